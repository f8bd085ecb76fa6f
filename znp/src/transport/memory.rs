//in-memory radio: answers SYS requests from a simulated NVRAM

use std::collections::{ BTreeMap, VecDeque };
use log::debug;
use crate::{
	commands::{ Command, Subsystem },
	config::FirmwareVersion,
	frame::GeneralFrame,
	nvids::OsalNvId,
	sys::{ ErrorCode, Request, Response, Status },
	types::Eui64
};
use super::Transport;

//largest value returned by a single read
const READ_CHUNK: usize = 244;

pub struct MemoryRadio {
	firmware: FirmwareVersion,
	pub legacy: BTreeMap<u16, Vec<u8>>,
	pub extended: BTreeMap<(u8, u16, u16), Vec<u8>>,
	pub sent: Vec<GeneralFrame>,
	pending: VecDeque<GeneralFrame>,
	silent: bool,
	pub resets: usize,
}

impl MemoryRadio {
	pub fn new(firmware: FirmwareVersion) -> Self {
		Self {
			firmware,
			legacy: BTreeMap::new(),
			extended: BTreeMap::new(),
			sent: Vec::new(),
			pending: VecDeque::new(),
			silent: false,
			resets: 0
		}
	}

	pub fn with_ieee(mut self, ieee: Eui64) -> Self {
		self.legacy.insert(OsalNvId::EXTADDR.0, ieee.0.to_vec());
		self
	}

	//radio that never answers
	pub fn silent(mut self) -> Self {
		self.silent = true;
		self
	}

	pub fn firmware(&self) -> FirmwareVersion {
		self.firmware
	}

	//unsolicited frame delivered before the next response
	pub fn queue(&mut self, frame: GeneralFrame) {
		self.pending.push_back(frame);
	}

	fn reply(&mut self, response: Response) {
		match GeneralFrame::from_response(&response) {
			Ok(frame) => self.pending.push_back(frame),
			Err(e) => debug!("memory radio can not encode {:?}: {}", response, e)
		}
	}

	fn rpc_error(&mut self, request: Command, error_code: ErrorCode) {
		self.reply(Response::RpcError { error_code, request_cmd0: request.cmd0, request_cmd1: request.id });
	}

	fn read_at(item: Option<&Vec<u8>>, offset: usize, limit: usize) -> (Status, Vec<u8>) {
		match item {
			None => (Status::InvalidParameter, Vec::new()),
			Some(v) if offset > v.len() => (Status::InvalidParameter, Vec::new()),
			Some(v) => {
				let end = v.len().min(offset + limit);
				(Status::Success, v[offset..end].to_vec())
			}
		}
	}

	fn write_at(item: Option<&mut Vec<u8>>, offset: usize, value: &[u8]) -> Status {
		match item {
			None => Status::NvItemUninit,
			Some(v) if offset + value.len() > v.len() => Status::NvOperFailed,
			Some(v) => {
				v[offset..offset + value.len()].copy_from_slice(value);
				Status::Success
			}
		}
	}

	fn handle(&mut self, header: Command, request: Request) {
		let extended = self.firmware.supports_extended_nvram();

		match request {
			Request::ResetReq { .. } => {
				self.resets += 1;
				let product_id = self.firmware.product_id();
				self.reply(Response::ResetInd { reason: 0, transport_rev: 2, product_id, major_rel: 2, minor_rel: 7, hw_rev: 1 });
			},
			Request::Ping => self.reply(Response::Ping { capabilities: 0x0659 }),
			Request::Version => {
				let product_id = self.firmware.product_id();
				self.reply(Response::Version { transport_rev: 2, product_id, major_rel: 2, minor_rel: 7, maint_rel: 1, extra: Vec::new() });
			},
			Request::OsalNvItemInit { id, item_len, init_data, .. } => {
				let status = if self.legacy.contains_key(&id) {
					Status::Success
				}
				else if init_data.len() > item_len as usize {
					Status::InvalidParameter
				}
				else {
					let mut value = vec![0u8; item_len as usize];
					value[..init_data.len()].copy_from_slice(&init_data);
					self.legacy.insert(id, value);
					Status::NvItemUninit
				};

				self.reply(Response::OsalNvItemInit { status });
			},
			Request::OsalNvRead { id, offset } => {
				let (status, value) = Self::read_at(self.legacy.get(&id), offset as usize, READ_CHUNK);
				self.reply(Response::OsalNvRead { status, value_len: value.len() as u8, value });
			},
			Request::OsalNvReadExt { id, offset } => {
				let (status, value) = Self::read_at(self.legacy.get(&id), offset as usize, READ_CHUNK);
				self.reply(Response::OsalNvReadExt { status, value_len: value.len() as u8, value });
			},
			Request::OsalNvWrite { id, offset, value, .. } => {
				let status = Self::write_at(self.legacy.get_mut(&id), offset as usize, &value);
				self.reply(Response::OsalNvWrite { status });
			},
			Request::OsalNvWriteExt { id, offset, value, .. } => {
				let status = Self::write_at(self.legacy.get_mut(&id), offset as usize, &value);
				self.reply(Response::OsalNvWriteExt { status });
			},
			Request::OsalNvDelete { id, item_len } => {
				let status = match self.legacy.get(&id) {
					None => Status::NvItemUninit,
					Some(v) if v.len() != item_len as usize => Status::NvBadItemLen,
					Some(_) => {
						self.legacy.remove(&id);
						Status::Success
					}
				};

				self.reply(Response::OsalNvDelete { status });
			},
			Request::OsalNvLength { id } => {
				let item_len = self.legacy.get(&id).map_or(0, |v| v.len() as u16);
				self.reply(Response::OsalNvLength { item_len });
			},
			Request::NvCreate { .. } |
			Request::NvDelete { .. } |
			Request::NvLength { .. } |
			Request::NvRead { .. } |
			Request::NvWrite { .. } if !extended => self.rpc_error(header, ErrorCode::InvalidCommandId),
			Request::NvCreate { sys_id, item_id, sub_id, length } => {
				let key = (sys_id, item_id, sub_id);

				let status = if self.extended.contains_key(&key) {
					Status::Success
				}
				else {
					self.extended.insert(key, vec![0xff; length as usize]);
					Status::NvItemUninit
				};

				self.reply(Response::NvCreate { status });
			},
			Request::NvDelete { sys_id, item_id, sub_id } => {
				let status = match self.extended.remove(&(sys_id, item_id, sub_id)) {
					Some(_) => Status::Success,
					None => Status::NvItemUninit
				};

				self.reply(Response::NvDelete { status });
			},
			Request::NvLength { sys_id, item_id, sub_id } => {
				let length = self.extended.get(&(sys_id, item_id, sub_id)).map_or(0, |v| v.len() as u32);
				self.reply(Response::NvLength { length });
			},
			Request::NvRead { sys_id, item_id, sub_id, offset, length } => {
				let (status, value) = match self.extended.get(&(sys_id, item_id, sub_id)) {
					None => (Status::NvItemUninit, Vec::new()),
					item => Self::read_at(item, offset as usize, length as usize)
				};

				self.reply(Response::NvRead { status, value_len: value.len() as u8, value });
			},
			Request::NvWrite { sys_id, item_id, sub_id, offset, value, .. } => {
				let status = Self::write_at(self.extended.get_mut(&(sys_id, item_id, sub_id)), offset as usize, &value);
				self.reply(Response::NvWrite { status });
			},
		}
	}
}

impl Transport for MemoryRadio {
	async fn send(&mut self, frame: GeneralFrame) -> Result<(), frames::Error> {
		self.sent.push(frame.clone());

		if self.silent {
			return Ok(());
		}

		match frame.request() {
			Ok(request) => self.handle(frame.header, request),
			Err(_) if frame.header.subsystem() != Subsystem::Sys => self.rpc_error(frame.header, ErrorCode::InvalidSubsystem),
			Err(_) => self.rpc_error(frame.header, ErrorCode::InvalidCommandId)
		}

		Ok(())
	}

	async fn receive(&mut self) -> Result<GeneralFrame, frames::Error> {
		match self.pending.pop_front() {
			Some(frame) => Ok(frame),
			None => futures::future::pending().await
		}
	}
}
