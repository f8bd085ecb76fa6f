//SYS (and RPC error) commands used by the nvram layer and workflows
//enum ids are the command header read as little endian u16: (id << 8) | cmd0

use deku::{ self, prelude::* };
use crate::commands::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(id_type = "u8")]
pub enum Status {
	#[deku(id = "0x00")]
	Success,
	#[deku(id = "0x01")]
	Failure,
	#[deku(id = "0x02")]
	InvalidParameter,
	#[deku(id = "0x09")]
	NvItemUninit,
	#[deku(id = "0x0A")]
	NvOperFailed,
	#[deku(id = "0x0C")]
	NvBadItemLen,
	#[deku(id_pat = "_")]
	Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(id_type = "u8")]
pub enum ErrorCode {
	#[deku(id = "0x01")]
	InvalidSubsystem,
	#[deku(id = "0x02")]
	InvalidCommandId,
	#[deku(id = "0x03")]
	InvalidParameter,
	#[deku(id = "0x04")]
	InvalidLength,
	#[deku(id_pat = "_")]
	Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(id_type = "u8")]
pub enum ResetType {
	#[deku(id = "0x00")]
	Hard,
	#[deku(id = "0x01")]
	Soft,
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(id_type = "u16")]
pub enum Request {
	#[deku(id = "0x0041")]
	ResetReq {
		reset_type: ResetType
	},
	#[deku(id = "0x0121")]
	Ping,
	#[deku(id = "0x0221")]
	Version,
	#[deku(id = "0x0721")]
	OsalNvItemInit {
		id: u16,
		item_len: u16,
		init_len: u8,
		#[deku(count = "init_len")]
		init_data: Vec<u8>
	},
	#[deku(id = "0x0821")]
	OsalNvRead {
		id: u16,
		offset: u8
	},
	#[deku(id = "0x0921")]
	OsalNvWrite {
		id: u16,
		offset: u8,
		value_len: u8,
		#[deku(count = "value_len")]
		value: Vec<u8>
	},
	#[deku(id = "0x1221")]
	OsalNvDelete {
		id: u16,
		item_len: u16
	},
	#[deku(id = "0x1321")]
	OsalNvLength {
		id: u16
	},
	#[deku(id = "0x1C21")]
	OsalNvReadExt {
		id: u16,
		offset: u16
	},
	#[deku(id = "0x1D21")]
	OsalNvWriteExt {
		id: u16,
		offset: u16,
		value_len: u16,
		#[deku(count = "value_len")]
		value: Vec<u8>
	},
	#[deku(id = "0x3021")]
	NvCreate {
		sys_id: u8,
		item_id: u16,
		sub_id: u16,
		length: u32
	},
	#[deku(id = "0x3121")]
	NvDelete {
		sys_id: u8,
		item_id: u16,
		sub_id: u16
	},
	#[deku(id = "0x3221")]
	NvLength {
		sys_id: u8,
		item_id: u16,
		sub_id: u16
	},
	#[deku(id = "0x3321")]
	NvRead {
		sys_id: u8,
		item_id: u16,
		sub_id: u16,
		offset: u16,
		length: u8
	},
	#[deku(id = "0x3421")]
	NvWrite {
		sys_id: u8,
		item_id: u16,
		sub_id: u16,
		offset: u16,
		value_len: u8,
		#[deku(count = "value_len")]
		value: Vec<u8>
	},
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(id_type = "u16")]
pub enum Response {
	//RPC subsystem, SRSP, id 0: the radio rejected the request
	#[deku(id = "0x0060")]
	RpcError {
		error_code: ErrorCode,
		request_cmd0: u8,
		request_cmd1: u8
	},
	#[deku(id = "0x0161")]
	Ping {
		capabilities: u16
	},
	#[deku(id = "0x0261")]
	Version {
		transport_rev: u8,
		product_id: u8,
		major_rel: u8,
		minor_rel: u8,
		maint_rel: u8,
		//code revision and bootloader info on newer firmwares
		#[deku(read_all)]
		extra: Vec<u8>
	},
	#[deku(id = "0x0761")]
	OsalNvItemInit {
		status: Status
	},
	#[deku(id = "0x0861")]
	OsalNvRead {
		status: Status,
		value_len: u8,
		#[deku(count = "value_len")]
		value: Vec<u8>
	},
	#[deku(id = "0x0961")]
	OsalNvWrite {
		status: Status
	},
	#[deku(id = "0x1261")]
	OsalNvDelete {
		status: Status
	},
	#[deku(id = "0x1361")]
	OsalNvLength {
		item_len: u16
	},
	#[deku(id = "0x1C61")]
	OsalNvReadExt {
		status: Status,
		value_len: u8,
		#[deku(count = "value_len")]
		value: Vec<u8>
	},
	#[deku(id = "0x1D61")]
	OsalNvWriteExt {
		status: Status
	},
	#[deku(id = "0x3061")]
	NvCreate {
		status: Status
	},
	#[deku(id = "0x3161")]
	NvDelete {
		status: Status
	},
	#[deku(id = "0x3261")]
	NvLength {
		length: u32
	},
	#[deku(id = "0x3361")]
	NvRead {
		status: Status,
		value_len: u8,
		#[deku(count = "value_len")]
		value: Vec<u8>
	},
	#[deku(id = "0x3461")]
	NvWrite {
		status: Status
	},
	#[deku(id = "0x8041")]
	ResetInd {
		reason: u8,
		transport_rev: u8,
		product_id: u8,
		major_rel: u8,
		minor_rel: u8,
		hw_rev: u8
	},
}

impl Request {
	pub fn header(&self) -> Command {
		Command::from_u16(match self {
			Self::ResetReq { .. } => 0x0041,
			Self::Ping => 0x0121,
			Self::Version => 0x0221,
			Self::OsalNvItemInit { .. } => 0x0721,
			Self::OsalNvRead { .. } => 0x0821,
			Self::OsalNvWrite { .. } => 0x0921,
			Self::OsalNvDelete { .. } => 0x1221,
			Self::OsalNvLength { .. } => 0x1321,
			Self::OsalNvReadExt { .. } => 0x1C21,
			Self::OsalNvWriteExt { .. } => 0x1D21,
			Self::NvCreate { .. } => 0x3021,
			Self::NvDelete { .. } => 0x3121,
			Self::NvLength { .. } => 0x3221,
			Self::NvRead { .. } => 0x3321,
			Self::NvWrite { .. } => 0x3421,
		})
	}

	pub fn osal_nv_write(id: u16, offset: u8, value: Vec<u8>) -> Self {
		Self::OsalNvWrite { id, offset, value_len: value.len() as u8, value }
	}

	pub fn osal_nv_write_ext(id: u16, offset: u16, value: Vec<u8>) -> Self {
		Self::OsalNvWriteExt { id, offset, value_len: value.len() as u16, value }
	}

	pub fn osal_nv_item_init(id: u16, item_len: u16, init_data: Vec<u8>) -> Self {
		Self::OsalNvItemInit { id, item_len, init_len: init_data.len() as u8, init_data }
	}

	pub fn nv_write(sys_id: u8, item_id: u16, sub_id: u16, offset: u16, value: Vec<u8>) -> Self {
		Self::NvWrite { sys_id, item_id, sub_id, offset, value_len: value.len() as u8, value }
	}
}

impl Response {
	//status byte for the responses that only report success / failure
	pub fn status(&self) -> Option<Status> {
		match self {
			Self::OsalNvItemInit { status } |
			Self::OsalNvRead { status, .. } |
			Self::OsalNvWrite { status } |
			Self::OsalNvDelete { status } |
			Self::OsalNvReadExt { status, .. } |
			Self::OsalNvWriteExt { status } |
			Self::NvCreate { status } |
			Self::NvDelete { status } |
			Self::NvRead { status, .. } |
			Self::NvWrite { status } => Some(*status),
			_ => None
		}
	}
}
