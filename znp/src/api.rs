//request / response exchanges with the radio, one at a time

use async_std::future::timeout;
use core::time::Duration;
use log::{ debug, info, warn };
use crate::{
	commands::{ Command, CommandType, Subsystem },
	config::{ FirmwareVersion, ZnpConfig },
	error::{ Error, Result },
	frame::GeneralFrame,
	sys::{ Request, Response, ResetType, Status },
	transport::Transport
};

const RPC_ERROR: Command = Command::new(Subsystem::Rpc, CommandType::Srsp, 0x00);
const RESET_IND: Command = Command::new(Subsystem::Sys, CommandType::Areq, 0x80);

#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
	pub transport_rev: u8,
	pub product_id: u8,
	pub major_rel: u8,
	pub minor_rel: u8,
	pub maint_rel: u8
}

pub struct Znp<T: Transport> {
	transport: T,
	config: ZnpConfig,
	firmware: FirmwareVersion,
}

impl<T: Transport> Znp<T> {
	//firmware generation comes from the config, or from SYS.Version when not declared
	pub async fn connect(transport: T, config: ZnpConfig) -> Result<Self> {
		let declared = config.firmware;
		let mut znp = Self { transport, config, firmware: declared.unwrap_or_default() };

		match declared {
			Some(firmware) => info!("Using declared firmware {:?}", firmware),
			None => {
				let version = znp.version().await?;
				znp.firmware = FirmwareVersion::from_product_id(version.product_id)?;

				info!("Detected firmware {:?} ({}.{}.{})", znp.firmware, version.major_rel, version.minor_rel, version.maint_rel);
			}
		}

		Ok(znp)
	}

	pub fn firmware(&self) -> FirmwareVersion {
		self.firmware
	}

	pub fn config(&self) -> &ZnpConfig {
		&self.config
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn transport_mut(&mut self) -> &mut T {
		&mut self.transport
	}

	pub fn into_transport(self) -> T {
		self.transport
	}

	//send a SREQ and wait for its SRSP
	pub async fn request(&mut self, request: Request) -> Result<Response> {
		let header = request.header();
		let wait = self.config.sreq_timeout();

		self.exchange(request, header.with_frame_type(CommandType::Srsp), wait).await
	}

	//like request, but the response status must be one of accepted
	pub async fn request_status(&mut self, request: Request, accepted: &[Status]) -> Result<Response> {
		let header = request.header();
		let response = self.request(request).await?;

		match response.status() {
			Some(status) if accepted.contains(&status) => Ok(response),
			Some(status) => Err(Error::CommandFailed { request: header, status }),
			None => Err(Error::UnexpectedResponse(header))
		}
	}

	async fn exchange(&mut self, request: Request, expected: Command, wait: Duration) -> Result<Response> {
		let header = request.header();
		debug!("{} {:?}", header, request);

		self.transport.send(GeneralFrame::from_request(&request)?).await?;

		match timeout(wait, self.wait_for(header, expected)).await {
			Ok(r) => r,
			Err(_) => {
				warn!("No response to {} in {:?}", header, wait);
				Err(Error::CommandTimeout(header))
			}
		}
	}

	async fn wait_for(&mut self, request: Command, expected: Command) -> Result<Response> {
		loop {
			let frame = self.transport.receive().await?;

			if frame.header == expected {
				let response = frame.response()?;
				debug!("{} {:?}", expected, response);

				return Ok(response);
			}

			if frame.header == RPC_ERROR {
				if let Ok(Response::RpcError { error_code, request_cmd0, request_cmd1 }) = frame.response() {
					if request_cmd0 == request.cmd0 && request_cmd1 == request.id {
						return Err(Error::Rpc { request, code: error_code });
					}
				}
			}

			debug!("Skipping unrelated frame {} {:02x?}", frame.header, frame.data);
		}
	}

	pub async fn version(&mut self) -> Result<VersionInfo> {
		match self.request(Request::Version).await? {
			Response::Version { transport_rev, product_id, major_rel, minor_rel, maint_rel, .. } =>
				Ok(VersionInfo { transport_rev, product_id, major_rel, minor_rel, maint_rel }),
			_ => Err(Error::UnexpectedResponse(Request::Version.header()))
		}
	}

	pub async fn ping(&mut self) -> Result<u16> {
		match self.request(Request::Ping).await? {
			Response::Ping { capabilities } => Ok(capabilities),
			_ => Err(Error::UnexpectedResponse(Request::Ping.header()))
		}
	}

	//soft reset, completes on the reset indication
	pub async fn reset(&mut self) -> Result<()> {
		let wait = self.config.arsp_timeout();

		if let Response::ResetInd { reason, .. } = self.exchange(Request::ResetReq { reset_type: ResetType::Soft }, RESET_IND, wait).await? {
			info!("Radio reset (reason {})", reason);
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::MemoryRadio;

	fn fast_config(firmware: Option<FirmwareVersion>) -> ZnpConfig {
		ZnpConfig { sreq_timeout_ms: 100, arsp_timeout_ms: 100, firmware }
	}

	#[async_std::test]
	async fn detects_firmware_from_version() {
		let znp = Znp::connect(MemoryRadio::new(FirmwareVersion::ZStack30), fast_config(None)).await.unwrap();

		assert_eq!(znp.firmware(), FirmwareVersion::ZStack30);
		assert_eq!(znp.transport().sent.len(), 1);
	}

	#[async_std::test]
	async fn declared_firmware_skips_detection() {
		let znp = Znp::connect(MemoryRadio::new(FirmwareVersion::ZStack12), fast_config(Some(FirmwareVersion::ZStack12))).await.unwrap();

		assert!(znp.transport().sent.is_empty());
	}

	#[async_std::test]
	async fn callbacks_are_skipped() {
		let mut znp = Znp::connect(MemoryRadio::new(FirmwareVersion::ZStack3x0), fast_config(Some(FirmwareVersion::ZStack3x0))).await.unwrap();
		znp.transport_mut().queue(GeneralFrame::new(Command::new(Subsystem::Zdo, CommandType::Areq, 0xC1), vec![0x34, 0x12]));

		assert_eq!(znp.ping().await.unwrap(), 0x0659);
	}

	#[async_std::test]
	async fn rpc_error_names_the_request() {
		let mut znp = Znp::connect(MemoryRadio::new(FirmwareVersion::ZStack12), fast_config(Some(FirmwareVersion::ZStack12))).await.unwrap();
		let r = znp.request(Request::NvLength { sys_id: 1, item_id: 7, sub_id: 0 }).await;

		assert!(matches!(r, Err(Error::Rpc { code: crate::sys::ErrorCode::InvalidCommandId, .. })));
	}

	#[async_std::test]
	async fn silent_radio_times_out() {
		let mut znp = Znp::connect(MemoryRadio::new(FirmwareVersion::ZStack3x0).silent(), fast_config(Some(FirmwareVersion::ZStack3x0))).await.unwrap();

		match znp.ping().await {
			Err(Error::CommandTimeout(header)) => assert_eq!(header, Request::Ping.header()),
			r => panic!("unexpected {:?}", r)
		}
	}

	#[async_std::test]
	async fn reset_waits_for_indication() {
		let mut znp = Znp::connect(MemoryRadio::new(FirmwareVersion::ZStack30), fast_config(Some(FirmwareVersion::ZStack30))).await.unwrap();

		znp.reset().await.unwrap();
		assert_eq!(znp.transport().resets, 1);
	}
}
