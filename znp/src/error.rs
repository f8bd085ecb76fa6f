use thiserror::Error;
use crate::{ commands::Command, nvram::NvRef, schema::SchemaViolation, sys::{ ErrorCode, Status }, types::Eui64 };

#[derive(Debug, Error)]
pub enum Error {
	#[error("Transport error: {0}")]
	Transport(#[from] frames::Error),
	#[error("No response to {0} in time")]
	CommandTimeout(Command),
	#[error("Radio rejected {request} ({code:?})")]
	Rpc { request: Command, code: ErrorCode },
	#[error("{request} failed with status {status:?}")]
	CommandFailed { request: Command, status: Status },
	#[error("Unexpected response to {0}")]
	UnexpectedResponse(Command),
	#[error("Codec error: {0}")]
	Codec(#[from] deku::DekuError),
	#[error("NVRAM item {0} does not exist")]
	ItemAbsent(NvRef),
	#[error("NVRAM item {item} has length {stored}, {written} bytes given")]
	LengthMismatch { item: NvRef, stored: usize, written: usize },
	#[error("No free entry left in {0}")]
	TableFull(String),
	#[error("Network is not formed")]
	NetworkUnformed,
	#[error("Network information lacks {0}")]
	IncompleteNetworkInfo(&'static str),
	#[error("No security material entry for extended pan id {extended_pan_id}")]
	NoMatchingSecurityEntry { extended_pan_id: Eui64 },
	#[error("Unsupported firmware (product id {0})")]
	UnsupportedFirmware(u8),
	#[error("Frame counter overflow ({counter} + {increment})")]
	CounterOverflow { counter: u32, increment: u32 },
	#[error("Link key of {0} is seed derived but no seed is stored")]
	SeedRequired(Eui64),
	#[error("Invalid backup: {0}")]
	SchemaViolation(#[from] SchemaViolation),
	#[error("Json error: {0}")]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
