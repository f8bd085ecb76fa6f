//MT command header: cmd0 (frame type in bits 5-7, subsystem in bits 0-4) followed by the command id

use deku::{ self, prelude::* };
use core::fmt;

const SUBSYSTEM_MASK: u8 = 0b0001_1111;
const TYPE_MASK: u8 = 0b1110_0000;
const TYPE_SHIFT: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
	Rpc,
	Sys,
	Mac,
	Nwk,
	Af,
	Zdo,
	Sapi,
	Util,
	Debug,
	App,
	AppConfig,
	GreenPower,
	//reserved codes used by some firmwares
	Unknown(u8),
}

impl Subsystem {
	pub const fn to_raw(self) -> u8 {
		match self {
			Self::Rpc => 0,
			Self::Sys => 1,
			Self::Mac => 2,
			Self::Nwk => 3,
			Self::Af => 4,
			Self::Zdo => 5,
			Self::Sapi => 6,
			Self::Util => 7,
			Self::Debug => 8,
			Self::App => 9,
			Self::AppConfig => 15,
			Self::GreenPower => 21,
			Self::Unknown(v) => v & SUBSYSTEM_MASK,
		}
	}

	pub const fn from_raw(value: u8) -> Self {
		match value & SUBSYSTEM_MASK {
			0 => Self::Rpc,
			1 => Self::Sys,
			2 => Self::Mac,
			3 => Self::Nwk,
			4 => Self::Af,
			5 => Self::Zdo,
			6 => Self::Sapi,
			7 => Self::Util,
			8 => Self::Debug,
			9 => Self::App,
			15 => Self::AppConfig,
			21 => Self::GreenPower,
			v => Self::Unknown(v),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
	Poll,
	//synchronous request, answered by exactly one SRSP
	Sreq,
	//asynchronous request or callback
	Areq,
	Srsp,
	Reserved(u8),
}

impl CommandType {
	pub const fn to_raw(self) -> u8 {
		match self {
			Self::Poll => 0,
			Self::Sreq => 1,
			Self::Areq => 2,
			Self::Srsp => 3,
			Self::Reserved(v) => v & 0b111,
		}
	}

	pub const fn from_raw(value: u8) -> Self {
		match value & 0b111 {
			0 => Self::Poll,
			1 => Self::Sreq,
			2 => Self::Areq,
			3 => Self::Srsp,
			v => Self::Reserved(v),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, DekuRead, DekuWrite)]
pub struct Command {
	pub cmd0: u8,
	pub id: u8,
}

impl Command {
	pub const fn new(subsystem: Subsystem, frame_type: CommandType, id: u8) -> Self {
		Self {
			cmd0: frame_type.to_raw() << TYPE_SHIFT | subsystem.to_raw(),
			id
		}
	}

	pub fn subsystem(&self) -> Subsystem {
		Subsystem::from_raw(self.cmd0)
	}

	pub fn frame_type(&self) -> CommandType {
		CommandType::from_raw(self.cmd0 >> TYPE_SHIFT)
	}

	pub fn with_subsystem(self, subsystem: Subsystem) -> Self {
		Self {
			cmd0: self.cmd0 & TYPE_MASK | subsystem.to_raw(),
			id: self.id
		}
	}

	pub fn with_frame_type(self, frame_type: CommandType) -> Self {
		Self {
			cmd0: self.cmd0 & SUBSYSTEM_MASK | frame_type.to_raw() << TYPE_SHIFT,
			id: self.id
		}
	}

	pub fn with_id(self, id: u8) -> Self {
		Self { cmd0: self.cmd0, id }
	}

	//serialized little endian: cmd0 is the low byte
	pub const fn to_u16(self) -> u16 {
		u16::from_le_bytes([self.cmd0, self.id])
	}

	pub const fn from_u16(value: u16) -> Self {
		let [cmd0, id] = value.to_le_bytes();

		Self { cmd0, id }
	}

	pub const fn to_le_bytes(self) -> [u8; 2] {
		[self.cmd0, self.id]
	}
}

pub fn encode(subsystem: Subsystem, frame_type: CommandType, id: u8) -> u16 {
	Command::new(subsystem, frame_type, id).to_u16()
}

pub fn decode(value: u16) -> (Subsystem, CommandType, u8) {
	let command = Command::from_u16(value);

	(command.subsystem(), command.frame_type(), command.id)
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}.{:?}({:#04x})", self.subsystem(), self.frame_type(), self.id)
	}
}

impl fmt::Debug for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Command({})", self)
	}
}
