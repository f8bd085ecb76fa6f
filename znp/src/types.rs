//basic zigbee types shared by commands, nvram records and the backup document

use deku::{ self, prelude::* };
use serde::{ Serialize, Deserialize, Serializer, Deserializer, de };
use core::fmt;

//EUI64, kept in wire (little endian) byte order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, DekuRead, DekuWrite)]
pub struct Eui64(pub [u8; 8]);

impl Eui64 {
	pub const BROADCAST: Self = Self([0xff; 8]);
	pub const ZERO: Self = Self([0x00; 8]);

	//display order is the reversed wire order
	pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
		let mut bytes = [0u8; 8];

		hex::decode_to_slice(s.replace(':', ""), &mut bytes)?;
		bytes.reverse();

		Ok(Self(bytes))
	}

	pub fn to_hex(&self) -> String {
		let mut bytes = self.0;
		bytes.reverse();

		hex::encode(bytes)
	}
}

impl fmt::Display for Eui64 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, b) in self.0.iter().rev().enumerate() {
			if i > 0 {
				write!(f, ":")?;
			}

			write!(f, "{:02x}", b)?;
		}

		Ok(())
	}
}

impl fmt::Debug for Eui64 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Eui64({})", self)
	}
}

impl Serialize for Eui64 {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for Eui64 {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;

		Eui64::from_hex(&s).map_err(de::Error::custom)
	}
}

//128 bit key
#[derive(Clone, Copy, PartialEq, Eq, Default, DekuRead, DekuWrite, Serialize, Deserialize)]
pub struct KeyData(#[serde(with = "hex::serde")] pub [u8; 16]);

impl KeyData {
	pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
		let mut bytes = [0u8; 16];
		hex::decode_to_slice(s, &mut bytes)?;

		Ok(Self(bytes))
	}
}

impl fmt::Debug for KeyData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "KeyData({})", hex::encode(self.0))
	}
}

//802.15.4 channels 11 - 26 as bitmask
#[derive(Clone, Copy, PartialEq, Eq, Default, DekuRead, DekuWrite)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
	pub const MIN_CHANNEL: u8 = 11;
	pub const MAX_CHANNEL: u8 = 26;
	pub const ALL: Self = Self(0x07FF_F800);

	pub fn from_channels(channels: &[u8]) -> Self {
		Self(channels.iter()
			.filter(|c| (Self::MIN_CHANNEL..=Self::MAX_CHANNEL).contains(*c))
			.fold(0, |mask, c| mask | 1u32 << c))
	}

	pub fn channels(&self) -> Vec<u8> {
		(Self::MIN_CHANNEL..=Self::MAX_CHANNEL).filter(|c| self.contains(*c)).collect()
	}

	pub fn contains(&self, channel: u8) -> bool {
		channel < 32 && self.0 & (1u32 << channel) != 0
	}
}

impl fmt::Debug for ChannelMask {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ChannelMask({:?})", self.channels())
	}
}

//16 bit addresses (pan id, nwk address) as 4 hex chars, big endian
pub mod hex_u16 {
	use serde::{ Deserialize, Deserializer, Serializer, de };

	pub fn serialize<S: Serializer>(value: &u16, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&hex::encode(value.to_be_bytes()))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
		let s = String::deserialize(deserializer)?;
		let mut bytes = [0u8; 2];

		hex::decode_to_slice(&s, &mut bytes).map_err(de::Error::custom)?;

		Ok(u16::from_be_bytes(bytes))
	}
}
