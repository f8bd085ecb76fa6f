//typed layouts of the NVRAM items

use deku::{ self, prelude::* };
use crate::types::{ ChannelMask, Eui64, KeyData };

pub const NWK_STATE_INIT: u8 = 0;
pub const NWK_STATE_ROUTER: u8 = 8;

//padding bytes of the 32 bit aligned NIB (CC26xx / CC13xx)
const NIB_ALIGNED_PADDING: [usize; 6] = [15, 21, 25, 39, 109, 115];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NibLayout {
	Packed,
	Aligned,
}

impl NibLayout {
	pub const PACKED_LEN: usize = 110;
	pub const ALIGNED_LEN: usize = 116;

	pub fn from_len(len: usize) -> Option<Self> {
		match len {
			Self::PACKED_LEN => Some(Self::Packed),
			Self::ALIGNED_LEN => Some(Self::Aligned),
			_ => None
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, DekuRead, DekuWrite)]
pub struct NwkKeyDesc {
	pub key_seq_num: u8,
	pub key: KeyData
}

//network information base, packed layout
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
pub struct Nib {
	pub sequence_num: u8,
	pub passive_ack_timeout: u8,
	pub max_broadcast_retries: u8,
	pub max_children: u8,
	pub max_depth: u8,
	pub max_routers: u8,
	pub dummy_neighbor_table: u8,
	pub broadcast_delivery_time: u8,
	pub report_constant_cost: u8,
	pub route_disc_retries: u8,
	pub dummy_routing_table: u8,
	pub secure_all_frames: u8,
	pub security_level: u8,
	pub sym_link: u8,
	pub capability_flags: u8,
	pub transaction_persistence_time: u16,
	pub nwk_protocol_version: u8,
	pub route_discovery_time: u8,
	pub route_expiry_time: u8,
	pub nwk_dev_address: u16,
	pub nwk_logical_channel: u8,
	pub nwk_coord_address: u16,
	pub nwk_coord_ext_address: Eui64,
	pub nwk_pan_id: u16,
	pub nwk_state: u8,
	pub channel_list: ChannelMask,
	pub beacon_order: u8,
	pub super_frame_order: u8,
	pub scan_duration: u8,
	pub batt_life_ext: u8,
	pub allocated_router_addresses: u32,
	pub allocated_end_device_addresses: u32,
	pub node_depth: u8,
	pub extended_pan_id: Eui64,
	pub nwk_key_loaded: u8,
	pub spare1: NwkKeyDesc,
	pub spare2: NwkKeyDesc,
	pub spare3: u8,
	pub spare4: u8,
	pub nwk_link_status_period: u8,
	pub nwk_router_age_limit: u8,
	pub nwk_use_multicast: u8,
	pub nwk_is_concentrator: u8,
	pub nwk_concentrator_discovery_time: u8,
	pub nwk_concentrator_radius: u8,
	pub nwk_all_fresh: u8,
	pub nwk_manager_addr: u16,
	pub nwk_total_transmissions: u16,
	pub nwk_update_id: u8,
}

impl Default for Nib {
	//values of a freshly erased coordinator
	fn default() -> Self {
		Self {
			sequence_num: 0,
			passive_ack_timeout: 5,
			max_broadcast_retries: 2,
			max_children: 0,
			max_depth: 20,
			max_routers: 0,
			dummy_neighbor_table: 0,
			broadcast_delivery_time: 30,
			report_constant_cost: 0,
			route_disc_retries: 0,
			dummy_routing_table: 0,
			secure_all_frames: 1,
			security_level: 5,
			sym_link: 1,
			capability_flags: 143,
			transaction_persistence_time: 7,
			nwk_protocol_version: 2,
			route_discovery_time: 5,
			route_expiry_time: 30,
			nwk_dev_address: 0xFFFE,
			nwk_logical_channel: 0,
			nwk_coord_address: 0x0000,
			nwk_coord_ext_address: Eui64::ZERO,
			nwk_pan_id: 0xFFFF,
			nwk_state: NWK_STATE_INIT,
			channel_list: ChannelMask(0),
			beacon_order: 15,
			super_frame_order: 15,
			scan_duration: 0,
			batt_life_ext: 0,
			allocated_router_addresses: 1,
			allocated_end_device_addresses: 1,
			node_depth: 0,
			extended_pan_id: Eui64::ZERO,
			nwk_key_loaded: 0,
			spare1: NwkKeyDesc::default(),
			spare2: NwkKeyDesc::default(),
			spare3: 0,
			spare4: 0,
			nwk_link_status_period: 60,
			nwk_router_age_limit: 3,
			nwk_use_multicast: 0,
			nwk_is_concentrator: 1,
			nwk_concentrator_discovery_time: 120,
			nwk_concentrator_radius: 30,
			nwk_all_fresh: 1,
			nwk_manager_addr: 0x0000,
			nwk_total_transmissions: 0,
			nwk_update_id: 0,
		}
	}
}

impl Nib {
	//accepts both layouts, returns the one found
	pub fn decode(buf: &[u8]) -> Result<(Self, NibLayout), DekuError> {
		match NibLayout::from_len(buf.len()) {
			Some(NibLayout::Packed) => Ok((Self::try_from(buf)?, NibLayout::Packed)),
			Some(NibLayout::Aligned) => {
				let packed: Vec<u8> = buf.iter()
					.enumerate()
					.filter(|(i, _)| !NIB_ALIGNED_PADDING.contains(i))
					.map(|(_, b)| *b)
					.collect();

				Ok((Self::try_from(packed.as_slice())?, NibLayout::Aligned))
			},
			None => Err(DekuError::Parse(format!("unexpected NIB length {}", buf.len()).into()))
		}
	}

	pub fn encode(&self, layout: NibLayout) -> Result<Vec<u8>, DekuError> {
		let mut buf = self.to_bytes()?;

		if layout == NibLayout::Aligned {
			for i in NIB_ALIGNED_PADDING {
				buf.insert(i, 0x00);
			}
		}

		Ok(buf)
	}

	pub fn is_formed(&self) -> bool {
		self.nwk_logical_channel != 0 && self.nwk_key_loaded != 0
	}
}

//NWKKEY item of Z-Stack 1.2, the frame counter is in the last 4 bytes
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
pub struct NwkActiveKeyItems {
	pub active: NwkKeyDesc,
	pub frame_counter: u32,
}

//trust center frame counter for one network
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
pub struct NwkSecMaterialDesc {
	pub frame_counter: u32,
	pub extended_pan_id: Eui64,
}

impl NwkSecMaterialDesc {
	pub const LEN: usize = 12;
	//matches any network
	pub const WILDCARD: Eui64 = Eui64::BROADCAST;
}

pub mod addr_mgr_user {
	pub const DEFAULT: u8 = 0x00;
	pub const ASSOC: u8 = 0x01;
	pub const SECURITY: u8 = 0x02;
	pub const BACKUP: u8 = 0x04;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
pub struct AddrMgrEntry {
	pub user: u8,
	pub nwk: u16,
	pub ieee: Eui64,
}

impl AddrMgrEntry {
	pub const LEN: usize = 11;
	pub const EMPTY: Self = Self { user: addr_mgr_user::DEFAULT, nwk: 0xFFFF, ieee: Eui64::BROADCAST };

	pub fn is_empty(&self) -> bool {
		self.nwk == 0xFFFF && self.ieee == Eui64::BROADCAST
	}
}

pub mod key_attributes {
	//key stored in the entry
	pub const EXPLICIT: u8 = 0x01;
	//key derived from the TCLK seed with the entry's seed shift
	pub const DERIVED: u8 = 0x02;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
pub struct LinkKeyEntry {
	pub ieee: Eui64,
	pub attributes: u8,
	pub seed_shift: u8,
	pub key: KeyData,
	pub tx_counter: u32,
	pub rx_counter: u32,
}

impl LinkKeyEntry {
	pub const LEN: usize = 34;

	pub fn is_derived(&self) -> bool {
		self.attributes & key_attributes::DERIVED != 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn record_sizes() {
		assert_eq!(Nib::default().to_bytes().unwrap().len(), NibLayout::PACKED_LEN);
		assert_eq!(AddrMgrEntry::EMPTY.to_bytes().unwrap().len(), AddrMgrEntry::LEN);
		assert_eq!(NwkSecMaterialDesc { frame_counter: 0, extended_pan_id: Eui64::ZERO }.to_bytes().unwrap().len(), NwkSecMaterialDesc::LEN);
		assert_eq!(NwkActiveKeyItems { active: NwkKeyDesc::default(), frame_counter: 0 }.to_bytes().unwrap().len(), 21);

		let entry = LinkKeyEntry { ieee: Eui64::ZERO, attributes: 0, seed_shift: 0, key: KeyData::default(), tx_counter: 0, rx_counter: 0 };
		assert_eq!(entry.to_bytes().unwrap().len(), LinkKeyEntry::LEN);
	}

	#[test]
	fn nib_layouts_round_trip() {
		let mut nib = Nib::default();
		nib.nwk_logical_channel = 25;
		nib.nwk_pan_id = 0xFEED;
		nib.nwk_update_id = 2;
		nib.nwk_manager_addr = 0x1234;

		for layout in [NibLayout::Packed, NibLayout::Aligned] {
			let buf = nib.encode(layout).unwrap();
			let (decoded, found) = Nib::decode(&buf).unwrap();

			assert_eq!(decoded, nib);
			assert_eq!(found, layout);
		}
	}

	#[test]
	fn aligned_nib_padding_positions() {
		let nib = Nib { capability_flags: 0xAA, transaction_persistence_time: 0x0102, nwk_manager_addr: 0x0304, ..Nib::default() };
		let buf = nib.encode(NibLayout::Aligned).unwrap();

		assert_eq!(buf.len(), NibLayout::ALIGNED_LEN);
		assert_eq!(buf[14], 0xAA);
		assert_eq!(buf[15], 0x00);
		assert_eq!(&buf[16..18], &[0x02, 0x01]);
		assert_eq!(&buf[110..112], &[0x04, 0x03]);
	}

	#[test]
	fn nib_rejects_other_lengths() {
		assert!(Nib::decode(&[0u8; 100]).is_err());
	}

	#[test]
	fn addr_mgr_entry_bytes() {
		let entry = AddrMgrEntry { user: addr_mgr_user::ASSOC, nwk: 0x9672, ieee: Eui64::from_hex("000b57fffe38b212").unwrap() };

		assert_eq!(entry.to_bytes().unwrap(), vec![0x01, 0x72, 0x96, 0x12, 0xb2, 0x38, 0xfe, 0xff, 0x57, 0x0b, 0x00]);
		assert!(AddrMgrEntry::try_from([0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff].as_slice()).unwrap().is_empty());
	}
}
