//NVRAM item identifiers

use core::fmt;

//system id of the Z-Stack items in the extended scheme
pub const ZSTACK_SYS_ID: u8 = 0x01;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsalNvId(pub u16);

impl OsalNvId {
	pub const EXTADDR: Self = Self(0x0001);
	pub const NIB: Self = Self(0x0021);
	pub const ADDRMGR: Self = Self(0x0023);
	pub const EXTENDED_PAN_ID: Self = Self(0x002D);
	pub const NWK_ACTIVE_KEY_INFO: Self = Self(0x003A);
	pub const NWK_ALTERN_KEY_INFO: Self = Self(0x003B);
	pub const PRECFGKEY: Self = Self(0x0062);
	pub const PRECFGKEYS_ENABLE: Self = Self(0x0063);
	pub const LEGACY_NWK_SEC_MATERIAL_TABLE_START: Self = Self(0x0075);
	pub const LEGACY_NWK_SEC_MATERIAL_TABLE_END: Self = Self(0x0080);
	pub const NWKKEY: Self = Self(0x0082);
	pub const PANID: Self = Self(0x0083);
	pub const CHANLIST: Self = Self(0x0084);
	pub const TCLK_SEED: Self = Self(0x0101);
	pub const APS_LINK_KEY_DATA_START: Self = Self(0x0201);
	pub const APS_LINK_KEY_DATA_END: Self = Self(0x02FF);

	pub fn offset(&self, index: u16) -> Self {
		Self(self.0.wrapping_add(index))
	}
}

impl fmt::Debug for OsalNvId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "OsalNvId({:#06x})", self.0)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExNvId(pub u16);

impl ExNvId {
	pub const ADDRMGR: Self = Self(0x0001);
	pub const APS_KEY_DATA_TABLE: Self = Self(0x0006);
	pub const NWK_SEC_MATERIAL_TABLE: Self = Self(0x0007);
}

impl fmt::Debug for ExNvId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ExNvId({:#06x})", self.0)
	}
}
