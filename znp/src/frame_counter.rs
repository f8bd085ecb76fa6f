//trust center network frame counter, stored differently by every firmware generation

use core::future::Future;
use deku::{ self, prelude::* };
use log::{ debug, info };
use crate::{
	api::Znp,
	config::FirmwareVersion,
	error::{ Error, Result },
	nvids::{ ExNvId, OsalNvId },
	nvram::{ NvRef, NvTable },
	records::{ NwkActiveKeyItems, NwkKeyDesc, NwkSecMaterialDesc },
	transport::Transport,
	types::Eui64
};

pub trait FrameCounterStore {
	fn read<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64) -> impl Future<Output = Result<u32>>;
	fn write<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64, counter: u32) -> impl Future<Output = Result<()>>;
	//security material the stack creates when it forms a network
	fn prepare<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64, key: &NwkKeyDesc) -> impl Future<Output = Result<()>>;
}

//Z-Stack 1.2: last 4 bytes of the NWKKEY item
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalFrameCounter;

impl GlobalFrameCounter {
	const ITEM: NvRef = NvRef::Legacy(OsalNvId::NWKKEY);

	async fn read_item<T: Transport>(znp: &mut Znp<T>) -> Result<Vec<u8>> {
		let item = znp.nvram().read(Self::ITEM).await?.ok_or(Error::ItemAbsent(Self::ITEM))?;

		if item.len() < 4 {
			return Err(Error::LengthMismatch { item: Self::ITEM, stored: item.len(), written: 4 });
		}

		Ok(item)
	}
}

fn counter_at(buf: &[u8]) -> u32 {
	let mut counter = [0u8; 4];
	counter.copy_from_slice(&buf[..4]);
	u32::from_le_bytes(counter)
}

impl FrameCounterStore for GlobalFrameCounter {
	async fn read<T: Transport>(&self, znp: &mut Znp<T>, _extended_pan_id: Eui64) -> Result<u32> {
		let item = Self::read_item(znp).await?;

		Ok(counter_at(&item[item.len() - 4..]))
	}

	async fn write<T: Transport>(&self, znp: &mut Znp<T>, _extended_pan_id: Eui64, counter: u32) -> Result<()> {
		let mut item = Self::read_item(znp).await?;
		let start = item.len() - 4;

		item[start..].copy_from_slice(&counter.to_le_bytes());

		znp.nvram().write(Self::ITEM, &item).await
	}

	async fn prepare<T: Transport>(&self, znp: &mut Znp<T>, _extended_pan_id: Eui64, key: &NwkKeyDesc) -> Result<()> {
		let frame_counter = match znp.nvram().read(Self::ITEM).await? {
			Some(item) if item.len() >= 4 => counter_at(&item[item.len() - 4..]),
			_ => 0
		};

		let item = NwkActiveKeyItems { active: *key, frame_counter }.to_bytes()?;

		znp.nvram().write_or_create(Self::ITEM, &item).await
	}
}

fn entry_matches(entry: &[u8], extended_pan_id: &Eui64) -> bool {
	entry.len() >= NwkSecMaterialDesc::LEN && entry[4..NwkSecMaterialDesc::LEN] == extended_pan_id.0
}

//Z-Stack 3.0: legacy table, falls back to (or creates) a wildcard entry
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTableFrameCounter;

impl FallbackTableFrameCounter {
	const TABLE: NvTable = NvTable::Range {
		start: OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_START,
		end: OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_END
	};

	//index and raw contents of the entry used for the network
	async fn resolve<T: Transport>(znp: &mut Znp<T>, extended_pan_id: Eui64) -> Result<(usize, Vec<u8>)> {
		let entries = znp.nvram().read_table(Self::TABLE).await?;

		if let Some(i) = entries.iter().position(|e| entry_matches(e, &extended_pan_id)) {
			return Ok((i, entries[i].clone()));
		}

		if let Some(i) = entries.iter().position(|e| entry_matches(e, &NwkSecMaterialDesc::WILDCARD)) {
			debug!("Using wildcard frame counter entry {}", i);
			return Ok((i, entries[i].clone()));
		}

		//first absent id, then the first unused slot
		let index = if entries.len() < Self::TABLE.capacity() {
			entries.len()
		}
		else {
			entries.iter()
				.position(|e| entry_matches(e, &Eui64::ZERO))
				.ok_or_else(|| Error::TableFull(format!("{:?}", Self::TABLE)))?
		};

		let entry = NwkSecMaterialDesc { frame_counter: 0, extended_pan_id: NwkSecMaterialDesc::WILDCARD }.to_bytes()?;
		znp.nvram().write_table_entry(Self::TABLE, index, &entry).await?;

		info!("Created wildcard frame counter entry {}", index);

		Ok((index, entry))
	}
}

impl FrameCounterStore for FallbackTableFrameCounter {
	async fn read<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64) -> Result<u32> {
		let (_, entry) = Self::resolve(znp, extended_pan_id).await?;

		Ok(counter_at(&entry))
	}

	async fn write<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64, counter: u32) -> Result<()> {
		let (index, mut entry) = Self::resolve(znp, extended_pan_id).await?;

		entry[..4].copy_from_slice(&counter.to_le_bytes());

		znp.nvram().write_table_entry(Self::TABLE, index, &entry).await
	}

	async fn prepare<T: Transport>(&self, _znp: &mut Znp<T>, _extended_pan_id: Eui64, _key: &NwkKeyDesc) -> Result<()> {
		Ok(())
	}
}

//Z-Stack 3.x0: extended table, the network must have its own entry
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictTableFrameCounter;

impl StrictTableFrameCounter {
	const TABLE: NvTable = NvTable::Extended {
		item_id: ExNvId::NWK_SEC_MATERIAL_TABLE,
		capacity: (OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_END.0 - OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_START.0 + 1) as usize
	};

	async fn resolve<T: Transport>(znp: &mut Znp<T>, extended_pan_id: Eui64) -> Result<(usize, Vec<u8>)> {
		let entries = znp.nvram().read_table(Self::TABLE).await?;

		entries.iter()
			.position(|e| entry_matches(e, &extended_pan_id))
			.map(|i| (i, entries[i].clone()))
			.ok_or(Error::NoMatchingSecurityEntry { extended_pan_id })
	}
}

impl FrameCounterStore for StrictTableFrameCounter {
	async fn read<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64) -> Result<u32> {
		let (_, entry) = Self::resolve(znp, extended_pan_id).await?;

		Ok(counter_at(&entry))
	}

	async fn write<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64, counter: u32) -> Result<()> {
		let (index, mut entry) = Self::resolve(znp, extended_pan_id).await?;

		entry[..4].copy_from_slice(&counter.to_le_bytes());

		znp.nvram().write_table_entry(Self::TABLE, index, &entry).await
	}

	async fn prepare<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64, _key: &NwkKeyDesc) -> Result<()> {
		let entries = znp.nvram().read_table(Self::TABLE).await?;

		if entries.iter().any(|e| entry_matches(e, &extended_pan_id)) {
			return Ok(());
		}

		let entry = NwkSecMaterialDesc { frame_counter: 0, extended_pan_id }.to_bytes()?;
		znp.nvram().write_table_entry(Self::TABLE, entries.len(), &entry).await
	}
}

#[derive(Debug, Clone, Copy)]
pub enum TcFrameCounter {
	Global(GlobalFrameCounter),
	FallbackTable(FallbackTableFrameCounter),
	StrictTable(StrictTableFrameCounter),
}

impl TcFrameCounter {
	pub fn for_firmware(firmware: FirmwareVersion) -> Self {
		match firmware {
			FirmwareVersion::ZStack12 => Self::Global(GlobalFrameCounter),
			FirmwareVersion::ZStack30 => Self::FallbackTable(FallbackTableFrameCounter),
			FirmwareVersion::ZStack3x0 => Self::StrictTable(StrictTableFrameCounter),
		}
	}

	pub async fn read<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64) -> Result<u32> {
		match self {
			Self::Global(s) => s.read(znp, extended_pan_id).await,
			Self::FallbackTable(s) => s.read(znp, extended_pan_id).await,
			Self::StrictTable(s) => s.read(znp, extended_pan_id).await,
		}
	}

	pub async fn write<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64, counter: u32) -> Result<()> {
		debug!("Writing frame counter {} for {}", counter, extended_pan_id);

		match self {
			Self::Global(s) => s.write(znp, extended_pan_id, counter).await,
			Self::FallbackTable(s) => s.write(znp, extended_pan_id, counter).await,
			Self::StrictTable(s) => s.write(znp, extended_pan_id, counter).await,
		}
	}

	pub async fn prepare<T: Transport>(&self, znp: &mut Znp<T>, extended_pan_id: Eui64, key: &NwkKeyDesc) -> Result<()> {
		match self {
			Self::Global(s) => s.prepare(znp, extended_pan_id, key).await,
			Self::FallbackTable(s) => s.prepare(znp, extended_pan_id, key).await,
			Self::StrictTable(s) => s.prepare(znp, extended_pan_id, key).await,
		}
	}
}
