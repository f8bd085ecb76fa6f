//devices known to the coordinator and their trust center link keys

use std::collections::HashMap;
use deku::{ self, prelude::* };
use log::{ debug, info, warn };
use crate::{
	api::Znp,
	config::FirmwareVersion,
	error::{ Error, Result },
	nvids::{ ExNvId, OsalNvId },
	nvram::{ NvRef, NvTable },
	records::{ addr_mgr_user, key_attributes, AddrMgrEntry, LinkKeyEntry },
	transport::Transport,
	types::{ Eui64, KeyData }
};

pub const ADDR_MGR_CAPACITY: usize = 64;
//size of the legacy link key id range, kept for the extended table
pub const LINK_KEY_CAPACITY: usize = 255;
//largest rotation tried when matching a key against the seed
pub const MAX_SEED_SHIFT: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkKeyRecord {
	pub key: KeyData,
	pub rx_counter: u32,
	pub tx_counter: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDevice {
	pub ieee: Eui64,
	pub nwk: u16,
	pub link_key: Option<LinkKeyRecord>,
}

//seed rotated left by shift bytes, xored with the wire order ieee repeated twice
pub fn derive_link_key_with_shift(seed: &KeyData, ieee: &Eui64, shift: u8) -> KeyData {
	let mut key = seed.0;
	let len = key.len();
	key.rotate_left(shift as usize % len);

	for (i, b) in key.iter_mut().enumerate() {
		*b ^= ieee.0[i % ieee.0.len()];
	}

	KeyData(key)
}

pub fn derive_link_key(seed: &KeyData, ieee: &Eui64) -> KeyData {
	derive_link_key_with_shift(seed, ieee, 0)
}

pub fn find_key_shift(seed: &KeyData, ieee: &Eui64, key: &KeyData) -> Option<u8> {
	(0..=MAX_SEED_SHIFT).find(|shift| derive_link_key_with_shift(seed, ieee, *shift) == *key)
}

pub fn addr_mgr_table(firmware: FirmwareVersion) -> NvTable {
	match firmware {
		FirmwareVersion::ZStack3x0 => NvTable::Extended { item_id: ExNvId::ADDRMGR, capacity: ADDR_MGR_CAPACITY },
		_ => NvTable::Blob { id: OsalNvId::ADDRMGR, entry_len: AddrMgrEntry::LEN, capacity: ADDR_MGR_CAPACITY }
	}
}

pub fn link_key_table(firmware: FirmwareVersion) -> NvTable {
	match firmware {
		FirmwareVersion::ZStack3x0 => NvTable::Extended { item_id: ExNvId::APS_KEY_DATA_TABLE, capacity: LINK_KEY_CAPACITY },
		_ => NvTable::Range { start: OsalNvId::APS_LINK_KEY_DATA_START, end: OsalNvId::APS_LINK_KEY_DATA_END }
	}
}

pub async fn read_seed<T: Transport>(znp: &mut Znp<T>) -> Result<Option<KeyData>> {
	if !znp.firmware().supports_tclk_seed() {
		return Ok(None);
	}

	match znp.nvram().read(OsalNvId::TCLK_SEED.into()).await? {
		Some(buf) => Ok(Some(KeyData::try_from(buf.as_slice())?)),
		None => Ok(None)
	}
}

//false when the firmware has no seed support
pub async fn write_seed<T: Transport>(znp: &mut Znp<T>, seed: &KeyData) -> Result<bool> {
	if !znp.firmware().supports_tclk_seed() {
		warn!("Firmware {:?} does not store a TCLK seed", znp.firmware());
		return Ok(false);
	}

	znp.nvram().write_or_create(OsalNvId::TCLK_SEED.into(), &seed.0).await?;

	Ok(true)
}

fn decode_entries<'a, R>(entries: &'a [Vec<u8>]) -> Result<Vec<R>> where
	R: TryFrom<&'a [u8], Error = DekuError> {
	entries.iter().map(|e| Ok(R::try_from(e.as_slice())?)).collect()
}

fn link_key_entry(device: &StoredDevice, record: &LinkKeyRecord, seed: Option<&KeyData>, tx_counter: u32) -> LinkKeyEntry {
	let shift = seed.and_then(|seed| find_key_shift(seed, &device.ieee, &record.key));

	match shift {
		Some(seed_shift) => LinkKeyEntry {
			ieee: device.ieee,
			attributes: key_attributes::DERIVED,
			seed_shift,
			key: KeyData::default(),
			tx_counter,
			rx_counter: record.rx_counter
		},
		None => LinkKeyEntry {
			ieee: device.ieee,
			attributes: key_attributes::EXPLICIT,
			seed_shift: 0,
			key: record.key,
			tx_counter,
			rx_counter: record.rx_counter
		}
	}
}

fn addr_mgr_entry(device: &StoredDevice) -> AddrMgrEntry {
	let user = match device.link_key {
		Some(_) => addr_mgr_user::ASSOC | addr_mgr_user::SECURITY,
		None => addr_mgr_user::ASSOC
	};

	AddrMgrEntry { user, nwk: device.nwk, ieee: device.ieee }
}

pub async fn load_devices<T: Transport>(znp: &mut Znp<T>, seed: Option<&KeyData>) -> Result<Vec<StoredDevice>> {
	let firmware = znp.firmware();
	let addr_entries = znp.nvram().read_table(addr_mgr_table(firmware)).await?;
	let key_entries = znp.nvram().read_table(link_key_table(firmware)).await?;

	let mut keys: HashMap<Eui64, LinkKeyEntry> = decode_entries::<LinkKeyEntry>(&key_entries)?
		.into_iter()
		.map(|e| (e.ieee, e))
		.collect();

	let mut devices = Vec::new();

	for entry in decode_entries::<AddrMgrEntry>(&addr_entries)? {
		if entry.is_empty() || entry.user & addr_mgr_user::ASSOC == 0 {
			continue;
		}

		let link_key = match keys.remove(&entry.ieee) {
			None => None,
			Some(k) if k.is_derived() => {
				let seed = seed.ok_or(Error::SeedRequired(entry.ieee))?;

				Some(LinkKeyRecord {
					key: derive_link_key_with_shift(seed, &entry.ieee, k.seed_shift),
					rx_counter: k.rx_counter,
					tx_counter: k.tx_counter
				})
			},
			Some(k) => Some(LinkKeyRecord { key: k.key, rx_counter: k.rx_counter, tx_counter: k.tx_counter })
		};

		devices.push(StoredDevice { ieee: entry.ieee, nwk: entry.nwk, link_key });
	}

	for ieee in keys.keys() {
		warn!("Link key of {} has no address manager entry", ieee);
	}

	debug!("Loaded {} devices", devices.len());

	Ok(devices)
}

//insert or update one device
pub async fn store_device<T: Transport>(znp: &mut Znp<T>, device: &StoredDevice, seed: Option<&KeyData>) -> Result<()> {
	let firmware = znp.firmware();
	let addr_table = addr_mgr_table(firmware);
	let addr_entries = decode_entries::<AddrMgrEntry>(&znp.nvram().read_table(addr_table).await?)?;

	let index = addr_entries.iter()
		.position(|e| !e.is_empty() && e.ieee == device.ieee)
		.or_else(|| addr_entries.iter().position(|e| e.is_empty()))
		.unwrap_or(addr_entries.len());

	if let NvTable::Blob { id, capacity, .. } = addr_table {
		if addr_entries.is_empty() {
			znp.nvram().create_if_missing(NvRef::Legacy(id), &AddrMgrEntry::EMPTY.to_bytes()?.repeat(capacity)).await?;
		}
	}

	znp.nvram().write_table_entry(addr_table, index, &addr_mgr_entry(device).to_bytes()?).await?;

	if let Some(record) = &device.link_key {
		let key_table = link_key_table(firmware);
		let key_entries = decode_entries::<LinkKeyEntry>(&znp.nvram().read_table(key_table).await?)?;

		let index = key_entries.iter()
			.position(|e| e.ieee == device.ieee)
			.unwrap_or(key_entries.len());

		let entry = link_key_entry(device, record, seed, record.tx_counter);
		znp.nvram().write_table_entry(key_table, index, &entry.to_bytes()?).await?;
	}

	debug!("Stored device {} ({:#06x})", device.ieee, device.nwk);

	Ok(())
}

//replaces all stored devices, advancing every tx counter by counter_increment
pub async fn write_devices<T: Transport>(znp: &mut Znp<T>, devices: &[StoredDevice], seed: Option<&KeyData>, counter_increment: u32) -> Result<()> {
	let firmware = znp.firmware();
	let mut addr_entries = Vec::with_capacity(devices.len());
	let mut key_entries = Vec::new();

	for device in devices {
		addr_entries.push(addr_mgr_entry(device).to_bytes()?);

		if let Some(record) = &device.link_key {
			let tx_counter = record.tx_counter.checked_add(counter_increment)
				.ok_or(Error::CounterOverflow { counter: record.tx_counter, increment: counter_increment })?;

			key_entries.push(link_key_entry(device, record, seed, tx_counter).to_bytes()?);
		}
	}

	znp.nvram().write_table(addr_mgr_table(firmware), &addr_entries, &AddrMgrEntry::EMPTY.to_bytes()?).await?;
	znp.nvram().write_table(link_key_table(firmware), &key_entries, &[]).await?;

	info!("Wrote {} devices, {} with link keys", addr_entries.len(), key_entries.len());

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ config::ZnpConfig, transport::MemoryRadio };

	fn seed() -> KeyData {
		KeyData::from_hex("c04884427c8a1ed7bb8412815ccce7aa").unwrap()
	}

	async fn znp(firmware: FirmwareVersion) -> Znp<MemoryRadio> {
		let config = ZnpConfig { firmware: Some(firmware), ..ZnpConfig::default() };

		Znp::connect(MemoryRadio::new(firmware), config).await.unwrap()
	}

	#[test]
	fn known_derivation_vector() {
		let ieee = Eui64::from_hex("000b57fffe38b212").unwrap();

		assert_eq!(derive_link_key(&seed(), &ieee), KeyData::from_hex("d2fabcbc83dd15d7a9362a7fa39becaa").unwrap());
	}

	#[test]
	fn key_shift_search() {
		let ieee = Eui64::from_hex("aabbccddeeff0011").unwrap();
		let key = derive_link_key_with_shift(&seed(), &ieee, 7);

		assert_ne!(key, derive_link_key(&seed(), &ieee));
		assert_eq!(find_key_shift(&seed(), &ieee, &key), Some(7));
		assert_eq!(find_key_shift(&seed(), &ieee, &KeyData::from_hex("01234567801234567801234567801234").unwrap()), None);
	}

	fn devices() -> Vec<StoredDevice> {
		vec![
			StoredDevice { ieee: Eui64::from_hex("000b57fffe36b9a0").unwrap(), nwk: 0xf319, link_key: None },
			StoredDevice {
				ieee: Eui64::from_hex("000b57fffe38b212").unwrap(),
				nwk: 0x9672,
				link_key: Some(LinkKeyRecord { key: KeyData::from_hex("d2fabcbc83dd15d7a9362a7fa39becaa").unwrap(), rx_counter: 123, tx_counter: 456 })
			},
			StoredDevice {
				ieee: Eui64::from_hex("aabbccddeeff0011").unwrap(),
				nwk: 0xabcd,
				link_key: Some(LinkKeyRecord { key: KeyData::from_hex("01234567801234567801234567801234").unwrap(), rx_counter: 112233, tx_counter: 445566 })
			}
		]
	}

	#[async_std::test]
	async fn derivable_keys_are_stored_compactly() {
		let mut znp = znp(FirmwareVersion::ZStack3x0).await;

		write_devices(&mut znp, &devices(), Some(&seed()), 0).await.unwrap();

		let stored = &znp.transport().extended[&(1, ExNvId::APS_KEY_DATA_TABLE.0, 0)];
		let entry = LinkKeyEntry::try_from(stored.as_slice()).unwrap();

		assert!(entry.is_derived());
		assert_eq!(entry.key, KeyData::default());
		assert_eq!(load_devices(&mut znp, Some(&seed())).await.unwrap(), devices());
	}

	#[async_std::test]
	async fn derived_keys_need_the_seed() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;

		write_devices(&mut znp, &devices(), Some(&seed()), 0).await.unwrap();

		assert!(matches!(load_devices(&mut znp, None).await, Err(Error::SeedRequired(_))));
	}

	#[async_std::test]
	async fn tx_counters_advance() {
		let mut znp = znp(FirmwareVersion::ZStack12).await;

		write_devices(&mut znp, &devices(), None, 2500).await.unwrap();

		let loaded = load_devices(&mut znp, None).await.unwrap();
		assert_eq!(loaded[1].link_key.unwrap().tx_counter, 456 + 2500);
		assert_eq!(loaded[1].link_key.unwrap().rx_counter, 123);
		assert_eq!(loaded[2].link_key.unwrap().tx_counter, 445566 + 2500);
	}

	#[async_std::test]
	async fn tx_counter_overflow_is_an_error() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		let mut devices = devices();
		devices[2].link_key = Some(LinkKeyRecord { key: KeyData::default(), rx_counter: 0, tx_counter: u32::MAX - 1 });

		assert!(matches!(write_devices(&mut znp, &devices, None, 2).await, Err(Error::CounterOverflow { .. })));
		assert!(znp.transport().sent.is_empty());
	}

	#[async_std::test]
	async fn store_device_upserts_by_ieee() {
		for firmware in [FirmwareVersion::ZStack30, FirmwareVersion::ZStack3x0] {
			let mut znp = znp(firmware).await;
			let mut devices = devices();

			for device in &devices {
				store_device(&mut znp, device, None).await.unwrap();
			}

			devices[1].nwk = 0x1111;
			devices[1].link_key = Some(LinkKeyRecord { key: KeyData([0x55; 16]), rx_counter: 1, tx_counter: 2 });
			store_device(&mut znp, &devices[1], None).await.unwrap();

			assert_eq!(load_devices(&mut znp, None).await.unwrap(), devices);
		}
	}

	#[test]
	fn shift_wraps_at_key_length() {
		let ieee = Eui64::from_hex("000b57fffe38b212").unwrap();

		assert_eq!(derive_link_key_with_shift(&seed(), &ieee, 16), derive_link_key(&seed(), &ieee));
		assert_eq!(derive_link_key_with_shift(&seed(), &ieee, 17), derive_link_key_with_shift(&seed(), &ieee, 1));
	}

	#[async_std::test]
	async fn keyless_devices_are_neighbors_only() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;

		write_devices(&mut znp, &devices(), Some(&seed()), 0).await.unwrap();

		let entries = znp.nvram().read_table(addr_mgr_table(FirmwareVersion::ZStack30)).await.unwrap();
		let first = AddrMgrEntry::try_from(entries[0].as_slice()).unwrap();
		let second = AddrMgrEntry::try_from(entries[1].as_slice()).unwrap();

		assert_eq!(first.user, addr_mgr_user::ASSOC);
		assert_eq!(second.user, addr_mgr_user::ASSOC | addr_mgr_user::SECURITY);
	}

	#[async_std::test]
	async fn seed_is_not_stored_on_zstack12() {
		let mut znp = znp(FirmwareVersion::ZStack12).await;

		assert!(!write_seed(&mut znp, &seed()).await.unwrap());
		assert_eq!(read_seed(&mut znp).await.unwrap(), None);
		assert!(znp.transport().sent.is_empty());
	}
}
