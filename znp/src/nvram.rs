//NVRAM access over the legacy (OSAL id) and extended (sys id, item id, sub id) schemes

use core::fmt;
use log::{ debug, trace };
use crate::{
	api::Znp,
	error::{ Error, Result },
	nvids::{ ExNvId, OsalNvId, ZSTACK_SYS_ID },
	sys::{ Request, Response, Status },
	transport::Transport
};

//largest value moved by one read / write request
pub const CHUNK_SIZE: usize = 240;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum NvRef {
	Legacy(OsalNvId),
	Extended { sys_id: u8, item_id: ExNvId, sub_id: u16 },
}

impl NvRef {
	pub fn extended(item_id: ExNvId, sub_id: u16) -> Self {
		Self::Extended { sys_id: ZSTACK_SYS_ID, item_id, sub_id }
	}
}

impl From<OsalNvId> for NvRef {
	fn from(id: OsalNvId) -> Self {
		Self::Legacy(id)
	}
}

impl fmt::Display for NvRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Legacy(id) => write!(f, "{:#06x}", id.0),
			Self::Extended { sys_id, item_id, sub_id } => write!(f, "{:#04x}:{:#06x}:{:#06x}", sys_id, item_id.0, sub_id)
		}
	}
}

impl fmt::Debug for NvRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "NvRef({})", self)
	}
}

pub struct Nvram<'a, T: Transport> {
	znp: &'a mut Znp<T>
}

impl<T: Transport> Znp<T> {
	pub fn nvram(&mut self) -> Nvram<'_, T> {
		Nvram { znp: self }
	}
}

impl<'a, T: Transport> Nvram<'a, T> {
	//0 when the item does not exist
	pub async fn length(&mut self, item: NvRef) -> Result<usize> {
		let request = match item {
			NvRef::Legacy(id) => Request::OsalNvLength { id: id.0 },
			NvRef::Extended { sys_id, item_id, sub_id } => Request::NvLength { sys_id, item_id: item_id.0, sub_id }
		};
		let header = request.header();

		match self.znp.request(request).await? {
			Response::OsalNvLength { item_len } => Ok(item_len as usize),
			Response::NvLength { length } => Ok(length as usize),
			_ => Err(Error::UnexpectedResponse(header))
		}
	}

	pub async fn read(&mut self, item: NvRef) -> Result<Option<Vec<u8>>> {
		let length = self.length(item).await?;

		if length == 0 {
			trace!("NVRAM {} absent", item);
			return Ok(None);
		}

		let mut value = Vec::with_capacity(length);

		while value.len() < length {
			let offset = value.len();

			let request = match item {
				NvRef::Legacy(id) if offset <= u8::MAX as usize => Request::OsalNvRead { id: id.0, offset: offset as u8 },
				NvRef::Legacy(id) => Request::OsalNvReadExt { id: id.0, offset: offset as u16 },
				NvRef::Extended { sys_id, item_id, sub_id } => Request::NvRead {
					sys_id,
					item_id: item_id.0,
					sub_id,
					offset: offset as u16,
					length: (length - offset).min(CHUNK_SIZE) as u8
				}
			};
			let header = request.header();

			let chunk = match self.znp.request_status(request, &[Status::Success]).await? {
				Response::OsalNvRead { value, .. } |
				Response::OsalNvReadExt { value, .. } |
				Response::NvRead { value, .. } => value,
				_ => return Err(Error::UnexpectedResponse(header))
			};

			if chunk.is_empty() {
				return Err(Error::UnexpectedResponse(header));
			}

			value.extend_from_slice(&chunk);
		}

		value.truncate(length);
		debug!("NVRAM {} read {} bytes", item, length);

		Ok(Some(value))
	}

	async fn write_chunks(&mut self, item: NvRef, value: &[u8]) -> Result<()> {
		for (i, chunk) in value.chunks(CHUNK_SIZE).enumerate() {
			let offset = i * CHUNK_SIZE;

			let request = match item {
				NvRef::Legacy(id) if offset <= u8::MAX as usize => Request::osal_nv_write(id.0, offset as u8, chunk.to_vec()),
				NvRef::Legacy(id) => Request::osal_nv_write_ext(id.0, offset as u16, chunk.to_vec()),
				NvRef::Extended { sys_id, item_id, sub_id } => Request::nv_write(sys_id, item_id.0, sub_id, offset as u16, chunk.to_vec())
			};

			self.znp.request_status(request, &[Status::Success]).await?;
		}

		Ok(())
	}

	async fn create(&mut self, item: NvRef, value: &[u8]) -> Result<()> {
		match item {
			NvRef::Legacy(id) => {
				let init = value[..value.len().min(CHUNK_SIZE)].to_vec();
				let partial = init.len() < value.len();

				//SUCCESS: already existed, NV_ITEM_UNINIT: created
				self.znp.request_status(Request::osal_nv_item_init(id.0, value.len() as u16, init), &[Status::Success, Status::NvItemUninit]).await?;

				if partial {
					self.write_chunks(item, value).await?;
				}
			},
			NvRef::Extended { sys_id, item_id, sub_id } => {
				self.znp.request_status(Request::NvCreate { sys_id, item_id: item_id.0, sub_id, length: value.len() as u32 }, &[Status::Success, Status::NvItemUninit]).await?;
				self.write_chunks(item, value).await?;
			}
		}

		debug!("NVRAM {} created with {} bytes", item, value.len());

		Ok(())
	}

	//overwrite an existing item of the same length
	pub async fn write(&mut self, item: NvRef, value: &[u8]) -> Result<()> {
		match self.length(item).await? {
			0 => Err(Error::ItemAbsent(item)),
			stored if stored != value.len() => Err(Error::LengthMismatch { item, stored, written: value.len() }),
			_ => {
				self.write_chunks(item, value).await?;
				debug!("NVRAM {} written", item);
				Ok(())
			}
		}
	}

	pub async fn write_or_create(&mut self, item: NvRef, value: &[u8]) -> Result<()> {
		let stored = self.length(item).await?;

		if stored == value.len() {
			return self.write_chunks(item, value).await;
		}

		if stored != 0 {
			debug!("NVRAM {} resized from {} to {} bytes", item, stored, value.len());
			self.delete_sized(item, stored).await?;
		}

		self.create(item, value).await
	}

	//true when the item was created
	pub async fn create_if_missing(&mut self, item: NvRef, value: &[u8]) -> Result<bool> {
		if self.length(item).await? != 0 {
			return Ok(false);
		}

		self.create(item, value).await?;

		Ok(true)
	}

	//true when an item was deleted
	pub async fn delete(&mut self, item: NvRef) -> Result<bool> {
		match self.length(item).await? {
			0 => Ok(false),
			stored => {
				self.delete_sized(item, stored).await?;
				Ok(true)
			}
		}
	}

	async fn delete_sized(&mut self, item: NvRef, stored: usize) -> Result<()> {
		let request = match item {
			NvRef::Legacy(id) => Request::OsalNvDelete { id: id.0, item_len: stored as u16 },
			NvRef::Extended { sys_id, item_id, sub_id } => Request::NvDelete { sys_id, item_id: item_id.0, sub_id }
		};

		self.znp.request_status(request, &[Status::Success]).await?;
		debug!("NVRAM {} deleted", item);

		Ok(())
	}
}

//a list of fixed size entries stored in nvram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvTable {
	//one entry per legacy id, start..=end
	Range { start: OsalNvId, end: OsalNvId },
	//one legacy item holding capacity entries of entry_len bytes
	Blob { id: OsalNvId, entry_len: usize, capacity: usize },
	//sub entries 0..capacity of one extended item
	Extended { item_id: ExNvId, capacity: usize },
}

impl NvTable {
	pub fn capacity(&self) -> usize {
		match self {
			Self::Range { start, end } => (end.0 as usize + 1).saturating_sub(start.0 as usize),
			Self::Blob { capacity, .. } | Self::Extended { capacity, .. } => *capacity
		}
	}

	pub fn entry_ref(&self, index: usize) -> Option<NvRef> {
		if index >= self.capacity() {
			return None;
		}

		match self {
			Self::Range { start, .. } => Some(NvRef::Legacy(start.offset(index as u16))),
			Self::Blob { id, .. } => Some(NvRef::Legacy(*id)),
			Self::Extended { item_id, .. } => Some(NvRef::extended(*item_id, index as u16))
		}
	}
}

impl<'a, T: Transport> Nvram<'a, T> {
	//entries in index order, up to the first absent one
	pub async fn read_table(&mut self, table: NvTable) -> Result<Vec<Vec<u8>>> {
		if let NvTable::Blob { id, entry_len, .. } = table {
			return Ok(match self.read(NvRef::Legacy(id)).await? {
				Some(blob) => blob.chunks_exact(entry_len).map(|c| c.to_vec()).collect(),
				None => Vec::new()
			});
		}

		let mut entries = Vec::new();

		while let Some(item) = table.entry_ref(entries.len()) {
			match self.read(item).await? {
				Some(entry) => entries.push(entry),
				None => break
			}
		}

		Ok(entries)
	}

	pub async fn write_table_entry(&mut self, table: NvTable, index: usize, entry: &[u8]) -> Result<()> {
		let Some(item) = table.entry_ref(index) else {
			return Err(Error::TableFull(format!("{:?}", table)));
		};

		if let NvTable::Blob { id, entry_len, capacity } = table {
			if entry.len() != entry_len {
				return Err(Error::LengthMismatch { item, stored: entry_len, written: entry.len() });
			}

			//blob must exist, it is created with its empty entries by whoever owns the table
			let mut blob = self.read(item).await?.ok_or(Error::ItemAbsent(item))?;

			if blob.len() != entry_len * capacity {
				return Err(Error::LengthMismatch { item, stored: blob.len(), written: entry_len * capacity });
			}

			blob[index * entry_len..(index + 1) * entry_len].copy_from_slice(entry);
			trace!("NVRAM table {} entry {} updated", id.0, index);

			return self.write(item, &blob).await;
		}

		self.write_or_create(item, entry).await
	}

	//blobs are filled with empty entries, other tables lose every entry up to their capacity
	pub async fn clear_table(&mut self, table: NvTable, empty: &[u8]) -> Result<()> {
		if let NvTable::Blob { id, entry_len, capacity } = table {
			if empty.len() != entry_len {
				return Err(Error::LengthMismatch { item: NvRef::Legacy(id), stored: entry_len, written: empty.len() });
			}

			return self.write_or_create(NvRef::Legacy(id), &empty.repeat(capacity)).await;
		}

		//entries past a gap are invisible to read_table but must go too
		let mut deleted = 0;

		for index in 0..table.capacity() {
			if let Some(item) = table.entry_ref(index) {
				if self.delete(item).await? {
					deleted += 1;
				}
			}
		}

		trace!("NVRAM table {:?} cleared, {} entries deleted", table, deleted);

		Ok(())
	}
}

impl<'a, T: Transport> Nvram<'a, T> {
	//replaces the whole table with entries
	pub async fn write_table(&mut self, table: NvTable, entries: &[Vec<u8>], empty: &[u8]) -> Result<()> {
		if entries.len() > table.capacity() {
			return Err(Error::TableFull(format!("{:?}", table)));
		}

		if let NvTable::Blob { id, capacity, .. } = table {
			let mut blob = Vec::with_capacity(capacity * empty.len());

			for entry in entries {
				if entry.len() != empty.len() {
					return Err(Error::LengthMismatch { item: NvRef::Legacy(id), stored: empty.len(), written: entry.len() });
				}

				blob.extend_from_slice(entry);
			}

			for _ in entries.len()..capacity {
				blob.extend_from_slice(empty);
			}

			return self.write_or_create(NvRef::Legacy(id), &blob).await;
		}

		self.clear_table(table, empty).await?;

		for (index, entry) in entries.iter().enumerate() {
			self.write_table_entry(table, index, entry).await?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ config::{ FirmwareVersion, ZnpConfig }, transport::MemoryRadio };

	async fn znp(firmware: FirmwareVersion) -> Znp<MemoryRadio> {
		let config = ZnpConfig { firmware: Some(firmware), ..ZnpConfig::default() };

		Znp::connect(MemoryRadio::new(firmware), config).await.unwrap()
	}

	#[async_std::test]
	async fn absent_is_not_empty() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		znp.transport_mut().legacy.insert(0x0062, vec![0x00; 16]);

		assert_eq!(znp.nvram().read(OsalNvId::NWKKEY.into()).await.unwrap(), None);
		assert_eq!(znp.nvram().read(OsalNvId::PRECFGKEY.into()).await.unwrap(), Some(vec![0x00; 16]));
	}

	#[async_std::test]
	async fn write_requires_existing_item_of_same_length() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		let item = NvRef::Legacy(OsalNvId::PANID);

		assert!(matches!(znp.nvram().write(item, &[0xed, 0xfe]).await, Err(Error::ItemAbsent(i)) if i == item));

		znp.transport_mut().legacy.insert(OsalNvId::PANID.0, vec![0xff, 0xff]);
		assert!(matches!(znp.nvram().write(item, &[0xed, 0xfe, 0x00]).await, Err(Error::LengthMismatch { stored: 2, written: 3, .. })));

		znp.nvram().write(item, &[0xed, 0xfe]).await.unwrap();
		assert_eq!(znp.transport().legacy[&OsalNvId::PANID.0], vec![0xed, 0xfe]);
	}

	#[async_std::test]
	async fn long_legacy_items_use_ext_commands() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		let value: Vec<u8> = (0..700).map(|i| (i % 251) as u8).collect();
		let item = NvRef::Legacy(OsalNvId::ADDRMGR);

		assert!(znp.nvram().create_if_missing(item, &value).await.unwrap());
		assert!(!znp.nvram().create_if_missing(item, &[0; 700]).await.unwrap());
		assert_eq!(znp.transport().legacy[&OsalNvId::ADDRMGR.0], value);
		assert_eq!(znp.nvram().read(item).await.unwrap(), Some(value));

		assert!(znp.transport().sent.iter().any(|f| f.header == Request::OsalNvReadExt { id: 0, offset: 0 }.header()));
		assert!(znp.transport().sent.iter().any(|f| f.header == Request::osal_nv_write_ext(0, 0, Vec::new()).header()));
	}

	#[async_std::test]
	async fn write_or_create_resizes() {
		let mut znp = znp(FirmwareVersion::ZStack3x0).await;
		let item = NvRef::extended(ExNvId::ADDRMGR, 3);

		znp.nvram().write_or_create(item, &[1, 2, 3]).await.unwrap();
		znp.nvram().write_or_create(item, &[4, 5]).await.unwrap();

		assert_eq!(znp.nvram().read(item).await.unwrap(), Some(vec![4, 5]));
		assert!(znp.nvram().delete(item).await.unwrap());
		assert!(!znp.nvram().delete(item).await.unwrap());
	}

	#[async_std::test]
	async fn range_table_stops_at_first_gap() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		let table = NvTable::Range { start: OsalNvId(0x0075), end: OsalNvId(0x0077) };

		znp.transport_mut().legacy.insert(0x0075, vec![1]);
		znp.transport_mut().legacy.insert(0x0077, vec![3]);

		assert_eq!(znp.nvram().read_table(table).await.unwrap(), vec![vec![1]]);

		znp.nvram().write_table_entry(table, 1, &[2]).await.unwrap();
		assert_eq!(znp.nvram().read_table(table).await.unwrap(), vec![vec![1], vec![2], vec![3]]);
		assert!(matches!(znp.nvram().write_table_entry(table, 3, &[4]).await, Err(Error::TableFull(_))));

		znp.nvram().clear_table(table, &[]).await.unwrap();
		assert!(znp.transport().legacy.is_empty());
	}

	#[async_std::test]
	async fn blob_table_entries() {
		let mut znp = znp(FirmwareVersion::ZStack12).await;
		let table = NvTable::Blob { id: OsalNvId::ADDRMGR, entry_len: 2, capacity: 3 };

		assert!(matches!(znp.nvram().write_table_entry(table, 0, &[1, 1]).await, Err(Error::ItemAbsent(_))));

		znp.nvram().clear_table(table, &[0xff, 0xff]).await.unwrap();
		znp.nvram().write_table_entry(table, 1, &[1, 1]).await.unwrap();

		assert_eq!(znp.nvram().read_table(table).await.unwrap(), vec![vec![0xff, 0xff], vec![1, 1], vec![0xff, 0xff]]);
		assert!(matches!(znp.nvram().write_table_entry(table, 3, &[1, 1]).await, Err(Error::TableFull(_))));

		znp.nvram().write_table(table, &[vec![2, 2]], &[0xff, 0xff]).await.unwrap();
		assert_eq!(znp.transport().legacy[&OsalNvId::ADDRMGR.0], vec![2, 2, 0xff, 0xff, 0xff, 0xff]);
	}

	#[async_std::test]
	async fn extended_table_rewrite() {
		let mut znp = znp(FirmwareVersion::ZStack3x0).await;
		let table = NvTable::Extended { item_id: ExNvId::APS_KEY_DATA_TABLE, capacity: 8 };

		znp.nvram().write_table(table, &[vec![1], vec![2], vec![3]], &[]).await.unwrap();
		znp.nvram().write_table(table, &[vec![4]], &[]).await.unwrap();

		assert_eq!(znp.nvram().read_table(table).await.unwrap(), vec![vec![4]]);
		assert_eq!(znp.transport().extended.len(), 1);
		assert!(matches!(znp.nvram().write_table_entry(table, 8, &[5]).await, Err(Error::TableFull(_))));
	}

	#[async_std::test]
	async fn extended_clear_removes_entries_past_a_gap() {
		let mut znp = znp(FirmwareVersion::ZStack3x0).await;
		let table = NvTable::Extended { item_id: ExNvId::APS_KEY_DATA_TABLE, capacity: 8 };
		let item_id = ExNvId::APS_KEY_DATA_TABLE.0;

		znp.transport_mut().extended.insert((ZSTACK_SYS_ID, item_id, 0), vec![1]);
		znp.transport_mut().extended.insert((ZSTACK_SYS_ID, item_id, 3), vec![3]);
		znp.transport_mut().extended.insert((ZSTACK_SYS_ID, item_id, 7), vec![7]);

		znp.nvram().write_table(table, &[vec![4], vec![5], vec![6], vec![8]], &[]).await.unwrap();

		assert_eq!(znp.nvram().read_table(table).await.unwrap(), vec![vec![4], vec![5], vec![6], vec![8]]);
		assert!(!znp.transport().extended.contains_key(&(ZSTACK_SYS_ID, item_id, 7)));
		assert_eq!(znp.transport().extended.len(), 4);
	}
}
