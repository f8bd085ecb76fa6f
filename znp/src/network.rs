//live network parameters and nvram based network formation

use deku::{ self, prelude::* };
use log::{ info, warn };
use crate::{
	api::Znp,
	config::FirmwareVersion,
	devices,
	error::{ Error, Result },
	frame_counter::TcFrameCounter,
	nvids::OsalNvId,
	nvram::NvTable,
	records::{ AddrMgrEntry, Nib, NibLayout, NwkKeyDesc, NWK_STATE_ROUTER },
	transport::Transport,
	types::{ ChannelMask, Eui64, KeyData }
};

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkInfo {
	pub extended_pan_id: Eui64,
	pub ieee: Option<Eui64>,
	pub nwk: Option<u16>,
	pub pan_id: Option<u16>,
	pub channel: Option<u8>,
	pub channel_mask: Option<ChannelMask>,
	pub security_level: Option<u8>,
	pub nwk_update_id: Option<u8>,
	pub network_key: Option<KeyData>,
	pub network_key_seq: Option<u8>,
}

impl NetworkInfo {
	pub fn bare(extended_pan_id: Eui64) -> Self {
		Self {
			extended_pan_id,
			ieee: None,
			nwk: None,
			pan_id: None,
			channel: None,
			channel_mask: None,
			security_level: None,
			nwk_update_id: None,
			network_key: None,
			network_key_seq: None,
		}
	}

	pub fn with_ieee(self, ieee: Eui64) -> Self {
		Self { ieee: Some(ieee), ..self }
	}

	pub fn with_nwk(self, nwk: u16) -> Self {
		Self { nwk: Some(nwk), ..self }
	}

	pub fn with_pan_id(self, pan_id: u16) -> Self {
		Self { pan_id: Some(pan_id), ..self }
	}

	pub fn with_channel(self, channel: u8) -> Self {
		Self { channel: Some(channel), ..self }
	}

	pub fn with_channel_mask(self, channel_mask: ChannelMask) -> Self {
		Self { channel_mask: Some(channel_mask), ..self }
	}

	pub fn with_security_level(self, security_level: u8) -> Self {
		Self { security_level: Some(security_level), ..self }
	}

	pub fn with_nwk_update_id(self, nwk_update_id: u8) -> Self {
		Self { nwk_update_id: Some(nwk_update_id), ..self }
	}

	pub fn with_network_key(self, key: KeyData, seq: u8) -> Self {
		Self { network_key: Some(key), network_key_seq: Some(seq), ..self }
	}

	pub fn key_desc(&self) -> Result<NwkKeyDesc> {
		Ok(NwkKeyDesc {
			key_seq_num: self.network_key_seq.unwrap_or(0),
			key: self.network_key.ok_or(Error::IncompleteNetworkInfo("network key"))?
		})
	}
}

fn default_nib_layout(firmware: FirmwareVersion) -> NibLayout {
	match firmware {
		FirmwareVersion::ZStack3x0 => NibLayout::Aligned,
		_ => NibLayout::Packed
	}
}

async fn read_nib<T: Transport>(znp: &mut Znp<T>) -> Result<Option<(Nib, NibLayout)>> {
	match znp.nvram().read(OsalNvId::NIB.into()).await? {
		Some(buf) => Ok(Some(Nib::decode(&buf)?)),
		None => Ok(None)
	}
}

pub async fn load_network_info<T: Transport>(znp: &mut Znp<T>) -> Result<NetworkInfo> {
	let Some((nib, _)) = read_nib(znp).await? else {
		return Err(Error::NetworkUnformed);
	};

	let Some(key_info) = znp.nvram().read(OsalNvId::NWK_ACTIVE_KEY_INFO.into()).await? else {
		return Err(Error::NetworkUnformed);
	};

	if !nib.is_formed() {
		return Err(Error::NetworkUnformed);
	}

	let key = NwkKeyDesc::try_from(key_info.as_slice())?;

	let ieee = match znp.nvram().read(OsalNvId::EXTADDR.into()).await? {
		Some(buf) => Some(Eui64::try_from(buf.as_slice())?),
		None => {
			warn!("Coordinator IEEE address is not stored");
			None
		}
	};

	let mut network_info = NetworkInfo::bare(nib.extended_pan_id)
		.with_nwk(nib.nwk_dev_address)
		.with_pan_id(nib.nwk_pan_id)
		.with_channel(nib.nwk_logical_channel)
		.with_channel_mask(nib.channel_list)
		.with_security_level(nib.security_level)
		.with_nwk_update_id(nib.nwk_update_id)
		.with_network_key(key.key, key.key_seq_num);

	if let Some(ieee) = ieee {
		network_info = network_info.with_ieee(ieee);
	}

	Ok(network_info)
}

//writes the network parameters the stack would have written when forming, then resets
pub async fn form_network<T: Transport>(znp: &mut Znp<T>, network_info: &NetworkInfo) -> Result<()> {
	write_network(znp, network_info).await?;

	znp.reset().await
}

//form_network without the reset, for callers with more to write first
pub async fn write_network<T: Transport>(znp: &mut Znp<T>, network_info: &NetworkInfo) -> Result<()> {
	let channel = network_info.channel.ok_or(Error::IncompleteNetworkInfo("channel"))?;
	let pan_id = network_info.pan_id.ok_or(Error::IncompleteNetworkInfo("pan id"))?;
	let key = network_info.key_desc()?;
	let channel_mask = network_info.channel_mask.unwrap_or(ChannelMask::from_channels(&[channel]));
	let firmware = znp.firmware();

	info!("Forming network {} on channel {} (pan id {:#06x})", network_info.extended_pan_id, channel, pan_id);

	let (nib, layout) = read_nib(znp).await?.unwrap_or_else(|| (Nib::default(), default_nib_layout(firmware)));

	let nib = Nib {
		nwk_state: NWK_STATE_ROUTER,
		nwk_dev_address: network_info.nwk.unwrap_or(0x0000),
		nwk_logical_channel: channel,
		nwk_coord_address: 0x0000,
		nwk_coord_ext_address: Eui64::ZERO,
		nwk_pan_id: pan_id,
		channel_list: channel_mask,
		security_level: network_info.security_level.unwrap_or(5),
		extended_pan_id: network_info.extended_pan_id,
		nwk_key_loaded: 1,
		nwk_update_id: network_info.nwk_update_id.unwrap_or(0),
		nwk_manager_addr: 0x0000,
		..nib
	};

	let key_bytes = key.to_bytes()?;
	let mut nvram = znp.nvram();

	if let Some(ieee) = network_info.ieee {
		nvram.write_or_create(OsalNvId::EXTADDR.into(), &ieee.0).await?;
	}

	nvram.write_or_create(OsalNvId::NIB.into(), &nib.encode(layout)?).await?;
	nvram.write_or_create(OsalNvId::NWK_ACTIVE_KEY_INFO.into(), &key_bytes).await?;
	nvram.write_or_create(OsalNvId::NWK_ALTERN_KEY_INFO.into(), &key_bytes).await?;

	nvram.write_or_create(OsalNvId::PANID.into(), &pan_id.to_le_bytes()).await?;
	nvram.write_or_create(OsalNvId::EXTENDED_PAN_ID.into(), &network_info.extended_pan_id.0).await?;
	nvram.write_or_create(OsalNvId::CHANLIST.into(), &channel_mask.0.to_le_bytes()).await?;
	nvram.write_or_create(OsalNvId::PRECFGKEY.into(), &key.key.0).await?;
	nvram.write_or_create(OsalNvId::PRECFGKEYS_ENABLE.into(), &[0x01]).await?;

	if let NvTable::Blob { id, capacity, .. } = devices::addr_mgr_table(firmware) {
		let empty = AddrMgrEntry::EMPTY.to_bytes()?.repeat(capacity);

		if nvram.create_if_missing(id.into(), &empty).await? {
			info!("Created empty address manager table");
		}
	}

	TcFrameCounter::for_firmware(firmware).prepare(znp, network_info.extended_pan_id, &key).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ config::ZnpConfig, transport::MemoryRadio };

	fn network() -> NetworkInfo {
		NetworkInfo::bare(Eui64::from_hex("abdefabcdefabcde").unwrap())
			.with_ieee(Eui64::from_hex("0123456780123456").unwrap())
			.with_nwk(0x0000)
			.with_pan_id(0xFEED)
			.with_channel(25)
			.with_channel_mask(ChannelMask::from_channels(&[15, 20, 25]))
			.with_security_level(5)
			.with_nwk_update_id(2)
			.with_network_key(KeyData::from_hex("37668fd64e35e03342e5ef9f35ccf4ab").unwrap(), 1)
	}

	async fn znp(firmware: FirmwareVersion) -> Znp<MemoryRadio> {
		let config = ZnpConfig { firmware: Some(firmware), ..ZnpConfig::default() };

		Znp::connect(MemoryRadio::new(firmware), config).await.unwrap()
	}

	#[test]
	fn builders_leave_the_original_untouched() {
		let bare = NetworkInfo::bare(Eui64::BROADCAST);
		let with_channel = bare.clone().with_channel(11);

		assert_eq!(bare.channel, None);
		assert_eq!(with_channel.channel, Some(11));
		assert_eq!(with_channel.extended_pan_id, Eui64::BROADCAST);
	}

	#[async_std::test]
	async fn empty_radio_is_unformed() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;

		assert!(matches!(load_network_info(&mut znp).await, Err(Error::NetworkUnformed)));
	}

	#[async_std::test]
	async fn formed_network_reads_back() {
		for firmware in [FirmwareVersion::ZStack12, FirmwareVersion::ZStack30, FirmwareVersion::ZStack3x0] {
			let mut znp = znp(firmware).await;

			form_network(&mut znp, &network()).await.unwrap();

			assert_eq!(load_network_info(&mut znp).await.unwrap(), network());
			assert_eq!(znp.transport().resets, 1);
		}
	}

	#[async_std::test]
	async fn existing_nib_layout_is_kept() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		znp.transport_mut().legacy.insert(OsalNvId::NIB.0, Nib::default().encode(NibLayout::Aligned).unwrap());

		form_network(&mut znp, &network()).await.unwrap();

		assert_eq!(znp.transport().legacy[&OsalNvId::NIB.0].len(), NibLayout::ALIGNED_LEN);
	}

	#[async_std::test]
	async fn unloaded_key_is_unformed() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		form_network(&mut znp, &network()).await.unwrap();

		let (mut nib, layout) = read_nib(&mut znp).await.unwrap().unwrap();
		nib.nwk_key_loaded = 0;
		znp.transport_mut().legacy.insert(OsalNvId::NIB.0, nib.encode(layout).unwrap());

		assert!(matches!(load_network_info(&mut znp).await, Err(Error::NetworkUnformed)));
	}

	#[async_std::test]
	async fn formation_needs_a_key() {
		let mut znp = znp(FirmwareVersion::ZStack30).await;
		let info = NetworkInfo::bare(Eui64::BROADCAST).with_channel(11).with_pan_id(0x1234);

		assert!(matches!(form_network(&mut znp, &info).await, Err(Error::IncompleteNetworkInfo("network key"))));
		assert!(znp.transport().sent.is_empty());
	}
}
