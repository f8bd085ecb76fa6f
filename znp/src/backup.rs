//open coordinator backup: assemble from a live radio, replay onto another

use serde::{ Serialize, Deserialize };
use serde_json::{ json, Value };
use log::info;
use crate::{
	api::Znp,
	config::FirmwareVersion,
	devices::{ self, LinkKeyRecord, StoredDevice },
	error::{ Error, Result },
	frame_counter::TcFrameCounter,
	network::{ self, NetworkInfo },
	schema::{ self, BACKUP_FORMAT, BACKUP_VERSION },
	transport::Transport,
	types::{ hex_u16, ChannelMask, Eui64, KeyData }
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
	pub format: String,
	pub version: u64,
	pub source: String,
	pub internal: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZStackSpecific {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tclk_seed: Option<KeyData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSpecific {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub zstack: Option<ZStackSpecific>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkKey {
	pub key: KeyData,
	pub sequence_number: u8,
	pub frame_counter: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupLinkKey {
	pub key: KeyData,
	pub rx_counter: u32,
	pub tx_counter: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDevice {
	pub ieee_address: Eui64,
	#[serde(with = "hex_u16")]
	pub nwk_address: u16,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub link_key: Option<BackupLinkKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
	pub metadata: Metadata,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack_specific: Option<StackSpecific>,
	pub coordinator_ieee: Eui64,
	#[serde(with = "hex_u16")]
	pub pan_id: u16,
	pub extended_pan_id: Eui64,
	pub nwk_update_id: u8,
	pub security_level: u8,
	pub channel: u8,
	pub channel_mask: Vec<u8>,
	pub network_key: NetworkKey,
	pub devices: Vec<BackupDevice>,
}

impl BackupDocument {
	//validated before any value is built
	pub fn from_json(document: &Value) -> Result<Self> {
		schema::validate(document)?;

		Ok(serde_json::from_value(document.clone())?)
	}

	pub fn to_json(&self) -> Result<Value> {
		Ok(serde_json::to_value(self)?)
	}

	pub fn tclk_seed(&self) -> Option<KeyData> {
		self.stack_specific.as_ref()
			.and_then(|s| s.zstack.as_ref())
			.and_then(|z| z.tclk_seed)
	}

	pub fn network_info(&self) -> NetworkInfo {
		NetworkInfo::bare(self.extended_pan_id)
			.with_ieee(self.coordinator_ieee)
			.with_nwk(0x0000)
			.with_pan_id(self.pan_id)
			.with_channel(self.channel)
			.with_channel_mask(ChannelMask::from_channels(&self.channel_mask))
			.with_security_level(self.security_level)
			.with_nwk_update_id(self.nwk_update_id)
			.with_network_key(self.network_key.key, self.network_key.sequence_number)
	}

	//devices without a key of their own use the one derived from the seed
	pub fn stored_devices(&self) -> Vec<StoredDevice> {
		let seed = self.tclk_seed();

		self.devices.iter()
			.map(|d| {
				let link_key = match (&d.link_key, &seed) {
					(Some(k), _) => Some(LinkKeyRecord { key: k.key, rx_counter: k.rx_counter, tx_counter: k.tx_counter }),
					(None, Some(seed)) => Some(LinkKeyRecord { key: devices::derive_link_key(seed, &d.ieee_address), rx_counter: 0, tx_counter: 0 }),
					(None, None) => None
				};

				StoredDevice { ieee: d.ieee_address, nwk: d.nwk_address, link_key }
			})
			.collect()
	}
}

fn source() -> String {
	format!("{}@{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn internal_metadata(firmware: FirmwareVersion) -> Value {
	json!({
		"creation_time": chrono::Utc::now().to_rfc3339(),
		"zstack": {
			"version": firmware.as_number()
		}
	})
}

pub async fn backup_network<T: Transport>(znp: &mut Znp<T>) -> Result<BackupDocument> {
	let firmware = znp.firmware();
	let network_info = network::load_network_info(znp).await?;
	let seed = devices::read_seed(znp).await?;
	let stored = devices::load_devices(znp, seed.as_ref()).await?;
	let frame_counter = TcFrameCounter::for_firmware(firmware).read(znp, network_info.extended_pan_id).await?;

	let key = network_info.key_desc()?;
	let missing = Error::IncompleteNetworkInfo;

	info!("Backing up network {} with {} devices", network_info.extended_pan_id, stored.len());

	Ok(BackupDocument {
		metadata: Metadata {
			format: BACKUP_FORMAT.to_string(),
			version: BACKUP_VERSION,
			source: source(),
			internal: internal_metadata(firmware)
		},
		stack_specific: Some(StackSpecific { zstack: Some(ZStackSpecific { tclk_seed: seed }) }),
		coordinator_ieee: network_info.ieee.ok_or(missing("coordinator ieee"))?,
		pan_id: network_info.pan_id.ok_or(missing("pan id"))?,
		extended_pan_id: network_info.extended_pan_id,
		nwk_update_id: network_info.nwk_update_id.unwrap_or(0),
		security_level: network_info.security_level.unwrap_or(5),
		channel: network_info.channel.ok_or(missing("channel"))?,
		channel_mask: network_info.channel_mask.map(|m| m.channels()).unwrap_or_default(),
		network_key: NetworkKey { key: key.key, sequence_number: key.key_seq_num, frame_counter },
		devices: stored.into_iter()
			.map(|d| BackupDevice {
				ieee_address: d.ieee,
				nwk_address: d.nwk,
				link_key: d.link_key.map(|k| BackupLinkKey { key: k.key, rx_counter: k.rx_counter, tx_counter: k.tx_counter })
			})
			.collect()
	})
}

//counter_increment is added to the network and every link key tx frame counter
pub async fn restore_network<T: Transport>(znp: &mut Znp<T>, document: &Value, counter_increment: u32) -> Result<()> {
	let backup = BackupDocument::from_json(document)?;
	let stored = backup.stored_devices();

	let frame_counter = backup.network_key.frame_counter;
	let frame_counter = frame_counter.checked_add(counter_increment)
		.ok_or(Error::CounterOverflow { counter: frame_counter, increment: counter_increment })?;

	for record in stored.iter().filter_map(|d| d.link_key.as_ref()) {
		if record.tx_counter.checked_add(counter_increment).is_none() {
			return Err(Error::CounterOverflow { counter: record.tx_counter, increment: counter_increment });
		}
	}

	let firmware = znp.firmware();
	let network_info = backup.network_info();

	info!("Restoring network {} with {} devices onto {:?}", network_info.extended_pan_id, stored.len(), firmware);

	network::write_network(znp, &network_info).await?;

	let seed = match backup.tclk_seed() {
		Some(seed) if devices::write_seed(znp, &seed).await? => Some(seed),
		_ => None
	};

	TcFrameCounter::for_firmware(firmware).write(znp, network_info.extended_pan_id, frame_counter).await?;
	devices::write_devices(znp, &stored, seed.as_ref(), counter_increment).await?;

	znp.reset().await
}
