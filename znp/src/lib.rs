pub mod types;
pub mod commands;
pub mod sys;
pub mod frame;
pub mod transport;
pub mod config;
pub mod error;
pub mod api;
pub mod nvids;
pub mod nvram;
pub mod records;
pub mod network;
pub mod frame_counter;
pub mod devices;
pub mod schema;
pub mod backup;

pub use api::Znp;
pub use config::{ FirmwareVersion, ZnpConfig, DEFAULT_COUNTER_INCREMENT };
pub use error::{ Error, Result };
pub use backup::{ BackupDocument, backup_network, restore_network };
pub use network::{ NetworkInfo, form_network, load_network_info };
pub use devices::{ StoredDevice, LinkKeyRecord, derive_link_key, find_key_shift };
pub use frame_counter::TcFrameCounter;
