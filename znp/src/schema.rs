//structural validation of open coordinator backup documents

use serde_json::{ Map, Value };
use thiserror::Error;

pub const BACKUP_FORMAT: &str = "zigpy/open-coordinator-backup";
pub const BACKUP_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {constraint}")]
pub struct SchemaViolation {
	pub path: String,
	pub constraint: String,
}

type Checked<T> = Result<T, SchemaViolation>;

fn violation<T>(path: &str, constraint: impl Into<String>) -> Checked<T> {
	Err(SchemaViolation { path: path.to_string(), constraint: constraint.into() })
}

fn join(path: &str, name: &str) -> String {
	if path.is_empty() {
		name.to_string()
	}
	else {
		format!("{}.{}", path, name)
	}
}

fn object<'a>(value: &'a Value, path: &str) -> Checked<&'a Map<String, Value>> {
	match value.as_object() {
		Some(map) => Ok(map),
		None => violation(path, "must be an object")
	}
}

fn array<'a>(value: &'a Value, path: &str) -> Checked<&'a Vec<Value>> {
	match value.as_array() {
		Some(items) => Ok(items),
		None => violation(path, "must be an array")
	}
}

fn required<'a>(map: &'a Map<String, Value>, path: &str, name: &str) -> Checked<(&'a Value, String)> {
	let path = join(path, name);

	match map.get(name) {
		Some(value) => Ok((value, path)),
		None => violation(&path, "is required")
	}
}

fn integer(value: &Value, path: &str, min: u64, max: u64) -> Checked<u64> {
	match value.as_u64() {
		Some(v) if (min..=max).contains(&v) => Ok(v),
		_ => violation(path, format!("must be an integer in {}..={}", min, max))
	}
}

fn hex_string(value: &Value, path: &str, digits: usize) -> Checked<()> {
	match value.as_str() {
		Some(s) if s.len() == digits && s.chars().all(|c| c.is_ascii_hexdigit()) => Ok(()),
		_ => violation(path, format!("must be a string of {} hex digits", digits))
	}
}

fn field_integer(map: &Map<String, Value>, path: &str, name: &str, min: u64, max: u64) -> Checked<u64> {
	let (value, path) = required(map, path, name)?;
	integer(value, &path, min, max)
}

fn field_hex(map: &Map<String, Value>, path: &str, name: &str, digits: usize) -> Checked<()> {
	let (value, path) = required(map, path, name)?;
	hex_string(value, &path, digits)
}

fn metadata(value: &Value, path: &str) -> Checked<()> {
	let map = object(value, path)?;

	let (format, format_path) = required(map, path, "format")?;
	if format.as_str() != Some(BACKUP_FORMAT) {
		return violation(&format_path, format!("must be \"{}\"", BACKUP_FORMAT));
	}

	field_integer(map, path, "version", BACKUP_VERSION, BACKUP_VERSION)?;

	let (source, source_path) = required(map, path, "source")?;
	if !source.is_string() {
		return violation(&source_path, "must be a string");
	}

	let (internal, internal_path) = required(map, path, "internal")?;
	object(internal, &internal_path)?;

	Ok(())
}

fn stack_specific(value: &Value, path: &str) -> Checked<()> {
	let map = object(value, path)?;

	if let Some(zstack) = map.get("zstack") {
		let path = join(path, "zstack");
		let zstack = object(zstack, &path)?;

		if let Some(seed) = zstack.get("tclk_seed") {
			hex_string(seed, &join(&path, "tclk_seed"), 32)?;
		}
	}

	Ok(())
}

fn network_key(value: &Value, path: &str) -> Checked<()> {
	let map = object(value, path)?;

	field_hex(map, path, "key", 32)?;
	field_integer(map, path, "sequence_number", 0, u8::MAX as u64)?;
	field_integer(map, path, "frame_counter", 0, u32::MAX as u64)?;

	Ok(())
}

fn device(value: &Value, path: &str) -> Checked<()> {
	let map = object(value, path)?;

	field_hex(map, path, "ieee_address", 16)?;
	field_hex(map, path, "nwk_address", 4)?;

	if let Some(link_key) = map.get("link_key") {
		let path = join(path, "link_key");
		let link_key = object(link_key, &path)?;

		field_hex(link_key, &path, "key", 32)?;
		field_integer(link_key, &path, "rx_counter", 0, u32::MAX as u64)?;
		field_integer(link_key, &path, "tx_counter", 0, u32::MAX as u64)?;
	}

	Ok(())
}

//first violation found, in document order
pub fn validate(document: &Value) -> Checked<()> {
	let root = object(document, "$")?;

	let (value, path) = required(root, "", "metadata")?;
	metadata(value, &path)?;

	if let Some(value) = root.get("stack_specific") {
		stack_specific(value, "stack_specific")?;
	}

	field_hex(root, "", "coordinator_ieee", 16)?;
	field_hex(root, "", "pan_id", 4)?;
	field_hex(root, "", "extended_pan_id", 16)?;
	field_integer(root, "", "nwk_update_id", 0, u8::MAX as u64)?;
	field_integer(root, "", "security_level", 0, 7)?;
	field_integer(root, "", "channel", 11, 26)?;

	let (value, path) = required(root, "", "channel_mask")?;
	for (i, channel) in array(value, &path)?.iter().enumerate() {
		integer(channel, &format!("{}[{}]", path, i), 11, 26)?;
	}

	let (value, path) = required(root, "", "network_key")?;
	network_key(value, &path)?;

	let (value, path) = required(root, "", "devices")?;
	for (i, d) in array(value, &path)?.iter().enumerate() {
		device(d, &format!("{}[{}]", path, i))?;
	}

	Ok(())
}
