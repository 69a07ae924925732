use std::collections::BTreeMap;
use std::iter::FromIterator;
use std::convert::TryFrom;

use crate::constants::*;
use crate::transport::BusSettings;
use crate::Error;

/// Device-tree style key/value properties describing how the sensor is wired.
#[derive(Debug, Clone, Default)]
pub struct DeviceProperties {
	values: BTreeMap<String, String>,
}

impl DeviceProperties {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, key: &str, value: &str) -> Self {
		self.values.insert(key.to_owned(), value.to_owned());
		self
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.values.get(key).map(String::as_str)
	}

	/// Absent keys yield `default`; present keys must parse.
	pub fn read_u32_or(&self, key: &str, default: u32) -> Result<u32, Error> {
		match self.get(key) {
			None => Ok(default),
			Some(value) => parse_u32(value).ok_or_else(|| Error::InvalidProperty {
				key: key.to_owned(),
				value: value.to_owned(),
			}),
		}
	}

	pub fn bus_settings(&self) -> Result<BusSettings, Error> {
		let max_speed_hz = self.read_u32_or(MAX_SPEED_HZ_PROPERTY, DEFAULT_MAX_SPEED_HZ)?;

		let bits_per_word = self.read_u32_or(BITS_PER_WORD_PROPERTY, DEFAULT_BITS_PER_WORD as u32)?;
		let bits_per_word = u8::try_from(bits_per_word).map_err(|_| Error::InvalidProperty {
			key: BITS_PER_WORD_PROPERTY.to_owned(),
			value: bits_per_word.to_string(),
		})?;

		Ok(BusSettings {
			max_speed_hz,
			bits_per_word,
			..BusSettings::default()
		})
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DeviceProperties {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}

// Device trees write cells either in decimal or with a 0x prefix.
fn parse_u32(value: &str) -> Option<u32> {
	let value = value.trim();

	if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		u32::from_str_radix(hex, 16).ok()
	} else {
		value.parse().ok()
	}
}
