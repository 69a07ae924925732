use bmp280::{DeviceProperties, IdentityPolicy, IirFilter, Oversampling, PowerMode, Settings, StandbyTime};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Register settings start from the `variant` preset; every `Some` field overrides it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
	pub log_level_filter: String,
	pub log_directory: String,
	pub device_path: String,
	/// Firmware-style properties, e.g. `"spi-max-frequency": "1000000"`.
	pub properties: BTreeMap<String, String>,
	/// `standalone` or `embedded`.
	pub variant: String,
	pub oversampling_temperature: Option<u8>,
	pub oversampling_pressure: Option<u8>,
	pub power_mode: Option<String>,
	pub standby_time_us: Option<u32>,
	pub iir_filter: Option<u8>,
	pub spi3w_enabled: Option<bool>,
	/// `strict` or `advisory`.
	pub identity_policy: Option<String>,
	pub soft_reset: Option<bool>,
	pub sample_period_ms: u64,
	pub bring_up_attempts: u32,
	pub bring_up_retry_delay_ms: u64,
	pub max_consecutive_failures: u32,
}

pub trait TryIntoLevelFilter {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()>;
}

impl TryIntoLevelFilter for String {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()> {
		Ok(match self.as_str() {
			"none" => LevelFilter::Off,
			"error" => LevelFilter::Error,
			"warn" => LevelFilter::Warn,
			"info" => LevelFilter::Info,
			"debug" => LevelFilter::Debug,
			"all" => LevelFilter::Trace,
			_ => return Err(()),
		})
	}
}

impl Default for StationConfig {
	fn default() -> Self {
		StationConfig {
			log_level_filter: String::from("info"),
			log_directory: String::from("."),
			device_path: String::from("/dev/spidev0.0"),
			properties: BTreeMap::new(),
			variant: String::from("standalone"),
			oversampling_temperature: None,
			oversampling_pressure: None,
			power_mode: None,
			standby_time_us: None,
			iir_filter: None,
			spi3w_enabled: None,
			identity_policy: None,
			soft_reset: None,
			sample_period_ms: 1000,
			bring_up_attempts: 3,
			bring_up_retry_delay_ms: 500,
			max_consecutive_failures: 5,
		}
	}
}

impl StationConfig {
	pub fn settings(&self) -> anyhow::Result<Settings> {
		let mut settings = match self.variant.as_str() {
			"standalone" => Settings::standalone(),
			"embedded" => Settings::embedded(),
			other => bail!("Unknown variant '{}'", other),
		};

		if let Some(factor) = self.oversampling_temperature {
			settings.temperature_oversampling = Oversampling::from_factor(factor)
				.ok_or_else(|| anyhow!("Invalid temperature oversampling x{}", factor))?;
		}

		if let Some(factor) = self.oversampling_pressure {
			settings.pressure_oversampling = Oversampling::from_factor(factor)
				.ok_or_else(|| anyhow!("Invalid pressure oversampling x{}", factor))?;
		}

		if let Some(name) = &self.power_mode {
			settings.power_mode = PowerMode::from_name(name)
				.ok_or_else(|| anyhow!("Invalid power mode '{}'", name))?;
		}

		if let Some(micros) = self.standby_time_us {
			settings.standby_time = StandbyTime::from_micros(micros)
				.ok_or_else(|| anyhow!("Invalid standby time {} us", micros))?;
		}

		if let Some(coefficient) = self.iir_filter {
			settings.iir_filter = IirFilter::from_coefficient(coefficient)
				.ok_or_else(|| anyhow!("Invalid IIR filter coefficient {}", coefficient))?;
		}

		if let Some(enabled) = self.spi3w_enabled {
			settings.spi3w_enabled = enabled;
		}

		if let Some(policy) = &self.identity_policy {
			settings.identity_policy = match policy.as_str() {
				"strict" => IdentityPolicy::Strict,
				"advisory" => IdentityPolicy::Advisory,
				other => bail!("Invalid identity policy '{}'", other),
			};
		}

		if let Some(soft_reset) = self.soft_reset {
			settings.soft_reset = soft_reset;
		}

		Ok(settings)
	}

	pub fn device_properties(&self) -> DeviceProperties {
		self.properties.iter()
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect()
	}

	pub fn sample_period(&self) -> Duration {
		Duration::from_millis(self.sample_period_ms)
	}

	pub fn bring_up_retry_delay(&self) -> Duration {
		Duration::from_millis(self.bring_up_retry_delay_ms)
	}
}

/// `None` when there is no file at `path`. Unreadable or invalid files are errors.
pub fn read(path: &Path) -> Result<Option<StationConfig>, Box<dyn Error>> {
	let config_file = match File::open(path) {
		Ok(file) => file,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(e.into()),
	};

	let config: StationConfig = serde_json::from_reader(config_file)?;

	Ok(Some(config))
}

pub fn save(config: &StationConfig, path: &Path) -> Result<(), Box<dyn Error>> {
	let mut config_file = OpenOptions::new()
		.create(true)
		.write(true)
		.truncate(true)
		.open(path)?;

	write!(config_file, "{}", serde_json::to_string_pretty(config)?)?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_select_the_standalone_preset() {
		let config = StationConfig::default();

		assert_eq!(config.settings().unwrap(), Settings::standalone());
		assert_eq!(config.device_properties().bus_settings().unwrap(), bmp280::BusSettings::default());
	}

	#[test]
	fn partial_file_keeps_defaults() {
		let config: StationConfig = serde_json::from_str(r#"{
			"variant": "embedded",
			"iir_filter": 4,
			"properties": { "spi-max-frequency": "0x30d40" }
		}"#).unwrap();

		assert_eq!(config.device_path, "/dev/spidev0.0");
		assert_eq!(config.sample_period(), Duration::from_secs(1));

		let settings = config.settings().unwrap();
		assert_eq!(settings.iir_filter, IirFilter::X4);
		assert_eq!(settings.config(), 0xA8);
		assert_eq!(settings.identity_policy, IdentityPolicy::Advisory);
		assert_eq!(config.device_properties().bus_settings().unwrap().max_speed_hz, 200_000);
	}

	#[test]
	fn overrides_are_validated() {
		let mut config = StationConfig::default();
		config.oversampling_pressure = Some(3);
		assert!(config.settings().is_err());

		config.oversampling_pressure = Some(16);
		config.power_mode = Some(String::from("forced"));
		config.identity_policy = Some(String::from("advisory"));
		let settings = config.settings().unwrap();
		assert_eq!(settings.ctrl_meas(), 0x35);
		assert_eq!(settings.identity_policy, IdentityPolicy::Advisory);

		config.variant = String::from("kernel");
		assert!(config.settings().is_err());
	}

	#[test]
	fn level_filters() {
		assert_eq!(String::from("all").try_into_level_filter(), Ok(LevelFilter::Trace));
		assert_eq!(String::from("none").try_into_level_filter(), Ok(LevelFilter::Off));
		assert!(String::from("verbose").try_into_level_filter().is_err());
	}

	#[test]
	fn saved_config_reads_back() {
		let path = std::env::temp_dir().join(format!("bmp280-station-{}.json", std::process::id()));
		let mut config = StationConfig::default();
		config.standby_time_us = Some(62_500);

		save(&config, &path).unwrap();
		let read_back = read(&path).unwrap();
		std::fs::remove_file(&path).unwrap();

		assert_eq!(read_back, Some(config));
	}

	#[test]
	fn missing_file_reads_as_none() {
		let path = std::env::temp_dir().join(format!("bmp280-station-missing-{}.json", std::process::id()));

		assert_eq!(read(&path).unwrap(), None);
	}

	#[test]
	fn mistyped_field_rejects_the_whole_file() {
		let path = std::env::temp_dir().join(format!("bmp280-station-mistyped-{}.json", std::process::id()));
		std::fs::write(&path, r#"{"variant":"embedded","iir_filter":"16"}"#).unwrap();

		let result = read(&path);
		std::fs::remove_file(&path).unwrap();

		assert!(result.is_err());
	}
}
