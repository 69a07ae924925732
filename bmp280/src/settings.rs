use std::time::Duration;

use crate::constants::*;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Oversampling {
	Skipped = 0b000,
	X1 = 0b001,
	X2 = 0b010,
	X4 = 0b011,
	X8 = 0b100,
	X16 = 0b101,
}

impl Oversampling {
	pub fn from_factor(factor: u8) -> Option<Self> {
		Some(match factor {
			0 => Oversampling::Skipped,
			1 => Oversampling::X1,
			2 => Oversampling::X2,
			4 => Oversampling::X4,
			8 => Oversampling::X8,
			16 => Oversampling::X16,
			_ => return None,
		})
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PowerMode {
	Sleep,
	Forced,
	Normal,
}

impl PowerMode {
	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"sleep" => PowerMode::Sleep,
			"forced" => PowerMode::Forced,
			"normal" => PowerMode::Normal,
			_ => return None,
		})
	}

	fn register_value(self) -> u8 {
		match self {
			PowerMode::Sleep => MODE_SLEEP,
			PowerMode::Forced => MODE_FORCED,
			PowerMode::Normal => MODE_NORMAL,
		}
	}
}

/// Inactive period between two measurements in normal mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StandbyTime {
	Us500 = 0b000,
	Us62500 = 0b001,
	Ms125 = 0b010,
	Ms250 = 0b011,
	Ms500 = 0b100,
	Ms1000 = 0b101,
	Ms2000 = 0b110,
	Ms4000 = 0b111,
}

impl StandbyTime {
	pub fn from_micros(micros: u32) -> Option<Self> {
		Some(match micros {
			500 => StandbyTime::Us500,
			62_500 => StandbyTime::Us62500,
			125_000 => StandbyTime::Ms125,
			250_000 => StandbyTime::Ms250,
			500_000 => StandbyTime::Ms500,
			1_000_000 => StandbyTime::Ms1000,
			2_000_000 => StandbyTime::Ms2000,
			4_000_000 => StandbyTime::Ms4000,
			_ => return None,
		})
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IirFilter {
	Off = 0b000,
	X2 = 0b001,
	X4 = 0b010,
	X8 = 0b011,
	X16 = 0b100,
}

impl IirFilter {
	pub fn from_coefficient(coefficient: u8) -> Option<Self> {
		Some(match coefficient {
			0 | 1 => IirFilter::Off,
			2 => IirFilter::X2,
			4 => IirFilter::X4,
			8 => IirFilter::X8,
			16 => IirFilter::X16,
			_ => return None,
		})
	}
}

/// What bring-up does when the identity register does not hold the BMP280 chip ID.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IdentityPolicy {
	/// Abort bring-up.
	Strict,
	/// Log a warning and carry on.
	Advisory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
	pub temperature_oversampling: Oversampling,
	pub pressure_oversampling: Oversampling,
	pub power_mode: PowerMode,
	pub standby_time: StandbyTime,
	pub iir_filter: IirFilter,
	pub spi3w_enabled: bool,
	pub identity_policy: IdentityPolicy,
	pub soft_reset: bool,
	pub reset_delay: Duration,
}

impl Settings {
	/// Host program over spidev: reset first, refuse unknown chips,
	/// 0.5 ms standby with the x16 IIR filter.
	pub fn standalone() -> Self {
		Self {
			temperature_oversampling: Oversampling::X1,
			pressure_oversampling: Oversampling::X4,
			power_mode: PowerMode::Normal,
			standby_time: StandbyTime::Us500,
			iir_filter: IirFilter::X16,
			spi3w_enabled: false,
			identity_policy: IdentityPolicy::Strict,
			soft_reset: true,
			reset_delay: Duration::from_millis(2), // datasheet start-up time
		}
	}

	/// Probe-driven driver: no reset, unknown chips are only logged,
	/// 1 s standby without filtering.
	pub fn embedded() -> Self {
		Self {
			standby_time: StandbyTime::Ms1000,
			iir_filter: IirFilter::Off,
			identity_policy: IdentityPolicy::Advisory,
			soft_reset: false,
			..Self::standalone()
		}
	}

	pub fn ctrl_meas(&self) -> u8 {
		(self.temperature_oversampling as u8) << OSRS_T_SHIFT
			| (self.pressure_oversampling as u8) << OSRS_P_SHIFT
			| self.power_mode.register_value()
	}

	pub fn config(&self) -> u8 {
		(self.standby_time as u8) << T_SB_SHIFT
			| (self.iir_filter as u8) << FILTER_SHIFT
			| if self.spi3w_enabled { SPI3W_EN } else { 0 }
	}
}

impl Default for Settings {
	fn default() -> Self {
		Self::standalone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn standalone_register_values() {
		let settings = Settings::standalone();
		assert_eq!(settings.ctrl_meas(), 0x2F);
		assert_eq!(settings.config(), 0x10);
	}

	#[test]
	fn embedded_register_values() {
		let settings = Settings::embedded();
		assert_eq!(settings.ctrl_meas(), 0x2F);
		assert_eq!(settings.config(), 0xA0);
		assert_eq!(settings.identity_policy, IdentityPolicy::Advisory);
		assert!(!settings.soft_reset);
	}

	#[test]
	fn spi3w_sets_lowest_config_bit() {
		let settings = Settings { spi3w_enabled: true, ..Settings::standalone() };
		assert_eq!(settings.config(), 0x11);
	}

	#[test]
	fn conversions_from_human_values() {
		assert_eq!(Oversampling::from_factor(16), Some(Oversampling::X16));
		assert_eq!(Oversampling::from_factor(3), None);
		assert_eq!(IirFilter::from_coefficient(1), Some(IirFilter::Off));
		assert_eq!(StandbyTime::from_micros(62_500), Some(StandbyTime::Us62500));
		assert_eq!(PowerMode::from_name("forced"), Some(PowerMode::Forced));
		assert_eq!(PowerMode::from_name("turbo"), None);
	}
}
