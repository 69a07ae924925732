use std::fmt::{self, Display, Formatter};
use std::{error, thread};

use crate::bmp280::Bmp280;
use crate::calibration::Calibration;
use crate::constants::*;
use crate::properties::DeviceProperties;
use crate::registers;
use crate::settings::{IdentityPolicy, Settings};
use crate::transport::Transport;
use crate::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailureReason {
	BusSetup,
	Reset,
	Identity,
	Configuration,
	Calibration,
}

impl Display for FailureReason {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FailureReason::BusSetup => "bus setup",
			FailureReason::Reset => "soft reset",
			FailureReason::Identity => "identification",
			FailureReason::Configuration => "configuration",
			FailureReason::Calibration => "calibration",
		})
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceState {
	Uninitialized,
	BusReady,
	Identified,
	Configured,
	CalibrationLoaded,
	Operational,
	Failed(FailureReason),
}

#[derive(Debug)]
pub struct BringUpError {
	pub reason: FailureReason,
	pub source: Error,
}

impl BringUpError {
	pub fn state(&self) -> DeviceState {
		DeviceState::Failed(self.reason)
	}
}

impl Display for BringUpError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "BMP280 bring-up failed during {}: {}", self.reason, self.source)
	}
}

impl error::Error for BringUpError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		Some(&self.source)
	}
}

/// Fail-fast bring-up state machine.
///
/// Each `advance` performs one transition. The first failing step leaves the sequence in
/// `Failed` and later calls do nothing.
pub struct BringUp<T> {
	transport: T,
	properties: DeviceProperties,
	settings: Settings,
	state: DeviceState,
	chip_id: Option<u8>,
	calibration: Option<Calibration>,
}

impl<T: Transport> BringUp<T> {
	pub fn new(transport: T, properties: &DeviceProperties, settings: Settings) -> Self {
		Self {
			transport,
			properties: properties.clone(),
			settings,
			state: DeviceState::Uninitialized,
			chip_id: None,
			calibration: None,
		}
	}

	pub fn state(&self) -> DeviceState {
		self.state
	}

	pub fn into_transport(self) -> T {
		self.transport
	}

	pub fn advance(&mut self) -> Result<DeviceState, BringUpError> {
		let next = match self.state {
			DeviceState::Uninitialized => self.set_up_bus().map(|()| DeviceState::BusReady),
			DeviceState::BusReady => self.reset_and_identify().map(|()| DeviceState::Identified),
			DeviceState::Identified => self.configure().map(|()| DeviceState::Configured),
			DeviceState::Configured => self.load_calibration().map(|()| DeviceState::CalibrationLoaded),
			DeviceState::CalibrationLoaded => {
				info!("BMP280: Successfully probed");
				Ok(DeviceState::Operational)
			}
			DeviceState::Operational | DeviceState::Failed(_) => return Ok(self.state),
		};

		match next {
			Ok(state) => {
				self.state = state;
				Ok(state)
			}
			Err(e) => {
				error!("BMP280: {}", e);
				self.state = e.state();
				Err(e)
			}
		}
	}

	pub fn run(mut self) -> Result<Bmp280<T>, BringUpError> {
		loop {
			match self.state {
				DeviceState::Operational => break,
				DeviceState::Failed(reason) => return Err(BringUpError {
					reason,
					source: Error::BringUpAborted,
				}),
				_ => self.advance()?,
			};
		}

		match (self.calibration, self.chip_id) {
			(Some(calibration), Some(chip_id)) => Ok(Bmp280::new(self.transport, calibration, chip_id)),
			_ => unreachable!("operational without identity or calibration"),
		}
	}

	fn set_up_bus(&mut self) -> Result<(), BringUpError> {
		let fail = |source| BringUpError { reason: FailureReason::BusSetup, source };

		let bus_settings = self.properties.bus_settings().map_err(fail)?;
		self.transport.setup(&bus_settings).map_err(fail)?;

		info!("BMP280: SPI bus OK ({} Hz, {} bits per word, {:?})",
			  bus_settings.max_speed_hz, bus_settings.bits_per_word, bus_settings.mode);
		Ok(())
	}

	fn reset_and_identify(&mut self) -> Result<(), BringUpError> {
		if self.settings.soft_reset {
			self.transport
				.write_register(registers::RESET, SOFT_RESET)
				.map_err(|source| BringUpError { reason: FailureReason::Reset, source })?;

			thread::sleep(self.settings.reset_delay);
			debug!("BMP280: Soft reset done");
		}

		let fail = |source| BringUpError { reason: FailureReason::Identity, source };

		let mut id = [0u8; 1];
		self.transport.read_registers(registers::ID, &mut id).map_err(fail)?;
		let found = id[0];

		if found != CHIP_ID {
			match self.settings.identity_policy {
				IdentityPolicy::Strict => return Err(fail(Error::IdentityMismatch { found })),
				IdentityPolicy::Advisory => warn!("BMP280: Unexpected chip ID 0x{:02x}, continuing", found),
			}
		} else {
			info!("BMP280: Chip ID: 0x{:02x}", found);
		}

		self.chip_id = Some(found);
		Ok(())
	}

	fn configure(&mut self) -> Result<(), BringUpError> {
		let ctrl_meas = self.settings.ctrl_meas();
		let config = self.settings.config();

		for &(register, value) in &[(registers::CTRL_MEAS, ctrl_meas), (registers::CONFIG, config)] {
			self.transport
				.write_register(register, value)
				.map_err(|e| BringUpError {
					reason: FailureReason::Configuration,
					source: Error::ConfigurationWrite { register, source: e.into_io_error() },
				})?;
		}

		debug!("BMP280: ctrl_meas = 0x{:02x}, config = 0x{:02x}", ctrl_meas, config);
		Ok(())
	}

	fn load_calibration(&mut self) -> Result<(), BringUpError> {
		let calibration = Calibration::load(&mut self.transport)
			.map_err(|source| BringUpError { reason: FailureReason::Calibration, source })?;

		debug!("BMP280: {:?}", calibration);
		self.calibration = Some(calibration);
		Ok(())
	}
}

/// Runs the whole bring-up sequence on `transport`.
pub fn bring_up<T: Transport>(transport: T, properties: &DeviceProperties, settings: Settings)
							  -> Result<Bmp280<T>, BringUpError> {
	BringUp::new(transport, properties, settings).run()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockBus;
	use crate::transport::RegisterBus;
	use std::time::Duration;

	fn quick_settings() -> Settings {
		Settings { reset_delay: Duration::from_millis(0), ..Settings::standalone() }
	}

	#[test]
	fn advance_walks_every_state_in_order() {
		let bus = MockBus::bmp280();
		let mut bring_up = BringUp::new(RegisterBus::new(bus), &DeviceProperties::new(), quick_settings());

		assert_eq!(bring_up.state(), DeviceState::Uninitialized);
		assert_eq!(bring_up.advance().unwrap(), DeviceState::BusReady);
		assert_eq!(bring_up.advance().unwrap(), DeviceState::Identified);
		assert_eq!(bring_up.advance().unwrap(), DeviceState::Configured);
		assert_eq!(bring_up.advance().unwrap(), DeviceState::CalibrationLoaded);
		assert_eq!(bring_up.advance().unwrap(), DeviceState::Operational);
		assert_eq!(bring_up.advance().unwrap(), DeviceState::Operational);
	}

	#[test]
	fn failed_state_is_sticky() {
		let bus = MockBus::bmp280();
		bus.fail_writes_at(0xF4);
		let mut bring_up = BringUp::new(RegisterBus::new(bus.clone()), &DeviceProperties::new(),
										quick_settings());

		bring_up.advance().unwrap();
		bring_up.advance().unwrap();
		let e = bring_up.advance().unwrap_err();
		assert_eq!(e.state(), DeviceState::Failed(FailureReason::Configuration));

		let frames = bus.frames().len();
		assert_eq!(bring_up.advance().unwrap(), DeviceState::Failed(FailureReason::Configuration));
		assert_eq!(bus.frames().len(), frames);

		let e = bring_up.run().unwrap_err();
		assert_eq!(e.reason, FailureReason::Configuration);
		assert!(matches!(e.source, Error::BringUpAborted));
		assert!(e.source.io_error().is_none());
	}

	#[test]
	fn error_message_names_the_step() {
		let e = BringUpError {
			reason: FailureReason::Identity,
			source: Error::IdentityMismatch { found: 0x60 },
		};

		assert_eq!(e.to_string(),
				   "BMP280 bring-up failed during identification: Unexpected chip ID 0x60 (expected 0x58)");
	}
}
