use crate::calibration::Calibration;
use crate::properties::DeviceProperties;
use crate::reading::Reading;
use crate::sample::{self, RawSample};
use crate::sequencer::{BringUp, BringUpError, DeviceState};
use crate::settings::Settings;
use crate::transport::Transport;
use crate::Error;

/// An operational BMP280. Only bring-up constructs it, so the calibration is always loaded.
#[derive(Debug)]
pub struct Bmp280<T> {
	transport: T,
	calibration: Calibration,
	chip_id: u8,
}

impl<T: Transport> Bmp280<T> {
	pub fn bring_up(transport: T, properties: &DeviceProperties, settings: Settings)
					-> Result<Self, BringUpError> {
		BringUp::new(transport, properties, settings).run()
	}

	pub(crate) fn new(transport: T, calibration: Calibration, chip_id: u8) -> Self {
		Self {
			transport,
			calibration,
			chip_id,
		}
	}

	pub fn state(&self) -> DeviceState {
		DeviceState::Operational
	}

	/// Identity register value read during bring-up. Differs from 0x58 only under the
	/// advisory identity policy.
	pub fn chip_id(&self) -> u8 {
		self.chip_id
	}

	pub fn calibration(&self) -> &Calibration {
		&self.calibration
	}

	pub fn read_raw(&mut self) -> Result<RawSample, Error> {
		sample::read_raw(&mut self.transport)
	}

	/// A failure only concerns this sample, the device stays operational.
	pub fn sample(&mut self) -> Result<Reading, Error> {
		sample::sample(&mut self.transport, &self.calibration)
	}

	pub fn release(self) -> T {
		self.transport
	}
}
