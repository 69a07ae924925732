use bmp280::{Bmp280, Reading, Transport};
use std::error::Error;
use std::time::Duration;

use crate::traits::InputController;

/// Samples an operational BMP280 at a fixed period.
pub struct Bmp280InputController<T> {
	bmp280: Bmp280<T>,
	period: Duration,
	max_consecutive_failures: u32,
}

impl<T: Transport> Bmp280InputController<T> {
	pub fn new(bmp280: Bmp280<T>, period: Duration, max_consecutive_failures: u32) -> Self {
		Self {
			bmp280,
			period,
			max_consecutive_failures,
		}
	}
}

impl<T: Transport + Send + 'static> InputController for Bmp280InputController<T> {
	type Input = Reading;

	fn delay(&self) -> Option<Duration> {
		Some(self.period)
	}

	fn max_consecutive_failures(&self) -> Option<u32> {
		Some(self.max_consecutive_failures)
	}

	fn read_input(&mut self) -> Result<Self::Input, Box<dyn Error>> {
		let reading = self.bmp280.sample()?;
		trace!("{:?}", reading);

		Ok(reading)
	}
}
