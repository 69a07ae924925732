use std::fmt::{self, Display, Formatter};
use std::io;

/// Compensated output in the sensor's native fixed-point units.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Reading {
	/// Hundredths of a degree Celsius.
	pub temperature: i32,
	/// Pascal in unsigned Q24.8.
	pub pressure: u32,
}

impl Reading {
	pub const PRESSURE_COUNTS_PER_PA: u32 = 256;
	pub const PRESSURE_COUNTS_PER_HPA: u32 = 256 * 100;

	pub fn celsius(&self) -> f64 {
		self.temperature as f64 / 100.
	}

	pub fn pascals(&self) -> f64 {
		self.pressure as f64 / Self::PRESSURE_COUNTS_PER_PA as f64
	}

	pub fn hectopascals(&self) -> f64 {
		self.pressure as f64 / Self::PRESSURE_COUNTS_PER_HPA as f64
	}
}

impl Display for Reading {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let sign = if self.temperature < 0 { "-" } else { "" };
		let temperature = self.temperature.unsigned_abs();
		writeln!(f, "Temperature: {}{}.{:02} °C", sign, temperature / 100, temperature % 100)?;

		let pressure = self.pressure;
		writeln!(f, "Pressure: {}.{:02} hPa",
				 pressure / Self::PRESSURE_COUNTS_PER_HPA,
				 (pressure % Self::PRESSURE_COUNTS_PER_HPA) * 100 / Self::PRESSURE_COUNTS_PER_HPA)
	}
}

/// A reading rendered once, handed out through bounded reads.
///
/// Every `read` copies at most the bytes left after the cursor, advances the cursor by the
/// amount copied and returns 0 once the report was fully consumed.
#[derive(Debug, Clone)]
pub struct ReadingReport {
	text: String,
	position: usize,
}

impl ReadingReport {
	pub fn new(reading: &Reading) -> Self {
		Self {
			text: reading.to_string(),
			position: 0,
		}
	}

	pub fn as_str(&self) -> &str {
		&self.text
	}

	pub fn position(&self) -> usize {
		self.position
	}

	pub fn remaining(&self) -> usize {
		self.text.len() - self.position
	}
}

impl From<Reading> for ReadingReport {
	fn from(reading: Reading) -> Self {
		Self::new(&reading)
	}
}

impl io::Read for ReadingReport {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let to_copy = buf.len().min(self.remaining());

		buf[..to_copy].copy_from_slice(&self.text.as_bytes()[self.position..self.position + to_copy]);
		self.position += to_copy;

		Ok(to_copy)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Read;

	const DATASHEET_READING: Reading = Reading { temperature: 2508, pressure: 25_767_233 };

	#[test]
	fn renders_two_digit_fractions() {
		assert_eq!(DATASHEET_READING.to_string(),
				   "Temperature: 25.08 °C\nPressure: 1006.53 hPa\n");
	}

	#[test]
	fn renders_negative_temperatures_once_signed() {
		let reading = Reading { temperature: -5, pressure: 0 };
		assert_eq!(reading.to_string(), "Temperature: -0.05 °C\nPressure: 0.00 hPa\n");

		let reading = Reading { temperature: -1234, pressure: 25_600 };
		assert_eq!(reading.to_string(), "Temperature: -12.34 °C\nPressure: 1.00 hPa\n");
	}

	#[test]
	fn scaling_helpers() {
		assert_approx_eq!(DATASHEET_READING.celsius(), 25.08);
		assert_approx_eq!(DATASHEET_READING.pascals(), 100_653.25, 0.01);
		assert_approx_eq!(DATASHEET_READING.hectopascals(), 1006.5325, 0.0001);
	}

	#[test]
	fn report_reads_are_bounded_and_advance_the_cursor() {
		let mut report = ReadingReport::new(&DATASHEET_READING);
		let total = report.remaining();

		let mut buffer = [0u8; 10];
		assert_eq!(report.read(&mut buffer).unwrap(), 10);
		assert_eq!(&buffer, b"Temperatur");
		assert_eq!(report.position(), 10);

		let mut rest = Vec::new();
		report.read_to_end(&mut rest).unwrap();
		assert_eq!(rest.len(), total - 10);
		assert_eq!(report.remaining(), 0);

		assert_eq!(report.read(&mut buffer).unwrap(), 0);
		assert_eq!(report.position(), total);
	}

	#[test]
	fn short_read_when_less_is_left_than_requested() {
		let mut report = ReadingReport::from(DATASHEET_READING);
		let total = report.remaining();

		let mut buffer = vec![0u8; total + 32];
		assert_eq!(report.read(&mut buffer).unwrap(), total);
		assert_eq!(&buffer[..total], report.as_str().as_bytes());
	}
}
