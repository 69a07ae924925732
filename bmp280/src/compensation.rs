//! Fixed-point compensation formulas from the BMP280 datasheet (section 8.2, 64-bit variant
//! for pressure).
//!
//! Temperature must be compensated first: its fine resolution value feeds the pressure formula.

use crate::calibration::Calibration;
use crate::reading::Reading;
use crate::sample::RawSample;

/// Fine resolution temperature (`t_fine`), carried from temperature to pressure compensation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FineTemperature(i32);

impl FineTemperature {
	/// Wraps a known `t_fine`, e.g. one logged by another tool.
	pub fn from_raw(value: i32) -> Self {
		FineTemperature(value)
	}

	pub fn value(self) -> i32 {
		self.0
	}
}

/// Returns the temperature in hundredths of a degree Celsius and `t_fine`.
///
/// Intermediates are 64-bit: the squared term exceeds 32 bits for extreme inputs, and the
/// results stay within 32 bits for any 20-bit `raw_temperature`.
pub fn compensate_temperature(raw_temperature: u32, calibration: &Calibration) -> (i32, FineTemperature) {
	let raw = i64::from(raw_temperature);
	let t1 = i64::from(calibration.t1);
	let t2 = i64::from(calibration.t2);
	let t3 = i64::from(calibration.t3);

	let var1 = (((raw >> 3) - (t1 << 1)) * t2) >> 11;
	let var2 = (((((raw >> 4) - t1) * ((raw >> 4) - t1)) >> 12) * t3) >> 14;

	let fine = var1 + var2;
	let temperature = (fine * 5 + 128) >> 8;

	(temperature as i32, FineTemperature(fine as i32))
}

/// Returns the pressure in Pa as unsigned Q24.8 (value / 256 = Pa).
///
/// A zero denominator yields 0. Out-of-range inputs wrap instead of panicking.
pub fn compensate_pressure(raw_pressure: u32, fine: FineTemperature, calibration: &Calibration) -> u32 {
	let p1 = i64::from(calibration.p1);
	let p2 = i64::from(calibration.p2);
	let p3 = i64::from(calibration.p3);
	let p4 = i64::from(calibration.p4);
	let p5 = i64::from(calibration.p5);
	let p6 = i64::from(calibration.p6);
	let p7 = i64::from(calibration.p7);
	let p8 = i64::from(calibration.p8);
	let p9 = i64::from(calibration.p9);

	let mut var1 = i64::from(fine.0) - 128_000;
	let mut var2 = var1.wrapping_mul(var1).wrapping_mul(p6);
	var2 = var2.wrapping_add(var1.wrapping_mul(p5) << 17);
	var2 = var2.wrapping_add(p4 << 35);
	var1 = (var1.wrapping_mul(var1).wrapping_mul(p3) >> 8).wrapping_add(var1.wrapping_mul(p2) << 12);
	var1 = (1i64 << 47).wrapping_add(var1).wrapping_mul(p1) >> 33;

	if var1 == 0 {
		return 0;
	}

	let mut p = 1_048_576 - i64::from(raw_pressure);
	p = (p << 31).wrapping_sub(var2).wrapping_mul(3125).wrapping_div(var1);
	var1 = (p9.wrapping_mul(p >> 13).wrapping_mul(p >> 13)) >> 25;
	var2 = p8.wrapping_mul(p) >> 19;
	p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add(p7 << 4);

	p as u32
}

/// Compensates both channels of one sample, temperature first.
pub fn compensate(raw: &RawSample, calibration: &Calibration) -> Reading {
	let (temperature, fine) = compensate_temperature(raw.temperature, calibration);
	let pressure = compensate_pressure(raw.pressure, fine, calibration);

	Reading { temperature, pressure }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{DATASHEET_CALIBRATION, DATASHEET_RAW_PRESSURE, DATASHEET_RAW_TEMPERATURE};

	#[test]
	fn datasheet_temperature() {
		let (temperature, fine) = compensate_temperature(DATASHEET_RAW_TEMPERATURE,
														 &DATASHEET_CALIBRATION);

		assert_eq!(fine.value(), 128_422);
		assert_eq!(temperature, 2508);
	}

	#[test]
	fn datasheet_pressure() {
		let (_, fine) = compensate_temperature(DATASHEET_RAW_TEMPERATURE, &DATASHEET_CALIBRATION);
		let pressure = compensate_pressure(DATASHEET_RAW_PRESSURE, fine, &DATASHEET_CALIBRATION);

		// 100653.25 Pa, the datasheet rounds its worked example to 100653.27 Pa
		assert_eq!(pressure, 25_767_233);
		assert!((pressure as f64 / 256. - 100_653.27).abs() < 0.1);
	}

	#[test]
	fn compensate_runs_both_channels() {
		let raw = RawSample {
			pressure: DATASHEET_RAW_PRESSURE,
			temperature: DATASHEET_RAW_TEMPERATURE,
		};

		assert_eq!(compensate(&raw, &DATASHEET_CALIBRATION),
				   Reading { temperature: 2508, pressure: 25_767_233 });
	}

	#[test]
	fn zero_denominator_returns_zero() {
		let calibration = Calibration { p1: 0, ..DATASHEET_CALIBRATION };
		let fine = FineTemperature::from_raw(128_422);

		assert_eq!(compensate_pressure(DATASHEET_RAW_PRESSURE, fine, &calibration), 0);
		assert_eq!(compensate_pressure(0, fine, &calibration), 0);
		assert_eq!(compensate_pressure(0xF_FFFF, fine, &calibration), 0);
	}

	#[test]
	fn temperature_is_deterministic_over_the_adc_range() {
		for raw in 0..=0xF_FFFFu32 {
			let first = compensate_temperature(raw, &DATASHEET_CALIBRATION);
			let second = compensate_temperature(raw, &DATASHEET_CALIBRATION);
			assert_eq!(first, second);
		}
	}

	#[test]
	fn temperature_increases_with_raw_value() {
		let (cold, _) = compensate_temperature(400_000, &DATASHEET_CALIBRATION);
		let (warm, _) = compensate_temperature(600_000, &DATASHEET_CALIBRATION);

		assert!(cold < warm);
	}

	#[test]
	fn pressure_decreases_with_raw_value() {
		let fine = FineTemperature::from_raw(128_422);
		let high = compensate_pressure(300_000, fine, &DATASHEET_CALIBRATION);
		let low = compensate_pressure(500_000, fine, &DATASHEET_CALIBRATION);

		assert!(low < high);
	}
}
