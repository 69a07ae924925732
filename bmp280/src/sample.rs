use crate::calibration::Calibration;
use crate::compensation::compensate;
use crate::constants::DATA_LEN;
use crate::reading::Reading;
use crate::registers;
use crate::transport::Transport;
use crate::Error;

/// Uncompensated 20-bit ADC outputs of one measurement.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RawSample {
	pub pressure: u32,
	pub temperature: u32,
}

impl RawSample {
	/// `press_msb..press_xlsb` followed by `temp_msb..temp_xlsb`.
	pub fn from_bytes(bytes: &[u8; DATA_LEN]) -> Self {
		Self {
			pressure: unpack_20_bits(bytes[0], bytes[1], bytes[2]),
			temperature: unpack_20_bits(bytes[3], bytes[4], bytes[5]),
		}
	}
}

#[inline(always)]
fn unpack_20_bits(msb: u8, lsb: u8, xlsb: u8) -> u32 {
	(msb as u32) << 12 | (lsb as u32) << 4 | (xlsb as u32) >> 4
}

/// Burst reads both ADC outputs at once so they belong to the same measurement.
pub fn read_raw<T: Transport + ?Sized>(transport: &mut T) -> Result<RawSample, Error> {
	let mut buffer = [0u8; DATA_LEN];
	transport.read_registers(registers::PRESS_MSB, &mut buffer)?;

	Ok(RawSample::from_bytes(&buffer))
}

pub fn sample<T: Transport + ?Sized>(transport: &mut T, calibration: &Calibration) -> Result<Reading, Error> {
	let raw = read_raw(transport)?;
	Ok(compensate(&raw, calibration))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockBus, DATASHEET_CALIBRATION, DATASHEET_RAW_PRESSURE, DATASHEET_RAW_TEMPERATURE};
	use crate::transport::RegisterBus;

	#[test]
	fn unpacks_three_byte_groups() {
		let raw = RawSample::from_bytes(&[0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00]);

		assert_eq!(raw.pressure, 415_148);
		assert_eq!(raw.temperature, 519_888);
	}

	#[test]
	fn low_nibble_of_xlsb_is_ignored() {
		let raw = RawSample::from_bytes(&[0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x0F]);

		assert_eq!(raw.pressure, 0xF_FFFF);
		assert_eq!(raw.temperature, 0);
	}

	#[test]
	fn read_raw_is_one_burst_from_press_msb() {
		let bus = MockBus::bmp280();
		let mut transport = RegisterBus::new(bus.clone());

		let raw = read_raw(&mut transport).unwrap();

		assert_eq!(raw, RawSample {
			pressure: DATASHEET_RAW_PRESSURE,
			temperature: DATASHEET_RAW_TEMPERATURE,
		});
		let frames = bus.frames();
		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0].tx, vec![0xF7, 0, 0, 0, 0, 0, 0]);
	}

	#[test]
	fn sample_propagates_bus_errors() {
		let bus = MockBus::bmp280();
		bus.fail_reads_at(0xF7);
		let mut transport = RegisterBus::new(bus);

		assert!(matches!(sample(&mut transport, &DATASHEET_CALIBRATION), Err(Error::Bus(_))));
	}
}
