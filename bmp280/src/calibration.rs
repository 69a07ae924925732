use crate::constants::CALIBRATION_LEN;
use crate::registers;
use crate::transport::Transport;
use crate::Error;

/// Factory trimming coefficients, read once per bring-up from `calib00`..`calib23`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Calibration {
	pub t1: u16,
	pub t2: i16,
	pub t3: i16,
	pub p1: u16,
	pub p2: i16,
	pub p3: i16,
	pub p4: i16,
	pub p5: i16,
	pub p6: i16,
	pub p7: i16,
	pub p8: i16,
	pub p9: i16,
}

impl Calibration {
	/// Little-endian words in the order T1, T2, T3, P1..P9.
	pub fn from_bytes(bytes: &[u8; CALIBRATION_LEN]) -> Self {
		let unsigned = |i: usize| u16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);
		let signed = |i: usize| i16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);

		Self {
			t1: unsigned(0),
			t2: signed(1),
			t3: signed(2),
			p1: unsigned(3),
			p2: signed(4),
			p3: signed(5),
			p4: signed(6),
			p5: signed(7),
			p6: signed(8),
			p7: signed(9),
			p8: signed(10),
			p9: signed(11),
		}
	}

	pub fn to_bytes(&self) -> [u8; CALIBRATION_LEN] {
		let words = [
			self.t1.to_le_bytes(),
			self.t2.to_le_bytes(),
			self.t3.to_le_bytes(),
			self.p1.to_le_bytes(),
			self.p2.to_le_bytes(),
			self.p3.to_le_bytes(),
			self.p4.to_le_bytes(),
			self.p5.to_le_bytes(),
			self.p6.to_le_bytes(),
			self.p7.to_le_bytes(),
			self.p8.to_le_bytes(),
			self.p9.to_le_bytes(),
		];

		let mut bytes = [0u8; CALIBRATION_LEN];
		for (chunk, word) in bytes.chunks_mut(2).zip(words.iter()) {
			chunk.copy_from_slice(word);
		}
		bytes
	}

	/// One burst read of the whole block; nothing is decoded unless the read succeeds.
	pub fn load<T: Transport + ?Sized>(transport: &mut T) -> Result<Self, Error> {
		let mut bytes = [0u8; CALIBRATION_LEN];

		transport
			.read_registers(registers::CALIB00, &mut bytes)
			.map_err(|e| Error::CalibrationRead(e.into_io_error()))?;

		Ok(Self::from_bytes(&bytes))
	}
}
