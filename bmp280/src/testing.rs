//! In-memory stand-ins for the SPI bus, to test code built on this crate without hardware.
//! Only built with the `testing` feature, which dependent crates enable as a dev-dependency.

use std::collections::HashSet;
use std::io::{self, ErrorKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crate::calibration::Calibration;
use crate::constants::*;
use crate::registers;
use crate::transport::{BusSettings, SpiBus};

/// Calibration of the datasheet compensation example (BMP280 datasheet, section 3.12).
pub const DATASHEET_CALIBRATION: Calibration = Calibration {
	t1: 27504,
	t2: 26435,
	t3: -1000,
	p1: 36477,
	p2: -10685,
	p3: 3024,
	p4: 2855,
	p5: 140,
	p6: -7,
	p7: 15500,
	p8: -14600,
	p9: 6000,
};

pub const DATASHEET_RAW_TEMPERATURE: u32 = 519_888;
pub const DATASHEET_RAW_PRESSURE: u32 = 415_148;

/// Bytes clocked out by the host during one chip-select cycle.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
	pub tx: Vec<u8>,
}

/// Transaction boundaries, in the order the bus saw them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Event {
	Begin(ThreadId),
	End(ThreadId),
}

struct State {
	registers: [u8; 256],
	frames: Vec<Frame>,
	events: Vec<Event>,
	bus_settings: Option<BusSettings>,
	failing_reads: HashSet<u8>,
	failing_writes: HashSet<u8>,
	failing_setup: bool,
	transfer_delay: Option<Duration>,
}

/// Emulates the BMP280 register file behind a 4-wire SPI interface.
///
/// Reads auto-increment from the addressed register, writes store `(register, value)` pairs.
/// Clones share the same state.
#[derive(Clone)]
pub struct MockBus {
	state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for MockBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MockBus").field("frames", &self.frames().len()).finish()
	}
}

impl MockBus {
	/// A bus with every register at zero.
	pub fn blank() -> Self {
		Self {
			state: Arc::new(Mutex::new(State {
				registers: [0u8; 256],
				frames: Vec::new(),
				events: Vec::new(),
				bus_settings: None,
				failing_reads: HashSet::new(),
				failing_writes: HashSet::new(),
				failing_setup: false,
				transfer_delay: None,
			})),
		}
	}

	/// A BMP280 holding the datasheet calibration and ADC values.
	pub fn bmp280() -> Self {
		let bus = Self::blank();
		bus.set_register(registers::ID, CHIP_ID);
		bus.set_registers(registers::CALIB00, &DATASHEET_CALIBRATION.to_bytes());
		bus.set_raw_sample(DATASHEET_RAW_PRESSURE, DATASHEET_RAW_TEMPERATURE);
		bus
	}

	fn state(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn set_register(&self, register: u8, value: u8) {
		self.state().registers[register as usize] = value;
	}

	pub fn set_registers(&self, start: u8, values: &[u8]) {
		let mut state = self.state();
		for (i, value) in values.iter().enumerate() {
			state.registers[(start as usize + i) & 0xFF] = *value;
		}
	}

	/// Stores 20-bit ADC outputs the way the sensor lays them out.
	pub fn set_raw_sample(&self, pressure: u32, temperature: u32) {
		let pack = |value: u32| [(value >> 12) as u8, (value >> 4) as u8, (value << 4) as u8];

		self.set_registers(registers::PRESS_MSB, &pack(pressure));
		self.set_registers(registers::TEMP_MSB, &pack(temperature));
	}

	pub fn register(&self, register: u8) -> u8 {
		self.state().registers[register as usize]
	}

	pub fn frames(&self) -> Vec<Frame> {
		self.state().frames.clone()
	}

	pub fn events(&self) -> Vec<Event> {
		self.state().events.clone()
	}

	pub fn bus_settings(&self) -> Option<BusSettings> {
		self.state().bus_settings
	}

	/// Burst reads starting at `register` fail from now on.
	pub fn fail_reads_at(&self, register: u8) {
		self.state().failing_reads.insert(register | READ_FLAG);
	}

	/// Writes to `register` fail from now on.
	pub fn fail_writes_at(&self, register: u8) {
		self.state().failing_writes.insert(register | READ_FLAG);
	}

	pub fn fail_setup(&self) {
		self.state().failing_setup = true;
	}

	pub fn clear_failures(&self) {
		let mut state = self.state();
		state.failing_reads.clear();
		state.failing_writes.clear();
		state.failing_setup = false;
	}

	/// Holds every transaction open for `delay`, widening the window for interleaving.
	pub fn set_transfer_delay(&self, delay: Duration) {
		self.state().transfer_delay = Some(delay);
	}

	fn exchange(state: &mut State, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
		state.frames.push(Frame { tx: tx.to_vec() });

		let address = tx[0];
		if address & READ_FLAG != 0 {
			if state.failing_reads.contains(&address) {
				return Err(io::Error::new(ErrorKind::TimedOut, "Injected read failure"));
			}

			rx[0] = 0;
			for (i, byte) in rx.iter_mut().enumerate().skip(1) {
				*byte = state.registers[(address as usize + i - 1) & 0xFF];
			}
		} else {
			for pair in tx.chunks(2) {
				// In SPI mode the register address is sent without its top bit
				let register = pair[0] | READ_FLAG;

				if state.failing_writes.contains(&register) {
					return Err(io::Error::new(ErrorKind::TimedOut, "Injected write failure"));
				}

				if let Some(&value) = pair.get(1) {
					if register == registers::RESET && value == SOFT_RESET {
						state.registers[registers::CTRL_MEAS as usize] = 0;
						state.registers[registers::CONFIG as usize] = 0;
					} else {
						state.registers[register as usize] = value;
					}
				}
			}
		}

		Ok(())
	}
}

impl SpiBus for MockBus {
	fn configure_bus(&mut self, settings: &BusSettings) -> io::Result<()> {
		let mut state = self.state();
		if state.failing_setup {
			return Err(io::Error::new(ErrorKind::Other, "Injected setup failure"));
		}

		state.bus_settings = Some(*settings);
		Ok(())
	}

	fn transfer_full_duplex(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
		assert_eq!(tx.len(), rx.len(), "full-duplex buffers must have the same length");
		let id = thread::current().id();

		let delay = {
			let mut state = self.state();
			state.events.push(Event::Begin(id));
			state.transfer_delay
		};

		match delay {
			Some(delay) => thread::sleep(delay),
			None => thread::yield_now(),
		}

		let mut state = self.state();
		let result = Self::exchange(&mut state, tx, rx);
		state.events.push(Event::End(id));
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn raw_sample_layout() {
		let bus = MockBus::blank();
		bus.set_raw_sample(DATASHEET_RAW_PRESSURE, DATASHEET_RAW_TEMPERATURE);

		let data: Vec<u8> = (0xF7..=0xFC).map(|r| bus.register(r)).collect();
		assert_eq!(data, vec![0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00]);
	}

	#[test]
	fn soft_reset_clears_control_registers() {
		let mut bus = MockBus::bmp280();
		let mut rx = [0u8; 2];

		bus.transfer_full_duplex(&[0x74, 0x2F], &mut rx).unwrap();
		assert_eq!(bus.register(0xF4), 0x2F);

		bus.transfer_full_duplex(&[0x60, 0xB6], &mut rx).unwrap();
		assert_eq!(bus.register(0xF4), 0);
		assert_eq!(bus.register(0xE0), 0);
	}

	#[test]
	fn every_transfer_has_matching_boundaries() {
		let mut bus = MockBus::bmp280();
		let mut rx = [0u8; 2];
		bus.transfer_full_duplex(&[0xD0, 0x00], &mut rx).unwrap();

		let id = thread::current().id();
		assert_eq!(bus.events(), vec![Event::Begin(id), Event::End(id)]);
		assert_eq!(rx[1], 0x58);
	}
}
