use spidev::{Spidev, SpidevOptions, SpiModeFlags, SpidevTransfer};
use std::io::{self, ErrorKind};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::*;
use crate::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SpiMode {
	Mode0,
	Mode1,
	Mode2,
	Mode3,
}

/// Bus-level parameters negotiated before the first register access.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BusSettings {
	pub max_speed_hz: u32,
	pub bits_per_word: u8,
	pub mode: SpiMode,
}

impl Default for BusSettings {
	fn default() -> Self {
		Self {
			max_speed_hz: DEFAULT_MAX_SPEED_HZ,
			bits_per_word: DEFAULT_BITS_PER_WORD,
			mode: SpiMode::Mode0,
		}
	}
}

/// Register-level access to the sensor. One call is one bus transaction.
pub trait Transport {
	fn setup(&mut self, settings: &BusSettings) -> Result<(), Error>;

	/// Burst read starting at `address`, filling the whole `buffer`.
	fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error>;

	fn write_register(&mut self, address: u8, value: u8) -> Result<(), Error>;
}

/// Raw full-duplex SPI: `rx` is clocked in while `tx` is clocked out, within one chip select.
pub trait SpiBus {
	fn configure_bus(&mut self, settings: &BusSettings) -> io::Result<()>;

	fn transfer_full_duplex(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()>;
}

impl SpiBus for Spidev {
	fn configure_bus(&mut self, settings: &BusSettings) -> io::Result<()> {
		let mode = match settings.mode {
			SpiMode::Mode0 => SpiModeFlags::SPI_MODE_0,
			SpiMode::Mode1 => SpiModeFlags::SPI_MODE_1,
			SpiMode::Mode2 => SpiModeFlags::SPI_MODE_2,
			SpiMode::Mode3 => SpiModeFlags::SPI_MODE_3,
		};

		let options = SpidevOptions::new()
			.bits_per_word(settings.bits_per_word)
			.max_speed_hz(settings.max_speed_hz)
			.mode(mode)
			.build();

		self.configure(&options)
	}

	#[inline(always)]
	fn transfer_full_duplex(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
		self.transfer(&mut SpidevTransfer::read_write(tx, rx))
	}
}

/// BMP280 register framing over any full-duplex SPI bus.
#[derive(Debug)]
pub struct RegisterBus<B> {
	bus: B,
}

impl RegisterBus<Spidev> {
	pub fn open(path: &str) -> Result<Self, io::Error> {
		Ok(Self::new(Spidev::open(path)?))
	}
}

impl<B: SpiBus> RegisterBus<B> {
	pub fn new(bus: B) -> Self {
		Self { bus }
	}

	pub fn into_inner(self) -> B {
		self.bus
	}
}

impl<B: SpiBus> Transport for RegisterBus<B> {
	fn setup(&mut self, settings: &BusSettings) -> Result<(), Error> {
		self.bus.configure_bus(settings).map_err(Error::Bus)
	}

	fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error> {
		if buffer.is_empty() {
			return Err(Error::Bus(io::Error::new(ErrorKind::InvalidInput,
												 "Register read of zero bytes")));
		}

		let mut tx_buffer = vec![0u8; buffer.len() + 1];
		let mut rx_buffer = vec![0u8; buffer.len() + 1];
		tx_buffer[0] = address | READ_FLAG;

		self.bus.transfer_full_duplex(&tx_buffer, &mut rx_buffer)?;

		buffer.copy_from_slice(&rx_buffer[1..]);
		Ok(())
	}

	fn write_register(&mut self, address: u8, value: u8) -> Result<(), Error> {
		let mut rx_buffer = [0u8; 2];

		self.bus.transfer_full_duplex(&[address & WRITE_MASK, value], &mut rx_buffer)?;

		Ok(())
	}
}

/// Cloneable handle serializing every transaction of the wrapped transport behind one lock.
#[derive(Debug)]
pub struct SharedTransport<T> {
	inner: Arc<Mutex<T>>,
}

impl<T> Clone for SharedTransport<T> {
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}

impl<T: Transport> SharedTransport<T> {
	pub fn new(transport: T) -> Self {
		Self { inner: Arc::new(Mutex::new(transport)) }
	}

	fn lock(&self) -> Result<MutexGuard<'_, T>, Error> {
		self.inner
			.lock()
			.map_err(|_| Error::Bus(io::Error::new(ErrorKind::Other, "Bus lock poisoned")))
	}
}

impl<T: Transport> Transport for SharedTransport<T> {
	fn setup(&mut self, settings: &BusSettings) -> Result<(), Error> {
		self.lock()?.setup(settings)
	}

	fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error> {
		self.lock()?.read_registers(address, buffer)
	}

	fn write_register(&mut self, address: u8, value: u8) -> Result<(), Error> {
		self.lock()?.write_register(address, value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{Frame, MockBus};

	#[test]
	fn read_sets_read_flag_and_skips_address_byte() {
		let bus = MockBus::bmp280();
		let mut transport = RegisterBus::new(bus.clone());

		let mut id = [0u8; 1];
		transport.read_registers(0xD0, &mut id).unwrap();

		assert_eq!(id[0], 0x58);
		assert_eq!(bus.frames(), vec![Frame { tx: vec![0xD0, 0x00] }]);
	}

	#[test]
	fn write_clears_read_flag() {
		let bus = MockBus::bmp280();
		let mut transport = RegisterBus::new(bus.clone());

		transport.write_register(0xF4, 0x2F).unwrap();

		assert_eq!(bus.frames(), vec![Frame { tx: vec![0x74, 0x2F] }]);
		assert_eq!(bus.register(0xF4), 0x2F);
	}

	#[test]
	fn empty_read_is_rejected_without_bus_traffic() {
		let bus = MockBus::bmp280();
		let mut transport = RegisterBus::new(bus.clone());

		match transport.read_registers(0xF7, &mut []) {
			Err(Error::Bus(e)) => assert_eq!(e.kind(), ErrorKind::InvalidInput),
			other => panic!("unexpected result {:?}", other),
		}
		assert!(bus.frames().is_empty());
	}

	#[test]
	fn bus_failure_is_reported_as_bus_error() {
		let bus = MockBus::bmp280();
		bus.fail_reads_at(0xF7);
		let mut transport = RegisterBus::new(bus);

		let mut data = [0u8; 6];
		assert!(matches!(transport.read_registers(0xF7, &mut data), Err(Error::Bus(_))));
	}

	#[test]
	fn setup_forwards_bus_settings() {
		let bus = MockBus::bmp280();
		let mut transport = RegisterBus::new(bus.clone());

		let settings = BusSettings { max_speed_hz: 100_000, ..BusSettings::default() };
		transport.setup(&settings).unwrap();

		assert_eq!(bus.bus_settings(), Some(settings));
	}
}
