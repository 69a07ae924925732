//! # bmp280
//!
//! BMP280 temperature and pressure sensor core over SPI: register framing, bring-up sequence,
//! calibration and the datasheet fixed-point compensation.
//!
//! # Examples
//! ```no_run
//! use bmp280::{Bmp280, DeviceProperties, RegisterBus, Settings};
//!
//! let transport = RegisterBus::open("/dev/spidev0.0").unwrap();
//! let mut bmp280 = Bmp280::bring_up(transport, &DeviceProperties::new(), Settings::standalone())
//!     .unwrap();
//!
//! let reading = bmp280.sample().unwrap();
//! print!("{}", reading);
//! ```

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

mod bmp280;
mod calibration;
mod compensation;
mod error;
mod properties;
mod reading;
mod sample;
mod sequencer;
mod settings;
mod transport;

#[allow(dead_code)]
mod registers;

#[allow(dead_code)]
mod constants;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::bmp280::Bmp280;
pub use calibration::Calibration;
pub use compensation::{compensate, compensate_pressure, compensate_temperature, FineTemperature};
pub use error::Error;
pub use properties::DeviceProperties;
pub use reading::{Reading, ReadingReport};
pub use sample::{read_raw, sample, RawSample};
pub use sequencer::{bring_up, BringUp, BringUpError, DeviceState, FailureReason};
pub use settings::{IdentityPolicy, IirFilter, Oversampling, PowerMode, Settings, StandbyTime};
pub use transport::{BusSettings, RegisterBus, SharedTransport, SpiBus, SpiMode, Transport};

pub const CHIP_ID: u8 = constants::CHIP_ID;
