use std::{error, fmt, io};

/// Errors reported by the BMP280 core.
#[derive(Debug)]
pub enum Error {
	/// The SPI transaction failed (partial transfer, timeout, device not responding).
	Bus(io::Error),

	/// The identity register did not hold the BMP280 chip ID.
	IdentityMismatch { found: u8 },

	/// The calibration block could not be read. Nothing was committed.
	CalibrationRead(io::Error),

	/// Writing `ctrl_meas` or `config` failed.
	ConfigurationWrite { register: u8, source: io::Error },

	/// A device property is present but cannot be read as the expected type.
	InvalidProperty { key: String, value: String },

	/// The bring-up sequence was run again after one of its steps had failed.
	/// The cause was reported by the failing step.
	BringUpAborted,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Bus(e) => write!(f, "SPI transaction failed: {}", e),
			Error::IdentityMismatch { found } => write!(f,
				"Unexpected chip ID 0x{:02x} (expected 0x{:02x})", found, crate::constants::CHIP_ID),
			Error::CalibrationRead(e) => write!(f, "Failed to read calibration data: {}", e),
			Error::ConfigurationWrite { register, source } => write!(f,
				"Failed to write configuration register 0x{:02x}: {}", register, source),
			Error::InvalidProperty { key, value } => write!(f,
				"Unable to read <{}> property value {:?}", key, value),
			Error::BringUpAborted => write!(f, "Bring-up already failed, start a new sequence"),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::Bus(e) | Error::CalibrationRead(e) => Some(e),
			Error::ConfigurationWrite { source, .. } => Some(source),
			Error::IdentityMismatch { .. } | Error::InvalidProperty { .. } | Error::BringUpAborted => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Error::Bus(e)
	}
}

impl Error {
	/// The underlying bus error, if any.
	pub fn io_error(&self) -> Option<&io::Error> {
		match self {
			Error::Bus(e) | Error::CalibrationRead(e) => Some(e),
			Error::ConfigurationWrite { source, .. } => Some(source),
			_ => None,
		}
	}

	/// Strips the step-specific wrapping so a failed bus access reads as a plain bus error.
	pub(crate) fn into_io_error(self) -> io::Error {
		match self {
			Error::Bus(e) | Error::CalibrationRead(e) => e,
			Error::ConfigurationWrite { source, .. } => source,
			other => io::Error::new(io::ErrorKind::Other, other.to_string()),
		}
	}
}
