use bmp280::{Reading, ReadingReport};
use std::error::Error;
use std::io::{self, Write};

use crate::traits::OutputController;

/// Streams every reading as a text report, followed by an empty line.
pub struct ReportOutputController<W> {
	writer: W,
}

impl<W: Write> ReportOutputController<W> {
	pub fn new(writer: W) -> Self {
		Self { writer }
	}

	pub fn into_inner(self) -> W {
		self.writer
	}
}

impl<W: Write> OutputController<Reading> for ReportOutputController<W> {
	fn write_output(&mut self, output: Reading) -> Result<(), Box<dyn Error>> {
		let mut report = ReadingReport::from(output);
		let written = io::copy(&mut report, &mut self.writer)?;
		trace!("Report: {} bytes", written);

		writeln!(self.writer)?;
		self.writer.flush()?;

		Ok(())
	}
}
