use chrono::NaiveDateTime;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::{
	collections::VecDeque,
	fs::{File, OpenOptions},
	io,
	io::Write,
	path::Path,
	thread,
	thread::JoinHandle,
	time::{Duration, Instant},
};

lazy_static! {
	static ref BLACK_BOX_CHANNEL: (Sender<Message>, Receiver<Message>) = unbounded::<Message>();
	static ref BLACK_BOX_LOGGER: BlackBoxLogger = BlackBoxLogger {
		start_instant: Instant::now()
	};
}

enum Message {
	Log(String),
	Flush,
	/// Flush, then acknowledge on the given channel.
	Sync(Sender<()>),
}

/// Session recorder: every log record ends up in a timestamped file and on stderr.
pub struct BlackBox {
	file: File,
	buffer: VecDeque<String>,
}

impl BlackBox {
	/// Creates `<directory>/<prefix>_<hour>-<minute>-<second>_<day>-<month>-<year>.log`.
	pub fn new(directory: &Path, prefix: &str) -> Result<Self, io::Error> {
		let now = chrono::offset::Local::now().naive_local();

		let file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.open(directory.join(log_file_name(prefix, &now)))?;

		Ok(BlackBox {
			buffer: VecDeque::<String>::new(),
			file,
		})
	}

	fn try_flush(&mut self) {
		if let Err(e) = self.flush() {
			self.buffer
				.push_back(format!("Failed to flush black box: {}", e));
		}
	}

	fn flush(&mut self) -> Result<(), io::Error> {
		while let Some(message) = self.buffer.pop_front() {
			eprintln!("{}", message);
			writeln!(self.file, "{}", message)?;
		}
		self.file.flush()
	}

	fn receive_loop(&mut self) {
		const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

		while let Ok(message) = BLACK_BOX_CHANNEL.1.recv_timeout(RECEIVE_TIMEOUT) {
			match message {
				Message::Log(content) => self.buffer.push_back(content),
				Message::Flush => self.try_flush(),
				Message::Sync(ack) => {
					self.try_flush();
					let _ = ack.send(());
				}
			}

			const MAX_BUFFER_LEN: usize = 8;
			if self.buffer.len() > MAX_BUFFER_LEN {
				self.try_flush();
			}
		}

		if !self.buffer.is_empty() {
			self.try_flush();
		}
	}

	/// Installs the global logger and starts the recorder thread.
	pub fn spawn(mut self, level_filter: LevelFilter) -> Result<JoinHandle<()>, SetLoggerError> {
		log::set_logger(&*BLACK_BOX_LOGGER)
			.map(|()| log::set_max_level(level_filter))?;

		Ok(thread::spawn(move || loop {
			self.receive_loop()
		}))
	}

	/// Waits until every record sent so far has been written, at most `timeout`.
	pub fn sync(timeout: Duration) -> bool {
		let (ack_sender, ack_receiver) = bounded::<()>(1);

		BLACK_BOX_CHANNEL.0.send(Message::Sync(ack_sender)).is_ok()
			&& ack_receiver.recv_timeout(timeout).is_ok()
	}
}

pub fn log_file_name(prefix: &str, time: &NaiveDateTime) -> String {
	format!("{}_{}.log", prefix, time.format("%H-%M-%S_%d-%m-%Y"))
}

/// `[seconds since start][level][module] message`, with the source location for errors.
pub fn format_record(record: &Record, elapsed: Duration) -> String {
	if record.level() == Level::Error {
		format!(
			"[{:.3}][{:?}][{}] {} ({}:{})",
			elapsed.as_secs_f32(),
			record.level(),
			record.module_path_static().unwrap_or("unknown"),
			record.args(),
			record.file_static().unwrap_or("unknown"),
			record.line().unwrap_or(0)
		)
	} else {
		format!(
			"[{:.3}][{:?}][{}] {}",
			elapsed.as_secs_f32(),
			record.level(),
			record.module_path_static().unwrap_or("unknown"),
			record.args(),
		)
	}
}

struct BlackBoxLogger {
	start_instant: Instant,
}

impl Log for BlackBoxLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			let formatted = format_record(record, Instant::now() - self.start_instant);
			let _ = BLACK_BOX_CHANNEL.0.send(Message::Log(formatted));
		}
	}

	fn flush(&self) {
		let _ = BLACK_BOX_CHANNEL.0.send(Message::Flush);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;

	#[test]
	fn file_name_carries_the_session_start() {
		let time = NaiveDate::from_ymd_opt(2020, 1, 2)
			.and_then(|date| date.and_hms_opt(3, 4, 5))
			.unwrap();

		assert_eq!(log_file_name("bmp280", &time), "bmp280_03-04-05_02-01-2020.log");
	}

	#[test]
	fn info_records_have_no_location() {
		let formatted = format_record(&Record::builder()
										  .args(format_args!("Chip ID: 0x{:02x}", 0x58))
										  .level(Level::Info)
										  .module_path_static(Some("bmp280::sequencer"))
										  .build(),
									  Duration::from_millis(1500));

		assert_eq!(formatted, "[1.500][Info][bmp280::sequencer] Chip ID: 0x58");
	}

	#[test]
	fn error_records_have_a_location() {
		let formatted = format_record(&Record::builder()
										  .args(format_args!("SPI transaction failed"))
										  .level(Level::Error)
										  .module_path_static(Some("station"))
										  .file_static(Some("station/src/main.rs"))
										  .line(Some(42))
										  .build(),
									  Duration::from_millis(250));

		assert_eq!(formatted, "[0.250][Error][station] SPI transaction failed (station/src/main.rs:42)");
	}
}
