use crossbeam_channel::{Receiver, Sender};
use std::{error::Error, thread, time::Duration};

/// Controllers that import external data.
pub trait InputController
where
	Self: Sized + Send + 'static,
{
	type Input: Send + 'static;

	/// Minimum duration to wait between two successive `read_input` calls.
	fn delay(&self) -> Option<Duration>;

	/// Number of failed reads in a row after which the loop gives up.
	fn max_consecutive_failures(&self) -> Option<u32>;

	fn read_input(&mut self) -> Result<Self::Input, Box<dyn Error>>;

	/// Returns once the receiving side hung up or too many reads failed in a row.
	fn read_loop(&mut self, input_sender: Sender<Self::Input>) {
		let mut consecutive_failures = 0;

		loop {
			match self.read_input() {
				Ok(input) => {
					consecutive_failures = 0;

					if input_sender.send(input).is_err() {
						debug!("Input receiver disconnected");
						return;
					}
				}
				Err(e) => {
					consecutive_failures += 1;
					error!("{}", e);

					if let Some(max) = self.max_consecutive_failures() {
						if consecutive_failures >= max {
							error!("Giving up after {} consecutive failures", consecutive_failures);
							return;
						}
					}
				}
			}

			if let Some(delay) = self.delay() {
				thread::sleep(delay);
			}
		}
	}

	/// Spawns a thread running `read_loop`. It is expected that the input controller is ready to
	/// read when spawned, i.e. that the initialization (if any) is done.
	fn spawn(mut self, input_sender: Sender<Self::Input>) -> thread::JoinHandle<()> {
		thread::spawn(move || self.read_loop(input_sender))
	}
}

/// Controllers that export data to external devices.
pub trait OutputController<T> {
	fn write_output(&mut self, output: T) -> Result<(), Box<dyn Error>>;

	/// Writes received outputs until the sender hangs up or `limit` outputs were written.
	/// Returns the number of outputs written.
	fn write_loop(&mut self, output_receiver: Receiver<T>, limit: Option<usize>) -> usize {
		let mut written = 0;

		if limit == Some(0) {
			return written;
		}

		for output in output_receiver.iter() {
			match self.write_output(output) {
				Ok(()) => written += 1,
				Err(e) => error!("{}", e),
			}

			if limit.map_or(false, |limit| written >= limit) {
				break;
			}
		}

		written
	}
}
