#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

use crossbeam_channel::unbounded;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use std::{io, thread};

use black_box::BlackBox;
use bmp280::{Bmp280, DeviceProperties, Reading, RegisterBus, Settings, Transport};

use crate::input_controllers::bmp280_input_controller::Bmp280InputController;
use crate::output_controllers::report_output_controller::ReportOutputController;
use crate::station_config::{StationConfig, TryIntoLevelFilter};
use crate::traits::{InputController, OutputController};

mod input_controllers;
mod output_controllers;
mod station_config;
mod traits;

fn main() -> Result<(), Box<dyn Error>> {
	// Command line arguments
	const CONFIG_ARG: &str = "config";
	const DEVICE_ARG: &str = "device";
	const COUNT_ARG: &str = "count";
	const SAVE_DEFAULT_CONFIG_ARG: &str = "save-default-config";

	let args = clap::Command::new("BMP280 station")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Reads temperature and pressure from a BMP280 over spidev")
		.arg(clap::Arg::new(CONFIG_ARG)
			.long("config")
			.short('c')
			.value_name("FILE")
			.takes_value(true)
			.default_value("bmp280.json")
			.help("JSON configuration file"))
		.arg(clap::Arg::new(DEVICE_ARG)
			.long("device")
			.short('d')
			.value_name("PATH")
			.takes_value(true)
			.help("spidev node, overrides the configuration"))
		.arg(clap::Arg::new(COUNT_ARG)
			.long("count")
			.short('n')
			.value_name("N")
			.takes_value(true)
			.help("Stop after N readings"))
		.arg(clap::Arg::new(SAVE_DEFAULT_CONFIG_ARG)
			.long("save-default-config")
			.takes_value(false)
			.help("Write the default configuration to the configuration file and exit"))
		.get_matches();

	let config_path = Path::new(args.value_of(CONFIG_ARG).unwrap_or("bmp280.json"));

	if args.is_present(SAVE_DEFAULT_CONFIG_ARG) {
		station_config::save(&StationConfig::default(), config_path)?;
		return Ok(());
	}

	let count = match args.value_of(COUNT_ARG) {
		Some(count) => Some(count.parse::<usize>()
			.map_err(|e| anyhow!("Invalid count '{}': {}", count, e))?),
		None => None,
	};

	// Configuration
	let loaded_config = station_config::read(config_path)?;
	let config_missing = loaded_config.is_none();
	let mut config = loaded_config.unwrap_or_default();

	if let Some(device) = args.value_of(DEVICE_ARG) {
		config.device_path = device.to_string();
	}

	// Log
	install_black_box(&config)?;

	info!("BMP280 station {}", env!("CARGO_PKG_VERSION"));

	if config_missing {
		warn!("{} not found, using default configuration", config_path.display());
	}

	let result = run(&config, count);

	if let Err(e) = &result {
		error!("{}", e);
	}

	BlackBox::sync(Duration::from_secs(1));

	result.map_err(|e| e.into())
}

fn install_black_box(config: &StationConfig) -> anyhow::Result<()> {
	let level_filter = config.log_level_filter
		.try_into_level_filter()
		.map_err(|_| anyhow!("Failed to parse log level filter"))?;

	BlackBox::new(Path::new(&config.log_directory), "bmp280")?
		.spawn(level_filter)
		.map_err(|e| anyhow!("Failed to install logger: {}", e))?;

	Ok(())
}

fn run(config: &StationConfig, count: Option<usize>) -> anyhow::Result<()> {
	let settings = config.settings()?;
	let properties = config.device_properties();
	let device_path = config.device_path.clone();

	let bmp280 = bring_up_with_retries(
		|| RegisterBus::open(&device_path),
		&properties,
		&settings,
		config.bring_up_attempts,
		config.bring_up_retry_delay())?;

	let (reading_sender, reading_receiver) = unbounded::<Reading>();

	let sampler = Bmp280InputController::new(bmp280, config.sample_period(), config.max_consecutive_failures)
		.spawn(reading_sender);

	let written = ReportOutputController::new(io::stdout())
		.write_loop(reading_receiver, count);

	info!("{} readings written", written);

	if count.map_or(true, |count| written < count) {
		sampler.join().map_err(|_| anyhow!("Sampling thread panicked"))?;
		bail!("Sampling stopped after {} readings", written);
	}

	Ok(())
}

/// Opens a fresh transport for every attempt, so a failed bring-up never leaks into the next one.
fn bring_up_with_retries<T, F>(mut open: F,
							   properties: &DeviceProperties,
							   settings: &Settings,
							   attempts: u32,
							   retry_delay: Duration) -> anyhow::Result<Bmp280<T>>
	where T: Transport,
		  F: FnMut() -> io::Result<T> {
	let attempts = attempts.max(1);

	for attempt in 1..=attempts {
		let result = open()
			.map_err(anyhow::Error::from)
			.and_then(|transport| Bmp280::bring_up(transport, properties, settings.clone())
				.map_err(anyhow::Error::from));

		match result {
			Ok(bmp280) => return Ok(bmp280),
			Err(e) if attempt < attempts => {
				warn!("Bring-up attempt {}/{} failed: {}", attempt, attempts, e);
				thread::sleep(retry_delay);
			}
			Err(e) => return Err(e.context(format!("Bring-up failed after {} attempts", attempts))),
		}
	}

	unreachable!()
}
