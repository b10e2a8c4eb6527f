use fastpinball::{CommandPrefixes, Connection, ConnectionConfig, DriverSettings, Drivers, HoldSettings, PulseSettings, ReceivedMessage};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

mod logging;
mod options;

use options::{Command, Options, PulseOptions};

/// How long to show replies after a driver command.
const REPLY_WINDOW: Duration = Duration::from_millis(100);

#[tokio::main(flavor = "current_thread")]
async fn main() {
	if let Err(()) = do_main(clap::Parser::parse()).await {
		std::process::exit(1);
	}
}

async fn do_main(options: Options) -> Result<(), ()> {
	logging::init(module_path!(), options.verbose);
	match &options.command {
		Command::ListPorts => {
			let ports = serial2::SerialPort::available_ports().map_err(|e| log::error!("Failed to list serial ports: {}", e))?;
			if ports.is_empty() {
				log::info!("No serial ports found");
			}
			for port in ports {
				log::info!("{}", port.display());
			}
		},
		Command::Id => {
			let (connection, _messages) = connect(&options).await?;
			let identity = connection.identity();
			log::info!("Port: {}", connection.port());
			log::info!(" ├─ Processor: {}", identity.processor);
			log::info!(" ├─ Model: {}", identity.model);
			log::info!(" └─ Firmware: {}", identity.firmware);
			connection.shutdown().await;
		},
		Command::Send { commands, wait } => {
			let (connection, mut messages) = connect(&options).await?;
			for command in commands {
				log::debug!("Sending {}", command);
				connection.send(command.as_str()).map_err(|e| log::error!("Failed to send {}: {}", command, e))?;
			}
			print_messages(&mut messages, Duration::from_millis(*wait)).await;
			connection.shutdown().await;
		},
		Command::Monitor { duration } => {
			let (mut connection, mut messages) = connect(&options).await?;
			let monitor = async {
				while let Some(message) = messages.recv().await {
					print_message(&message);
				}
			};
			let deadline = async {
				match duration {
					Some(seconds) => tokio::time::sleep(Duration::from_secs(*seconds)).await,
					None => std::future::pending().await,
				}
			};
			tokio::select! {
				_ = monitor => (),
				_ = deadline => (),
				reason = connection.closed() => {
					log::error!("{}", reason);
					return Err(());
				},
			}
			connection.shutdown().await;
		},
		Command::Reset { driver } => {
			run_driver_command(&options, *driver, DriverSettings::default(), |driver, sender| {
				driver.reset(sender);
				Ok(())
			})
			.await?;
		},
		Command::Pulse { driver, pulse } => {
			let pulse = pulse_settings(pulse);
			run_driver_command(&options, *driver, DriverSettings::default(), |driver, sender| {
				driver.pulse(sender, pulse).map(|_| ())
			})
			.await?;
		},
		Command::Enable { driver, pulse, hold_power, recycle } => {
			let pulse = pulse_settings(pulse);
			let hold = HoldSettings {
				duration_ms: 0,
				power: *hold_power,
			};
			let settings = DriverSettings {
				recycle: *recycle,
				..DriverSettings::default()
			};
			run_driver_command(&options, *driver, settings, |driver, sender| driver.enable(sender, pulse, hold)).await?;
		},
		Command::Disable { driver } => {
			run_driver_command(&options, *driver, DriverSettings::default(), |driver, sender| {
				driver.disable(sender);
				Ok(())
			})
			.await?;
		},
		Command::ShellCompletion { shell, output } => {
			write_shell_completion(*shell, output.as_deref())?;
		},
	}

	Ok(())
}

async fn connect(options: &Options) -> Result<(Connection, mpsc::UnboundedReceiver<ReceivedMessage>), ()> {
	let config = ConnectionConfig::new(options.serial_port.as_str())
		.with_baud_rate(options.baud_rate)
		.with_max_in_flight(options.max_in_flight)
		.with_retry_open(options.retry)
		.with_watchdog(options.watchdog.map(Duration::from_millis))
		.with_debug(options.debug);
	log::debug!("Using serial port {} with baud rate {}", config.port, config.baud_rate);

	let (router, messages) = mpsc::unbounded_channel();
	let connection = Connection::open(&config, router, &mut ())
		.await
		.map_err(|e| log::error!("Failed to connect to {}: {}", config.port, e))?;
	Ok((connection, messages))
}

fn pulse_settings(options: &PulseOptions) -> PulseSettings {
	PulseSettings {
		duration_ms: options.pulse_ms,
		power: options.power,
	}
}

async fn run_driver_command<F>(options: &Options, number: u8, settings: DriverSettings, command: F) -> Result<(), ()>
where
	F: FnOnce(&mut fastpinball::Driver, &mut fastpinball::CommandSender) -> Result<(), fastpinball::ValueOutOfRange>,
{
	let (connection, mut messages) = connect(options).await?;
	let prefixes = if options.network {
		CommandPrefixes::NETWORK
	} else {
		CommandPrefixes::LOCAL
	};

	let mut drivers = Drivers::new(prefixes);
	let driver = drivers.add(number, settings);
	let mut sender = connection.sender();
	command(driver, &mut sender).map_err(|e| log::error!("Invalid driver command: {}", e))?;

	print_messages(&mut messages, REPLY_WINDOW).await;
	connection.shutdown().await;
	Ok(())
}

/// Print received messages until none arrived for `idle`.
async fn print_messages(messages: &mut mpsc::UnboundedReceiver<ReceivedMessage>, idle: Duration) {
	while let Ok(Some(message)) = tokio::time::timeout(idle, messages.recv()).await {
		print_message(&message);
	}
}

fn print_message(message: &ReceivedMessage) {
	log::info!("{}: {}", message.processor, message.message);
}

fn write_shell_completion(shell: clap_complete::Shell, path: Option<&Path>) -> Result<(), ()> {
	use clap::CommandFactory;
	use std::io::Write;

	let mut buffer = Vec::with_capacity(4 * 1024);

	let mut command = Options::command();
	clap_complete::generate(shell, &mut command, env!("CARGO_BIN_NAME"), &mut buffer);
	if !buffer.ends_with(b"\n") {
		buffer.push(b'\n');
	}

	let path = path.unwrap_or_else(|| Path::new("-"));
	if path == Path::new("-") {
		log::debug!("Writing shell completion for {} to stdout", shell);
		let stdout = std::io::stdout();
		stdout
			.lock()
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to stdout: {}", e))?;
	} else {
		log::debug!("Writing shell completion for {} to {}", shell, path.display());
		let mut output = std::fs::File::create(path).map_err(|e| log::error!("Failed to create {}: {}", path.display(), e))?;
		output
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to {}: {}", path.display(), e))?;
	}

	Ok(())
}
