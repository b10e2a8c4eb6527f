use std::path::PathBuf;

/// Talk to the processors of a FAST pinball controller.
///
/// Driver numbers are given in hexadecimal, like they appear in the protocol.
#[derive(clap::Parser)]
#[command(version)]
pub struct Options {
	/// Print more messages, use twice to include raw serial data.
	#[arg(long, short, global = true)]
	#[arg(action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// The serial port of the processor to talk to.
	#[arg(long, short, global = true)]
	#[cfg_attr(target_os = "windows", arg(default_value = "COM1"))]
	#[cfg_attr(not(target_os = "windows"), arg(default_value = "/dev/ttyACM0"))]
	pub serial_port: String,

	/// The baud rate of the serial port.
	#[arg(long, short, global = true)]
	#[arg(default_value = "921600")]
	pub baud_rate: u32,

	/// The maximum number of unacknowledged commands, 0 to disable flow control.
	#[arg(long, global = true)]
	#[arg(default_value = "0")]
	pub max_in_flight: usize,

	/// Keep trying to open the serial port until it becomes available.
	#[arg(long, global = true)]
	pub retry: bool,

	/// Log all received data with a hex dump.
	#[arg(long, global = true)]
	pub debug: bool,

	/// Keep a hardware watchdog with this timeout in milliseconds alive.
	#[arg(long, global = true)]
	#[arg(value_name = "MS")]
	pub watchdog: Option<u64>,

	/// Address drivers on the I/O network (DN/TN) instead of the local board (DL/TL).
	#[arg(long, global = true)]
	pub network: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
	/// List the available serial ports.
	ListPorts,

	/// Identify the processor on the serial port.
	Id,

	/// Send raw commands and print the replies.
	Send {
		/// The commands to send, without the trailing carriage return.
		#[arg(value_name = "COMMAND")]
		#[arg(required = true)]
		commands: Vec<String>,

		/// How long to wait for replies after the last command.
		#[arg(long, value_name = "MS")]
		#[arg(default_value = "500")]
		wait: u64,
	},

	/// Print all messages from the processor.
	Monitor {
		/// Stop after this many seconds instead of running until the port closes.
		#[arg(long, value_name = "SECONDS")]
		duration: Option<u64>,
	},

	/// Reset a driver to an unconfigured state.
	Reset {
		/// The driver to reset.
		#[arg(value_name = "DRIVER", value_parser = parse_driver_number)]
		driver: u8,
	},

	/// Pulse a driver once.
	Pulse {
		/// The driver to pulse.
		#[arg(value_name = "DRIVER", value_parser = parse_driver_number)]
		driver: u8,

		#[command(flatten)]
		pulse: PulseOptions,
	},

	/// Turn a driver on until it is disabled.
	Enable {
		/// The driver to enable.
		#[arg(value_name = "DRIVER", value_parser = parse_driver_number)]
		driver: u8,

		#[command(flatten)]
		pulse: PulseOptions,

		/// The hold power between 0.0 and 1.0.
		#[arg(long, value_name = "POWER")]
		#[arg(default_value = "0.0")]
		hold_power: f64,

		/// Enforce a recycle time after the driver fired.
		#[arg(long)]
		recycle: bool,
	},

	/// Turn a driver off.
	Disable {
		/// The driver to disable.
		#[arg(value_name = "DRIVER", value_parser = parse_driver_number)]
		driver: u8,
	},

	/// Write shell completions to a file or stdout.
	ShellCompletion {
		/// The shell for which to generate completions.
		#[arg(long)]
		shell: clap_complete::Shell,

		/// The file to write the generated completion file to.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
}

#[derive(clap::Args)]
pub struct PulseOptions {
	/// The pulse duration in milliseconds.
	#[arg(long, value_name = "MS")]
	#[arg(default_value = "10")]
	pub pulse_ms: u32,

	/// The pulse power between 0.0 and 1.0.
	#[arg(long, value_name = "POWER")]
	#[arg(default_value = "1.0")]
	pub power: f64,
}

fn parse_driver_number(data: &str) -> Result<u8, String> {
	let digits = data.strip_prefix("0x").or_else(|| data.strip_prefix("0X")).unwrap_or(data);
	u8::from_str_radix(digits, 16).map_err(|_| format!("invalid driver number: expected a hexadecimal number in the range 00..FF, got {:?}", data))
}
