use clap::{Parser, Subcommand};
use std::time::Duration;

use a131ctl::frame::ChecksumPolicy;
use a131ctl::link::{DEFAULT_BAUD, Timing};
use a131ctl::status::StatusCheck;
use a131ctl::{DirectionControl, DriveConfig};

#[derive(Parser, Debug)]
#[command(name = "a131ctl", about = "A131 spindle inverter RS485 client")]
struct Args {
    /// Serial port path
    #[arg(
        long,
        value_name = "PORT",
        env = "A131_PORT",
        default_value = "/dev/ttyUSB0"
    )]
    port: String,

    /// Baud rate configured on the drive
    #[arg(long, value_name = "BAUD", env = "A131_BAUD", default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Upper bound for receiving one status frame
    #[arg(
        long,
        value_name = "MS",
        env = "A131_TIMEOUT_MS",
        default_value_t = 1000u64
    )]
    timeout_ms: u64,

    /// Adapter switches direction itself; leave RTS alone.
    #[arg(long, env = "A131_AUTO_DIRECTION")]
    auto_direction: bool,

    /// Send the constant 54 A9 trailer instead of a computed one.
    #[arg(long, env = "A131_LEGACY_CHECKSUM")]
    legacy_checksum: bool,

    /// Decode status frames without checking fixed bytes and trailer.
    #[arg(long, env = "A131_LENIENT")]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the spindle clockwise
    On,
    /// Stop the spindle
    Off,
    /// Set the target speed
    Speed {
        #[arg(value_name = "RPM")]
        rpm: u32,
    },
    /// Print the speed the drive is reporting
    Report,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = DriveConfig {
        port: args.port,
        direction: if args.auto_direction {
            DirectionControl::Auto
        } else {
            DirectionControl::Rts
        },
        timing: Timing {
            baud: args.baud,
            read_timeout: Duration::from_millis(args.timeout_ms),
            ..Timing::default()
        },
        policy: if args.legacy_checksum {
            ChecksumPolicy::Legacy
        } else {
            ChecksumPolicy::Fresh
        },
        check: if args.lenient {
            StatusCheck::Lenient
        } else {
            StatusCheck::Strict
        },
    };

    let spindle = match config.open() {
        Ok(spindle) => spindle,
        Err(e) => {
            eprintln!("Failed to open {}: {e}", config.port);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Command::On => spindle.turn_on(),
        Command::Off => spindle.turn_off(),
        Command::Speed { rpm } => spindle.set_speed(rpm),
        Command::Report => spindle.report_speed().map(|rpm| {
            println!("Current RPM: {rpm}");
        }),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
