//! ZAF CLI Client
//!
//! Command-line interface for sending single commands to the feeder board.

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use zaf::config::{DEFAULT_BAUD_RATE, DEFAULT_PORT};
use zaf::protocol::Command;
use zaf::{Config, Controller, DispenseOutcome};

/// ZAF CLI
#[derive(Parser, Debug)]
#[command(name = "zaf-cli")]
#[command(about = "CLI for the ZAF++ feeder board")]
#[command(version)]
struct Args {
    /// Serial port
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Read timeout in milliseconds
    #[arg(short, long, default_value = "2000")]
    timeout_ms: u64,

    /// Delay after opening the port, in milliseconds
    #[arg(long, default_value = "2000")]
    settle_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handshake with the board
    Ping,

    /// Dispense food and wait for completion
    Feed {
        /// Number of dispense cycles
        #[arg(short, long, default_value = "1")]
        cycles: u32,
    },

    /// Switch the rumble motor
    Rumble {
        state: Switch,
    },

    /// Drive a water pump
    Pump {
        /// Pump id (1 or 2)
        id: u8,

        /// PWM speed (0-255)
        speed: u8,

        /// 1 forward, -1 reverse, 0 stop
        #[arg(allow_hyphen_values = true)]
        direction: i8,
    },

    /// Send a raw protocol line and print the reply
    Raw {
        /// Command text, e.g. "PUMP:1:150:1"
        line: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,zaf=info"));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    // Validate before touching the port
    let command = match build_command(&args.command) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let config = Config::builder()
        .port(&args.port)
        .baud_rate(args.baud)
        .read_timeout_ms(args.timeout_ms)
        .settle_ms(args.settle_ms)
        .build();
    let mut controller = Controller::new(config);

    let report = controller.connect();
    if !report.connected {
        eprintln!(
            "error: {}",
            report.error.unwrap_or_else(|| "not connected".to_string())
        );
        std::process::exit(1);
    }

    let ok = match command {
        Command::Ping => {
            let verified = controller.ping();
            println!("{}", if verified { "PONG" } else { "no PONG" });
            verified
        }
        Command::Dispense { cycles } => print_dispense(controller.dispense_food(cycles)),
        other => {
            let reply = controller.send_command(&other);
            println!("{}", reply);
            !reply.is_empty()
        }
    };

    controller.disconnect();
    if !ok {
        std::process::exit(1);
    }
}

fn build_command(command: &Commands) -> zaf::Result<Command> {
    match command {
        Commands::Ping => Ok(Command::Ping),
        Commands::Feed { cycles } => Command::dispense(*cycles),
        Commands::Rumble { state } => Ok(Command::Rumble {
            on: matches!(state, Switch::On),
        }),
        Commands::Pump {
            id,
            speed,
            direction,
        } => Command::pump(*id, *speed, *direction),
        Commands::Raw { line } => line.parse(),
    }
}

fn print_dispense(outcome: DispenseOutcome) -> bool {
    for update in outcome.updates() {
        println!("  {}", update);
    }
    match &outcome {
        DispenseOutcome::Completed { .. } => println!("DISPENSE_COMPLETE"),
        DispenseOutcome::TimedOut { .. } => println!("timed out waiting for completion"),
        DispenseOutcome::NotAcknowledged { response } => {
            println!("not acknowledged: {:?}", response)
        }
        DispenseOutcome::Offline { reason } => println!("offline: {}", reason),
    }
    outcome.is_completed()
}
