//! ZAF Hardware Check
//!
//! Walks the feeder's hardware map and exercises every output the firmware
//! can drive. Ctrl+C stops the walk between steps; the port is always
//! released before exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use zaf::config::DEFAULT_PORT;
use zaf::protocol::{PumpDirection, PumpId};
use zaf::{Config, Controller};

/// ZAF hardware check
#[derive(Parser, Debug)]
#[command(name = "zaf-check")]
#[command(about = "Exercise every output of the ZAF++ feeder board")]
#[command(version)]
struct Args {
    /// Serial port of the board
    #[arg(default_value = DEFAULT_PORT)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// Seconds each output stays on
    #[arg(short = 'd', long, default_value = "2")]
    on_secs: u64,
}

/// What kind of output a hardware entry is
#[derive(Debug, Clone, Copy)]
enum Output {
    /// Relay channel the firmware does not expose
    Relay,
    Rumble,
    Pump(PumpId),
}

struct HardwareEntry {
    name: &'static str,
    pin: u8,
    output: Output,
    desc: &'static str,
}

/// Board wiring, in test order
const HARDWARE_MAP: &[HardwareEntry] = &[
    HardwareEntry {
        name: "Servo Power Relay",
        pin: 22,
        output: Output::Relay,
        desc: "Gates 6V to Servo",
    },
    HardwareEntry {
        name: "Rumble Motor",
        pin: 23,
        output: Output::Rumble,
        desc: "Gates 5V to Rumble Motor",
    },
    HardwareEntry {
        name: "Valve 1",
        pin: 24,
        output: Output::Relay,
        desc: "Solenoid Valve Control",
    },
    HardwareEntry {
        name: "Valve 2",
        pin: 25,
        output: Output::Relay,
        desc: "Solenoid Valve Control",
    },
    HardwareEntry {
        name: "Valve 3",
        pin: 26,
        output: Output::Relay,
        desc: "Solenoid Valve Control",
    },
    HardwareEntry {
        name: "Valve 4",
        pin: 27,
        output: Output::Relay,
        desc: "Solenoid Valve Control",
    },
    HardwareEntry {
        name: "Pump 1",
        pin: 2,
        output: Output::Pump(PumpId::One),
        desc: "Water Pump 1",
    },
    HardwareEntry {
        name: "Pump 2",
        pin: 3,
        output: Output::Pump(PumpId::Two),
        desc: "Water Pump 2",
    },
];

/// Speed used when running a pump
const PUMP_TEST_SPEED: u8 = 150;

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zaf=info"));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    tracing::info!("Initializing ZAF controller on {}...", args.port);
    let config = Config::builder()
        .port(&args.port)
        .baud_rate(args.baud)
        .build();
    let mut controller = Controller::new(config);

    let report = controller.connect();
    if !report.connected {
        tracing::error!("Failed to connect to controller. Check connection and port.");
        std::process::exit(1);
    }

    let on_time = Duration::from_secs(args.on_secs);
    if run_checks(&mut controller, on_time, &interrupted) {
        tracing::info!("Hardware Check Complete.");
    } else {
        tracing::info!("Hardware check interrupted by user.");
    }

    tracing::info!("Cleaning up...");
    controller.disconnect();
}

/// Returns false if interrupted before the walk finished
fn run_checks(controller: &mut Controller, on_time: Duration, interrupted: &AtomicBool) -> bool {
    tracing::info!("Starting Hardware Check Sequence...");
    if !pause(Duration::from_secs(1), interrupted) {
        return false;
    }

    for entry in HARDWARE_MAP {
        tracing::info!("--- Testing {} (pin {}, {}) ---", entry.name, entry.pin, entry.desc);

        // Outputs are switched off even when interrupted mid-step
        let finished = match entry.output {
            Output::Rumble => {
                tracing::info!("Turning ON {}...", entry.name);
                controller.set_rumble_pack(true);
                let finished = pause(on_time, interrupted);
                tracing::info!("Turning OFF {}...", entry.name);
                controller.set_rumble_pack(false);
                finished
            }
            Output::Pump(id) => {
                tracing::info!(
                    "Running {} (ID: {}) Forward at Speed {}...",
                    entry.name,
                    id,
                    PUMP_TEST_SPEED
                );
                controller.control_pump(id, PUMP_TEST_SPEED, PumpDirection::Forward);
                let finished = pause(on_time, interrupted);
                tracing::info!("Stopping {}...", entry.name);
                controller.control_pump(id, 0, PumpDirection::Stop);
                finished
            }
            Output::Relay => {
                tracing::warn!(
                    "SKIPPING {}: Control not supported by current firmware.",
                    entry.name
                );
                true
            }
        };

        if !finished || !pause(Duration::from_millis(500), interrupted) {
            return false;
        }
    }

    true
}

/// Sleep in short slices; returns false as soon as Ctrl+C is seen
fn pause(duration: Duration, interrupted: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(50);
    let deadline = Instant::now() + duration;

    while !interrupted.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLICE.min(deadline - now));
    }
    false
}
