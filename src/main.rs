//! # ESC Telemetry Monitor
//!
//! Acquire ESC telemetry over a serial link: KISS polling and Hobbywing V4
//! streaming.
//!
//! This application runs the acquisition core against a real serial port and
//! periodically emits the combined telemetry record as a JSON log line.

use anyhow::Result;
use serde::Serialize;
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, info, warn};

mod config;
mod error;
mod motor;
mod protocol;
mod sensor;
mod serial;
mod telemetry;

use config::Config;
use motor::FixedMotorDriver;
use sensor::{rpm_to_mechanical, EscSensor, SensorCounters};
use serial::EscSerial;
use telemetry::{SampleSlot, TelemetrySample};

/// Acquisition tick rate in Hz
const TICK_RATE_HZ: u32 = 100;

/// One JSON line emitted per snapshot interval
#[derive(Serialize)]
struct Snapshot<'a> {
    timestamp: String,
    valid: bool,
    mechanical_rpm: i32,
    combined: &'a TelemetrySample,
    counters: SensorCounters,
}

/// Renders the combined record as a JSON line, `None` while no protocol is
/// configured or serialization fails
fn snapshot_json(sensor: &EscSensor, pole_count: u8) -> Option<String> {
    let combined = sensor.sample(SampleSlot::Combined)?;
    let snapshot = Snapshot {
        timestamp: chrono::Utc::now().to_rfc3339(),
        valid: sensor.is_sample_valid(SampleSlot::Combined),
        mechanical_rpm: rpm_to_mechanical(i32::from(combined.rpm), pole_count),
        combined,
        counters: sensor.counters(),
    };
    serde_json::to_string(&snapshot).ok()
}

/// Main entry point for the ESC telemetry monitor
///
/// Initializes the application and runs the acquisition loop that ticks the
/// sensor at 100Hz and logs combined telemetry snapshots.
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (path from the first argument, or
///      `config/default.toml`)
///    - Open the telemetry serial port at the protocol's fixed baud rate;
///      an unavailable port leaves the sensor inactive instead of aborting
///
/// 2. **Main Loop**
///    - Tick the sensor at 100Hz with a monotonic microsecond clock
///    - Emit a combined-record JSON snapshot every snapshot interval
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop the acquisition loop
///    - Log the final diagnostic counters
///    - Clean exit
///
/// # Errors
///
/// Returns error if:
/// - The configuration file cannot be read or fails validation
///
/// # Examples
///
/// Run the application:
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO esc_telemetry: ESC Telemetry v0.1.0 starting...
/// INFO esc_telemetry::serial: Successfully opened telemetry port at /dev/ttyUSB0
/// INFO esc_telemetry: Starting acquisition loop at 100Hz (kiss, 4 motors)
/// INFO esc_telemetry: telemetry {"timestamp":"...","valid":true,...}
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("ESC Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    let motors = FixedMotorDriver::new(config.esc.motor_count);
    let mut sensor = EscSensor::new(config.esc.protocol, Box::new(motors));

    // The port may be unplugged; the sensor then reports inactive instead of
    // taking the process down
    if let Some(baud) = config.esc.protocol.baud() {
        match EscSerial::open(&config.serial.port, baud) {
            Ok(port) => {
                info!(
                    "ESC telemetry on {} at {} baud{}",
                    port.device_path(),
                    port.baud(),
                    if config.serial.half_duplex { ", half-duplex pad" } else { "" }
                );
                sensor.attach_link(Box::new(port.into_link()));
            }
            Err(e) => {
                warn!("Telemetry port unavailable, sensor stays inactive: {}", e);
            }
        }
    } else {
        info!("ESC telemetry disabled by configuration");
    }

    // Create 100Hz interval (10ms period)
    let period_ms = 1000 / TICK_RATE_HZ;
    let mut tick_interval = interval(Duration::from_millis(u64::from(period_ms)));
    let ticks_per_snapshot =
        (config.monitor.snapshot_interval_ms / u64::from(period_ms)).max(1);

    info!(
        "Starting acquisition loop at {}Hz ({:?}, {} motors)",
        TICK_RATE_HZ, config.esc.protocol, config.esc.motor_count
    );
    info!("Press Ctrl+C to exit");

    let started = Instant::now();
    let mut tick_count: u64 = 0;

    // Main acquisition loop
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let now_us = started.elapsed().as_micros() as u64;
                sensor.tick(now_us);
                tick_count += 1;

                if tick_count % ticks_per_snapshot == 0 {
                    match snapshot_json(&sensor, config.esc.motor_pole_count) {
                        Some(json) => info!("telemetry {}", json),
                        None => debug!("no combined record to snapshot"),
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let counters = sensor.counters();
    info!(
        "Ticks run: {}, frames decoded: {}, timeouts: {}, crc errors: {}, resyncs: {}",
        tick_count,
        counters.frames_decoded,
        counters.timeouts,
        counters.crc_errors,
        counters.resync_events
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::EscProtocol;
    use motor::MockMotorDriver;

    #[test]
    fn test_tick_rate_constant() {
        // The freshness rules assume one age unit per 10ms tick
        assert_eq!(TICK_RATE_HZ, 100);
        let period_ms = 1000 / TICK_RATE_HZ;
        assert_eq!(period_ms, 10, "Period should be 10ms at 100Hz");
    }

    #[test]
    fn test_snapshot_cadence_calculation() {
        let period_ms = u64::from(1000 / TICK_RATE_HZ);
        assert_eq!((1000u64 / period_ms).max(1), 100);
        // Sub-period intervals still snapshot every tick
        assert_eq!((5u64 / period_ms).max(1), 1);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut motors = MockMotorDriver::new();
        motors.expect_motor_count().return_const(4usize);
        let sensor = EscSensor::new(EscProtocol::Kiss, Box::new(motors));

        let json = snapshot_json(&sensor, 14).unwrap();
        assert!(json.contains("\"timestamp\""));
        assert!(json.contains("\"valid\":false"));
        assert!(json.contains("\"voltage\""));
        assert!(json.contains("\"frames_decoded\""));
    }

    #[test]
    fn test_snapshot_absent_without_protocol() {
        let sensor = EscSensor::new(EscProtocol::None, Box::new(MockMotorDriver::new()));
        assert!(snapshot_json(&sensor, 14).is_none());
    }
}
