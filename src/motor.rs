//! # Motor Driver Interface
//!
//! Seam between telemetry acquisition and the motor output layer. The
//! acquisition scheduler needs three things from whoever owns the motors:
//! how many there are, whether output is enabled at all, and a way to ask
//! one ESC for a telemetry frame. Everything else (mixing, DSHOT signalling,
//! arming logic) stays on the other side of this trait.

use tracing::trace;

/// Motor output layer as seen by telemetry acquisition
#[cfg_attr(test, mockall::automock)]
pub trait MotorDriver: Send {
    /// Number of motors being driven
    fn motor_count(&self) -> usize;

    /// Whether motor output is enabled. Acquisition idles while it is not.
    fn output_enabled(&self) -> bool;

    /// Signals the given motor's ESC to transmit one telemetry frame.
    fn request_telemetry(&mut self, motor: usize);
}

/// Driver with a fixed motor count and a switchable output flag.
///
/// Stands in for a real mixer in the monitor binary: telemetry requests are
/// logged rather than signalled, which suits bench setups where the ESC
/// streams on its own or the request line is driven externally.
#[derive(Debug)]
pub struct FixedMotorDriver {
    motor_count: usize,
    output_enabled: bool,
}

impl FixedMotorDriver {
    /// Creates a driver with output enabled.
    ///
    /// # Arguments
    ///
    /// * `motor_count` - Number of motors to report
    #[must_use]
    pub fn new(motor_count: usize) -> Self {
        Self {
            motor_count,
            output_enabled: true,
        }
    }

    /// Switches motor output on or off.
    pub fn set_output_enabled(&mut self, enabled: bool) {
        self.output_enabled = enabled;
    }
}

impl MotorDriver for FixedMotorDriver {
    fn motor_count(&self) -> usize {
        self.motor_count
    }

    fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    fn request_telemetry(&mut self, motor: usize) {
        trace!("Telemetry requested for motor {}", motor);
    }
}
