//! # Telemetry Data Model
//!
//! Per-motor telemetry samples, the freshness (data age) model, and the
//! aggregate record combining all motors for battery-level consumers.
//!
//! Every sample carries a `data_age` counting acquisition cycles since the
//! last validated decode. Age `0` is fresh, [`DATA_AGE_INVALID`] means no
//! frame has ever been decoded, and downstream validity rules draw their
//! thresholds in between. Ages only move toward the sentinel and saturate
//! there; a decode is the only thing that resets them.

use serde::Serialize;

/// Data age sentinel: no validated frame has ever been decoded
pub const DATA_AGE_INVALID: u8 = u8::MAX;

/// Maximum data age at which battery-level consumers trust a sample
pub const BATTERY_AGE_MAX: u8 = 10;

/// Number of motor slots allocated in the store
pub const MAX_MOTORS: usize = 8;

/// One motor's telemetry record (or the combined record)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetrySample {
    /// Acquisition cycles since the last validated decode
    pub data_age: u8,
    /// ESC temperature in °C
    pub temperature: i8,
    /// Voltage in 0.01 V
    pub voltage: u16,
    /// Current in 0.01 A
    pub current: i32,
    /// Consumed capacity in mAh
    pub consumption: i32,
    /// RPM in protocol units (100 erpm)
    pub rpm: u16,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            data_age: DATA_AGE_INVALID,
            temperature: 0,
            voltage: 0,
            current: 0,
            consumption: 0,
            rpm: 0,
        }
    }
}

/// Addresses one record in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSlot {
    /// A single motor by index
    Motor(usize),
    /// The aggregate record across all active motors
    Combined,
}

/// Holds every motor's latest sample plus the memoized combined record.
///
/// The combined record is marked stale whenever per-motor data changes and
/// recomputed on demand through [`refresh_combined`](Self::refresh_combined).
#[derive(Debug)]
pub struct SampleStore {
    motors: [TelemetrySample; MAX_MOTORS],
    combined: TelemetrySample,
    combined_dirty: bool,
}

impl SampleStore {
    /// Creates a store with every age at the invalid sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            motors: [TelemetrySample::default(); MAX_MOTORS],
            combined: TelemetrySample::default(),
            combined_dirty: true,
        }
    }

    /// Returns one motor's record, `None` when the index has no slot.
    #[must_use]
    pub fn motor(&self, index: usize) -> Option<&TelemetrySample> {
        self.motors.get(index)
    }

    /// Returns the combined record as of the last refresh.
    #[must_use]
    pub fn combined(&self) -> &TelemetrySample {
        &self.combined
    }

    /// Stores a freshly decoded sample and marks the combined record stale.
    ///
    /// Out-of-range indices are ignored.
    pub fn record(&mut self, index: usize, sample: TelemetrySample) {
        if let Some(slot) = self.motors.get_mut(index) {
            *slot = sample;
            self.combined_dirty = true;
        }
    }

    /// Overwrites one motor's consumption field and marks the combined
    /// record stale. Used by the streaming protocol, which integrates
    /// consumption locally instead of receiving it in the frame.
    pub fn set_consumption(&mut self, index: usize, consumption: i32) {
        if let Some(slot) = self.motors.get_mut(index) {
            slot.consumption = consumption;
            self.combined_dirty = true;
        }
    }

    /// Ages one motor by a cycle, saturating at the invalid sentinel.
    ///
    /// The combined record only goes stale when the age actually moves.
    pub fn age_motor(&mut self, index: usize) {
        if let Some(slot) = self.motors.get_mut(index) {
            if slot.data_age < DATA_AGE_INVALID {
                slot.data_age += 1;
                self.combined_dirty = true;
            }
        }
    }

    /// Zeroes the outputs of every invalid motor among the first `count`.
    ///
    /// Voltage, current, consumption and rpm of an invalid motor are reset
    /// to zero, along with the same fields of the combined record, so stale
    /// readings never reach consumers. Ages and temperatures are left alone,
    /// and the staleness flag is not touched.
    pub fn sweep_invalid<F>(&mut self, count: usize, is_valid: F)
    where
        F: Fn(&TelemetrySample) -> bool,
    {
        for i in 0..count.min(MAX_MOTORS) {
            if !is_valid(&self.motors[i]) {
                self.motors[i].voltage = 0;
                self.motors[i].current = 0;
                self.motors[i].consumption = 0;
                self.motors[i].rpm = 0;
                self.combined.voltage = 0;
                self.combined.current = 0;
                self.combined.consumption = 0;
                self.combined.rpm = 0;
            }
        }
    }

    /// Recomputes the combined record if it is stale.
    ///
    /// Aggregation over the first `count` motors: maximum of ages and
    /// temperatures, sum of current and consumption, mean of voltage and
    /// rpm.
    pub fn refresh_combined(&mut self, count: usize) {
        if !self.combined_dirty {
            return;
        }

        let count = count.clamp(1, MAX_MOTORS);

        let mut age: u8 = 0;
        let mut temperature: i8 = 0;
        let mut voltage: u32 = 0;
        let mut current: i64 = 0;
        let mut consumption: i64 = 0;
        let mut rpm: u32 = 0;

        for motor in &self.motors[..count] {
            age = age.max(motor.data_age);
            temperature = temperature.max(motor.temperature);
            voltage += u32::from(motor.voltage);
            current += i64::from(motor.current);
            consumption += i64::from(motor.consumption);
            rpm += u32::from(motor.rpm);
        }

        self.combined = TelemetrySample {
            data_age: age,
            temperature,
            voltage: (voltage / count as u32) as u16,
            current: current as i32,
            consumption: consumption as i32,
            rpm: (rpm / count as u32) as u16,
        };
        self.combined_dirty = false;
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}
