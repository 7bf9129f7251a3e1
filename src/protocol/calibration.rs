//! # Hobbywing Calibration Module
//!
//! Converts raw Hobbywing V4 ADC readings into physical units.
//!
//! ## Temperature
//!
//! The FET/BEC temperature sensor is an NTC thermistor, so the raw ADC value
//! falls as the part heats up. Readings are inverted against the cold-end
//! reference (3828) and run through a 26-knee piecewise-linear table measured
//! from real hardware, with linear interpolation between knees.
//!
//! - raw above 3828: colder than the table covers, reported as 0 °C
//! - raw below 1123: hotter than the table covers, reported as 100 °C
//!
//! ## Current
//!
//! The current sense ADC has a zero offset of 28 counts; everything at or
//! below the offset reads as 0 A. Above it the response is linear at
//! 610 counts per amp.
//!
//! ## Voltage
//!
//! Pack voltage is a plain resistor divider: raw / 113 volts.
//!
//! ## Usage
//!
//! ```
//! use esc_telemetry::protocol::calibration::{current_amps, temperature_celsius};
//!
//! // At the sense-resistor zero offset
//! assert_eq!(current_amps(28), 0.0);
//!
//! // One amp above the offset
//! assert!((current_amps(638) - 1.0).abs() < 0.001);
//!
//! // Colder than the table covers
//! assert_eq!(temperature_celsius(4000), 0.0);
//! ```

/// Raw ADC reading at the cold end of the temperature table
const TEMP_RAW_COLD: u16 = 3828;

/// Raw ADC reading at the hot end of the temperature table
const TEMP_RAW_HOT: u16 = 1123;

/// Zero offset of the current sense ADC, in counts
const CURRENT_RAW_OFFSET: u16 = 28;

/// Current sense ADC counts per amp
const CURRENT_COUNTS_PER_AMP: f32 = 610.0;

/// Voltage divider ratio: raw counts per volt
const VOLTAGE_COUNTS_PER_VOLT: f32 = 113.0;

/// Temperature lookup table: (inverted raw reading, °C), ascending.
///
/// Measured from Hobbywing V4 hardware. The first column is the raw ADC
/// value inverted against [`TEMP_RAW_COLD`].
const TEMP_TABLE: [(u16, u16); 26] = [
    (0, 1),
    (14, 2),
    (28, 3),
    (58, 5),
    (106, 8),
    (158, 11),
    (234, 15),
    (296, 18),
    (362, 21),
    (408, 23),
    (505, 27),
    (583, 30),
    (664, 33),
    (720, 35),
    (807, 38),
    (897, 41),
    (1021, 45),
    (1150, 49),
    (1315, 54),
    (1855, 70),
    (1978, 74),
    (2239, 82),
    (2387, 87),
    (2472, 90),
    (2656, 97),
    (2705, 99),
];

/// Converts a raw temperature ADC reading to degrees Celsius.
///
/// Readings outside the table range clamp to 0 °C (cold end) and 100 °C
/// (hot end). Readings landing exactly on a table knee return that knee's
/// temperature; anything between two knees is linearly interpolated.
///
/// # Arguments
///
/// * `raw` - Raw ADC value from the telemetry frame
///
/// # Returns
///
/// Temperature in °C (0.0 to 100.0)
///
/// # Examples
///
/// ```
/// use esc_telemetry::protocol::calibration::temperature_celsius;
///
/// assert_eq!(temperature_celsius(3828), 1.0); // first knee
/// assert_eq!(temperature_celsius(4000), 0.0); // beyond cold end
/// assert_eq!(temperature_celsius(1000), 100.0); // beyond hot end
/// ```
#[must_use]
pub fn temperature_celsius(raw: u16) -> f32 {
    if raw > TEMP_RAW_COLD {
        return 0.0;
    }
    if raw < TEMP_RAW_HOT {
        return 100.0;
    }

    let inverted = TEMP_RAW_COLD - raw;

    // Find the first knee strictly above the inverted reading. The table
    // starts at 0, so the loop always advances at least once.
    let mut i = 0;
    while i < TEMP_TABLE.len() && inverted >= TEMP_TABLE[i].0 {
        i += 1;
    }

    // raw == TEMP_RAW_HOT lands exactly on the final knee
    if i == TEMP_TABLE.len() {
        return f32::from(TEMP_TABLE[TEMP_TABLE.len() - 1].1);
    }

    let (x0, y0) = TEMP_TABLE[i - 1];
    let (x1, y1) = TEMP_TABLE[i];

    f32::from(y0)
        + (f32::from(y1) - f32::from(y0)) * f32::from(inverted - x0) / f32::from(x1 - x0)
}

/// Converts a raw current ADC reading to amps.
///
/// # Arguments
///
/// * `raw` - Raw ADC value from the telemetry frame
///
/// # Returns
///
/// Current in amps; 0.0 at or below the sense offset
#[must_use]
pub fn current_amps(raw: u16) -> f32 {
    if raw > CURRENT_RAW_OFFSET {
        f32::from(raw - CURRENT_RAW_OFFSET) / CURRENT_COUNTS_PER_AMP
    } else {
        0.0
    }
}

/// Converts a raw voltage ADC reading to volts.
///
/// # Arguments
///
/// * `raw` - Raw ADC value from the telemetry frame
///
/// # Returns
///
/// Pack voltage in volts
#[must_use]
pub fn voltage_volts(raw: u16) -> f32 {
    f32::from(raw) / VOLTAGE_COUNTS_PER_VOLT
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Temperature Tests ====================

    #[test]
    fn test_temperature_knee_exactness() {
        // Every table knee must map to exactly its listed temperature
        for &(inverted, celsius) in TEMP_TABLE.iter() {
            let raw = TEMP_RAW_COLD - inverted;
            assert_eq!(
                temperature_celsius(raw),
                f32::from(celsius),
                "knee at inverted reading {} should map to {} °C",
                inverted,
                celsius
            );
        }
    }

    #[test]
    fn test_temperature_beyond_cold_end() {
        assert_eq!(temperature_celsius(3829), 0.0);
        assert_eq!(temperature_celsius(u16::MAX), 0.0);
    }

    #[test]
    fn test_temperature_beyond_hot_end() {
        assert_eq!(temperature_celsius(1122), 100.0);
        assert_eq!(temperature_celsius(0), 100.0);
    }

    #[test]
    fn test_temperature_hot_boundary_clamps_to_final_knee() {
        // raw == 1123 inverts to exactly the final knee (2705 -> 99 °C)
        assert_eq!(temperature_celsius(TEMP_RAW_HOT), 99.0);
    }

    #[test]
    fn test_temperature_interpolates_between_knees() {
        // Halfway between the (0, 1) and (14, 2) knees
        let raw = TEMP_RAW_COLD - 7;
        assert!((temperature_celsius(raw) - 1.5).abs() < 0.001);

        // Partway between (1315, 54) and (1855, 70): 1585 is the midpoint
        let raw = TEMP_RAW_COLD - 1585;
        assert!((temperature_celsius(raw) - 62.0).abs() < 0.001);
    }

    #[test]
    fn test_temperature_is_monotonic() {
        // Hotter readings (lower raw) must never report a lower temperature
        let mut last = temperature_celsius(TEMP_RAW_COLD);
        for raw in (TEMP_RAW_HOT..TEMP_RAW_COLD).rev() {
            let t = temperature_celsius(raw);
            assert!(
                t >= last,
                "temperature fell from {} to {} at raw {}",
                last,
                t,
                raw
            );
            last = t;
        }
    }

    // ==================== Current Tests ====================

    #[test]
    fn test_current_at_or_below_offset_is_zero() {
        assert_eq!(current_amps(0), 0.0);
        assert_eq!(current_amps(27), 0.0);
        assert_eq!(current_amps(28), 0.0);
    }

    #[test]
    fn test_current_linear_above_offset() {
        assert!((current_amps(29) - 1.0 / 610.0).abs() < 1e-6);
        assert!((current_amps(638) - 1.0).abs() < 0.001);
        assert!((current_amps(28 + 610 * 25) - 25.0).abs() < 0.001);
    }

    // ==================== Voltage Tests ====================

    #[test]
    fn test_voltage_divider() {
        assert_eq!(voltage_volts(0), 0.0);
        assert!((voltage_volts(113) - 1.0).abs() < 0.001);
        assert!((voltage_volts(1130) - 10.0).abs() < 0.001);
        // Typical 6S pack at storage charge
        assert!((voltage_volts(2543) - 22.5).abs() < 0.01);
    }
}
