//! # KISS Telemetry Decoder
//!
//! Decodes the 10-byte KISS ESC telemetry frame sent in response to a
//! telemetry request.
//!
//! Frame layout (all multi-byte fields big-endian):
//!
//! | Bytes | Field | Units |
//! |-------|-------------|----------------|
//! | 0 | Temperature | °C (signed) |
//! | 1-2 | Voltage | 0.01 V |
//! | 3-4 | Current | 0.01 A |
//! | 5-6 | Consumption | mAh |
//! | 7-8 | eRPM | 100 erpm |
//! | 9 | CRC-8 | poly 0x07 |

use super::crc::crc8;
use crate::error::{EscTelemetryError, Result};

/// Size of a complete KISS telemetry frame in bytes
pub const KISS_FRAME_SIZE: usize = 10;

/// Serial baud rate used by KISS telemetry ESCs
pub const KISS_BAUD: u32 = 115_200;

/// Decoded KISS telemetry values, one frame per polled motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KissTelemetry {
    /// ESC temperature in °C
    pub temperature: i8,
    /// Battery voltage in 0.01 V
    pub voltage: u16,
    /// Motor current in 0.01 A
    pub current: u16,
    /// Consumed capacity in mAh
    pub consumption: u16,
    /// Electrical RPM in units of 100 erpm
    pub rpm: u16,
}

/// Outcome of polling the byte sink for a response frame
#[derive(Debug)]
pub enum FrameStatus {
    /// Fewer bytes buffered than a complete frame
    Pending,
    /// Frame decoded and checksum verified
    Complete(KissTelemetry),
    /// Full-length frame that failed validation
    Failed(EscTelemetryError),
}

/// Decode a complete KISS telemetry frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (9 data bytes + CRC)
///
/// # Returns
///
/// * `Result<KissTelemetry>` - Decoded telemetry, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Frame is not exactly [`KISS_FRAME_SIZE`] bytes
/// - CRC check fails
pub fn decode_frame(frame: &[u8]) -> Result<KissTelemetry> {
    if frame.len() != KISS_FRAME_SIZE {
        return Err(EscTelemetryError::TruncatedFrame {
            got: frame.len(),
            expected: KISS_FRAME_SIZE,
        });
    }

    // CRC covers the 9 data bytes; the 10th byte is the transmitted CRC
    let received_crc = frame[KISS_FRAME_SIZE - 1];
    let computed_crc = crc8(&frame[..KISS_FRAME_SIZE - 1]);

    if computed_crc != received_crc {
        return Err(EscTelemetryError::ChecksumMismatch {
            computed: computed_crc,
            received: received_crc,
        });
    }

    Ok(KissTelemetry {
        temperature: frame[0] as i8,
        voltage: u16::from_be_bytes([frame[1], frame[2]]),
        current: u16::from_be_bytes([frame[3], frame[4]]),
        consumption: u16::from_be_bytes([frame[5], frame[6]]),
        rpm: u16::from_be_bytes([frame[7], frame[8]]),
    })
}

/// Poll buffered response bytes for a complete frame
///
/// # Arguments
///
/// * `buffered` - Bytes collected so far in the response window
///
/// # Returns
///
/// * [`FrameStatus::Pending`] while fewer than a full frame is buffered
/// * [`FrameStatus::Complete`] with the decoded telemetry on CRC match
/// * [`FrameStatus::Failed`] with the decode error on CRC mismatch
#[must_use]
pub fn poll_frame(buffered: &[u8]) -> FrameStatus {
    if buffered.len() < KISS_FRAME_SIZE {
        return FrameStatus::Pending;
    }

    match decode_frame(&buffered[..KISS_FRAME_SIZE]) {
        Ok(telemetry) => FrameStatus::Complete(telemetry),
        Err(err) => FrameStatus::Failed(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a valid frame from telemetry values
    fn build_frame(temp: i8, voltage: u16, current: u16, consumption: u16, rpm: u16) -> [u8; 10] {
        let mut frame = [0u8; 10];
        frame[0] = temp as u8;
        frame[1..3].copy_from_slice(&voltage.to_be_bytes());
        frame[3..5].copy_from_slice(&current.to_be_bytes());
        frame[5..7].copy_from_slice(&consumption.to_be_bytes());
        frame[7..9].copy_from_slice(&rpm.to_be_bytes());
        frame[9] = crc8(&frame[..9]);
        frame
    }

    #[test]
    fn test_decode_valid_frame() {
        // 25 °C, 14.21 V, 1.23 A, 500 mAh, 100_000 erpm
        let frame = build_frame(25, 1421, 123, 500, 1000);

        let result = decode_frame(&frame);
        assert!(result.is_ok(), "Decode failed: {:?}", result.err());

        let telemetry = result.unwrap();
        assert_eq!(telemetry.temperature, 25);
        assert_eq!(telemetry.voltage, 1421);
        assert_eq!(telemetry.current, 123);
        assert_eq!(telemetry.consumption, 500);
        assert_eq!(telemetry.rpm, 1000);
    }

    #[test]
    fn test_decode_negative_temperature() {
        let frame = build_frame(-10, 1600, 0, 0, 0);

        let telemetry = decode_frame(&frame).unwrap();
        assert_eq!(telemetry.temperature, -10);
    }

    #[test]
    fn test_decode_frame_too_short() {
        let frame = [0x19, 0x05, 0x8D];
        let result = decode_frame(&frame);

        match result {
            Err(EscTelemetryError::TruncatedFrame { got, expected }) => {
                assert_eq!(got, 3);
                assert_eq!(expected, KISS_FRAME_SIZE);
            }
            other => panic!("expected TruncatedFrame, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_frame_crc_error() {
        let mut frame = build_frame(25, 1421, 123, 500, 1000);
        let good_crc = frame[9];

        // Corrupt a data byte; the transmitted CRC no longer matches
        frame[4] ^= 0x01;

        match decode_frame(&frame) {
            Err(EscTelemetryError::ChecksumMismatch { computed, received }) => {
                assert_eq!(received, good_crc);
                assert_ne!(computed, received);
            }
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_poll_frame_pending_while_short() {
        let frame = build_frame(25, 1421, 123, 500, 1000);

        for len in 0..KISS_FRAME_SIZE {
            assert!(
                matches!(poll_frame(&frame[..len]), FrameStatus::Pending),
                "{} bytes should still be pending",
                len
            );
        }
    }

    #[test]
    fn test_poll_frame_complete() {
        let frame = build_frame(30, 1680, 2500, 1200, 2000);

        match poll_frame(&frame) {
            FrameStatus::Complete(telemetry) => {
                assert_eq!(telemetry.temperature, 30);
                assert_eq!(telemetry.rpm, 2000);
            }
            other => panic!("expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn test_poll_frame_failed_on_corruption() {
        let mut frame = build_frame(30, 1680, 2500, 1200, 2000);
        frame[9] ^= 0xFF;

        assert!(matches!(poll_frame(&frame), FrameStatus::Failed(_)));
    }
}
