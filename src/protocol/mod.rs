//! # ESC Wire Protocols
//!
//! Frame-level implementations of the supported ESC telemetry protocols.
//!
//! This module handles:
//! - KISS request/response frame decoding (10 bytes, CRC-8 checked)
//! - Hobbywing V4 stream synchronization and payload decoding
//! - CRC-8/0x07 checksum calculation
//! - Raw ADC count calibration (temperature, voltage, current)

pub mod calibration;
pub mod crc;
pub mod hobbywing;
pub mod kiss;
