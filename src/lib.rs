//! # ESC Telemetry Library
//!
//! Acquire ESC telemetry over a serial link: KISS polling and Hobbywing V4
//! streaming.
//!
//! This library provides the core functionality for decoding per-motor ESC
//! telemetry frames, tracking data freshness, and aggregating motors into a
//! combined battery-style record.

pub mod config;
pub mod error;
pub mod motor;
pub mod protocol;
pub mod sensor;
pub mod serial;
pub mod telemetry;
