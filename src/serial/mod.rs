//! # Serial Transport Module
//!
//! Opens the ESC telemetry serial port and adapts it to the non-blocking
//! [`TelemetryLink`] the acquisition scheduler consumes.
//!
//! This module handles:
//! - Opening the port at the protocol's baud rate (8N1)
//! - A reader pump task draining the port into a byte channel
//! - Buffering received chunks for lock-free pull access
//!
//! The pump task is the only place that awaits on the port; the scheduler
//! side never blocks. Dropping the link ends the pump on its next read.

pub mod port_trait;

use crate::error::{EscTelemetryError, Result};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub use port_trait::TelemetryLink;

/// Read buffer size for the pump task
const READ_CHUNK_SIZE: usize = 256;

/// ESC telemetry serial port
///
/// Wraps the opened port until [`into_link`](Self::into_link) hands it to
/// the reader pump.
pub struct EscSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
    /// Baud rate the port was opened at
    baud: u32,
}

impl std::fmt::Debug for EscSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscSerial")
            .field("device_path", &self.device_path)
            .field("baud", &self.baud)
            .finish_non_exhaustive()
    }
}

impl EscSerial {
    /// Open the telemetry port with the given protocol baud rate
    ///
    /// ESC telemetry is 8 data bits, no parity, 1 stop bit for both
    /// supported protocols; only the baud rate differs.
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud` - Protocol baud rate ([`crate::protocol::kiss::KISS_BAUD`]
    ///   or [`crate::protocol::hobbywing::HOBBYWING_BAUD`])
    ///
    /// # Returns
    ///
    /// * `Result<EscSerial>` - Opened serial port or error
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| EscTelemetryError::Serial(format!("Failed to open {}: {}", path, e)))?;

        info!("Opened ESC telemetry port {} at {} baud", path, baud);

        Ok(Self {
            port,
            device_path: path.to_string(),
            baud,
        })
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Get the baud rate the port was opened at
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Start the reader pump and return the scheduler-side link
    ///
    /// Spawns a task that reads the port and forwards every received chunk
    /// over an unbounded channel; the returned [`SerialRxLink`] collects
    /// those chunks on demand. Must be called within a Tokio runtime.
    pub fn into_link(self) -> SerialRxLink {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_pump(self.port, self.device_path, tx);
        SerialRxLink::new(rx)
    }
}

/// Spawn a task pumping `reader` into the chunk channel
///
/// Ends on EOF, on a read error, or once the receiving link is dropped.
fn spawn_pump<R>(mut reader: R, device_path: String, tx: mpsc::UnboundedSender<Bytes>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => {
                    warn!("Telemetry port {} closed", device_path);
                    break;
                }
                Ok(n) => {
                    if tx.send(Bytes::copy_from_slice(&chunk[..n])).is_err() {
                        debug!("Telemetry link dropped, stopping pump for {}", device_path);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Read error on {}: {}", device_path, e);
                    break;
                }
            }
        }
    });
}

/// Scheduler-side view of the reader pump
///
/// Collects pumped chunks into a contiguous buffer and serves them a byte
/// at a time. Both trait methods are non-blocking; an empty buffer simply
/// reads as zero bytes available.
pub struct SerialRxLink {
    chunks: mpsc::UnboundedReceiver<Bytes>,
    pending: BytesMut,
}

impl SerialRxLink {
    fn new(chunks: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            chunks,
            pending: BytesMut::new(),
        }
    }

    /// Move every chunk the pump has delivered into the pending buffer
    fn collect(&mut self) {
        while let Ok(chunk) = self.chunks.try_recv() {
            self.pending.extend_from_slice(&chunk);
        }
    }
}

impl TelemetryLink for SerialRxLink {
    fn bytes_available(&mut self) -> usize {
        self.collect();
        self.pending.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.collect();

        if self.pending.is_empty() {
            return None;
        }

        let byte = self.pending[0];
        self.pending.advance(1);
        Some(byte)
    }
}

impl std::fmt::Debug for SerialRxLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialRxLink")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
