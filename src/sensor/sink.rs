//! # Response Byte Sink
//!
//! Fixed-capacity sink collecting the bytes of one polled telemetry
//! response. The poller arms it with the expected frame length before each
//! request; bytes arriving after the frame is full are dropped so a chatty
//! ESC cannot run past the window.

/// Collects up to `N` bytes of a single response frame.
#[derive(Debug)]
pub struct FrameSink<const N: usize> {
    buf: [u8; N],
    /// Bytes expected for the current frame (≤ N)
    target: usize,
    /// Bytes stored so far
    cursor: usize,
}

impl<const N: usize> FrameSink<N> {
    /// Creates an unarmed sink. Arm it with [`begin`](Self::begin) before
    /// pushing bytes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: [0; N],
            target: 0,
            cursor: 0,
        }
    }

    /// Arms the sink for a frame of `len` bytes, discarding prior contents.
    ///
    /// # Arguments
    ///
    /// * `len` - Expected frame length; clamped to the sink capacity
    pub fn begin(&mut self, len: usize) {
        self.target = len.min(N);
        self.cursor = 0;
    }

    /// Stores one received byte.
    ///
    /// # Returns
    ///
    /// `true` if the byte was stored, `false` if the frame was already
    /// complete and the byte was dropped
    pub fn push(&mut self, byte: u8) -> bool {
        if self.cursor >= self.target {
            return false;
        }

        self.buf[self.cursor] = byte;
        self.cursor += 1;
        true
    }

    /// Number of bytes stored since the last [`begin`](Self::begin).
    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.cursor
    }

    /// Whether the armed frame length has been reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cursor == self.target
    }

    /// The bytes collected so far.
    #[must_use]
    pub fn frame(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }
}

impl<const N: usize> Default for FrameSink<N> {
    fn default() -> Self {
        Self::new()
    }
}
