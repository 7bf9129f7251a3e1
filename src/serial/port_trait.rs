//! Trait abstraction for the telemetry byte source to enable testing

/// Non-blocking pull interface over received telemetry bytes.
///
/// The acquisition scheduler drains whatever has arrived since its last
/// cycle; an empty buffer is an ordinary outcome, not an error. Both calls
/// take `&mut self` so implementations can collect from their transport
/// lazily.
pub trait TelemetryLink: Send {
    /// Number of bytes currently buffered.
    fn bytes_available(&mut self) -> usize;

    /// Takes the next buffered byte, `None` when the buffer is empty.
    fn read_byte(&mut self) -> Option<u8>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted byte source for testing.
    ///
    /// Clones share the same buffer, so a test can keep one handle and feed
    /// bytes while the scheduler owns the other.
    #[derive(Clone)]
    pub struct ScriptedLink {
        bytes: Arc<Mutex<VecDeque<u8>>>,
    }

    impl ScriptedLink {
        pub fn new() -> Self {
            Self {
                bytes: Arc::new(Mutex::new(VecDeque::new())),
            }
        }

        /// Appends bytes for the scheduler to find on its next cycle.
        pub fn feed(&self, data: &[u8]) {
            self.bytes.lock().unwrap().extend(data.iter().copied());
        }

        /// Whether every fed byte has been consumed.
        pub fn is_drained(&self) -> bool {
            self.bytes.lock().unwrap().is_empty()
        }
    }

    impl TelemetryLink for ScriptedLink {
        fn bytes_available(&mut self) -> usize {
            self.bytes.lock().unwrap().len()
        }

        fn read_byte(&mut self) -> Option<u8> {
            self.bytes.lock().unwrap().pop_front()
        }
    }
}
