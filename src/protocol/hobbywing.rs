//! # Hobbywing V4 Telemetry Stream
//!
//! Parses the continuous telemetry stream a Hobbywing V4 ESC transmits on
//! its own schedule. There is no request/response cycle and no checksum;
//! framing relies entirely on the 0x9B sentinel discipline.
//!
//! Frame layout after the sentinel (all multi-byte fields big-endian):
//!
//! | Bytes | Field | Units |
//! |--------|------------------|------------------|
//! | 0-2 | Packet counter | monotonic, 24-bit |
//! | 3-4 | Throttle | 0-1024 |
//! | 5-6 | Output PWM | 0-1024 |
//! | 7-9 | eRPM | 24-bit |
//! | 10-11 | Voltage | raw ADC |
//! | 12-13 | Current | raw ADC |
//! | 14-15 | FET temperature | raw ADC |
//! | 16-17 | BEC temperature | raw ADC |
//!
//! At zero throttle the ESC interleaves a shorter informational packet that
//! begins with two sentinel bytes. Seeing the sentinel twice in a row is
//! therefore treated as a false start: the frame is abandoned and the next
//! eleven bytes are discarded unread. A genuine packet counter would need
//! over ten million transmissions before its first byte reaches 0x9B, so
//! the ambiguity does not arise in practice.

use super::calibration;

/// Sentinel byte marking the start of a telemetry frame
pub const HOBBYWING_SYNC_BYTE: u8 = 0x9B;

/// Payload length following the sentinel, in bytes
pub const HOBBYWING_PAYLOAD_SIZE: usize = 18;

/// Serial baud rate used by Hobbywing V4 ESCs
pub const HOBBYWING_BAUD: u32 = 19_200;

/// Bytes to discard after a double sentinel (rest of the info packet)
const INFO_PACKET_SKIP: u8 = 11;

/// Outcome of feeding one byte to the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// Byte consumed; no complete frame yet
    Pending,
    /// Double sentinel seen: frame abandoned, info-packet skip armed
    Resync,
    /// Final payload byte received; [`FrameSync::payload`] holds a full frame
    FrameReady,
}

/// Incremental frame synchronizer for the Hobbywing telemetry stream.
///
/// Feed every received byte through [`push`](Self::push); the payload of a
/// completed frame stays readable until the next byte is pushed.
#[derive(Debug, Default)]
pub struct FrameSync {
    /// Payload of the frame being assembled (or last completed)
    payload: [u8; HOBBYWING_PAYLOAD_SIZE],
    /// 0 = hunting for sentinel, n = sentinel seen plus n-1 payload bytes
    bytes_read: u8,
    /// Remaining bytes to discard after a double sentinel
    skip: u8,
}

impl FrameSync {
    /// Creates a synchronizer hunting for its first sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one stream byte and reports the framing outcome.
    ///
    /// # Arguments
    ///
    /// * `byte` - Next byte received from the ESC
    ///
    /// # Returns
    ///
    /// * [`SyncEvent::FrameReady`] when `byte` completed a frame
    /// * [`SyncEvent::Resync`] when a double sentinel forced a skip
    /// * [`SyncEvent::Pending`] otherwise
    pub fn push(&mut self, byte: u8) -> SyncEvent {
        if self.skip > 0 {
            self.skip -= 1;
            return SyncEvent::Pending;
        }

        if self.bytes_read == 0 {
            // Hunting: everything except the sentinel is inter-frame noise
            if byte == HOBBYWING_SYNC_BYTE {
                self.bytes_read = 1;
            }
            return SyncEvent::Pending;
        }

        if self.bytes_read == 1 && byte == HOBBYWING_SYNC_BYTE {
            self.bytes_read = 0;
            self.skip = INFO_PACKET_SKIP;
            return SyncEvent::Resync;
        }

        self.payload[usize::from(self.bytes_read) - 1] = byte;
        self.bytes_read += 1;

        if usize::from(self.bytes_read) == HOBBYWING_PAYLOAD_SIZE + 1 {
            self.bytes_read = 0;
            return SyncEvent::FrameReady;
        }

        SyncEvent::Pending
    }

    /// Returns the most recently assembled payload.
    ///
    /// Only meaningful immediately after [`push`](Self::push) returned
    /// [`SyncEvent::FrameReady`].
    #[must_use]
    pub fn payload(&self) -> &[u8; HOBBYWING_PAYLOAD_SIZE] {
        &self.payload
    }
}

/// Decoded Hobbywing V4 telemetry values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HobbywingTelemetry {
    /// Monotonic packet counter (24-bit)
    pub packet_counter: u32,
    /// Commanded throttle (0-1024)
    pub throttle: u16,
    /// Actual output PWM (0-1024)
    pub pwm: u16,
    /// Electrical RPM (24-bit)
    pub rpm: u32,
    /// Pack voltage, raw ADC counts
    pub voltage_raw: u16,
    /// Current, raw ADC counts
    pub current_raw: u16,
    /// FET temperature, raw ADC counts
    pub temp_fet_raw: u16,
    /// BEC temperature, raw ADC counts
    pub temp_bec_raw: u16,
}

impl HobbywingTelemetry {
    /// Pack voltage in volts, after divider calibration.
    #[must_use]
    pub fn voltage_volts(&self) -> f32 {
        calibration::voltage_volts(self.voltage_raw)
    }

    /// Current in amps, after sense calibration.
    #[must_use]
    pub fn current_amps(&self) -> f32 {
        calibration::current_amps(self.current_raw)
    }

    /// FET temperature in °C, after thermistor calibration.
    #[must_use]
    pub fn fet_temperature_celsius(&self) -> f32 {
        calibration::temperature_celsius(self.temp_fet_raw)
    }

    /// BEC temperature in °C, after thermistor calibration.
    #[must_use]
    pub fn bec_temperature_celsius(&self) -> f32 {
        calibration::temperature_celsius(self.temp_bec_raw)
    }
}

/// Decode a complete payload into telemetry values
///
/// The payload length is fixed by the type, so decoding cannot fail;
/// validation happened in the synchronizer.
///
/// # Arguments
///
/// * `payload` - The 18 bytes following the sentinel
#[must_use]
pub fn decode_payload(payload: &[u8; HOBBYWING_PAYLOAD_SIZE]) -> HobbywingTelemetry {
    HobbywingTelemetry {
        packet_counter: u32::from_be_bytes([0, payload[0], payload[1], payload[2]]),
        throttle: u16::from_be_bytes([payload[3], payload[4]]),
        pwm: u16::from_be_bytes([payload[5], payload[6]]),
        rpm: u32::from_be_bytes([0, payload[7], payload[8], payload[9]]),
        voltage_raw: u16::from_be_bytes([payload[10], payload[11]]),
        current_raw: u16::from_be_bytes([payload[12], payload[13]]),
        temp_fet_raw: u16::from_be_bytes([payload[14], payload[15]]),
        temp_bec_raw: u16::from_be_bytes([payload[16], payload[17]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Push a slice of bytes, returning every non-pending event
    fn push_all(sync: &mut FrameSync, bytes: &[u8]) -> Vec<SyncEvent> {
        bytes
            .iter()
            .map(|&b| sync.push(b))
            .filter(|e| *e != SyncEvent::Pending)
            .collect()
    }

    #[test]
    fn test_sync_ignores_noise_before_sentinel() {
        let mut sync = FrameSync::new();

        let events = push_all(&mut sync, &[0x00, 0xFF, 0x42, 0x13]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_sync_completes_frame_on_final_payload_byte() {
        let mut sync = FrameSync::new();
        let payload: Vec<u8> = (1..=18).collect();

        assert_eq!(sync.push(HOBBYWING_SYNC_BYTE), SyncEvent::Pending);
        for &b in &payload[..17] {
            assert_eq!(sync.push(b), SyncEvent::Pending);
        }
        assert_eq!(sync.push(payload[17]), SyncEvent::FrameReady);
        assert_eq!(sync.payload()[..], payload[..]);
    }

    #[test]
    fn test_sync_double_sentinel_skips_info_packet() {
        let mut sync = FrameSync::new();

        assert_eq!(sync.push(HOBBYWING_SYNC_BYTE), SyncEvent::Pending);
        assert_eq!(sync.push(HOBBYWING_SYNC_BYTE), SyncEvent::Resync);

        // The next 11 bytes are discarded even if they contain the sentinel
        for _ in 0..11 {
            assert_eq!(sync.push(HOBBYWING_SYNC_BYTE), SyncEvent::Pending);
        }

        // Skip consumed: the stream syncs again on the next sentinel
        assert_eq!(sync.push(HOBBYWING_SYNC_BYTE), SyncEvent::Pending);
        for b in 1..=17 {
            assert_eq!(sync.push(b), SyncEvent::Pending);
        }
        assert_eq!(sync.push(18), SyncEvent::FrameReady);
    }

    #[test]
    fn test_sync_resync_sequence_yields_exactly_one_frame() {
        // Double sentinel, 11 discarded bytes, then one genuine frame
        let mut stream = vec![HOBBYWING_SYNC_BYTE, HOBBYWING_SYNC_BYTE];
        stream.extend_from_slice(&[0xAA; 11]);
        stream.push(HOBBYWING_SYNC_BYTE);
        stream.extend((100..118).map(|b| b as u8));

        let mut sync = FrameSync::new();
        let events = push_all(&mut sync, &stream);

        assert_eq!(events, vec![SyncEvent::Resync, SyncEvent::FrameReady]);
        assert_eq!(sync.payload()[0], 100);
        assert_eq!(sync.payload()[17], 117);
    }

    #[test]
    fn test_sync_sentinel_allowed_inside_payload() {
        // Only payload position 0 is sentinel-guarded
        let mut sync = FrameSync::new();

        sync.push(HOBBYWING_SYNC_BYTE);
        sync.push(0x01);
        for _ in 0..16 {
            assert_eq!(sync.push(HOBBYWING_SYNC_BYTE), SyncEvent::Pending);
        }
        assert_eq!(sync.push(HOBBYWING_SYNC_BYTE), SyncEvent::FrameReady);
    }

    #[test]
    fn test_sync_back_to_back_frames() {
        let mut sync = FrameSync::new();

        let mut stream = Vec::new();
        for frame in 0..3u8 {
            stream.push(HOBBYWING_SYNC_BYTE);
            stream.extend((0..18).map(|i| frame * 20 + i));
        }

        let events = push_all(&mut sync, &stream);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| *e == SyncEvent::FrameReady));

        // Last completed frame remains readable
        assert_eq!(sync.payload()[0], 40);
    }

    #[test]
    fn test_decode_payload_field_offsets() {
        let payload: [u8; 18] = [
            0x00, 0x12, 0x34, // packet counter
            0x01, 0x90, // throttle = 400
            0x02, 0x00, // pwm = 512
            0x01, 0x5A, 0x7C, // rpm = 88700
            0x05, 0xC6, // voltage raw = 1478
            0x02, 0x7E, // current raw = 638
            0x0A, 0xF0, // FET temp raw = 2800
            0x0B, 0x00, // BEC temp raw = 2816
        ];

        let telemetry = decode_payload(&payload);
        assert_eq!(telemetry.packet_counter, 0x1234);
        assert_eq!(telemetry.throttle, 400);
        assert_eq!(telemetry.pwm, 512);
        assert_eq!(telemetry.rpm, 88_700);
        assert_eq!(telemetry.voltage_raw, 1478);
        assert_eq!(telemetry.current_raw, 638);
        assert_eq!(telemetry.temp_fet_raw, 2800);
        assert_eq!(telemetry.temp_bec_raw, 2816);
    }

    #[test]
    fn test_decode_payload_24_bit_fields() {
        let mut payload = [0u8; 18];
        payload[0] = 0xFF;
        payload[1] = 0xFF;
        payload[2] = 0xFF;
        payload[7] = 0xFF;
        payload[8] = 0xFF;
        payload[9] = 0xFF;

        let telemetry = decode_payload(&payload);
        assert_eq!(telemetry.packet_counter, 0xFF_FFFF);
        assert_eq!(telemetry.rpm, 0xFF_FFFF);
    }

    #[test]
    fn test_calibrated_accessors() {
        let mut payload = [0u8; 18];
        payload[10] = 0x05;
        payload[11] = 0xC6; // 1478 raw -> ~13.08 V
        payload[12] = 0x02;
        payload[13] = 0x7E; // 638 raw -> 1.0 A

        let telemetry = decode_payload(&payload);
        assert!((telemetry.voltage_volts() - 13.08).abs() < 0.01);
        assert!((telemetry.current_amps() - 1.0).abs() < 0.001);
    }
}
