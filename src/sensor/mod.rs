//! # Acquisition Scheduler
//!
//! Owns the per-tick acquisition cycle: polling KISS ESCs round-robin over
//! the shared serial link, or draining the Hobbywing V4 stream, then keeping
//! the telemetry store's freshness and combined record coherent.
//!
//! [`EscSensor::tick`] is designed to be called at 100 Hz with a monotonic
//! microsecond clock. Every call does a bounded amount of work and never
//! blocks: bytes are pulled from whatever the [`TelemetryLink`] has already
//! buffered. Wire problems (timeouts, bad checksums, lost sync) age the
//! affected motor and bump a diagnostic counter; they are never surfaced as
//! errors.

pub mod sink;

use crate::config::EscProtocol;
use crate::motor::MotorDriver;
use crate::protocol::hobbywing::{self, FrameSync, HobbywingTelemetry, SyncEvent};
use crate::protocol::kiss::{self, FrameStatus, KISS_FRAME_SIZE};
use crate::serial::TelemetryLink;
use crate::telemetry::{
    SampleSlot, SampleStore, TelemetrySample, BATTERY_AGE_MAX, MAX_MOTORS,
};
use serde::Serialize;
use sink::FrameSink;
use tracing::debug;

/// Delay before the first telemetry request, letting ESCs finish booting (ms)
pub const ESC_BOOT_TIME_MS: u64 = 5000;

/// Response window for one polled telemetry request (ms)
pub const ESC_REQUEST_TIMEOUT_MS: u64 = 100;

/// Hobbywing validity bound on data age while the motor spins (~50 ms frames)
const HOBBYWING_SPINNING_AGE_MAX: u8 = 11;

/// Hobbywing validity bound on data age at rest (~400 ms frames)
const HOBBYWING_RESTING_AGE_MAX: u8 = 100;

/// Diagnostic counters accumulated across the sensor's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SensorCounters {
    /// Polled requests whose response window expired
    pub timeouts: u32,
    /// Full-length frames rejected by checksum
    pub crc_errors: u32,
    /// Validated frames stored, both protocols
    pub frames_decoded: u32,
    /// Streaming resyncs forced by a double sentinel
    pub resync_events: u32,
}

/// KISS trigger machine states, one transition per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerState {
    /// Waiting out the ESC boot window
    Startup,
    /// Ready to issue the next telemetry request
    Ready,
    /// Request issued, collecting the response
    Pending,
}

/// Round-robin poller for the KISS request/response protocol
#[derive(Debug)]
struct KissPoller {
    trigger: TriggerState,
    sink: FrameSink<KISS_FRAME_SIZE>,
    /// Motor whose response we are waiting for (or will request next)
    motor: usize,
    /// Time of the first tick, anchoring the boot delay
    started_at_ms: Option<u64>,
    /// Time the current request was issued
    triggered_at_ms: u64,
}

impl KissPoller {
    fn new() -> Self {
        Self {
            trigger: TriggerState::Startup,
            sink: FrameSink::new(),
            motor: 0,
            started_at_ms: None,
            triggered_at_ms: 0,
        }
    }

    fn tick(
        &mut self,
        now_ms: u64,
        link: &mut dyn TelemetryLink,
        motors: &mut dyn MotorDriver,
        motor_count: usize,
        store: &mut SampleStore,
        counters: &mut SensorCounters,
    ) {
        match self.trigger {
            TriggerState::Startup => {
                let started = *self.started_at_ms.get_or_insert(now_ms);
                if now_ms.saturating_sub(started) >= ESC_BOOT_TIME_MS {
                    self.trigger = TriggerState::Ready;
                }
            }
            TriggerState::Ready => {
                // Anything buffered now arrived outside a request window
                // (ESC startup chatter); drop it before arming
                while link.read_byte().is_some() {}

                self.sink.begin(KISS_FRAME_SIZE);
                motors.request_telemetry(self.motor);
                self.triggered_at_ms = now_ms;
                self.trigger = TriggerState::Pending;
            }
            TriggerState::Pending => {
                while let Some(byte) = link.read_byte() {
                    self.sink.push(byte);
                }

                if now_ms < self.triggered_at_ms + ESC_REQUEST_TIMEOUT_MS {
                    match kiss::poll_frame(self.sink.frame()) {
                        FrameStatus::Pending => {}
                        FrameStatus::Complete(telemetry) => {
                            store.record(self.motor, Self::to_sample(&telemetry));
                            counters.frames_decoded += 1;
                            debug!("KISS frame decoded for motor {}", self.motor);
                            self.advance_round_robin(motor_count);
                        }
                        FrameStatus::Failed(err) => {
                            debug!("KISS frame for motor {} rejected: {}", self.motor, err);
                            store.age_motor(self.motor);
                            counters.crc_errors += 1;
                            self.advance_round_robin(motor_count);
                        }
                    }
                } else {
                    // Window expired; come back to this motor next lap
                    store.age_motor(self.motor);
                    counters.timeouts += 1;
                    debug!("KISS response timeout for motor {}", self.motor);
                    self.advance_round_robin(motor_count);
                }
            }
        }
    }

    fn advance_round_robin(&mut self, motor_count: usize) {
        self.motor = (self.motor + 1) % motor_count.max(1);
        self.trigger = TriggerState::Ready;
    }

    fn to_sample(telemetry: &kiss::KissTelemetry) -> TelemetrySample {
        TelemetrySample {
            data_age: 0,
            temperature: telemetry.temperature,
            voltage: telemetry.voltage,
            current: i32::from(telemetry.current),
            consumption: i32::from(telemetry.consumption),
            rpm: telemetry.rpm,
        }
    }
}

/// Continuous-stream handler for the Hobbywing V4 protocol (motor 0 only)
#[derive(Debug)]
struct HobbywingStream {
    sync: FrameSync,
    /// Running consumption integral, truncated into the store every tick
    consumption_mah: f64,
    /// Previous tick time, `None` right after (re)arming
    last_tick_ms: Option<u64>,
}

impl HobbywingStream {
    fn new() -> Self {
        Self {
            sync: FrameSync::new(),
            consumption_mah: 0.0,
            last_tick_ms: None,
        }
    }

    fn tick(
        &mut self,
        now_ms: u64,
        output_rising: bool,
        link: &mut dyn TelemetryLink,
        store: &mut SampleStore,
        counters: &mut SensorCounters,
    ) {
        if output_rising {
            // New arming session: consumption starts over
            self.consumption_mah = 0.0;
            self.last_tick_ms = None;
        }

        // Age up front; a decoded frame below resets it
        store.age_motor(0);

        while let Some(byte) = link.read_byte() {
            match self.sync.push(byte) {
                SyncEvent::Pending => {}
                SyncEvent::Resync => {
                    counters.resync_events += 1;
                    debug!("Hobbywing info packet skipped");
                }
                SyncEvent::FrameReady => {
                    let telemetry = hobbywing::decode_payload(self.sync.payload());
                    store.record(0, self.to_sample(&telemetry));
                    counters.frames_decoded += 1;
                    debug!(
                        "Hobbywing frame {} decoded: {} erpm",
                        telemetry.packet_counter, telemetry.rpm
                    );
                }
            }
        }

        // Integrate consumption from the last stored current reading, frame
        // or no frame. At 100 Hz even 100 A adds only ~0.28 mAh per tick, so
        // the integral lives in an f64 and the store gets the truncation.
        let elapsed_ms = self
            .last_tick_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        if let Some(sample) = store.motor(0) {
            self.consumption_mah +=
                elapsed_ms as f64 * f64::from(sample.current) * 10.0 / (1000.0 * 3600.0);
        }
        store.set_consumption(0, self.consumption_mah as i32);
        self.last_tick_ms = Some(now_ms);
    }

    fn to_sample(&self, telemetry: &HobbywingTelemetry) -> TelemetrySample {
        TelemetrySample {
            data_age: 0,
            temperature: telemetry.fet_temperature_celsius() as i8,
            voltage: (telemetry.voltage_volts() * 100.0) as u16,
            current: (telemetry.current_amps() * 100.0) as i32,
            consumption: self.consumption_mah as i32,
            rpm: (telemetry.rpm / 100).min(u32::from(u16::MAX)) as u16,
        }
    }
}

/// Active protocol state, fixed at construction
#[derive(Debug)]
enum ProtocolState {
    Kiss(KissPoller),
    Hobbywing(HobbywingStream),
}

/// ESC telemetry acquisition core.
///
/// Construct with the configured protocol and a [`MotorDriver`], attach a
/// [`TelemetryLink`], then call [`tick`](Self::tick) periodically. All
/// accessors read the state as settled by the most recent tick.
pub struct EscSensor {
    protocol: Option<ProtocolState>,
    store: SampleStore,
    counters: SensorCounters,
    link: Option<Box<dyn TelemetryLink>>,
    motors: Box<dyn MotorDriver>,
    output_was_enabled: bool,
}

impl std::fmt::Debug for EscSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscSensor")
            .field("protocol", &self.protocol)
            .field("counters", &self.counters)
            .field("link_attached", &self.link.is_some())
            .finish_non_exhaustive()
    }
}

impl EscSensor {
    /// Creates a sensor for the configured protocol.
    ///
    /// # Arguments
    ///
    /// * `protocol` - Wire protocol to run; [`EscProtocol::None`] builds an
    ///   inactive sensor whose accessors all report no data
    /// * `motors` - Motor output layer to poll and gate on
    #[must_use]
    pub fn new(protocol: EscProtocol, motors: Box<dyn MotorDriver>) -> Self {
        let protocol = match protocol {
            EscProtocol::None => None,
            EscProtocol::Kiss => Some(ProtocolState::Kiss(KissPoller::new())),
            EscProtocol::Hobbywing => Some(ProtocolState::Hobbywing(HobbywingStream::new())),
        };

        Self {
            protocol,
            store: SampleStore::new(),
            counters: SensorCounters::default(),
            link: None,
            motors,
            output_was_enabled: false,
        }
    }

    /// Attaches the serial byte source. The sensor stays inactive until one
    /// is attached.
    pub fn attach_link(&mut self, link: Box<dyn TelemetryLink>) {
        self.link = Some(link);
    }

    /// Runs one acquisition cycle.
    ///
    /// # Arguments
    ///
    /// * `now_us` - Monotonic time in microseconds
    pub fn tick(&mut self, now_us: u64) {
        let now_ms = now_us / 1000;

        let Some(link) = self.link.as_deref_mut() else {
            return;
        };
        let Some(protocol) = self.protocol.as_mut() else {
            return;
        };

        if !self.motors.output_enabled() {
            self.output_was_enabled = false;
            return;
        }
        let output_rising = !self.output_was_enabled;
        self.output_was_enabled = true;

        let motor_count = self.motors.motor_count().clamp(1, MAX_MOTORS);

        let (active_count, sample_valid): (usize, fn(&TelemetrySample) -> bool) = match protocol {
            ProtocolState::Kiss(poller) => {
                poller.tick(
                    now_ms,
                    link,
                    self.motors.as_mut(),
                    motor_count,
                    &mut self.store,
                    &mut self.counters,
                );
                (motor_count, kiss_sample_valid)
            }
            ProtocolState::Hobbywing(stream) => {
                stream.tick(now_ms, output_rising, link, &mut self.store, &mut self.counters);
                (1, hobbywing_sample_valid)
            }
        };

        // Invalid motors must never leak stale outputs, and the combined
        // record has to settle before the next read
        self.store.sweep_invalid(active_count, sample_valid);
        self.store.refresh_combined(active_count);
    }

    /// Whether the sensor has both a protocol and a link.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.protocol.is_some() && self.link.is_some()
    }

    /// Whether the addressed record passes the active protocol's freshness
    /// rule. Inactive sensors and out-of-range indices read as invalid.
    #[must_use]
    pub fn is_sample_valid(&self, slot: SampleSlot) -> bool {
        if !self.is_active() {
            return false;
        }

        let sample = match slot {
            SampleSlot::Motor(index) if index < self.active_motor_count() => {
                match self.store.motor(index) {
                    Some(sample) => sample,
                    None => return false,
                }
            }
            SampleSlot::Motor(_) => return false,
            SampleSlot::Combined => self.store.combined(),
        };

        match &self.protocol {
            Some(ProtocolState::Kiss(_)) => kiss_sample_valid(sample),
            Some(ProtocolState::Hobbywing(_)) => hobbywing_sample_valid(sample),
            None => false,
        }
    }

    /// Last stored rpm for a motor, in protocol units (100 erpm).
    ///
    /// Invalid motors read as zero because the sweep already zeroed them;
    /// out-of-range indices read as zero too.
    #[must_use]
    pub fn rpm(&self, motor: usize) -> u16 {
        if motor < self.active_motor_count() {
            self.store.motor(motor).map_or(0, |sample| sample.rpm)
        } else {
            0
        }
    }

    /// The addressed record, `None` when no protocol is configured or the
    /// index is out of range.
    #[must_use]
    pub fn sample(&self, slot: SampleSlot) -> Option<&TelemetrySample> {
        self.protocol.as_ref()?;

        match slot {
            SampleSlot::Motor(index) if index < self.active_motor_count() => {
                self.store.motor(index)
            }
            SampleSlot::Motor(_) => None,
            SampleSlot::Combined => Some(self.store.combined()),
        }
    }

    /// Diagnostic counters since construction.
    #[must_use]
    pub fn counters(&self) -> SensorCounters {
        self.counters
    }

    /// Motors the active protocol can serve: the driver's count for KISS,
    /// one for Hobbywing, zero when no protocol is configured.
    fn active_motor_count(&self) -> usize {
        match &self.protocol {
            Some(ProtocolState::Kiss(_)) => self.motors.motor_count().clamp(1, MAX_MOTORS),
            Some(ProtocolState::Hobbywing(_)) => 1,
            None => 0,
        }
    }
}

/// KISS freshness rule, shared with battery fallback consumers
fn kiss_sample_valid(sample: &TelemetrySample) -> bool {
    sample.data_age <= BATTERY_AGE_MAX
}

/// Hobbywing freshness rule: frames arrive every ~50 ms while spinning but
/// only every ~400 ms at rest, so the staleness bound depends on rpm
fn hobbywing_sample_valid(sample: &TelemetrySample) -> bool {
    if sample.rpm > 0 {
        sample.data_age < HOBBYWING_SPINNING_AGE_MAX
    } else {
        sample.data_age < HOBBYWING_RESTING_AGE_MAX
    }
}

/// Converts electrical rpm (in 100 erpm units) to mechanical rpm.
///
/// # Arguments
///
/// * `erpm` - Electrical rpm in 100 erpm units, as stored in samples
/// * `pole_count` - Motor magnetic pole count (even, at least 2)
#[must_use]
pub fn rpm_to_mechanical(erpm: i32, pole_count: u8) -> i32 {
    (erpm * 100) / (i32::from(pole_count) / 2).max(1)
}
