//! Simulated armband link
//!
//! Stands in for the wireless transport so a capture session can run end to
//! end without hardware. The simulated device behaves like a Myo-style
//! armband: each notification carries two 8-channel EMG vectors and
//! notifications only flow while a streaming mode is active.

use crate::hal::{
    DeviceHandle, DeviceLink, EmgReading, FirmwareVersion, FrameCallback, LinkError,
    LinkSession, StreamingMode, Subscription, CHANNELS_PER_VECTOR,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Muscle activation patterns driving the simulated signal
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivationPattern {
    Constant,
    Sinusoidal { frequency_hz: f32 },
    Burst { burst_duration_ms: u32, rest_duration_ms: u32 },
    Random,
}

/// Metadata queries that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Name,
    Battery,
    Firmware,
    Info,
}

/// Simulator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub address: String,
    pub name: String,
    pub battery_percent: u8,
    pub firmware: FirmwareVersion,
    pub info: String,
    /// EMG notifications per second
    pub notification_rate_hz: u32,
    /// Peak amplitude in raw sensor units (at most 127)
    pub signal_amplitude: f32,
    pub noise_level: f32,
    pub activation_pattern: ActivationPattern,
    pub discovery_latency_ms: u64,
    pub auxiliary_notifications_supported: bool,
    pub failing_metadata: Vec<MetadataField>,
    pub fail_streaming_activation: bool,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            address: "00:00:00:00:00:00".to_string(),
            name: "Simulated Armband".to_string(),
            battery_percent: 87,
            firmware: FirmwareVersion {
                major: 1,
                minor: 5,
                patch: 1970,
                hardware_rev: 2,
            },
            info: "simulated armband, 8 EMG channels".to_string(),
            notification_rate_hz: 50,
            signal_amplitude: 60.0,
            noise_level: 0.1,
            activation_pattern: ActivationPattern::Sinusoidal { frequency_hz: 1.0 },
            discovery_latency_ms: 200,
            auxiliary_notifications_supported: true,
            failing_metadata: Vec::new(),
            fail_streaming_activation: false,
            seed: 0x5EED,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.address.is_empty() {
            return Err("Simulator address cannot be empty".to_string());
        }
        if self.notification_rate_hz == 0 {
            return Err("Simulator notification rate must be greater than 0".to_string());
        }
        if !(0.0..=127.0).contains(&self.signal_amplitude) {
            return Err("Simulator signal amplitude must be between 0 and 127".to_string());
        }
        if !(0.0..=1.0).contains(&self.noise_level) {
            return Err("Simulator noise level must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }

    fn fails(&self, field: MetadataField) -> bool {
        self.failing_metadata.contains(&field)
    }
}

/// Call counters shared between the link and every session it opened
#[derive(Debug, Default)]
pub struct SimulatorStats {
    pub opens: AtomicU64,
    pub closes: AtomicU64,
    pub mode_changes: AtomicU64,
    pub notifications: AtomicU64,
}

impl SimulatorStats {
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn mode_changes(&self) -> u64 {
        self.mode_changes.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::SeqCst)
    }
}

/// Simulated armband transport
pub struct SimulatedArmband {
    config: SimulatorConfig,
    stats: Arc<SimulatorStats>,
}

impl SimulatedArmband {
    pub fn new(config: SimulatorConfig) -> Result<Self, LinkError> {
        config.validate().map_err(LinkError::InvalidState)?;
        Ok(Self {
            config,
            stats: Arc::new(SimulatorStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<SimulatorStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

#[async_trait]
impl DeviceLink for SimulatedArmband {
    type Session = SimulatedSession;

    async fn find_by_address(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Option<DeviceHandle>, LinkError> {
        let latency = Duration::from_millis(self.config.discovery_latency_ms);
        if latency > timeout {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }
        tokio::time::sleep(latency).await;

        if address.eq_ignore_ascii_case(&self.config.address) {
            Ok(Some(DeviceHandle {
                address: self.config.address.clone(),
                name: Some(self.config.name.clone()),
            }))
        } else {
            Ok(None)
        }
    }

    async fn open(&self, handle: &DeviceHandle) -> Result<Self::Session, LinkError> {
        if !handle.address.eq_ignore_ascii_case(&self.config.address) {
            return Err(LinkError::Transport(format!(
                "no simulated device at {}",
                handle.address
            )));
        }

        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        debug!(address = %handle.address, "Simulated armband opened");
        Ok(SimulatedSession::new(self.config.clone(), Arc::clone(&self.stats)))
    }
}

type Subscribers = Arc<Mutex<Vec<(Arc<AtomicBool>, FrameCallback)>>>;

/// Open connection to the simulated armband
pub struct SimulatedSession {
    config: SimulatorConfig,
    stats: Arc<SimulatorStats>,
    mode: StreamingMode,
    subscribers: Subscribers,
    next_subscription_id: u64,
    emitter: Option<JoinHandle<()>>,
    closed: bool,
}

impl SimulatedSession {
    fn new(config: SimulatorConfig, stats: Arc<SimulatorStats>) -> Self {
        Self {
            config,
            stats,
            mode: StreamingMode::Off,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_subscription_id: 0,
            emitter: None,
            closed: false,
        }
    }

    pub fn mode(&self) -> StreamingMode {
        self.mode
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.closed {
            Err(LinkError::InvalidState("session is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn start_emitter(&mut self) {
        if self.emitter.is_some() {
            return;
        }

        let generator = SignalGenerator::new(&self.config);
        let subscribers = Arc::clone(&self.subscribers);
        let stats = Arc::clone(&self.stats);
        let period = Duration::from_secs_f64(1.0 / self.config.notification_rate_hz as f64);

        self.emitter = Some(tokio::spawn(async move {
            let mut generator = generator;
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let reading = generator.next_reading();
                stats.notifications.fetch_add(1, Ordering::Relaxed);

                let mut listeners = subscribers.lock();
                listeners.retain(|(active, _)| active.load(Ordering::Acquire));
                for (_, callback) in listeners.iter() {
                    callback(reading);
                }
            }
        }));
    }

    fn stop_emitter(&mut self) {
        if let Some(emitter) = self.emitter.take() {
            emitter.abort();
        }
    }
}

#[async_trait]
impl LinkSession for SimulatedSession {
    async fn name(&self) -> Result<String, LinkError> {
        self.ensure_open()?;
        if self.config.fails(MetadataField::Name) {
            return Err(LinkError::Transport("name characteristic read failed".to_string()));
        }
        Ok(self.config.name.clone())
    }

    async fn battery_level(&self) -> Result<u8, LinkError> {
        self.ensure_open()?;
        if self.config.fails(MetadataField::Battery) {
            return Err(LinkError::Transport("battery characteristic read failed".to_string()));
        }
        Ok(self.config.battery_percent)
    }

    async fn firmware_version(&self) -> Result<FirmwareVersion, LinkError> {
        self.ensure_open()?;
        if self.config.fails(MetadataField::Firmware) {
            return Err(LinkError::Transport("firmware characteristic read failed".to_string()));
        }
        Ok(self.config.firmware)
    }

    async fn device_info(&self) -> Result<String, LinkError> {
        self.ensure_open()?;
        if self.config.fails(MetadataField::Info) {
            return Err(LinkError::Transport("info characteristic read failed".to_string()));
        }
        Ok(self.config.info.clone())
    }

    async fn enable_auxiliary_notifications(&mut self) -> Result<(), LinkError> {
        self.ensure_open()?;
        if !self.config.auxiliary_notifications_supported {
            return Err(LinkError::Unsupported("battery notifications".to_string()));
        }
        Ok(())
    }

    async fn set_streaming_mode(&mut self, mode: StreamingMode) -> Result<(), LinkError> {
        self.ensure_open()?;
        if self.config.fail_streaming_activation && mode.is_streaming() {
            return Err(LinkError::Transport("mode command rejected".to_string()));
        }

        self.stats.mode_changes.fetch_add(1, Ordering::SeqCst);
        self.mode = mode;
        if mode.is_streaming() {
            self.start_emitter();
        } else {
            self.stop_emitter();
        }
        debug!(?mode, "Simulated armband streaming mode set");
        Ok(())
    }

    fn on_frame(&mut self, callback: FrameCallback) -> Result<Subscription, LinkError> {
        self.ensure_open()?;
        let subscription = Subscription::new(self.next_subscription_id);
        self.next_subscription_id += 1;
        self.subscribers
            .lock()
            .push((subscription.active_flag(), callback));
        trace!(id = subscription.id(), "Frame callback registered");
        Ok(subscription)
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.stop_emitter();
        self.mode = StreamingMode::Off;
        self.subscribers.lock().clear();
        self.closed = true;
        debug!("Simulated armband closed");
        Ok(())
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        self.stop_emitter();
    }
}

/// Deterministic EMG-like signal source
struct SignalGenerator {
    pattern: ActivationPattern,
    amplitude: f32,
    noise_level: f32,
    rate_hz: f32,
    sequence: u64,
    rng: StdRng,
}

impl SignalGenerator {
    fn new(config: &SimulatorConfig) -> Self {
        Self {
            pattern: config.activation_pattern.clone(),
            amplitude: config.signal_amplitude,
            noise_level: config.noise_level,
            rate_hz: config.notification_rate_hz as f32,
            sequence: 0,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    fn next_reading(&mut self) -> EmgReading {
        let sequence = self.sequence;
        self.sequence += 1;

        let mut first = [0i8; CHANNELS_PER_VECTOR];
        let mut second = [0i8; CHANNELS_PER_VECTOR];
        for channel in 0..CHANNELS_PER_VECTOR {
            // Two samples per notification
            first[channel] = self.sample(sequence * 2, channel);
            second[channel] = self.sample(sequence * 2 + 1, channel);
        }
        EmgReading::new(first, second)
    }

    fn sample(&mut self, sample_index: u64, channel: usize) -> i8 {
        let time_s = sample_index as f32 / (self.rate_hz * 2.0);

        let envelope = match &self.pattern {
            ActivationPattern::Constant => 1.0,
            ActivationPattern::Sinusoidal { frequency_hz } => {
                let phase = 2.0 * std::f32::consts::PI * frequency_hz * time_s;
                0.5 * (1.0 + phase.sin())
            }
            ActivationPattern::Burst {
                burst_duration_ms,
                rest_duration_ms,
            } => {
                let period_ms = (burst_duration_ms + rest_duration_ms).max(1) as f32;
                if (time_s * 1000.0) % period_ms < *burst_duration_ms as f32 {
                    1.0
                } else {
                    0.05
                }
            }
            ActivationPattern::Random => self.rng.gen_range(0.0..1.0),
        };

        // EMG is zero-mean; alternate sign per sample and channel
        let carrier = if (sample_index + channel as u64) % 2 == 0 { 1.0 } else { -1.0 };
        let channel_gain = 1.0 - channel as f32 * 0.05;
        let noise = self.rng.gen_range(-1.0..1.0) * self.noise_level * self.amplitude;

        let value = carrier * envelope * channel_gain * self.amplitude + noise;
        value.round().clamp(i8::MIN as f32, i8::MAX as f32) as i8
    }
}
