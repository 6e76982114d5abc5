use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drivers::DaqError;

/// Bounds of the random pause between two emitted events.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepInterval {
    pub min_secs: f64,
    pub max_secs: f64,
}
impl SleepInterval {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }
    /// No pause at all; the generator emits back to back.
    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }
    /// Saturates at `Duration::MAX` for bounds `validate` would reject.
    pub fn max_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
    fn validate(&self) -> Result<(), DaqError> {
        if !self.min_secs.is_finite() || !self.max_secs.is_finite() {
            return Err(invalid("sleep interval bounds must be finite"));
        }
        if self.min_secs < 0.0 {
            return Err(invalid("sleep interval lower bound must not be negative"));
        }
        if self.min_secs > self.max_secs {
            return Err(invalid(format!(
                "sleep interval lower bound {} exceeds upper bound {}",
                self.min_secs, self.max_secs
            )));
        }
        if Duration::try_from_secs_f64(self.max_secs).is_err() {
            return Err(invalid(format!(
                "sleep interval upper bound {} s is not a representable duration",
                self.max_secs
            )));
        }
        Ok(())
    }
}
impl Default for SleepInterval {
    fn default() -> Self {
        // Events arrive somewhere between immediately and two seconds apart.
        Self::new(0.0, 2.0)
    }
}

/// Shape of the synthetic photomultiplier pulse and its sampling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseShape {
    pub sample_count: usize,
    pub sample_step_secs: f64,
    /// Standard deviation of the additive Gaussian noise.
    pub noise_scale_mv: f64,
    pub amplitude_min_mv: f64,
    pub amplitude_max_mv: f64,
    /// Exponential decay constant of the scintillation light.
    pub decay_rate_per_sec: f64,
    pub onset_min_samples: usize,
    pub onset_max_samples: usize,
    /// PMT signals swing negative.
    pub negative: bool,
}
impl PulseShape {
    pub fn validate(&self) -> Result<(), DaqError> {
        if self.sample_count == 0 {
            return Err(invalid("sample count must be greater than zero"));
        }
        if !(self.sample_step_secs.is_finite() && self.sample_step_secs > 0.0) {
            return Err(invalid("sample step must be a positive finite number"));
        }
        let span = self.sample_step_secs * self.sample_count as f64;
        if !span.is_finite() {
            return Err(invalid("time axis overflows"));
        }
        if !(self.noise_scale_mv.is_finite() && self.noise_scale_mv >= 0.0) {
            return Err(invalid("noise scale must be finite and not negative"));
        }
        if !self.amplitude_min_mv.is_finite() || !self.amplitude_max_mv.is_finite() {
            return Err(invalid("pulse amplitude bounds must be finite"));
        }
        if self.amplitude_min_mv < 0.0 || self.amplitude_min_mv > self.amplitude_max_mv {
            return Err(invalid(format!(
                "pulse amplitude range [{}, {}] is empty or negative",
                self.amplitude_min_mv, self.amplitude_max_mv
            )));
        }
        if !(self.decay_rate_per_sec.is_finite() && self.decay_rate_per_sec >= 0.0) {
            return Err(invalid("decay rate must be finite and not negative"));
        }
        if self.onset_min_samples > self.onset_max_samples {
            return Err(invalid("onset lower bound exceeds upper bound"));
        }
        if self.onset_max_samples >= self.sample_count {
            return Err(invalid(format!(
                "onset of {} samples leaves no room in a {}-sample trace",
                self.onset_max_samples, self.sample_count
            )));
        }
        Ok(())
    }
}
impl Default for PulseShape {
    fn default() -> Self {
        // 0 to 3 us in 5 ns steps, 30-500 mV pulse shifted by 50 samples.
        Self {
            sample_count: 600,
            sample_step_secs: 5e-9,
            noise_scale_mv: 2.0,
            amplitude_min_mv: 30.0,
            amplitude_max_mv: 500.0,
            decay_rate_per_sec: 5e6,
            onset_min_samples: 50,
            onset_max_samples: 50,
            negative: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// `None` keeps the queue unbounded.
    pub capacity: Option<usize>,
    /// How long a push into a full bounded queue waits before the record is dropped.
    pub push_timeout_ms: u64,
}
impl ChannelConfig {
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }
}

/// What the consumer does when the sink refuses a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkErrorPolicy {
    /// Stop pulling and report the failure to the caller.
    #[default]
    Halt,
    /// Log the failure, count it, keep pulling.
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Upper bound on one blocking pull before the loop guard is re-checked.
    pub poll_interval_ms: u64,
    pub on_sink_error: SinkErrorPolicy,
}
impl ConsumerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            on_sink_error: SinkErrorPolicy::Halt,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaqConfig {
    pub sleep: SleepInterval,
    pub pulse: PulseShape,
    pub channel: ChannelConfig,
    pub consumer: ConsumerConfig,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}
impl DaqConfig {
    pub fn from_json_str(text: &str) -> Result<Self, DaqError> {
        let config: DaqConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DaqError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
    pub fn validate(&self) -> Result<(), DaqError> {
        self.sleep.validate()?;
        self.pulse.validate()?;
        if self.channel.capacity == Some(0) {
            return Err(invalid("bounded channel capacity must be at least 1"));
        }
        if self.consumer.poll_interval_ms == 0 {
            return Err(invalid("consumer poll interval must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> DaqError {
    DaqError::InvalidConfig(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_are_valid() {
        let config = DaqConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sleep.max_duration(), Duration::from_secs(2));
        assert_eq!(config.consumer.on_sink_error, SinkErrorPolicy::Halt);
    }
    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = DaqConfig::from_json_str(
            r#"{ "sleep": { "max_secs": 0.5 }, "consumer": { "on_sink_error": "continue" }, "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.sleep, SleepInterval::new(0.0, 0.5));
        assert_eq!(config.pulse, PulseShape::default());
        assert_eq!(config.consumer.on_sink_error, SinkErrorPolicy::Continue);
        assert_eq!(config.seed, Some(7));
    }
    #[test]
    fn inverted_ranges_are_rejected() {
        let mut config = DaqConfig::default();
        config.sleep = SleepInterval::new(2.0, 1.0);
        assert!(matches!(config.validate(), Err(DaqError::InvalidConfig(_))));

        let mut config = DaqConfig::default();
        config.pulse.amplitude_min_mv = 600.0;
        assert!(matches!(config.validate(), Err(DaqError::InvalidConfig(_))));

        let mut config = DaqConfig::default();
        config.pulse.onset_max_samples = config.pulse.sample_count;
        assert!(matches!(config.validate(), Err(DaqError::InvalidConfig(_))));
    }
    #[test]
    fn oversized_sleep_bound_is_rejected() {
        let mut config = DaqConfig::default();
        config.sleep = SleepInterval::new(1e20, 1e20);
        assert!(matches!(config.validate(), Err(DaqError::InvalidConfig(_))));
        assert_eq!(config.sleep.max_duration(), Duration::MAX);

        // large but representable bounds are still accepted
        config.sleep = SleepInterval::new(0.0, 1e9);
        config.validate().unwrap();
    }
    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = DaqConfig::default();
        config.channel.capacity = Some(0);
        assert!(config.validate().is_err());
    }
    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            DaqConfig::from_json_str("{ sleep: }"),
            Err(DaqError::Json(_))
        ));
    }
}
