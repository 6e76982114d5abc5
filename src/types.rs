// src/types.rs
use std::time::{Duration, SystemTime};

use crate::drivers::DaqError;

/// One synthetic scintillator event: a sampled time axis and the amplitude
/// trace measured on it. Read-only once built.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementRecord {
    sequence: u64,
    acquired_at: SystemTime,
    timebase: Vec<f64>,  // seconds
    amplitude: Vec<f64>, // millivolts
}

impl MeasurementRecord {
    pub fn new(sequence: u64, timebase: Vec<f64>, amplitude: Vec<f64>) -> Result<Self, DaqError> {
        if timebase.len() != amplitude.len() {
            return Err(DaqError::LengthMismatch {
                timebase: timebase.len(),
                amplitude: amplitude.len(),
            });
        }
        Ok(Self {
            sequence,
            acquired_at: SystemTime::now(),
            timebase,
            amplitude,
        })
    }

    /// Emission index assigned by the generator, starting at zero.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn acquired_at(&self) -> SystemTime {
        self.acquired_at
    }

    pub fn timebase(&self) -> &[f64] {
        &self.timebase
    }

    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    pub fn len(&self) -> usize {
        self.timebase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timebase.is_empty()
    }

    /// Span covered by the time axis.
    pub fn duration(&self) -> Duration {
        match (self.timebase.first(), self.timebase.last()) {
            (Some(first), Some(last)) => Duration::from_secs_f64((last - first).max(0.0)),
            _ => Duration::ZERO,
        }
    }

    /// Sample with the largest magnitude, as `(time, value)`.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.timebase
            .iter()
            .copied()
            .zip(self.amplitude.iter().copied())
            .fold(None, |best: Option<(f64, f64)>, (t, v)| match best {
                Some((_, b)) if b.abs() >= v.abs() => best,
                _ => Some((t, v)),
            })
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.timebase.windows(2).all(|w| w[0] < w[1])
    }
}

/// Counters reported by the generator thread when it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    pub emitted: u64,
    /// Records rejected by a full bounded channel.
    pub dropped: u64,
}

/// Counters reported by the consumer thread when it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub delivered: u64,
    pub failed: u64,
    pub last_sequence: Option<u64>,
}

/// Outcome of a supervised run.
#[derive(Debug)]
pub struct ShutdownReport {
    pub generator: GeneratorStats,
    pub consumer: ConsumerStats,
    /// Set when the generator died on a synthesis error. The consumer keeps
    /// running in that case and exits once the channel closes.
    pub generator_error: Option<DaqError>,
    /// Time from the stop request until both threads were joined.
    pub latency: Duration,
}
