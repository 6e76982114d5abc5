use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::drivers::config::PulseShape;
use crate::drivers::DaqError;
use crate::types::MeasurementRecord;

/// Trait representing something that can synthesize or replay measurement records.
pub trait EventSource: Send {
    fn next_record(&mut self, sequence: u64) -> Result<MeasurementRecord, DaqError>;
}

/// Fake scintillator read out by a photomultiplier: a steep rise followed by an
/// exponential decay, buried in Gaussian noise.
pub struct PulseSynth {
    shape: PulseShape,
    noise: Normal<f64>,
    rng: StdRng,
}
impl PulseSynth {
    pub fn new(shape: PulseShape, seed: Option<u64>) -> Result<Self, DaqError> {
        shape.validate()?;
        let noise = Normal::new(0.0, shape.noise_scale_mv)
            .map_err(|e| DaqError::Synthesis(format!("noise distribution: {e}")))?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { shape, noise, rng })
    }
    pub fn shape(&self) -> &PulseShape {
        &self.shape
    }
    pub fn timebase(&self) -> Vec<f64> {
        (0..self.shape.sample_count)
            .map(|i| i as f64 * self.shape.sample_step_secs)
            .collect()
    }
}
impl EventSource for PulseSynth {
    fn next_record(&mut self, sequence: u64) -> Result<MeasurementRecord, DaqError> {
        let shape = self.shape;
        let timebase = self.timebase();
        let height = self
            .rng
            .gen_range(shape.amplitude_min_mv..=shape.amplitude_max_mv);
        let onset = self
            .rng
            .gen_range(shape.onset_min_samples..=shape.onset_max_samples);
        let polarity = if shape.negative { -1.0 } else { 1.0 };

        let mut amplitude: Vec<f64> = (0..shape.sample_count)
            .map(|_| self.noise.sample(&mut self.rng))
            .collect();
        // The pulse starts at t = 0 on its own clock, shifted `onset` samples right.
        for (sample, t) in amplitude[onset..].iter_mut().zip(&timebase) {
            *sample += polarity * height * (-shape.decay_rate_per_sec * t).exp();
        }
        if let Some(bad) = amplitude.iter().position(|v| !v.is_finite()) {
            return Err(DaqError::Synthesis(format!(
                "sample {bad} of event {sequence} is not finite"
            )));
        }
        MeasurementRecord::new(sequence, timebase, amplitude)
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Result<MeasurementRecord, DaqError>>,
}
impl ManualSource {
    pub fn new(records: impl IntoIterator<Item = MeasurementRecord>) -> Self {
        Self {
            queue: records.into_iter().map(Ok).collect(),
        }
    }
    /// Queue a failure; the source returns it once its turn comes.
    pub fn then_fail(mut self, error: DaqError) -> Self {
        self.queue.push_back(Err(error));
        self
    }
}
impl EventSource for ManualSource {
    fn next_record(&mut self, _sequence: u64) -> Result<MeasurementRecord, DaqError> {
        self.queue.pop_front().unwrap_or(Err(DaqError::SourceExhausted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn quiet_shape() -> PulseShape {
        PulseShape {
            noise_scale_mv: 0.0,
            amplitude_min_mv: 100.0,
            amplitude_max_mv: 100.0,
            ..PulseShape::default()
        }
    }
    #[test]
    fn records_hold_the_length_and_monotonic_invariants() {
        let mut synth = PulseSynth::new(PulseShape::default(), Some(42)).unwrap();
        for seq in 0..20 {
            let record = synth.next_record(seq).unwrap();
            assert_eq!(record.sequence(), seq);
            assert_eq!(record.timebase().len(), 600);
            assert_eq!(record.timebase().len(), record.amplitude().len());
            assert!(record.is_strictly_increasing());
        }
    }
    #[test]
    fn pulse_is_shifted_by_the_onset() {
        let mut synth = PulseSynth::new(quiet_shape(), Some(1)).unwrap();
        let record = synth.next_record(0).unwrap();
        let amp = record.amplitude();
        assert!(amp[..50].iter().all(|v| *v == 0.0));
        assert!((amp[50] + 100.0).abs() < 1e-9);
        // one step later the pulse has decayed by exp(-5e6 * 5e-9)
        let expected = -100.0 * (-5e6_f64 * 5e-9).exp();
        assert!((amp[51] - expected).abs() < 1e-9);
        assert_eq!(record.peak().map(|(_, v)| v), Some(-100.0));
    }
    #[test]
    fn pulse_height_and_onset_stay_in_range() {
        let shape = PulseShape {
            noise_scale_mv: 0.0,
            onset_min_samples: 10,
            onset_max_samples: 80,
            negative: false,
            ..PulseShape::default()
        };
        let mut synth = PulseSynth::new(shape, Some(9)).unwrap();
        for seq in 0..50 {
            let record = synth.next_record(seq).unwrap();
            let amp = record.amplitude();
            let onset = amp.iter().position(|v| *v != 0.0).unwrap();
            assert!((10..=80).contains(&onset));
            assert!((30.0..=500.0).contains(&amp[onset]));
        }
    }
    #[test]
    fn same_seed_gives_same_events() {
        let mut a = PulseSynth::new(PulseShape::default(), Some(5)).unwrap();
        let mut b = PulseSynth::new(PulseShape::default(), Some(5)).unwrap();
        assert_eq!(
            a.next_record(0).unwrap().amplitude(),
            b.next_record(0).unwrap().amplitude()
        );
    }
    #[test]
    fn invalid_shape_is_rejected_up_front() {
        let shape = PulseShape {
            sample_count: 0,
            ..PulseShape::default()
        };
        assert!(matches!(
            PulseSynth::new(shape, None),
            Err(DaqError::InvalidConfig(_))
        ));
    }
    #[test]
    fn manual_source_replays_then_fails() {
        let record = MeasurementRecord::new(0, vec![0.0], vec![1.0]).unwrap();
        let mut source =
            ManualSource::new(vec![record]).then_fail(DaqError::Synthesis("boom".into()));
        assert!(source.next_record(0).is_ok());
        assert!(matches!(source.next_record(1), Err(DaqError::Synthesis(_))));
        assert!(matches!(source.next_record(2), Err(DaqError::SourceExhausted)));
    }
}
