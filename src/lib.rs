// src/lib.rs
//! Fake data-acquisition pipeline: a generator thread synthesizes scintillator
//! events, a consumer thread drains them in order into a display sink.
pub mod drivers;
pub mod engine;
pub mod recorder;
pub mod supervisor;
pub mod types;

pub use drivers::{DaqConfig, DaqError, DisplaySink, EventSource, PulseSynth, ShutdownFlag};
pub use supervisor::Supervisor;
pub use types::{ConsumerStats, GeneratorStats, MeasurementRecord, ShutdownReport};
