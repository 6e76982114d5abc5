use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::drivers::DaqError;
use crate::types::MeasurementRecord;

/// Receiving end of the pipeline: whatever shows the events to a human.
///
/// The consumer lends each record immutably; a sink that needs to keep one
/// clones it.
pub trait DisplaySink: Send {
    fn deliver(&mut self, record: &MeasurementRecord) -> Result<(), DaqError>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn deliver(&mut self, record: &MeasurementRecord) -> Result<(), DaqError> {
        (**self).deliver(record)
    }
}

/// Prints a one-line summary per event, like the console mode of a bench DAQ.
#[derive(Default)]
pub struct LogSink;
impl DisplaySink for LogSink {
    fn deliver(&mut self, record: &MeasurementRecord) -> Result<(), DaqError> {
        let (peak_t, peak_v) = record.peak().unwrap_or((0.0, 0.0));
        log::info!(
            "event #{}: {} samples over {:.1} ns, peak {:.1} mV at {:.1} ns",
            record.sequence(),
            record.len(),
            record.duration().as_secs_f64() * 1e9,
            peak_v,
            peak_t * 1e9
        );
        Ok(())
    }
}

/// Hands each event to a UI-update task over a plain mpsc channel.
#[derive(Clone)]
pub struct ForwardSink {
    tx: Sender<MeasurementRecord>,
}
impl ForwardSink {
    pub fn new(tx: Sender<MeasurementRecord>) -> Self {
        Self { tx }
    }
}
impl DisplaySink for ForwardSink {
    fn deliver(&mut self, record: &MeasurementRecord) -> Result<(), DaqError> {
        self.tx.send(record.clone()).map_err(|_| DaqError::Delivery {
            sequence: record.sequence(),
            reason: "display task is gone".into(),
        })
    }
}

/// Keeps every delivered event in a shared vector.
#[derive(Clone, Default)]
pub struct CollectSink {
    records: Arc<Mutex<Vec<MeasurementRecord>>>,
}
impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn snapshot(&self) -> Vec<MeasurementRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl DisplaySink for CollectSink {
    fn deliver(&mut self, record: &MeasurementRecord) -> Result<(), DaqError> {
        let mut records = self.records.lock().map_err(|_| DaqError::Delivery {
            sequence: record.sequence(),
            reason: "collector lock poisoned".into(),
        })?;
        records.push(record.clone());
        Ok(())
    }
}
