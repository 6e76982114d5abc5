use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::drivers::config::ChannelConfig;
use crate::types::MeasurementRecord;

/// Result of handing one record to the channel.
#[derive(Debug, PartialEq)]
pub enum Push {
    Queued,
    /// Bounded queue stayed full for the whole push timeout.
    Rejected,
    /// The consumer side is gone.
    Closed,
}

/// Result of one bounded wait on the channel.
#[derive(Debug)]
pub enum Pull {
    Record(MeasurementRecord),
    Idle,
    Closed,
}

/// Producer half. Only the generator holds one.
pub struct RecordSender {
    tx: Sender<MeasurementRecord>,
    push_timeout: Option<Duration>,
}

/// Consumer half. Only the consumer holds one.
pub struct RecordReceiver {
    rx: Receiver<MeasurementRecord>,
}

pub fn record_channel(config: &ChannelConfig) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = match config.capacity {
        Some(capacity) => crossbeam_channel::bounded(capacity),
        None => crossbeam_channel::unbounded(),
    };
    let push_timeout = config.capacity.map(|_| config.push_timeout());
    (RecordSender { tx, push_timeout }, RecordReceiver { rx })
}

impl RecordSender {
    pub fn push(&self, record: MeasurementRecord) -> Push {
        match self.push_timeout {
            None => match self.tx.send(record) {
                Ok(()) => Push::Queued,
                Err(_) => Push::Closed,
            },
            Some(timeout) => match self.tx.send_timeout(record, timeout) {
                Ok(()) => Push::Queued,
                Err(SendTimeoutError::Timeout(_)) => Push::Rejected,
                Err(SendTimeoutError::Disconnected(_)) => Push::Closed,
            },
        }
    }
}

impl RecordReceiver {
    pub fn pull(&self, timeout: Duration) -> Pull {
        match self.rx.recv_timeout(timeout) {
            Ok(record) => Pull::Record(record),
            Err(RecvTimeoutError::Timeout) => Pull::Idle,
            Err(RecvTimeoutError::Disconnected) => Pull::Closed,
        }
    }

    /// Records currently waiting in the queue.
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }
}
