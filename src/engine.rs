// src/engine.rs
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::drivers::{
    ConsumerConfig, DaqError, DisplaySink, EventSource, Pull, Push, RecordReceiver, RecordSender,
    ShutdownFlag, SinkErrorPolicy, SleepInterval,
};
use crate::types::{ConsumerStats, GeneratorStats};

/// Starts the fake acquisition on its own thread.
///
/// The thread never touches signal handlers; interrupts are the supervisor's
/// business and only ever reach the generator as a set shutdown flag.
pub fn spawn_generator<S: EventSource + 'static>(
    sleep: SleepInterval,
    seed: Option<u64>,
    source: S,
    tx: RecordSender,
    shutdown: ShutdownFlag,
) -> Result<JoinHandle<Result<GeneratorStats, DaqError>>, DaqError> {
    let handle = thread::Builder::new()
        .name("daq-generator".into())
        .spawn(move || run_generator(sleep, seed, source, tx, shutdown))?;
    Ok(handle)
}

/// Event loop of the acquisition: pause a random while, synthesize one event,
/// queue it. Returns when the flag is set or the consumer is gone.
pub fn run_generator<S: EventSource>(
    sleep: SleepInterval,
    seed: Option<u64>,
    mut source: S,
    tx: RecordSender,
    shutdown: ShutdownFlag,
) -> Result<GeneratorStats, DaqError> {
    // Pause lengths get their own stream so they do not shift the event data.
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let mut stats = GeneratorStats::default();
    log::info!(
        "generator started, pause {:.3}..{:.3} s",
        sleep.min_secs,
        sleep.max_secs
    );

    while !shutdown.is_set() {
        // 1. 随机等待 (模拟事件到达间隔)
        let pause = random_pause(&mut rng, &sleep);
        if !shutdown.sleep(pause) {
            break;
        }

        // 2. 合成事件
        let record = source.next_record(stats.emitted + stats.dropped).map_err(|e| {
            log::error!("generator stopping: {e}");
            e
        })?;
        let sequence = record.sequence();

        // 3. 入队
        match tx.push(record) {
            Push::Queued => {
                stats.emitted += 1;
                log::debug!("queued event #{sequence}");
            }
            Push::Rejected => {
                stats.dropped += 1;
                log::warn!("queue full, dropped event #{sequence}");
            }
            Push::Closed => {
                log::info!("consumer gone, generator stopping");
                break;
            }
        }
    }

    log::info!(
        "generator stopped after {} events ({} dropped)",
        stats.emitted,
        stats.dropped
    );
    Ok(stats)
}

fn random_pause(rng: &mut StdRng, sleep: &SleepInterval) -> Duration {
    let secs = if sleep.max_secs > sleep.min_secs {
        rng.gen_range(sleep.min_secs..=sleep.max_secs)
    } else {
        sleep.min_secs
    };
    // Bounds are validated at startup; saturate rather than panic if they were not.
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// Starts the consumer worker on its own thread, away from whatever drives the display.
pub fn spawn_consumer<K: DisplaySink + 'static>(
    config: ConsumerConfig,
    rx: RecordReceiver,
    sink: K,
    shutdown: ShutdownFlag,
) -> Result<JoinHandle<Result<ConsumerStats, DaqError>>, DaqError> {
    let handle = thread::Builder::new()
        .name("daq-consumer".into())
        .spawn(move || {
            let mut sink = sink;
            run_consumer(&config, &rx, &mut sink, &shutdown)
        })?;
    Ok(handle)
}

/// Drains the channel into `sink` in arrival order.
///
/// The flag is checked before every pull. A pull waits at most
/// `poll_interval`, so a stop request is seen within one interval even when no
/// events arrive. A record that was already pulled when the flag flipped is
/// still delivered; nothing is pulled after that.
pub fn run_consumer<K: DisplaySink + ?Sized>(
    config: &ConsumerConfig,
    rx: &RecordReceiver,
    sink: &mut K,
    shutdown: &ShutdownFlag,
) -> Result<ConsumerStats, DaqError> {
    let mut stats = ConsumerStats::default();
    let poll = config.poll_interval();

    while !shutdown.is_set() {
        let record = match rx.pull(poll) {
            Pull::Record(record) => record,
            Pull::Idle => continue,
            Pull::Closed => {
                log::info!("generator gone, consumer stopping");
                break;
            }
        };
        let sequence = record.sequence();
        match sink.deliver(&record) {
            Ok(()) => {
                stats.delivered += 1;
                stats.last_sequence = Some(sequence);
            }
            Err(e) => {
                stats.failed += 1;
                match config.on_sink_error {
                    SinkErrorPolicy::Halt => {
                        log::error!("delivery of event #{sequence} failed, consumer halting: {e}");
                        return Err(into_delivery_error(sequence, e));
                    }
                    SinkErrorPolicy::Continue => {
                        log::error!("delivery of event #{sequence} failed: {e}");
                    }
                }
            }
        }
    }

    if rx.backlog() > 0 {
        log::debug!("consumer left {} queued events behind", rx.backlog());
    }
    Ok(stats)
}

fn into_delivery_error(sequence: u64, error: DaqError) -> DaqError {
    match error {
        DaqError::Delivery { .. } => error,
        other => DaqError::Delivery {
            sequence,
            reason: other.to_string(),
        },
    }
}
