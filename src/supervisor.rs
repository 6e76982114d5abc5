// src/supervisor.rs
use std::thread::JoinHandle;
use std::time::Instant;

use crate::drivers::{record_channel, DaqConfig, DaqError, DisplaySink, EventSource, ShutdownFlag};
use crate::engine;
use crate::types::{ConsumerStats, GeneratorStats, ShutdownReport};

/// Owns the shutdown flag and both pipeline threads.
pub struct Supervisor {
    shutdown: ShutdownFlag,
    generator: JoinHandle<Result<GeneratorStats, DaqError>>,
    consumer: JoinHandle<Result<ConsumerStats, DaqError>>,
}

impl Supervisor {
    /// Validates `config`, then starts the generator and the consumer.
    pub fn start<S, K>(config: &DaqConfig, source: S, sink: K) -> Result<Self, DaqError>
    where
        S: EventSource + 'static,
        K: DisplaySink + 'static,
    {
        config.validate()?;
        let shutdown = ShutdownFlag::new();
        let (tx, rx) = record_channel(&config.channel);
        let generator =
            engine::spawn_generator(config.sleep, config.seed, source, tx, shutdown.clone())?;
        let consumer = match engine::spawn_consumer(config.consumer, rx, sink, shutdown.clone()) {
            Ok(handle) => handle,
            Err(e) => {
                shutdown.request();
                let _ = generator.join();
                return Err(e);
            }
        };
        log::info!("DAQ pipeline running");
        Ok(Self {
            shutdown,
            generator,
            consumer,
        })
    }

    /// Handle for code that needs to request a stop from elsewhere (e.g. a
    /// Ctrl-C handler). Interrupts reach the pipeline threads only through
    /// this flag; neither thread installs or observes a signal handler.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Sets the flag. Safe to call any number of times.
    pub fn request_shutdown(&self) {
        if self.shutdown.request() {
            log::info!("DAQ shutting down...");
        }
    }

    /// Both threads have exited on their own (source failure, sink halt, or a
    /// completed shutdown).
    pub fn is_finished(&self) -> bool {
        self.generator.is_finished() && self.consumer.is_finished()
    }

    /// Stops the pipeline and waits for both threads.
    ///
    /// The flag is set before anything is joined, so the generator leaves its
    /// pause within one maximum sleep interval at worst. A consumer halted by a
    /// sink failure turns into `Err`; a generator killed by a synthesis error is
    /// only recorded in the report. A panic on either thread is returned as
    /// `ThreadPanicked`, after both threads have been joined.
    pub fn stop(self) -> Result<ShutdownReport, DaqError> {
        let started = Instant::now();
        self.request_shutdown();

        // Join both before looking at either result; no thread is left detached.
        let generator = self.generator.join();
        let consumer = self.consumer.join();

        let generator = generator.map_err(|_| DaqError::ThreadPanicked("generator"));
        let consumer = consumer.map_err(|_| DaqError::ThreadPanicked("consumer"));
        let (generator, generator_error) = match generator {
            Ok(Ok(stats)) => (stats, None),
            Ok(Err(e)) | Err(e) => (GeneratorStats::default(), Some(e)),
        };
        let consumer = match consumer.and_then(|result| result) {
            Ok(stats) => stats,
            Err(e) => {
                log::error!(
                    "consumer failed after {} generated events: {e}",
                    generator.emitted
                );
                // A dead generator outranks a failing display.
                return Err(match generator_error {
                    Some(err @ DaqError::ThreadPanicked(_)) => err,
                    Some(other) => {
                        log::error!("generator also failed: {other}");
                        e
                    }
                    None => e,
                });
            }
        };
        if let Some(DaqError::ThreadPanicked(which)) = generator_error {
            return Err(DaqError::ThreadPanicked(which));
        }

        let latency = started.elapsed();
        log::info!(
            "Done. {} events generated, {} delivered, shutdown took {:?}",
            generator.emitted,
            consumer.delivered,
            latency
        );
        Ok(ShutdownReport {
            generator,
            consumer,
            generator_error,
            latency,
        })
    }
}
