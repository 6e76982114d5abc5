// src/main.rs
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fakedaq::drivers::{LogSink, PlotStyle, PngSnapshotSink, SleepInterval};
use fakedaq::recorder::CsvRecorder;
use fakedaq::{DaqConfig, DisplaySink, PulseSynth, Supervisor};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SinkKind {
    /// One log line per event
    Log,
    /// Append samples to a CSV file
    Csv,
    /// Redraw the latest event into a PNG file
    Png,
}

/// Fake scintillator DAQ: generates random PMT pulses on a background thread
/// and hands them to a display sink until Ctrl-C.
#[derive(Debug, Parser)]
#[command(name = "fakedaq", version)]
struct Cli {
    /// JSON configuration file; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Where events go
    #[arg(long, value_enum, default_value_t = SinkKind::Log)]
    sink: SinkKind,
    /// Output file for the csv and png sinks
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long)]
    duration: Option<f64>,
    /// Longest random pause between events, in seconds
    #[arg(long)]
    max_sleep: Option<f64>,
    /// Fixed RNG seed
    #[arg(long)]
    seed: Option<u64>,
}

fn load_config(cli: &Cli) -> Result<DaqConfig> {
    let mut config = match &cli.config {
        Some(path) => DaqConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DaqConfig::default(),
    };
    if let Some(max) = cli.max_sleep {
        config.sleep = SleepInterval::new(config.sleep.min_secs.min(max), max);
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// `None` runs until Ctrl-C, as does a duration too long to land on a real instant.
fn run_deadline(duration: Option<f64>) -> Result<Option<Instant>> {
    let Some(secs) = duration else {
        return Ok(None);
    };
    let span = Duration::try_from_secs_f64(secs)
        .with_context(|| format!("--duration {secs} is not a usable number of seconds"))?;
    Ok(Instant::now().checked_add(span))
}

fn build_sink(kind: SinkKind, output: Option<PathBuf>) -> Result<Box<dyn DisplaySink>> {
    let sink: Box<dyn DisplaySink> = match kind {
        SinkKind::Log => Box::new(LogSink),
        SinkKind::Csv => {
            let path = output.unwrap_or_else(|| PathBuf::from("events.csv"));
            let recorder = CsvRecorder::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            Box::new(recorder)
        }
        SinkKind::Png => {
            let path = output.unwrap_or_else(|| PathBuf::from("latest_event.png"));
            Box::new(PngSnapshotSink::new(path, PlotStyle::default()))
        }
    };
    Ok(sink)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let deadline = run_deadline(cli.duration)?;
    let sink = build_sink(cli.sink, cli.output.clone())?;
    let source = PulseSynth::new(config.pulse, config.seed).context("setting up pulse synth")?;

    let supervisor = Supervisor::start(&config, source, sink).context("starting pipeline")?;
    let shutdown = supervisor.shutdown_flag();
    {
        // Only this process-wide handler sees Ctrl-C; the pipeline threads just see the flag.
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.request();
        })
        .context("installing Ctrl-C handler")?;
    }

    while !shutdown.is_set() && !supervisor.is_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        shutdown.sleep(Duration::from_millis(100));
    }

    let report = supervisor.stop()?;
    if let Some(e) = &report.generator_error {
        log::error!("generator failed: {e}");
    }
    println!(
        "{} events generated, {} dropped, {} delivered, {} failed",
        report.generator.emitted,
        report.generator.dropped,
        report.consumer.delivered,
        report.consumer.failed
    );
    Ok(())
}
