// src/drivers/mod.rs
pub mod channel;
pub mod config;
pub mod error;
pub mod plot;
pub mod shutdown;
pub mod sink;
pub mod source;
pub use channel::{record_channel, Pull, Push, RecordReceiver, RecordSender};
pub use config::{
    ChannelConfig, ConsumerConfig, DaqConfig, PulseShape, SinkErrorPolicy, SleepInterval,
};
pub use error::DaqError;
pub use plot::{render_event_png, PlotStyle, PngSnapshotSink};
pub use shutdown::ShutdownFlag;
pub use sink::{CollectSink, DisplaySink, ForwardSink, LogSink};
pub use source::{EventSource, ManualSource, PulseSynth};
