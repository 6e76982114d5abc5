use thiserror::Error;
#[derive(Debug, Error)]
pub enum DaqError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to synthesize event: {0}")]
    Synthesis(String),
    #[error("record length mismatch: timebase has {timebase} samples, amplitude has {amplitude}")]
    LengthMismatch { timebase: usize, amplitude: usize },
    #[error("sink rejected record {sequence}: {reason}")]
    Delivery { sequence: u64, reason: String },
    #[error("record channel closed")]
    ChannelClosed,
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
    #[error("source exhausted")]
    SourceExhausted,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for DaqError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        DaqError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for DaqError {
    fn from(value: image::ImageError) -> Self {
        DaqError::Plot(value.to_string())
    }
}
