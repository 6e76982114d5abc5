use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::drivers::{DaqError, DisplaySink};
use crate::types::MeasurementRecord;

/// Appends every delivered event to a CSV file, one row per sample.
pub struct CsvRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    rows: u64,
}

impl CsvRecorder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DaqError> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "event,time_ns,signal_mv")?;
        log::info!("💾 Recording started: {}", path.display());
        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn finish(mut self) -> Result<PathBuf, DaqError> {
        self.writer.flush()?;
        log::info!("💾 Recording saved ({} rows).", self.rows);
        Ok(self.path)
    }

    fn write_record(&mut self, record: &MeasurementRecord) -> std::io::Result<()> {
        for (t, v) in record.timebase().iter().zip(record.amplitude()) {
            writeln!(self.writer, "{},{:.3},{:.4}", record.sequence(), t * 1e9, v)?;
            self.rows += 1;
        }
        // 每个事件结束后刷新，进程被强制结束时最多丢一个事件
        self.writer.flush()
    }
}

impl DisplaySink for CsvRecorder {
    fn deliver(&mut self, record: &MeasurementRecord) -> Result<(), DaqError> {
        self.write_record(record).map_err(|e| DaqError::Delivery {
            sequence: record.sequence(),
            reason: e.to_string(),
        })
    }
}
