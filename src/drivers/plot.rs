use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::DaqError;
use crate::drivers::sink::DisplaySink;
use crate::types::MeasurementRecord;
const GRID_STEP_MV: f64 = 100.0;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    /// Fixed signal axis in mV; `None` fits the axis to the event.
    pub y_range_mv: Option<(f64, f64)>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        // White scope screen, black trace, negative PMT pulses up to 500 mV.
        Self {
            width: 900,
            height: 400,
            background: WHITE,
            trace: BLACK,
            y_range_mv: Some((-500.0, 0.0)),
        }
    }
}
pub fn render_event_png(
    record: &MeasurementRecord,
    style: &PlotStyle,
) -> Result<Vec<u8>, DaqError> {
    if record.is_empty() {
        return Err(DaqError::Plot(format!(
            "event #{} has no samples",
            record.sequence()
        )));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let times_ns: Vec<f64> = record.timebase().iter().map(|t| t * 1e9).collect();
        let x_min = times_ns.first().copied().unwrap_or(0.0);
        let x_max = times_ns.last().copied().unwrap_or(1.0).max(x_min + 1e-3);
        let (y_min, y_max) = match style.y_range_mv {
            Some(range) => range,
            None => fit_range(record.amplitude()),
        };
        // No font backend is compiled in: no captions or tick labels.
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        let grid = style.trace.mix(0.15);
        let mut level = (y_min / GRID_STEP_MV).ceil() * GRID_STEP_MV;
        while level <= y_max {
            chart.draw_series(LineSeries::new(vec![(x_min, level), (x_max, level)], &grid))?;
            level += GRID_STEP_MV;
        }
        let series = times_ns
            .iter()
            .copied()
            .zip(record.amplitude().iter().copied());
        chart.draw_series(LineSeries::new(series, &style.trace))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn fit_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(0.0f64, f64::min);
    let max = values.iter().copied().fold(0.0f64, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (-50.0, 50.0)
    } else {
        (min, max)
    }
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DaqError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| DaqError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
/// Redraws the most recent event into a PNG file, replacing the previous one.
pub struct PngSnapshotSink {
    path: PathBuf,
    style: PlotStyle,
}
impl PngSnapshotSink {
    pub fn new(path: impl Into<PathBuf>, style: PlotStyle) -> Self {
        Self {
            path: path.into(),
            style,
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl DisplaySink for PngSnapshotSink {
    fn deliver(&mut self, record: &MeasurementRecord) -> Result<(), DaqError> {
        let png = render_event_png(record, &self.style)?;
        fs::write(&self.path, png).map_err(|e| DaqError::Delivery {
            sequence: record.sequence(),
            reason: e.to_string(),
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{EventSource, PulseShape, PulseSynth};
    #[test]
    fn renders_a_synthetic_event() {
        let mut synth = PulseSynth::new(PulseShape::default(), Some(3)).unwrap();
        let record = synth.next_record(0).unwrap();
        let png = render_event_png(&record, &PlotStyle::default()).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        let auto = PlotStyle {
            y_range_mv: None,
            ..PlotStyle::default()
        };
        assert!(!render_event_png(&record, &auto).unwrap().is_empty());
    }
    #[test]
    fn empty_event_is_a_plot_error() {
        let record = MeasurementRecord::new(1, vec![], vec![]).unwrap();
        assert!(matches!(
            render_event_png(&record, &PlotStyle::default()),
            Err(DaqError::Plot(_))
        ));
    }
    #[test]
    fn snapshot_sink_overwrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest_event.png");
        let mut sink = PngSnapshotSink::new(&path, PlotStyle::default());
        let mut synth = PulseSynth::new(PulseShape::default(), Some(8)).unwrap();
        sink.deliver(&synth.next_record(0).unwrap()).unwrap();
        sink.deliver(&synth.next_record(1).unwrap()).unwrap();
        let bytes = fs::read(sink.path()).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
