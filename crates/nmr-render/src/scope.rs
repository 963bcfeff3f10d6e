use std::collections::VecDeque;

use nmr_core::run::RunState;
use nmr_core::sample::Sample;
use nmr_core::spectrum::SpectralFrame;
use nmr_core::traits::DisplaySink;

use crate::meter::ThroughputMeter;

/// Most points handed to a chart; longer series are min/max decimated.
pub const MAX_PLOT_POINTS: usize = 4096;

/// Magnitudes below this are floored before taking log10.
const LOG_FLOOR: f64 = 1.0;

/// Number of refresh ticks the throughput meter averages over.
const METER_WINDOW: usize = 20;

/// Everything the terminal UI draws, updated through [`DisplaySink`].
///
/// # Example
/// ```
/// use nmr_core::sample::Sample;
/// use nmr_core::traits::DisplaySink;
/// use nmr_render::scope::ScopeView;
///
/// let mut view = ScopeView::new(10_000, false, 8);
/// view.show_time_series(&[Sample::decode(100), Sample::decode(300)]);
/// assert_eq!(view.sample_count(), 2);
/// assert_eq!(view.time_points().len(), 2);
/// ```
pub struct ScopeView {
    sample_rate: u32,
    log_magnitude: bool,
    source: String,
    sample_count: usize,
    time_points: Vec<(f64, f64)>,
    time_bounds: ([f64; 2], [f64; 2]),
    /// Last frame received, kept so the magnitude scale can be switched.
    frame: SpectralFrame,
    spectrum_points: Vec<(f64, f64)>,
    spectrum_bounds: ([f64; 2], [f64; 2]),
    peak: Option<(f64, f64)>,
    status: VecDeque<String>,
    status_capacity: usize,
    state: RunState,
    meter: ThroughputMeter,
}

impl ScopeView {
    #[must_use]
    pub fn new(sample_rate: u32, log_magnitude: bool, status_lines: usize) -> Self {
        let status_capacity = status_lines.max(1);
        let nyquist = f64::from(sample_rate) / 2.0;
        Self {
            sample_rate,
            log_magnitude,
            source: String::new(),
            sample_count: 0,
            time_points: Vec::new(),
            time_bounds: ([0.0, 1.0], [0.0, f64::from(nmr_core::sample::SAMPLE_MAX)]),
            frame: SpectralFrame::default(),
            spectrum_points: Vec::new(),
            spectrum_bounds: ([0.0, nyquist], [0.0, 1.0]),
            peak: None,
            status: VecDeque::with_capacity(status_capacity),
            status_capacity,
            state: RunState::Idle,
            meter: ThroughputMeter::new(METER_WINDOW),
        }
    }

    /// Label for the data source shown in the title, e.g. the port name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Append a device status line, dropping the oldest once full.
    pub fn push_status(&mut self, line: impl Into<String>) {
        if self.status.len() == self.status_capacity {
            self.status.pop_front();
        }
        self.status.push_back(line.into());
    }

    pub fn set_state(&mut self, state: RunState) {
        if state.is_stopped() && !self.state.is_stopped() {
            self.meter.reset();
        }
        self.state = state;
    }

    pub fn toggle_log_magnitude(&mut self) {
        self.log_magnitude = !self.log_magnitude;
        self.rebuild_spectrum();
    }

    fn rebuild_spectrum(&mut self) {
        let log = self.log_magnitude;
        self.spectrum_points = decimate(
            self.frame
                .bins()
                .map(|(f, m)| (f, if log { m.max(LOG_FLOOR).log10() } else { m })),
            self.frame.len(),
            MAX_PLOT_POINTS,
        );
        let nyquist = f64::from(self.sample_rate) / 2.0;
        self.spectrum_bounds = (
            [0.0, nyquist],
            padded_range(self.spectrum_points.iter().map(|p| p.1)),
        );
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn log_magnitude(&self) -> bool {
        self.log_magnitude
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Captured time in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / f64::from(self.sample_rate.max(1))
    }

    #[must_use]
    pub fn time_points(&self) -> &[(f64, f64)] {
        &self.time_points
    }

    /// `(x, y)` axis bounds of the time-domain chart.
    #[must_use]
    pub fn time_bounds(&self) -> ([f64; 2], [f64; 2]) {
        self.time_bounds
    }

    #[must_use]
    pub fn spectrum_points(&self) -> &[(f64, f64)] {
        &self.spectrum_points
    }

    /// `(x, y)` axis bounds of the spectrum chart.
    #[must_use]
    pub fn spectrum_bounds(&self) -> ([f64; 2], [f64; 2]) {
        self.spectrum_bounds
    }

    /// Dominant non-DC bin as `(Hz, raw magnitude)`.
    #[must_use]
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.peak
    }

    pub fn status_lines(&self) -> impl Iterator<Item = &str> {
        self.status.iter().map(String::as_str)
    }

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Samples per second arriving at the display.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        self.meter.rate()
    }
}

impl DisplaySink for ScopeView {
    fn show_time_series(&mut self, samples: &[Sample]) {
        self.sample_count = samples.len();
        self.meter.record(samples.len());
        self.time_points = decimate(
            samples
                .iter()
                .enumerate()
                .map(|(i, &s)| (i as f64, f64::from(s))),
            samples.len(),
            MAX_PLOT_POINTS,
        );
        let x_max = samples.len().saturating_sub(1).max(1) as f64;
        self.time_bounds = ([0.0, x_max], padded_range(self.time_points.iter().map(|p| p.1)));
    }

    fn show_spectrum(&mut self, frame: &SpectralFrame) {
        self.peak = frame.peak();
        self.frame.clone_from(frame);
        self.rebuild_spectrum();
    }
}

/// `[min, max]` of `values` with 5% headroom; a flat or empty series gets a unit span.
fn padded_range(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    let span = hi - lo;
    if span <= f64::EPSILON {
        return [lo - 0.5, hi + 0.5];
    }
    let pad = span * 0.05;
    [lo - pad, hi + pad]
}

/// Reduce to at most `max` points, keeping the minimum and maximum of each bucket
/// so peaks survive. Points stay in x order.
fn decimate(
    points: impl Iterator<Item = (f64, f64)>,
    len: usize,
    max: usize,
) -> Vec<(f64, f64)> {
    if len <= max {
        return points.collect();
    }
    let buckets = (max / 2).max(1);
    let per_bucket = len.div_ceil(buckets);
    let mut out = Vec::with_capacity(buckets * 2);
    let mut bucket: Vec<(f64, f64)> = Vec::with_capacity(per_bucket);
    for p in points {
        bucket.push(p);
        if bucket.len() == per_bucket {
            flush_bucket(&mut bucket, &mut out);
        }
    }
    flush_bucket(&mut bucket, &mut out);
    out
}

fn flush_bucket(bucket: &mut Vec<(f64, f64)>, out: &mut Vec<(f64, f64)>) {
    let lo = bucket.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1));
    let hi = bucket.iter().copied().max_by(|a, b| a.1.total_cmp(&b.1));
    if let (Some(lo), Some(hi)) = (lo, hi) {
        if lo.0 <= hi.0 {
            out.extend([lo, hi]);
        } else {
            out.extend([hi, lo]);
        }
    }
    bucket.clear();
}
