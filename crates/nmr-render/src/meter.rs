use std::collections::VecDeque;
use std::time::Instant;

/// Sample throughput over a sliding window of refresh ticks.
///
/// # Example
/// ```
/// use nmr_render::meter::ThroughputMeter;
/// let mut meter = ThroughputMeter::new(20);
/// meter.record(0);
/// assert!(meter.rate().abs() < f64::EPSILON);
/// ```
pub struct ThroughputMeter {
    /// (time, running sample total) of the last N ticks.
    marks: VecDeque<(Instant, usize)>,
    window: usize,
    rate: f64,
}

impl ThroughputMeter {
    /// Create a meter averaging over `window` ticks (at least two).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            marks: VecDeque::with_capacity(window + 1),
            window,
            rate: 0.0,
        }
    }

    /// Record the running total after a refresh.
    pub fn record(&mut self, total: usize) {
        self.record_at(Instant::now(), total);
    }

    fn record_at(&mut self, now: Instant, total: usize) {
        self.marks.push_back((now, total));
        if self.marks.len() > self.window {
            self.marks.pop_front();
        }
        if self.marks.len() >= 2
            && let Some(&(t0, n0)) = self.marks.front()
        {
            let secs = now.duration_since(t0).as_secs_f64();
            if secs > 0.0 {
                self.rate = total.saturating_sub(n0) as f64 / secs;
            }
        }
    }

    /// Samples per second across the window.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Forget history, e.g. once the stream has stopped.
    pub fn reset(&mut self) {
        self.marks.clear();
        self.rate = 0.0;
    }
}
