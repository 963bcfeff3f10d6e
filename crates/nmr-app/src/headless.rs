use std::thread;
use std::time::Duration;

use nmr_core::run::CancelToken;
use nmr_core::sample::Sample;
use nmr_core::signal::SignalBuffer;
use nmr_core::spectrum::SpectralFrame;
use nmr_core::traits::DisplaySink;
use nmr_serial::ReaderHandle;

use crate::driver::RefreshDriver;

/// Display sink for runs without a terminal: one log line per update.
pub struct LogSink {
    sample_rate: u32,
    samples: usize,
    updates: usize,
}

impl LogSink {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            samples: 0,
            updates: 0,
        }
    }

    /// Number of spectrum updates logged so far.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl DisplaySink for LogSink {
    fn show_time_series(&mut self, samples: &[Sample]) {
        self.samples = samples.len();
    }

    fn show_spectrum(&mut self, frame: &SpectralFrame) {
        self.updates += 1;
        let secs = self.samples as f64 / f64::from(self.sample_rate);
        match frame.peak() {
            Some((hz, magnitude)) => log::info!(
                "{} samples ({secs:.3} s), {} bins, peak {hz:.1} Hz ({magnitude:.0})",
                self.samples,
                frame.len()
            ),
            None => log::info!("{} samples ({secs:.3} s)", self.samples),
        }
    }
}

/// Refresh on a fixed period until the reader finishes. Raising `interrupt`
/// (Ctrl-C) stops the reader; the loop still drains what it produced.
pub fn run(
    driver: &mut RefreshDriver,
    reader: &ReaderHandle,
    interrupt: &CancelToken,
    refresh: Duration,
) {
    let mut sink = LogSink::new(driver.sample_rate());
    let mut forwarded = false;
    loop {
        let finished = reader.is_finished();
        driver.tick(&mut sink);
        if finished {
            break;
        }
        if interrupt.is_cancelled() && !forwarded {
            log::warn!("Interrupted, stopping acquisition");
            reader.cancel();
            forwarded = true;
        }
        thread::sleep(refresh);
    }
    log::info!(
        "{}",
        closing_summary(sink.updates(), driver.signal(), driver.sample_rate())
    );
}

fn closing_summary(updates: usize, signal: &SignalBuffer, sample_rate: u32) -> String {
    format!(
        "Display closed after {updates} updates, {} samples ({:.3} s)",
        signal.len(),
        signal.duration_secs(sample_rate)
    )
}
