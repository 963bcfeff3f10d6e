use std::sync::Arc;

use nmr_core::sample::Sample;
use nmr_core::spectrum::SpectralFrame;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

/// Full-buffer real FFT using realfft.
///
/// Every call transforms the whole sequence it is given; nothing carries
/// over between calls except cached plans and scratch allocations.
///
/// # Example
/// ```
/// use nmr_dsp::fft::SpectralEngine;
/// let engine = SpectralEngine::new(10_000);
/// assert_eq!(engine.sample_rate(), 10_000);
/// ```
pub struct SpectralEngine {
    sample_rate: u32,
    planner: RealFftPlanner<f64>,
    input_buf: Vec<f64>,
    spectrum_buf: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralEngine {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            planner: RealFftPlanner::new(),
            input_buf: Vec::new(),
            spectrum_buf: Vec::new(),
            scratch: Vec::new(),
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Transform `samples` and keep the non-negative half.
    ///
    /// Returns `floor(N/2) + 1` bins at `k * sample_rate / N` Hz with the
    /// unnormalised magnitude of each coefficient. Fewer than two samples
    /// give an empty frame.
    ///
    /// # Example
    /// ```
    /// use nmr_core::sample::Sample;
    /// use nmr_dsp::fft::SpectralEngine;
    /// let mut engine = SpectralEngine::new(1000);
    /// let frame = engine.compute(&[Sample::decode(1); 10]);
    /// assert_eq!(frame.len(), 6);
    /// assert_eq!(frame.frequencies[5], 500.0);
    /// assert!((frame.magnitudes[0] - 10.0).abs() < 1e-9);
    /// ```
    pub fn compute(&mut self, samples: &[Sample]) -> SpectralFrame {
        let n = samples.len();
        if n <= 1 {
            return SpectralFrame::default();
        }

        let plan: Arc<dyn RealToComplex<f64>> = self.planner.plan_fft_forward(n);

        self.input_buf.clear();
        self.input_buf.extend(samples.iter().copied().map(f64::from));
        self.spectrum_buf.resize(n / 2 + 1, Complex::default());
        self.scratch.resize(plan.get_scratch_len(), Complex::default());

        if let Err(e) =
            plan.process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
        {
            log::error!("FFT of {n} samples failed: {e}");
            return SpectralFrame::default();
        }

        let bin_width = f64::from(self.sample_rate) / n as f64;
        SpectralFrame {
            frequencies: (0..self.spectrum_buf.len())
                .map(|k| k as f64 * bin_width)
                .collect(),
            magnitudes: self.spectrum_buf.iter().map(|c| c.norm()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use super::*;

    fn tone(n: usize, sample_rate: u32, freq: f64) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let t = i as f64 / f64::from(sample_rate);
                let v = 2048.0 + 1000.0 * (TAU * freq * t).sin();
                Sample::decode(v.round() as u16)
            })
            .collect()
    }

    #[test]
    fn fewer_than_two_samples_give_empty_frame() {
        let mut engine = SpectralEngine::new(10_000);
        assert!(engine.compute(&[]).is_empty());
        assert!(engine.compute(&[Sample::decode(5)]).is_empty());
    }

    #[test]
    fn bin_count_is_half_plus_one() {
        let mut engine = SpectralEngine::new(10_000);
        for n in (2..=17).chain([999, 1000, 1001]) {
            let samples = vec![Sample::decode(100); n];
            let frame = engine.compute(&samples);
            assert_eq!(frame.len(), n / 2 + 1, "n = {n}");
            assert_eq!(frame.magnitudes.len(), frame.frequencies.len());
        }
    }

    #[test]
    fn frequencies_ascend_from_zero() {
        let mut engine = SpectralEngine::new(10_000);
        for n in [2, 3, 64, 101] {
            let frame = engine.compute(&tone(n, 10_000, 500.0));
            assert_eq!(frame.frequencies[0], 0.0);
            assert!(frame.frequencies.windows(2).all(|w| w[0] < w[1]));
            assert!(frame.frequencies.iter().all(|&f| f <= 5000.0));
        }
    }

    #[test]
    fn pure_tone_peaks_at_its_frequency() {
        let mut engine = SpectralEngine::new(10_000);
        // 1000 samples at 10 kSPS: 10 Hz bins, 1700 Hz falls on bin 170.
        let frame = engine.compute(&tone(1000, 10_000, 1700.0));
        let (freq, mag) = frame.peak().unwrap();
        assert!((freq - 1700.0).abs() < 1e-9);
        // Amplitude 1000 over N samples concentrates to about 1000 * N / 2.
        assert!((mag - 500_000.0).abs() < 5_000.0, "magnitude {mag}");
    }

    #[test]
    fn constant_signal_is_all_dc() {
        let mut engine = SpectralEngine::new(10_000);
        let frame = engine.compute(&[Sample::decode(2048); 100]);
        assert!((frame.magnitudes[0] - 204_800.0).abs() < 1e-6);
        assert!(frame.magnitudes[1..].iter().all(|&m| m < 1e-6));
    }

    #[test]
    fn growing_buffer_recomputes_from_scratch() {
        let mut engine = SpectralEngine::new(10_000);
        let signal = tone(2000, 10_000, 1700.0);
        let first = engine.compute(&signal[..1000]);
        let second = engine.compute(&signal);
        let fresh = SpectralEngine::new(10_000).compute(&signal);
        assert_eq!(first.len(), 501);
        assert_eq!(second, fresh);
    }
}
