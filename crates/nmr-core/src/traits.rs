use crate::sample::Sample;
use crate::spectrum::SpectralFrame;

/// Receives refreshed series from the refresh driver and renders them.
///
/// Implemented by : `ScopeView` (terminal charts), `LogSink` (headless).
/// Each call carries the complete current data; implementations are
/// expected to rescale both axes to the new range.
///
/// # Example
/// ```
/// use nmr_core::traits::DisplaySink;
/// use nmr_core::sample::Sample;
/// use nmr_core::spectrum::SpectralFrame;
///
/// #[derive(Default)]
/// struct CountingSink { points: usize, bins: usize }
/// impl DisplaySink for CountingSink {
///     fn show_time_series(&mut self, samples: &[Sample]) { self.points = samples.len(); }
///     fn show_spectrum(&mut self, frame: &SpectralFrame) { self.bins = frame.len(); }
/// }
///
/// let mut sink = CountingSink::default();
/// sink.show_time_series(&[Sample::decode(1)]);
/// assert_eq!(sink.points, 1);
/// ```
pub trait DisplaySink {
    /// Raw time-domain series, one point per sample ordinal.
    fn show_time_series(&mut self, samples: &[Sample]);

    /// Frequency bins and magnitudes, parallel and ascending.
    fn show_spectrum(&mut self, frame: &SpectralFrame);
}
