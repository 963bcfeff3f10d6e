use crate::sample::Sample;

/// Append-only buffer of decoded samples for one acquisition run.
///
/// Index = sample ordinal = implicit time axis at the device sample rate.
/// Only mutated from the refresh thread.
///
/// # Example
/// ```
/// use nmr_core::sample::Sample;
/// use nmr_core::signal::SignalBuffer;
/// let mut buf = SignalBuffer::new();
/// buf.extend([Sample::decode(1), Sample::decode(2)]);
/// assert_eq!(buf.len(), 2);
/// assert_eq!(buf.snapshot()[1].value(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SignalBuffer {
    samples: Vec<Sample>,
}

impl SignalBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for the number of samples a run is expected to produce.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append samples in the order given.
    pub fn extend(&mut self, samples: impl IntoIterator<Item = Sample>) {
        self.samples.extend(samples);
    }

    /// Read-only view of everything accumulated so far.
    #[must_use]
    pub fn snapshot(&self) -> &[Sample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Capture length in seconds at `sample_rate`.
    #[must_use]
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(sample_rate)
    }
}
