/// Positive-frequency half of the transform of the current signal buffer.
///
/// Derived and ephemeral: fully recomputed on every refresh.
///
/// # Example
/// ```
/// use nmr_core::spectrum::SpectralFrame;
/// let frame = SpectralFrame::default();
/// assert!(frame.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectralFrame {
    /// Bin frequencies in Hz, ascending, starting at 0.
    pub frequencies: Vec<f64>,
    /// Magnitude of each bin, parallel to `frequencies`.
    pub magnitudes: Vec<f64>,
}

impl SpectralFrame {
    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Bin with the largest magnitude, ignoring the DC bin.
    ///
    /// # Example
    /// ```
    /// use nmr_core::spectrum::SpectralFrame;
    /// let frame = SpectralFrame {
    ///     frequencies: vec![0.0, 10.0, 20.0],
    ///     magnitudes: vec![99.0, 3.0, 5.0],
    /// };
    /// assert_eq!(frame.peak(), Some((20.0, 5.0)));
    /// ```
    #[must_use]
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequencies
            .iter()
            .zip(&self.magnitudes)
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&f, &m)| (f, m))
    }

    /// Iterate `(frequency, magnitude)` pairs.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.magnitudes.iter().copied())
    }
}
