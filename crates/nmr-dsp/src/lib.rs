// Spectral analysis for nmrscope.

pub mod fft;

pub use fft::SpectralEngine;
