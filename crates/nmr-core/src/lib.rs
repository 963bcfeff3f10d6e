//! Data model, configuration, and shared structures for nmrscope.
//!
//! This crate contains the types every stage of the acquisition pipeline
//! agrees on: decoded samples, the signal buffer, spectral frames, run state
//! and the display sink contract.

pub mod config;
pub mod error;
pub mod run;
pub mod sample;
pub mod signal;
pub mod spectrum;
pub mod traits;

pub use config::ScopeConfig;
pub use error::CoreError;
pub use run::{CancelToken, RunMonitor, RunState, StopReason};
pub use sample::{AcquisitionRequest, Sample};
pub use signal::SignalBuffer;
pub use spectrum::SpectralFrame;
pub use traits::DisplaySink;
