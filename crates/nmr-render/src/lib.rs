//! Terminal display for nmrscope.
//!
//! Provides the scope view (a `DisplaySink`), its layout, and the
//! acquisition throughput meter.

pub mod meter;
pub mod scope;
pub mod ui;

pub use scope::ScopeView;
