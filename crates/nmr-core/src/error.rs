use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Acquisition durations must both be positive.
    #[error("invalid acquisition request: pulse={pulse_ms}ms read={read_ms}ms (both must be > 0)")]
    InvalidRequest {
        /// Excitation pulse length in milliseconds.
        pulse_ms: u32,
        /// Read window length in milliseconds.
        read_ms: u32,
    },
}
