use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;

/// Shared set-once cancellation flag.
///
/// Set by the reader when it exits (for any reason) and by the display side
/// when it closes. Cloning shares the same flag.
///
/// # Example
/// ```
/// use nmr_core::run::CancelToken;
/// let token = CancelToken::new();
/// let other = token.clone();
/// assert!(!token.is_cancelled());
/// other.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Why a run stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of samples was read.
    Completed,
    /// The device stopped sending mid-run (short read or end of stream).
    StreamEnded,
    /// The cancellation flag was raised from outside the reader.
    Cancelled,
    /// A transport or protocol error aborted the run.
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::StreamEnded => f.write_str("stream ended"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// Lifecycle of one acquisition run, driven by the protocol reader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    /// Reader not started yet.
    #[default]
    Idle,
    /// Waiting for the ready line, sending the command, reading status lines.
    Handshaking,
    /// Binary frames are arriving.
    Streaming,
    /// Reader has exited.
    Stopped(StopReason),
}

impl RunState {
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Handshaking => f.write_str("handshaking"),
            Self::Streaming => f.write_str("streaming"),
            Self::Stopped(reason) => write!(f, "stopped ({reason})"),
        }
    }
}

/// Lock-free shared view of the current [`RunState`].
///
/// The reader thread writes, the display side reads once per refresh.
///
/// # Example
/// ```
/// use nmr_core::run::{RunMonitor, RunState};
/// let monitor = RunMonitor::new();
/// assert_eq!(monitor.get(), RunState::Idle);
/// monitor.set(RunState::Streaming);
/// assert_eq!(monitor.clone().get(), RunState::Streaming);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RunMonitor {
    state: Arc<ArcSwap<RunState>>,
}

impl RunMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, state: RunState) {
        log::debug!("run state -> {state}");
        self.state.store(Arc::new(state));
    }

    #[must_use]
    pub fn get(&self) -> RunState {
        RunState::clone(&self.state.load())
    }
}
