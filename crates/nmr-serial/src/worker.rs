use std::thread::{self, JoinHandle};

use nmr_core::config::ProtocolConfig;
use nmr_core::run::{CancelToken, RunMonitor, RunState, StopReason};
use nmr_core::sample::AcquisitionRequest;

use crate::error::{ReaderError, TransportError};
use crate::protocol::{ProtocolReader, RunSummary};
use crate::queue::SampleProducer;
use crate::transport::Transport;

/// Background protocol reader thread.
///
/// Dropping the handle cancels the run and waits for the thread, so the
/// process never exits with the device mid-transaction.
pub struct ReaderHandle {
    cancel: CancelToken,
    monitor: RunMonitor,
    thread: Option<JoinHandle<Result<RunSummary, ReaderError>>>,
}

impl ReaderHandle {
    /// Spawn the reader thread.
    ///
    /// `connect` runs on the reader thread, so open failures take the same
    /// exit path as every other fatal error: logged, state set to
    /// `Stopped(Failed)`, cancel flag raised.
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn<T, F>(
        connect: F,
        config: ProtocolConfig,
        request: AcquisitionRequest,
        mut producer: SampleProducer,
        status_tx: Option<flume::Sender<String>>,
    ) -> anyhow::Result<Self>
    where
        T: Transport + 'static,
        F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let monitor = RunMonitor::new();

        let thread_cancel = cancel.clone();
        let thread_monitor = monitor.clone();
        let thread = thread::Builder::new()
            .name("nmr-reader".to_string())
            .spawn(move || {
                let transport = match connect() {
                    Ok(transport) => transport,
                    Err(e) => {
                        log::error!("Transport error: {e}");
                        thread_monitor.set(RunState::Stopped(StopReason::Failed(e.to_string())));
                        thread_cancel.cancel();
                        return Err(e.into());
                    }
                };
                let mut reader = ProtocolReader::new(transport, config, thread_cancel)
                    .with_monitor(thread_monitor);
                if let Some(tx) = status_tx {
                    reader = reader.with_status_channel(tx);
                }
                let result = reader.run(request, &mut producer);
                log::info!("--- Reader finished ---");
                result
            })?;

        Ok(Self {
            cancel,
            monitor,
            thread: Some(thread),
        })
    }

    /// Ask the reader to stop. It notices within one transport read timeout.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The flag shared with the reader; raised by the reader itself on exit.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.monitor.get()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the reader thread and return its outcome.
    ///
    /// # Errors
    /// Returns the reader's error, or an error if the thread panicked.
    pub fn join(mut self) -> anyhow::Result<RunSummary> {
        let Some(thread) = self.thread.take() else {
            anyhow::bail!("reader thread already joined");
        };
        let outcome = thread
            .join()
            .map_err(|_| anyhow::anyhow!("reader thread panicked"))?;
        Ok(outcome?)
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel.cancel();
            let _ = thread.join();
        }
    }
}
