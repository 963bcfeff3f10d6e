use nmr_core::sample::Sample;

/// Create the unbounded single-producer/single-consumer sample queue.
///
/// Acquisition length is bounded by the request, so the queue never needs a cap.
///
/// # Example
/// ```
/// use nmr_core::sample::Sample;
/// use nmr_serial::queue::sample_queue;
/// let (mut tx, mut rx) = sample_queue();
/// tx.push(Sample::decode(7));
/// assert_eq!(rx.drain(), vec![Sample::decode(7)]);
/// assert!(rx.drain().is_empty());
/// ```
#[must_use]
pub fn sample_queue() -> (SampleProducer, SampleConsumer) {
    let (tx, rx) = flume::unbounded();
    (SampleProducer { tx }, SampleConsumer { rx })
}

/// Reader side of the queue.
pub struct SampleProducer {
    tx: flume::Sender<Sample>,
}

impl SampleProducer {
    /// Enqueue one sample. Never blocks.
    ///
    /// Returns `false` once the consumer has been dropped.
    pub fn push(&mut self, sample: Sample) -> bool {
        self.tx.send(sample).is_ok()
    }
}

/// Refresh side of the queue.
pub struct SampleConsumer {
    rx: flume::Receiver<Sample>,
}

impl SampleConsumer {
    /// Take everything queued at the time of the call, in FIFO order.
    ///
    /// Samples pushed while draining stay queued for the next call.
    #[must_use]
    pub fn drain(&mut self) -> Vec<Sample> {
        let queued = self.rx.len();
        self.rx.try_iter().take(queued).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
