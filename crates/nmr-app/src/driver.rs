use nmr_core::signal::SignalBuffer;
use nmr_core::spectrum::SpectralFrame;
use nmr_core::traits::DisplaySink;
use nmr_dsp::fft::SpectralEngine;
use nmr_serial::queue::SampleConsumer;

/// Largest up-front reservation for the signal buffer, in samples.
const MAX_PREALLOC: usize = 1 << 22;

/// One refresh step: drain the queue, grow the signal, recompute the spectrum, push both.
///
/// Runs on the display thread only; it never blocks on I/O.
pub struct RefreshDriver {
    consumer: SampleConsumer,
    signal: SignalBuffer,
    engine: SpectralEngine,
    frame: SpectralFrame,
}

impl RefreshDriver {
    #[must_use]
    pub fn new(consumer: SampleConsumer, engine: SpectralEngine, expected: u64) -> Self {
        let capacity = usize::try_from(expected).map_or(MAX_PREALLOC, |n| n.min(MAX_PREALLOC));
        Self {
            consumer,
            signal: SignalBuffer::with_capacity(capacity),
            engine,
            frame: SpectralFrame::default(),
        }
    }

    /// Run one refresh. Returns `false`, leaving everything untouched, when
    /// no new samples arrived since the previous call.
    pub fn tick(&mut self, sink: &mut dyn DisplaySink) -> bool {
        let batch = self.consumer.drain();
        if batch.is_empty() {
            return false;
        }
        log::trace!("refresh: +{} samples", batch.len());

        self.signal.extend(batch);
        self.frame = self.engine.compute(self.signal.snapshot());
        sink.show_time_series(self.signal.snapshot());
        sink.show_spectrum(&self.frame);
        true
    }

    #[must_use]
    pub fn signal(&self) -> &SignalBuffer {
        &self.signal
    }

    /// Last computed spectrum.
    #[must_use]
    pub fn frame(&self) -> &SpectralFrame {
        &self.frame
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }
}
