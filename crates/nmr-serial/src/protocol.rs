//! Command/response protocol and binary frame streaming.
//!
//! One run goes: flush input, wait for the ready line, send `NMR(p,r)`,
//! read status lines until the start-of-data marker, then decode 2-byte
//! little-endian frames until the expected count, a short read, or cancel.

use std::io::{self, BufRead, BufReader, Read};
use std::time::Instant;

use nmr_core::config::{ProtocolConfig, ReadyMatch};
use nmr_core::run::{CancelToken, RunMonitor, RunState, StopReason};
use nmr_core::sample::{AcquisitionRequest, FRAME_LEN, SYNC_WORD, Sample};

use crate::error::{ProtocolError, ReaderError, TransportError};
use crate::queue::SampleProducer;
use crate::transport::Transport;

/// Prefix the device puts on lines answering a bad command.
const DEVICE_ERROR_PREFIX: &str = "ERROR:";

/// Outcome of a run that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Samples pushed to the queue.
    pub samples: u64,
    /// Samples the request asked for.
    pub expected: u64,
    pub reason: StopReason,
}

/// Result of waiting for one text line.
enum LineRead {
    Line(String),
    TimedOut,
    Cancelled,
    Closed,
}

/// Owns the device connection for one acquisition run.
pub struct ProtocolReader<T: Transport> {
    port: BufReader<T>,
    config: ProtocolConfig,
    cancel: CancelToken,
    monitor: RunMonitor,
    status_tx: Option<flume::Sender<String>>,
    /// Bytes of a text line received before a read timed out.
    pending: Vec<u8>,
}

impl<T: Transport> ProtocolReader<T> {
    #[must_use]
    pub fn new(transport: T, config: ProtocolConfig, cancel: CancelToken) -> Self {
        Self {
            port: BufReader::new(transport),
            config,
            cancel,
            monitor: RunMonitor::new(),
            status_tx: None,
            pending: Vec::with_capacity(128),
        }
    }

    /// Publish state transitions to a shared monitor.
    #[must_use]
    pub fn with_monitor(mut self, monitor: RunMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Forward every device text line to `tx` as well as to the log.
    #[must_use]
    pub fn with_status_channel(mut self, tx: flume::Sender<String>) -> Self {
        self.status_tx = Some(tx);
        self
    }

    #[must_use]
    pub fn monitor(&self) -> &RunMonitor {
        &self.monitor
    }

    /// Give the transport back, dropping any buffered input.
    pub fn into_transport(self) -> T {
        self.port.into_inner()
    }

    /// Perform one full acquisition run, pushing decoded samples into `queue`.
    ///
    /// The cancellation flag is always raised on return, whatever the outcome.
    ///
    /// # Errors
    /// Returns a [`ReaderError`] on transport failure or protocol violation.
    pub fn run(
        &mut self,
        request: AcquisitionRequest,
        queue: &mut SampleProducer,
    ) -> Result<RunSummary, ReaderError> {
        let expected = request.samples_expected(self.config.sample_rate);
        let mut samples = 0u64;

        let outcome = self.run_phases(request, queue, expected, &mut samples);

        let reason = match &outcome {
            Ok(reason) => {
                log::info!("Run {reason}: {samples}/{expected} samples");
                reason.clone()
            }
            Err(e) => {
                log::error!("Run aborted after {samples}/{expected} samples: {e}");
                StopReason::Failed(e.to_string())
            }
        };
        self.monitor.set(RunState::Stopped(reason));
        self.cancel.cancel();

        outcome.map(|reason| RunSummary {
            samples,
            expected,
            reason,
        })
    }

    fn run_phases(
        &mut self,
        request: AcquisitionRequest,
        queue: &mut SampleProducer,
        expected: u64,
        samples: &mut u64,
    ) -> Result<StopReason, ReaderError> {
        self.monitor.set(RunState::Handshaking);
        self.port
            .get_mut()
            .clear_input()
            .map_err(TransportError::Flush)?;

        if let Some(stop) = self.handshake()? {
            return Ok(stop);
        }
        self.send_command(request)?;
        if let Some(stop) = self.await_data()? {
            return Ok(stop);
        }
        self.stream(queue, expected, samples)
    }

    fn handshake(&mut self) -> Result<Option<StopReason>, ReaderError> {
        let deadline = Instant::now() + self.config.handshake_timeout();
        let line = match self.read_line_until(deadline)? {
            LineRead::Line(line) => line,
            LineRead::Cancelled => return Ok(Some(StopReason::Cancelled)),
            LineRead::TimedOut if self.config.ready_match == ReadyMatch::Any => {
                log::warn!("No ready line before the deadline; continuing (ready_match = Any)");
                return Ok(None);
            }
            LineRead::TimedOut | LineRead::Closed => {
                return Err(ProtocolError::NoHandshake { received: None }.into());
            }
        };

        log::info!("Device says: '{line}'");
        self.report(&line);
        if self
            .config
            .ready_match
            .matches(&line, &self.config.ready_token)
        {
            Ok(None)
        } else {
            Err(ProtocolError::NoHandshake {
                received: Some(line),
            }
            .into())
        }
    }

    fn send_command(&mut self, request: AcquisitionRequest) -> Result<(), TransportError> {
        let command = request.command();
        log::info!("--> Sending command: {}", command.trim_end());
        let port = self.port.get_mut();
        port.write_all(command.as_bytes())
            .map_err(TransportError::Write)?;
        port.flush().map_err(TransportError::Flush)
    }

    /// Status phase. Each received line restarts the status deadline.
    fn await_data(&mut self) -> Result<Option<StopReason>, ReaderError> {
        let timeout = self.config.status_timeout();
        let mut deadline = Instant::now() + timeout;
        loop {
            match self.read_line_until(deadline)? {
                LineRead::Line(line) => {
                    if line.is_empty() {
                        continue;
                    }
                    log::info!("{line}");
                    self.report(&line);
                    if line.contains(&self.config.start_marker) {
                        return Ok(None);
                    }
                    if line.starts_with(DEVICE_ERROR_PREFIX) {
                        return Err(ProtocolError::DeviceRejected(line).into());
                    }
                    deadline = Instant::now() + timeout;
                }
                LineRead::Cancelled => return Ok(Some(StopReason::Cancelled)),
                LineRead::TimedOut => {
                    return Err(ProtocolError::Timeout {
                        waited_ms: self.config.status_timeout_ms,
                    }
                    .into());
                }
                LineRead::Closed => return Err(ProtocolError::Closed.into()),
            }
        }
    }

    fn stream(
        &mut self,
        queue: &mut SampleProducer,
        expected: u64,
        samples: &mut u64,
    ) -> Result<StopReason, ReaderError> {
        self.monitor.set(RunState::Streaming);
        log::info!("Streaming {expected} samples");

        while *samples < expected {
            if self.cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }
            let Some(frame) = self.read_frame()? else {
                if self.cancel.is_cancelled() {
                    return Ok(StopReason::Cancelled);
                }
                log::warn!("Short read after {samples}/{expected} samples, treating as end of stream");
                return Ok(StopReason::StreamEnded);
            };

            let raw = u16::from_le_bytes(frame);
            if self.config.drop_sync_words && raw == SYNC_WORD {
                log::debug!("sync word skipped");
                continue;
            }
            if !queue.push(Sample::decode(raw)) {
                log::warn!("Sample queue closed, stopping");
                return Ok(StopReason::Cancelled);
            }
            *samples += 1;
        }
        Ok(StopReason::Completed)
    }

    /// Read one text line, tolerating read timeouts until `deadline`.
    fn read_line_until(&mut self, deadline: Instant) -> Result<LineRead, TransportError> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(LineRead::Cancelled);
            }
            match self.port.read_until(b'\n', &mut self.pending) {
                Ok(0) if self.pending.is_empty() => return Ok(LineRead::Closed),
                // Either a full line, or the tail of the stream without a newline.
                Ok(_) => return Ok(LineRead::Line(self.take_line())),
                Err(e) if is_timeout(&e) => {
                    if Instant::now() >= deadline {
                        return Ok(LineRead::TimedOut);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::Read(e)),
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).trim().to_owned();
        self.pending.clear();
        line
    }

    /// `None` on a short read: timeout or end of stream before a full frame.
    fn read_frame(&mut self) -> Result<Option<[u8; FRAME_LEN]>, TransportError> {
        let mut frame = [0u8; FRAME_LEN];
        let mut filled = 0;
        while filled < FRAME_LEN {
            match self.port.read(&mut frame[filled..]) {
                Ok(0) => return Ok(None),
                Ok(n) => filled += n,
                Err(e) if is_timeout(&e) => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::Read(e)),
            }
        }
        Ok(Some(frame))
    }

    fn report(&self, line: &str) {
        if let Some(tx) = &self.status_tx {
            let _ = tx.send(line.to_owned());
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::queue::sample_queue;

    pub(crate) const READY: &[u8] = b"NMR Controller Ready. Waiting for commands...\n";
    pub(crate) const START: &[u8] = b"STATUS: Starting data read at 10kSPS...\n";

    pub(crate) enum Step {
        Bytes(Vec<u8>),
        /// Block for the given time, then report a read timeout.
        Stall(Duration),
        /// Raise the flag as if the consumer closed mid-read, then time out.
        Cancel(CancelToken),
    }

    /// In-memory device replaying a fixed script. EOF once the script runs out.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        pub script: VecDeque<Step>,
        pub written: Vec<u8>,
        pub cleared: bool,
    }

    impl ScriptedTransport {
        pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                script: steps.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl Read for ScriptedTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.script.pop_front() {
                None => Ok(0),
                Some(Step::Bytes(mut bytes)) => {
                    let n = buf.len().min(bytes.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.script.push_front(Step::Bytes(bytes.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Step::Stall(d)) => {
                    std::thread::sleep(d);
                    Err(io::ErrorKind::TimedOut.into())
                }
                Some(Step::Cancel(token)) => {
                    token.cancel();
                    Err(io::ErrorKind::TimedOut.into())
                }
            }
        }
    }

    impl Write for ScriptedTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for ScriptedTransport {
        fn clear_input(&mut self) -> io::Result<()> {
            self.cleared = true;
            Ok(())
        }
    }

    pub(crate) fn frames(values: impl IntoIterator<Item = u16>) -> Vec<u8> {
        values.into_iter().flat_map(u16::to_le_bytes).collect()
    }

    fn values(samples: &[Sample]) -> Vec<u16> {
        samples.iter().map(|s| s.value()).collect()
    }

    fn request(pulse_ms: u32, read_ms: u32) -> AcquisitionRequest {
        AcquisitionRequest::new(pulse_ms, read_ms).unwrap()
    }

    #[test]
    fn full_run_reads_expected_samples() {
        let data: Vec<u16> = (0..1000u16).map(|i| 0x1000 | (i % 4096)).collect();
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(b"COMMAND RECEIVED: Pulse=5ms, Read=100ms\n".to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames(data.iter().copied())),
            Step::Bytes(vec![0x01]),
        ]);
        let cancel = CancelToken::new();
        let mut reader = ProtocolReader::new(transport, ProtocolConfig::default(), cancel.clone());
        let (mut tx, mut rx) = sample_queue();

        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert_eq!(
            summary,
            RunSummary {
                samples: 1000,
                expected: 1000,
                reason: StopReason::Completed
            }
        );
        let queued = rx.drain();
        assert_eq!(queued.len(), 1000);
        assert_eq!(values(&queued)[..3], [0, 1, 2]);
        assert!(cancel.is_cancelled());
        assert_eq!(
            reader.monitor().get(),
            RunState::Stopped(StopReason::Completed)
        );

        let transport = reader.into_transport();
        assert!(transport.cleared);
        assert_eq!(transport.written, b"NMR(5,100)\n");
    }

    #[test]
    fn short_read_ends_stream_without_error() {
        let mut bytes = frames(0..999u16);
        bytes.push(0x42);
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(bytes),
        ]);
        let cancel = CancelToken::new();
        let mut reader = ProtocolReader::new(transport, ProtocolConfig::default(), cancel.clone());
        let (mut tx, mut rx) = sample_queue();

        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert_eq!(summary.samples, 999);
        assert_eq!(summary.reason, StopReason::StreamEnded);
        assert_eq!(rx.drain().len(), 999);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn timed_out_frame_is_a_short_read() {
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames([1, 2, 3])),
            Step::Stall(Duration::from_millis(1)),
            Step::Bytes(frames([4, 5])),
        ]);
        let mut reader =
            ProtocolReader::new(transport, ProtocolConfig::default(), CancelToken::new());
        let (mut tx, mut rx) = sample_queue();

        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert_eq!(summary.reason, StopReason::StreamEnded);
        assert_eq!(values(&rx.drain()), vec![1, 2, 3]);
    }

    #[test]
    fn wrong_ready_line_aborts_before_command() {
        let transport = ScriptedTransport::new([
            Step::Bytes(b"bootloader v2\n".to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames([1, 2, 3])),
        ]);
        let cancel = CancelToken::new();
        let mut reader = ProtocolReader::new(transport, ProtocolConfig::default(), cancel.clone());
        let (mut tx, mut rx) = sample_queue();

        let err = reader.run(request(5, 100), &mut tx).unwrap_err();

        assert!(matches!(
            err,
            ReaderError::Protocol(ProtocolError::NoHandshake { received: Some(ref line) })
                if line == "bootloader v2"
        ));
        assert!(rx.drain().is_empty());
        assert!(cancel.is_cancelled());
        assert!(matches!(
            reader.monitor().get(),
            RunState::Stopped(StopReason::Failed(_))
        ));
        assert!(reader.into_transport().written.is_empty());
    }

    #[test]
    fn silent_device_fails_handshake_at_deadline() {
        let transport = ScriptedTransport::new([
            Step::Stall(Duration::from_millis(20)),
            Step::Stall(Duration::from_millis(20)),
            Step::Bytes(READY.to_vec()),
        ]);
        let config = ProtocolConfig {
            handshake_timeout_ms: 30,
            ..ProtocolConfig::default()
        };
        let mut reader = ProtocolReader::new(transport, config, CancelToken::new());
        let (mut tx, _rx) = sample_queue();

        let err = reader.run(request(5, 100), &mut tx).unwrap_err();

        assert!(matches!(
            err,
            ReaderError::Protocol(ProtocolError::NoHandshake { received: None })
        ));
        assert!(reader.into_transport().written.is_empty());
    }

    #[test]
    fn handshake_tolerates_timeouts_before_deadline() {
        let transport = ScriptedTransport::new([
            Step::Stall(Duration::from_millis(2)),
            Step::Bytes(b"NMR Controller ".to_vec()),
            Step::Stall(Duration::from_millis(2)),
            Step::Bytes(b"Ready.\n".to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames([7; 10])),
        ]);
        let mut reader =
            ProtocolReader::new(transport, ProtocolConfig::default(), CancelToken::new());
        let (mut tx, mut rx) = sample_queue();

        let summary = reader.run(request(1, 1), &mut tx).unwrap();

        assert_eq!(summary.reason, StopReason::Completed);
        assert_eq!(values(&rx.drain()), vec![7; 10]);
    }

    #[test]
    fn any_match_accepts_silence() {
        let transport = ScriptedTransport::new([
            Step::Stall(Duration::from_millis(15)),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames([1; 10])),
        ]);
        let config = ProtocolConfig {
            ready_match: ReadyMatch::Any,
            handshake_timeout_ms: 10,
            ..ProtocolConfig::default()
        };
        let mut reader = ProtocolReader::new(transport, config, CancelToken::new());
        let (mut tx, _rx) = sample_queue();

        let summary = reader.run(request(1, 1), &mut tx).unwrap();

        assert_eq!(summary.samples, 10);
        assert_eq!(reader.into_transport().written, b"NMR(1,1)\n");
    }

    #[test]
    fn exact_match_rejects_partial_token() {
        let transport = ScriptedTransport::new([Step::Bytes(b"READY?\n".to_vec())]);
        let config = ProtocolConfig {
            ready_token: "READY".into(),
            ready_match: ReadyMatch::Exact,
            ..ProtocolConfig::default()
        };
        let mut reader = ProtocolReader::new(transport, config, CancelToken::new());
        let (mut tx, _rx) = sample_queue();

        assert!(reader.run(request(1, 1), &mut tx).is_err());
    }

    #[test]
    fn status_phase_times_out_without_marker() {
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(b"STATUS: Polarizing coil ON for 5 seconds...\n".to_vec()),
            Step::Stall(Duration::from_millis(20)),
            Step::Stall(Duration::from_millis(20)),
        ]);
        let config = ProtocolConfig {
            status_timeout_ms: 30,
            ..ProtocolConfig::default()
        };
        let cancel = CancelToken::new();
        let mut reader = ProtocolReader::new(transport, config, cancel.clone());
        let (mut tx, _rx) = sample_queue();

        let err = reader.run(request(5, 100), &mut tx).unwrap_err();

        assert!(matches!(
            err,
            ReaderError::Protocol(ProtocolError::Timeout { waited_ms: 30 })
        ));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn device_error_line_is_fatal() {
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(b"ERROR: Invalid command format. Use: NMR(pulse_ms,read_ms)\n".to_vec()),
        ]);
        let mut reader =
            ProtocolReader::new(transport, ProtocolConfig::default(), CancelToken::new());
        let (mut tx, _rx) = sample_queue();

        let err = reader.run(request(5, 100), &mut tx).unwrap_err();

        assert!(matches!(
            err,
            ReaderError::Protocol(ProtocolError::DeviceRejected(ref line)) if line.starts_with("ERROR:")
        ));
    }

    #[test]
    fn stream_closed_during_status_phase() {
        let transport = ScriptedTransport::new([Step::Bytes(READY.to_vec())]);
        let mut reader =
            ProtocolReader::new(transport, ProtocolConfig::default(), CancelToken::new());
        let (mut tx, _rx) = sample_queue();

        let err = reader.run(request(5, 100), &mut tx).unwrap_err();

        assert!(matches!(err, ReaderError::Protocol(ProtocolError::Closed)));
    }

    #[test]
    fn status_lines_are_forwarded() {
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(b"\r\nSTATUS: Pulse finished.\r\n".to_vec()),
            Step::Bytes(START.to_vec()),
        ]);
        let (status_tx, status_rx) = flume::unbounded();
        let mut reader =
            ProtocolReader::new(transport, ProtocolConfig::default(), CancelToken::new())
                .with_status_channel(status_tx);
        let (mut tx, _rx) = sample_queue();

        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert_eq!(summary.reason, StopReason::StreamEnded);
        let lines: Vec<String> = status_rx.try_iter().collect();
        assert_eq!(
            lines,
            vec![
                "NMR Controller Ready. Waiting for commands...",
                "STATUS: Pulse finished.",
                "STATUS: Starting data read at 10kSPS...",
            ]
        );
    }

    #[test]
    fn frames_are_masked_to_twelve_bits() {
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames([0xF1A3, 0xFFFF, 0x8000, 0x0FFF])),
        ]);
        let config = ProtocolConfig {
            sample_rate: 4_000,
            ..ProtocolConfig::default()
        };
        let mut reader = ProtocolReader::new(transport, config, CancelToken::new());
        let (mut tx, mut rx) = sample_queue();

        let summary = reader.run(request(1, 1), &mut tx).unwrap();

        assert_eq!(summary.reason, StopReason::Completed);
        assert_eq!(values(&rx.drain()), vec![419, 4095, 0, 4095]);
    }

    #[test]
    fn sync_words_dropped_when_configured() {
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames([0xFFFF, 1, 2, 0xFFFF])),
        ]);
        let config = ProtocolConfig {
            sample_rate: 2_000,
            drop_sync_words: true,
            ..ProtocolConfig::default()
        };
        let mut reader = ProtocolReader::new(transport, config, CancelToken::new());
        let (mut tx, mut rx) = sample_queue();

        let summary = reader.run(request(1, 1), &mut tx).unwrap();

        assert_eq!(summary.samples, 2);
        assert_eq!(values(&rx.drain()), vec![1, 2]);
    }

    #[test]
    fn external_cancel_mid_stream_keeps_decoded_prefix() {
        let cancel = CancelToken::new();
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames(0..250u16)),
            Step::Cancel(cancel.clone()),
            Step::Bytes(frames(250..1000u16)),
        ]);
        let mut reader = ProtocolReader::new(transport, ProtocolConfig::default(), cancel.clone());
        let (mut tx, mut rx) = sample_queue();

        let started = Instant::now();
        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.samples, 250);
        assert_eq!(values(&rx.drain()), (0..250u16).collect::<Vec<_>>());
        assert_eq!(
            reader.monitor().get(),
            RunState::Stopped(StopReason::Cancelled)
        );
    }

    #[test]
    fn cancelled_before_start_sends_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let transport = ScriptedTransport::new([Step::Bytes(READY.to_vec())]);
        let mut reader = ProtocolReader::new(transport, ProtocolConfig::default(), cancel);
        let (mut tx, _rx) = sample_queue();

        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.samples, 0);
        assert!(reader.into_transport().written.is_empty());
    }

    #[test]
    fn cancel_while_awaiting_start_marker_stops_before_data() {
        let cancel = CancelToken::new();
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(b"STATUS: Pulse sent\n".to_vec()),
            Step::Cancel(cancel.clone()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames(0..1000u16)),
        ]);
        let mut reader = ProtocolReader::new(transport, ProtocolConfig::default(), cancel);
        let (mut tx, mut rx) = sample_queue();

        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.samples, 0);
        assert!(rx.drain().is_empty());
        assert_eq!(
            reader.monitor().get(),
            RunState::Stopped(StopReason::Cancelled)
        );
        assert_eq!(reader.into_transport().written, b"NMR(5,100)\n");
    }

    #[test]
    fn dropped_consumer_stops_stream() {
        let transport = ScriptedTransport::new([
            Step::Bytes(READY.to_vec()),
            Step::Bytes(START.to_vec()),
            Step::Bytes(frames(0..100u16)),
        ]);
        let mut reader =
            ProtocolReader::new(transport, ProtocolConfig::default(), CancelToken::new());
        let (mut tx, rx) = sample_queue();
        drop(rx);

        let summary = reader.run(request(5, 100), &mut tx).unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.samples, 0);
    }
}
