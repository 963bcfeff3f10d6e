//! Simulated acquisition controller.
//!
//! Speaks the same line/frame protocol as the hardware so the full pipeline
//! runs without a device attached. The signal is a free induction decay:
//! a damped sinusoid around mid-scale plus uniform noise.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use nmr_core::sample::{AcquisitionRequest, SAMPLE_MAX, SYNC_WORD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::transport::Transport;

const READY_LINE: &str = "NMR Controller Ready. Waiting for commands...\n";
const MIN_POLL: Duration = Duration::from_micros(100);
const INVALID_COMMAND_LINE: &str = "ERROR: Invalid command format. Use: NMR(pulse_ms,read_ms)\n";

/// Shape and timing of the simulated signal.
///
/// # Example
/// ```
/// use nmr_serial::sim::SimConfig;
/// let config = SimConfig::default();
/// assert_eq!(config.sample_rate, 10_000);
/// ```
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub sample_rate: u32,
    /// Precession frequency of the decay, in Hz.
    pub frequency_hz: f64,
    /// Peak deviation from the baseline, in ADC counts.
    pub amplitude: f64,
    /// Envelope time constant.
    pub decay_ms: f64,
    /// DC level, in ADC counts.
    pub baseline: f64,
    /// Half-width of the uniform noise, in ADC counts.
    pub noise: f64,
    /// Release samples at the sample rate instead of all at once.
    pub realtime: bool,
    /// How long an idle read blocks before reporting a timeout.
    pub read_timeout: Duration,
    /// Delay before the ready line appears, as after a device reset.
    pub boot_delay: Duration,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sample_rate: 10_000,
            frequency_hz: 1701.0,
            amplitude: 1200.0,
            decay_ms: 40.0,
            baseline: 2048.0,
            noise: 8.0,
            realtime: true,
            read_timeout: Duration::from_millis(500),
            boot_delay: Duration::from_millis(200),
            seed: 0x5eed,
        }
    }
}

/// Data block currently being sent.
struct Acquisition {
    total: u64,
    emitted: u64,
    started: Instant,
}

/// In-process stand-in for the acquisition controller.
///
/// # Example
/// ```
/// use std::io::{Read, Write};
/// use std::time::Duration;
/// use nmr_serial::sim::{SimConfig, SimulatedDevice};
///
/// let mut dev = SimulatedDevice::new(SimConfig {
///     realtime: false,
///     boot_delay: Duration::ZERO,
///     ..SimConfig::default()
/// });
/// let mut buf = [0u8; 64];
/// let n = dev.read(&mut buf).unwrap();
/// assert!(buf[..n].starts_with(b"NMR Controller Ready"));
/// ```
pub struct SimulatedDevice {
    config: SimConfig,
    outbox: VecDeque<u8>,
    inbox: Vec<u8>,
    ready_at: Option<Instant>,
    acquisition: Option<Acquisition>,
    rng: StdRng,
}

impl SimulatedDevice {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            ready_at: Some(Instant::now() + config.boot_delay),
            config,
            outbox: VecDeque::new(),
            inbox: Vec::new(),
            acquisition: None,
            rng,
        }
    }

    /// ADC reading for sample ordinal `index`.
    fn sample_at(&mut self, index: u64) -> u16 {
        let t = index as f64 / f64::from(self.config.sample_rate);
        let envelope = (-t * 1000.0 / self.config.decay_ms).exp();
        let noise = if self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..=self.config.noise)
        } else {
            0.0
        };
        let v = self.config.baseline
            + self.config.amplitude * envelope * (TAU * self.config.frequency_hz * t).sin()
            + noise;
        v.round().clamp(0.0, f64::from(SAMPLE_MAX)) as u16
    }

    fn push_line(&mut self, line: &str) {
        self.outbox.extend(line.as_bytes());
    }

    fn push_word(&mut self, word: u16) {
        self.outbox.extend(word.to_le_bytes());
    }

    /// Move everything that is due by now into the outbox.
    fn pump(&mut self) {
        let now = Instant::now();
        if let Some(at) = self.ready_at
            && now >= at
        {
            self.ready_at = None;
            self.push_line(READY_LINE);
        }

        let Some(acq) = self.acquisition.as_ref() else {
            return;
        };
        let due = if self.config.realtime {
            let elapsed = now.duration_since(acq.started).as_secs_f64();
            ((elapsed * f64::from(self.config.sample_rate)) as u64).min(acq.total)
        } else {
            acq.total
        };
        let (from, total) = (acq.emitted, acq.total);
        for i in from..due {
            let sample = self.sample_at(i);
            self.push_word(sample);
        }
        if let Some(acq) = self.acquisition.as_mut() {
            acq.emitted = due.max(from);
        }

        if due >= total {
            self.acquisition = None;
            self.push_word(SYNC_WORD);
            self.push_line("STATUS: Data read complete. Sequence finished.\n");
            self.push_line(READY_LINE);
        }
    }

    /// Time until the next byte would become available, if anything is scheduled.
    fn next_due_in(&self) -> Option<Duration> {
        let now = Instant::now();
        if let Some(at) = self.ready_at {
            return Some(at.saturating_duration_since(now));
        }
        let acq = self.acquisition.as_ref()?;
        let next = acq.started
            + Duration::from_secs_f64((acq.emitted + 1) as f64 / f64::from(self.config.sample_rate));
        Some(next.saturating_duration_since(now))
    }

    fn handle_command(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        let Some(request) = AcquisitionRequest::parse_command(line) else {
            log::debug!("sim: rejecting {line:?}");
            self.push_line(INVALID_COMMAND_LINE);
            return;
        };
        let (pulse_ms, read_ms) = (request.pulse_ms(), request.read_ms());
        self.push_line(&format!(
            "COMMAND RECEIVED: Pulse={pulse_ms}ms, Read={read_ms}ms\n"
        ));
        for status in [
            "STATUS: Polarizing coil ON for 5 seconds...",
            "STATUS: Polarization complete.",
            "STATUS: Setting relay to WRITE mode...",
            "STATUS: Starting excitation pulse...",
            "STATUS: Pulse finished.",
            "STATUS: Setting relay to READ mode...",
        ] {
            self.push_line(&format!("{status}\n"));
        }
        let ksps = self.config.sample_rate / 1000;
        self.push_line(&format!("STATUS: Starting data read at {ksps}kSPS...\n"));
        self.push_word(SYNC_WORD);
        self.acquisition = Some(Acquisition {
            total: request.samples_expected(self.config.sample_rate),
            emitted: 0,
            started: Instant::now(),
        });
    }
}

impl Read for SimulatedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let deadline = Instant::now() + self.config.read_timeout;
        self.pump();
        while self.outbox.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "simulated read timeout",
                ));
            }
            let remaining = deadline - now;
            let wait = self
                .next_due_in()
                .map_or(remaining, |d| d.min(remaining))
                .max(MIN_POLL);
            thread::sleep(wait);
            self.pump();
        }
        let n = buf.len().min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inbox.extend_from_slice(buf);
        while let Some(pos) = self.inbox.iter().position(|&b| b == b'\n' || b == b'\r') {
            let raw: Vec<u8> = self.inbox.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]).into_owned();
            self.handle_command(line.trim());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for SimulatedDevice {
    fn clear_input(&mut self) -> io::Result<()> {
        self.outbox.clear();
        Ok(())
    }
}
