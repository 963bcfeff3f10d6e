use std::fmt;

use crate::error::CoreError;

/// Size of one data frame on the wire, in bytes.
pub const FRAME_LEN: usize = 2;

/// Bits 0-11 carry the ADC value; bits 12-15 are reserved for sync/flags.
pub const SAMPLE_MASK: u16 = 0x0FFF;

/// Largest decodable sample value.
pub const SAMPLE_MAX: u16 = SAMPLE_MASK;

/// Marker word the device writes before and after a data block.
pub const SYNC_WORD: u16 = 0xFFFF;

/// One 12-bit ADC reading, immutable once decoded.
///
/// # Example
/// ```
/// use nmr_core::sample::Sample;
/// let s = Sample::decode(0xF1A3);
/// assert_eq!(s.value(), 0x01A3);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sample(u16);

impl Sample {
    /// Decode a raw 16-bit wire value by masking off the high 4 bits.
    #[inline]
    #[must_use]
    pub const fn decode(raw: u16) -> Self {
        Self(raw & SAMPLE_MASK)
    }

    /// Decode a little-endian wire frame.
    ///
    /// # Example
    /// ```
    /// use nmr_core::sample::Sample;
    /// assert_eq!(Sample::from_le_bytes([0xA3, 0xF1]).value(), 419);
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_le_bytes(frame: [u8; FRAME_LEN]) -> Self {
        Self::decode(u16::from_le_bytes(frame))
    }

    /// The decoded value, always in `0..=4095`.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl From<Sample> for f64 {
    fn from(s: Sample) -> Self {
        f64::from(s.0)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of one acquisition run. Immutable for the run's lifetime.
///
/// # Example
/// ```
/// use nmr_core::sample::AcquisitionRequest;
/// let req = AcquisitionRequest::new(5, 100).unwrap();
/// assert_eq!(req.samples_expected(10_000), 1000);
/// assert_eq!(req.command(), "NMR(5,100)\n");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pulse_ms: u32,
    read_ms: u32,
}

impl AcquisitionRequest {
    /// Build a request; both durations must be positive.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidRequest`] if either duration is zero.
    pub fn new(pulse_ms: u32, read_ms: u32) -> Result<Self, CoreError> {
        if pulse_ms == 0 || read_ms == 0 {
            return Err(CoreError::InvalidRequest { pulse_ms, read_ms });
        }
        Ok(Self { pulse_ms, read_ms })
    }

    /// Excitation pulse length in milliseconds.
    #[must_use]
    pub fn pulse_ms(&self) -> u32 {
        self.pulse_ms
    }

    /// Read window length in milliseconds.
    #[must_use]
    pub fn read_ms(&self) -> u32 {
        self.read_ms
    }

    /// Number of samples the device produces for this request at `sample_rate`.
    ///
    /// A partial sample period at the end of the window still yields a sample,
    /// so the count rounds up.
    #[must_use]
    pub fn samples_expected(&self, sample_rate: u32) -> u64 {
        (u64::from(sample_rate) * u64::from(self.read_ms)).div_ceil(1000)
    }

    /// Wire command, newline terminated: `NMR(<pulse_ms>,<read_ms>)\n`.
    #[must_use]
    pub fn command(&self) -> String {
        format!("NMR({},{})\n", self.pulse_ms, self.read_ms)
    }

    /// Parse a command line as the device does. Surrounding whitespace is ignored.
    ///
    /// # Example
    /// ```
    /// use nmr_core::sample::AcquisitionRequest;
    /// let req = AcquisitionRequest::parse_command("NMR(12,340)\r\n").unwrap();
    /// assert_eq!((req.pulse_ms(), req.read_ms()), (12, 340));
    /// assert!(AcquisitionRequest::parse_command("PING").is_none());
    /// ```
    #[must_use]
    pub fn parse_command(line: &str) -> Option<Self> {
        let args = line.trim().strip_prefix("NMR(")?.strip_suffix(')')?;
        let (pulse, read) = args.split_once(',')?;
        let pulse_ms = pulse.trim().parse().ok()?;
        let read_ms = read.trim().parse().ok()?;
        Self::new(pulse_ms, read_ms).ok()
    }
}
