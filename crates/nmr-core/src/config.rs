use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Complete acquisition and display configuration.
///
/// Serializable to TOML. Every field has a sane default, so a partial file
/// only overrides what it names.
///
/// # Example
/// ```
/// use nmr_core::config::ScopeConfig;
/// let config = ScopeConfig::default();
/// assert_eq!(config.serial.baud_rate, 115_200);
/// assert_eq!(config.protocol.sample_rate, 10_000);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ScopeConfig {
    pub serial: SerialConfig,
    pub protocol: ProtocolConfig,
    pub display: DisplayConfig,
}

/// Byte-stream device settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
    /// Per-read timeout. Bounds how long a cancellation can go unnoticed.
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".into(),
            baud_rate: 115_200,
            read_timeout_ms: 500,
        }
    }
}

impl SerialConfig {
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// How the handshake line is compared against the ready token.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ReadyMatch {
    /// The line contains the token.
    #[default]
    Contains,
    /// The trimmed line equals the token.
    Exact,
    /// Any received line is accepted.
    Any,
}

impl ReadyMatch {
    /// # Example
    /// ```
    /// use nmr_core::config::ReadyMatch;
    /// let line = "NMR Controller Ready. Waiting for commands...";
    /// assert!(ReadyMatch::Contains.matches(line, "Ready"));
    /// assert!(!ReadyMatch::Exact.matches(line, "Ready"));
    /// assert!(ReadyMatch::Any.matches("", "Ready"));
    /// ```
    #[must_use]
    pub fn matches(self, line: &str, token: &str) -> bool {
        match self {
            Self::Contains => line.contains(token),
            Self::Exact => line.trim() == token,
            Self::Any => true,
        }
    }
}

/// Command/response protocol settings, passed to the protocol reader.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ProtocolConfig {
    pub ready_token: String,
    pub ready_match: ReadyMatch,
    /// Status line marker announcing the start of binary frames.
    pub start_marker: String,
    /// Deadline for the ready line, across repeated timed-out reads.
    pub handshake_timeout_ms: u64,
    /// Deadline for any status line to arrive. The device is silent for ~5 s while polarizing.
    pub status_timeout_ms: u64,
    /// Device sample rate in samples per second.
    pub sample_rate: u32,
    /// Skip raw `0xFFFF` marker frames instead of queueing them as 4095.
    pub drop_sync_words: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            ready_token: "NMR Controller Ready".into(),
            ready_match: ReadyMatch::Contains,
            start_marker: "Starting data read".into(),
            handshake_timeout_ms: 6_000,
            status_timeout_ms: 8_000,
            sample_rate: 10_000,
            drop_sync_words: false,
        }
    }
}

impl ProtocolConfig {
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    #[must_use]
    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}

/// Display refresh settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DisplayConfig {
    /// Refresh driver period.
    pub refresh_ms: u64,
    /// Plot spectrum magnitudes on a log10 axis.
    pub log_magnitude: bool,
    /// Device status lines kept in the status panel.
    pub status_lines: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 100,
            log_magnitude: true,
            status_lines: 8,
        }
    }
}

impl DisplayConfig {
    #[must_use]
    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

impl ScopeConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.serial.baud_rate = self.serial.baud_rate.max(300);
        self.serial.read_timeout_ms = self.serial.read_timeout_ms.clamp(10, 60_000);
        self.protocol.handshake_timeout_ms = self.protocol.handshake_timeout_ms.max(10);
        self.protocol.status_timeout_ms = self.protocol.status_timeout_ms.max(10);
        self.protocol.sample_rate = self.protocol.sample_rate.max(1);
        self.display.refresh_ms = self.display.refresh_ms.clamp(10, 2_000);
        self.display.status_lines = self.display.status_lines.clamp(1, 64);
    }

    /// Reject settings no clamp can repair.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.serial.port.trim().is_empty() {
            return Err(CoreError::Config("serial.port is empty".into()));
        }
        if self.protocol.ready_match != ReadyMatch::Any && self.protocol.ready_token.is_empty() {
            return Err(CoreError::Config(
                "protocol.ready_token is empty; use ready_match = \"Any\" to accept any line".into(),
            ));
        }
        if self.protocol.start_marker.is_empty() {
            return Err(CoreError::Config("protocol.start_marker is empty".into()));
        }
        Ok(())
    }
}

/// Intermediate TOML structure, every section optional.
#[derive(Deserialize)]
struct ConfigFile {
    serial: Option<SerialSection>,
    protocol: Option<ProtocolSection>,
    display: Option<DisplaySection>,
}

#[derive(Deserialize)]
struct SerialSection {
    port: Option<String>,
    baud_rate: Option<u32>,
    read_timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
struct ProtocolSection {
    ready_token: Option<String>,
    ready_match: Option<ReadyMatch>,
    start_marker: Option<String>,
    handshake_timeout_ms: Option<u64>,
    status_timeout_ms: Option<u64>,
    sample_rate: Option<u32>,
    drop_sync_words: Option<bool>,
}

#[derive(Deserialize)]
struct DisplaySection {
    refresh_ms: Option<u64>,
    log_magnitude: Option<bool>,
    status_lines: Option<usize>,
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
///
/// # Example
/// ```
/// use nmr_core::config::{parse_config, ReadyMatch};
/// let config = parse_config("[protocol]\nready_match = \"Exact\"\n").unwrap();
/// assert_eq!(config.protocol.ready_match, ReadyMatch::Exact);
/// assert_eq!(config.serial.port, "/dev/ttyACM0");
/// ```
pub fn parse_config(content: &str) -> Result<ScopeConfig> {
    let file: ConfigFile = toml::from_str(content).context("TOML parse error")?;
    let mut config = ScopeConfig::default();

    if let Some(s) = file.serial {
        if let Some(v) = s.port {
            config.serial.port = v;
        }
        if let Some(v) = s.baud_rate {
            config.serial.baud_rate = v;
        }
        if let Some(v) = s.read_timeout_ms {
            config.serial.read_timeout_ms = v;
        }
    }

    if let Some(p) = file.protocol {
        if let Some(v) = p.ready_token {
            config.protocol.ready_token = v;
        }
        if let Some(v) = p.ready_match {
            config.protocol.ready_match = v;
        }
        if let Some(v) = p.start_marker {
            config.protocol.start_marker = v;
        }
        if let Some(v) = p.handshake_timeout_ms {
            config.protocol.handshake_timeout_ms = v;
        }
        if let Some(v) = p.status_timeout_ms {
            config.protocol.status_timeout_ms = v;
        }
        if let Some(v) = p.sample_rate {
            config.protocol.sample_rate = v;
        }
        if let Some(v) = p.drop_sync_words {
            config.protocol.drop_sync_words = v;
        }
    }

    if let Some(d) = file.display {
        if let Some(v) = d.refresh_ms {
            config.display.refresh_ms = v;
        }
        if let Some(v) = d.log_magnitude {
            config.display.log_magnitude = v;
        }
        if let Some(v) = d.status_lines {
            config.display.status_lines = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Load a TOML file and merge it with the defaults.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use nmr_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<ScopeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config in {}", path.display()))
}
