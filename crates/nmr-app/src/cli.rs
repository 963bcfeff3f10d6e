use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use nmr_core::config::ScopeConfig;
use nmr_core::sample::AcquisitionRequest;

/// nmrscope: pulse an NMR probe and watch the free induction decay and its spectrum live.
#[derive(Parser, Debug)]
#[command(name = "nmrscope", version, about, long_about = None)]
pub struct Cli {
    /// Excitation pulse duration in milliseconds.
    #[arg(
        value_parser = clap::value_parser!(u32).range(1..),
        required_unless_present = "list_ports"
    )]
    pub pulse_ms: Option<u32>,

    /// Acquisition window in milliseconds.
    #[arg(
        value_parser = clap::value_parser!(u32).range(1..),
        required_unless_present = "list_ports"
    )]
    pub read_ms: Option<u32>,

    /// Serial device, overrides the config file.
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate, overrides the config file.
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// TOML configuration file. Defaults are used if it does not exist.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Talk to a built-in simulated controller instead of a serial port.
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// No terminal UI: log progress and stop on Ctrl-C or end of run.
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Display refresh period in milliseconds, overrides the config file.
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Log level: error, warn, info, debug, trace. Default: warn (TUI), info (headless).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print the detected serial ports and exit.
    #[arg(long, default_value_t = false)]
    pub list_ports: bool,
}

impl Cli {
    /// The acquisition request named by the positional arguments.
    ///
    /// # Errors
    /// Returns an error if either duration is missing or zero.
    pub fn request(&self) -> anyhow::Result<AcquisitionRequest> {
        let pulse_ms = self.pulse_ms.context("missing PULSE_MS")?;
        let read_ms = self.read_ms.context("missing READ_MS")?;
        Ok(AcquisitionRequest::new(pulse_ms, read_ms)?)
    }

    /// Log level filter; stderr output would tear the terminal UI, so it defaults quieter.
    #[must_use]
    pub fn log_filter(&self) -> log::LevelFilter {
        let fallback = if self.headless {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        };
        self.log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(fallback)
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ScopeConfig) {
        if let Some(ref port) = self.port {
            config.serial.port.clone_from(port);
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(refresh_ms) = self.refresh_ms {
            config.display.refresh_ms = refresh_ms;
        }
        config.clamp_all();
    }
}
