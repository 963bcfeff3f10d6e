use anyhow::Result;
use clap::Parser;
use nmr_core::config::{ScopeConfig, load_config};
use nmr_core::run::CancelToken;
use nmr_core::sample::AcquisitionRequest;
use nmr_dsp::fft::SpectralEngine;
use nmr_render::scope::ScopeView;
use nmr_serial::ReaderHandle;
use nmr_serial::queue::{SampleProducer, sample_queue};
use nmr_serial::sim::{SimConfig, SimulatedDevice};
use nmr_serial::transport::{describe_ports, open_serial};

pub mod app;
pub mod cli;
pub mod driver;
pub mod headless;

fn main() -> Result<()> {
    // 1. Parse the command line (bad durations exit here, before any I/O)
    let cli = cli::Cli::parse();

    // 2. Logging
    env_logger::Builder::new()
        .filter_level(cli.log_filter())
        .init();

    if cli.list_ports {
        let ports = describe_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        }
        for port in ports {
            println!("{port}");
        }
        return Ok(());
    }

    // 3. Configuration: file, then command-line overrides
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let request = cli.request()?;
    let expected = request.samples_expected(config.protocol.sample_rate);
    log::info!(
        "Pulse {} ms, read {} ms: expecting {expected} samples at {} S/s",
        request.pulse_ms(),
        request.read_ms(),
        config.protocol.sample_rate
    );

    // 4. Reader thread
    let (producer, consumer) = sample_queue();
    let (status_tx, status_rx) = if cli.headless {
        (None, None)
    } else {
        let (tx, rx) = flume::unbounded();
        (Some(tx), Some(rx))
    };
    let reader = spawn_reader(cli.simulate, &config, request, producer, status_tx)?;

    // 5. Display until closed
    let mut refresh_driver = driver::RefreshDriver::new(
        consumer,
        SpectralEngine::new(config.protocol.sample_rate),
        expected,
    );
    let refresh = config.display.refresh_period();
    let result = if cli.headless {
        let interrupt = CancelToken::new();
        let handler_token = interrupt.clone();
        ctrlc::set_handler(move || handler_token.cancel())?;
        headless::run(&mut refresh_driver, &reader, &interrupt, refresh);
        Ok(())
    } else {
        let source = if cli.simulate {
            "simulated".to_string()
        } else {
            config.serial.port.clone()
        };
        let view = ScopeView::new(
            config.protocol.sample_rate,
            config.display.log_magnitude,
            config.display.status_lines,
        )
        .with_source(source);
        let mut app = app::App::new(refresh_driver, view, status_rx, refresh);

        let terminal = ratatui::init();
        let result = app.run(terminal, &reader);
        // Restore the terminal (ALWAYS, even on error)
        ratatui::restore();
        result
    };

    // 6. Closing the display stops the reader; wait for it before exiting
    reader.cancel();
    let summary = reader.join();
    result?;
    let summary = summary?;
    println!(
        "{}/{} samples, {}",
        summary.samples, summary.expected, summary.reason
    );
    Ok(())
}

/// Start the reader against the serial port or the simulator.
fn spawn_reader(
    simulate: bool,
    config: &ScopeConfig,
    request: AcquisitionRequest,
    producer: SampleProducer,
    status_tx: Option<flume::Sender<String>>,
) -> Result<ReaderHandle> {
    if simulate {
        let sim = SimConfig {
            sample_rate: config.protocol.sample_rate,
            read_timeout: config.serial.read_timeout(),
            ..SimConfig::default()
        };
        log::info!("Using simulated controller");
        ReaderHandle::spawn(
            move || Ok(SimulatedDevice::new(sim)),
            config.protocol.clone(),
            request,
            producer,
            status_tx,
        )
    } else {
        let serial = config.serial.clone();
        ReaderHandle::spawn(
            move || open_serial(&serial),
            config.protocol.clone(),
            request,
            producer,
            status_tx,
        )
    }
}

/// Load `--config` if present, otherwise fall back to defaults.
fn resolve_config(cli: &cli::Cli) -> Result<ScopeConfig> {
    if cli.config.exists() {
        load_config(&cli.config)
    } else {
        log::warn!(
            "Config not found: {}. Using defaults.",
            cli.config.display()
        );
        Ok(ScopeConfig::default())
    }
}
