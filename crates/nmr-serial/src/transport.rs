use std::io::{self, Read, Write};

use nmr_core::config::SerialConfig;
use serialport::{ClearBuffer, SerialPort, SerialPortType};

use crate::error::TransportError;

/// Byte-stream device the protocol reader talks to.
///
/// Implemented by : serial ports (`Box<dyn SerialPort>`), `SimulatedDevice`.
/// Reads must block no longer than the configured read timeout and report
/// it as [`io::ErrorKind::TimedOut`].
pub trait Transport: Read + Write + Send {
    /// Discard whatever the device sent before we started listening.
    ///
    /// # Errors
    /// Returns the underlying I/O error.
    fn clear_input(&mut self) -> io::Result<()>;
}

impl Transport for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Open the configured serial port with its read timeout.
///
/// # Errors
/// Returns [`TransportError::Open`] if the device is missing or busy.
pub fn open_serial(config: &SerialConfig) -> Result<Box<dyn SerialPort>, TransportError> {
    log::info!("Connecting to {} @ {} baud", config.port, config.baud_rate);
    serialport::new(&config.port, config.baud_rate)
        .timeout(config.read_timeout())
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|source| TransportError::Open {
            port: config.port.clone(),
            source,
        })
}

/// One line per detected port, USB ports with their VID:PID and product.
///
/// # Errors
/// Returns an error if the OS port enumeration fails.
pub fn describe_ports() -> anyhow::Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| match port.port_type {
            SerialPortType::UsbPort(info) => format!(
                "{}  USB {:04x}:{:04x}  {}",
                port.port_name,
                info.vid,
                info.pid,
                info.product.as_deref().unwrap_or("")
            ),
            SerialPortType::PciPort => format!("{}  PCI", port.port_name),
            SerialPortType::BluetoothPort => format!("{}  Bluetooth", port.port_name),
            SerialPortType::Unknown => port.port_name,
        })
        .collect())
}
