use std::io;

use thiserror::Error;

/// Failures at the byte-stream layer. Fatal to the run, never retried.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The device could not be opened.
    #[error("cannot open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// Clearing the input buffer or flushing output failed.
    #[error("flush failed: {0}")]
    Flush(#[source] io::Error),
}

/// The device did not follow the command/response protocol.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Ready line absent, wrong, or not received before the handshake deadline.
    #[error("no handshake from device (received: {received:?})")]
    NoHandshake { received: Option<String> },

    /// No start-of-data marker before the status deadline.
    #[error("timed out after {waited_ms}ms waiting for the start of data")]
    Timeout { waited_ms: u64 },

    /// The device answered the command with an error line.
    #[error("device rejected command: {0}")]
    DeviceRejected(String),

    /// The byte stream ended before data started.
    #[error("device closed the stream before data started")]
    Closed,
}

/// Everything that can abort a reader run.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
