// Device connection, wire protocol, and sample hand-off for nmrscope.

pub mod error;
pub mod protocol;
pub mod queue;
pub mod sim;
pub mod transport;
pub mod worker;

pub use error::{ProtocolError, ReaderError, TransportError};
pub use protocol::{ProtocolReader, RunSummary};
pub use queue::{SampleConsumer, SampleProducer, sample_queue};
pub use transport::Transport;
pub use worker::ReaderHandle;
