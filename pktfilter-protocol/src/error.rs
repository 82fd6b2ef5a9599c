use std::path::PathBuf;

use pktfilter_core::{Command, RegistryError};
use thiserror::Error;

/// Every way a filter session can end other than end-of-stream.
///
/// None of these are reported to the driver through `status=`; the driver
/// sees the channel close.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("I/O error on filter channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error at {path}: {source}")]
    LogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed handshake, missing capability, missing flush, unknown
    /// metadata key or a damaged packet.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A content command arrived without its capability negotiated.
    #[error("bad command '{command}'")]
    UnsupportedOperation { command: String },

    /// Injected failure after `status=success` was already sent.
    #[error("{command} write error")]
    SimulatedFault { command: Command },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub(crate) fn violation(message: impl Into<String>) -> FilterError {
    FilterError::ProtocolViolation(message.into())
}

pub(crate) fn log_err(path: impl Into<PathBuf>, source: std::io::Error) -> FilterError {
    FilterError::LogIo {
        path: path.into(),
        source,
    }
}
