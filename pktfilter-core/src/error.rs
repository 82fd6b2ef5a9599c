//! Error types for pktfilter-core.

use thiserror::Error;

/// Errors raised by [`crate::registry::DelayRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A pathname was seeded into the registry twice.
    #[error("pathname '{pathname}' is already present in the delay registry")]
    DuplicateKey { pathname: String },
}
