use std::path::PathBuf;

use pktfilter_core::Capability;

/// Settings for one filter process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Delay every `can-delay=1` pathname, not only the fixtures.
    pub always_delay: bool,
    /// Session log, opened in append mode.
    pub log_path: PathBuf,
    /// Capabilities this side offers back to the driver, in order.
    pub capabilities: Vec<Capability>,
}
