//! rot13-filter — test double for the server side of the long-running
//! content filter protocol.
//!
//! # Usage
//!
//! ```text
//! rot13-filter [--always-delay] <log path> <capability>...
//! ```
//!
//! The driver talks pkt-line on stdin/stdout. Reserved pathnames trigger
//! test behaviour: `error.r`, `abort.r`, `clean-write-fail.r`,
//! `smudge-write-fail.r`, and the delay fixtures (`test-delay10.a`, ...).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use pktfilter_core::Capability;
use pktfilter_protocol::{start_blocking, FilterConfig};

/// Exit status used for every fatal condition.
const FATAL_EXIT: u8 = 128;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "rot13-filter",
    version,
    about = "rot13 content filter speaking the long-running filter protocol",
    long_about = None,
)]
struct Cli {
    /// Delay every pathname sent with can-delay=1, not only the fixtures.
    #[arg(long)]
    always_delay: bool,

    /// File the session log is appended to.
    log_path: PathBuf,

    /// Capabilities to offer the driver, e.g. clean smudge delay.
    #[arg(required = true)]
    capabilities: Vec<String>,
}

impl Cli {
    fn into_config(self) -> FilterConfig {
        FilterConfig {
            always_delay: self.always_delay,
            log_path: self.log_path,
            capabilities: self.capabilities.into_iter().map(Capability::from).collect(),
        }
    }

    fn run(self) -> Result<()> {
        let config = self.into_config();
        start_blocking(&config).with_context(|| {
            format!("filter session logging to {} failed", config.log_path.display())
        })
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err:#}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}
