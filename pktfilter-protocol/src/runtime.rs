use std::io::{self, BufReader, BufWriter, Read, Write};

use crate::command_loop;
use crate::config::FilterConfig;
use crate::constants::required_capabilities;
use crate::error::FilterError;
use crate::negotiate::negotiate;
use crate::pkt_line::PktChannel;
use crate::session::Session;
use crate::session_log::SessionLog;

/// Run one filter session over stdin/stdout and block until the driver
/// closes the channel.
pub fn start_blocking(config: &FilterConfig) -> Result<(), FilterError> {
    init_tracing();
    let mut log = SessionLog::open(&config.log_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(
        BufReader::new(stdin.lock()),
        BufWriter::new(stdout.lock()),
        config,
        &mut log,
    )
}

/// Run a complete session: handshake, capability exchange, command loop.
pub fn serve<R: Read, W: Write>(
    reader: R,
    writer: W,
    config: &FilterConfig,
    log: &mut SessionLog,
) -> Result<(), FilterError> {
    let mut channel = PktChannel::new(reader, writer);
    log.start()?;

    let agreed = negotiate(&mut channel, &required_capabilities(), &config.capabilities)?;
    log.handshake_complete()?;

    let mut session = Session::new(agreed, config.always_delay)?;
    command_loop::run(&mut channel, &mut session, log)
}

/// Diagnostics go to stderr; stdout carries the protocol.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
