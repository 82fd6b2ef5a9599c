//! Per-request command loop.
//!
//! ```text
//! AwaitCommand --list_available_blobs--> announce --> AwaitCommand
//! AwaitCommand --clean|smudge--> read request --> respond --> AwaitCommand
//! AwaitCommand --EOF--> Stopped
//! ```
//! Every request is read in full, payload included, before it is answered.

use std::io::{Read, Write};

use pktfilter_core::{transform, Command, Status, TestHook, UnknownCommand};

use crate::error::{violation, FilterError};
use crate::pkt_line::PktChannel;
use crate::session::Session;
use crate::session_log::{Outcome, SessionLog};

/// Metadata keys passed through to the log without interpretation.
const LOGGED_METADATA: &[&str] = &["ref", "treeish", "blob"];
const CAN_DELAY: &str = "can-delay=1";

/// One `clean` or `smudge` request, fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub pathname: String,
    /// Recognised `key=value` metadata in arrival order.
    pub metadata: Vec<(String, String)>,
    pub can_delay: bool,
    pub payload: Vec<u8>,
}

/// Serve commands until the driver closes the stream.
pub fn run<R: Read, W: Write>(
    channel: &mut PktChannel<R, W>,
    session: &mut Session,
    log: &mut SessionLog,
) -> Result<(), FilterError> {
    loop {
        let Some(value) = channel.read_key_value("command")? else {
            tracing::info!("driver closed the channel, stopping");
            log.stop()?;
            return Ok(());
        };
        let command = value
            .parse::<Command>()
            .map_err(|UnknownCommand(command)| FilterError::UnsupportedOperation { command })?;
        tracing::debug!(%command, "command received");
        log.command(command)?;

        match command {
            Command::ListAvailableBlobs => list_available_blobs(channel, session, log)?,
            Command::Clean | Command::Smudge => {
                let request = read_request(channel, session, log, command)?;
                respond(channel, session, log, request)?;
            }
        }
    }
}

fn list_available_blobs<R: Read, W: Write>(
    channel: &mut PktChannel<R, W>,
    session: &mut Session,
    log: &mut SessionLog,
) -> Result<(), FilterError> {
    channel.expect_flush("list_available_blobs end")?;

    let blobs = session.registry_mut().poll_available();
    for pathname in &blobs.announced {
        channel.write_line(&format!("pathname={pathname}"))?;
    }
    log.available(&blobs.ready)?;
    channel.write_flush()?;

    tracing::debug!(announced = ?blobs.announced, "available blobs announced");
    channel.write_line(&format!("status={}", Status::Success))?;
    channel.write_flush()
}

fn read_request<R: Read, W: Write>(
    channel: &mut PktChannel<R, W>,
    session: &mut Session,
    log: &mut SessionLog,
    command: Command,
) -> Result<Request, FilterError> {
    let pathname = channel
        .read_key_value("pathname")?
        .ok_or_else(|| violation("unexpected EOF while expecting pathname"))?;
    log.field(&pathname)?;

    let mut metadata = Vec::new();
    let mut can_delay = false;
    while let Some(line) = channel.read_line()? {
        if line == CAN_DELAY {
            can_delay = true;
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) if LOGGED_METADATA.contains(&key) => {
                log.field(&line)?;
                metadata.push((key.to_owned(), value.to_owned()));
            }
            _ => return Err(violation(format!("Unknown message '{line}'"))),
        }
    }

    if can_delay {
        session.request_delay(&pathname)?;
    }

    let payload = channel.read_stream()?;
    log.input_read(payload.len())?;

    Ok(Request {
        command,
        pathname,
        metadata,
        can_delay,
        payload,
    })
}

/// Content to answer `request` with. First match wins: cached delayed
/// output, empty output for error/abort, the transform, else fatal.
fn resolve_output(
    session: &Session,
    request: &Request,
    hook: Option<TestHook>,
) -> Result<Vec<u8>, FilterError> {
    if let Some(cached) = session.cached_output(&request.pathname) {
        return Ok(cached.to_vec());
    }
    if matches!(hook, Some(TestHook::Error | TestHook::Abort)) {
        return Ok(Vec::new());
    }
    if session.supports(request.command) {
        return Ok(transform::rot13(&request.payload));
    }
    Err(FilterError::UnsupportedOperation {
        command: request.command.to_string(),
    })
}

fn resolve_status(session: &Session, request: &Request, hook: Option<TestHook>) -> Status {
    match hook {
        Some(TestHook::Abort) => Status::Abort,
        Some(TestHook::Error) => Status::Error,
        _ if request.command == Command::Smudge && session.is_delay_pending(&request.pathname) => {
            Status::Delayed
        }
        _ => Status::Success,
    }
}

fn respond<R: Read, W: Write>(
    channel: &mut PktChannel<R, W>,
    session: &mut Session,
    log: &mut SessionLog,
    request: Request,
) -> Result<(), FilterError> {
    let hook = session.hook_for(request.command, &request.pathname);
    let output = resolve_output(session, &request, hook)?;
    let status = resolve_status(session, &request, hook);
    tracing::debug!(
        command = %request.command,
        pathname = %request.pathname,
        %status,
        "responding"
    );

    match status {
        Status::Abort => {
            session.mark_aborted(request.command);
            log.outcome(Outcome::Abort)?;
        }
        Status::Error => log.outcome(Outcome::Error)?,
        Status::Delayed => {
            log.outcome(Outcome::Delayed)?;
            if let Some(entry) = session.registry_mut().get_mut(&request.pathname) {
                entry.deliver(output.clone());
            }
        }
        Status::Success => {}
    }

    channel.write_line(&format!("status={status}"))?;
    channel.write_flush()?;
    if status != Status::Success {
        return Ok(());
    }

    if hook == Some(TestHook::WriteFail) {
        tracing::warn!(command = %request.command, "simulating write failure");
        log.outcome(Outcome::WriteFail)?;
        return Err(FilterError::SimulatedFault {
            command: request.command,
        });
    }

    log.output_started(output.len())?;
    let packets = channel.write_stream(&output)?;
    channel.write_flush()?;
    log.output_written(packets)?;
    channel.write_flush()
}
