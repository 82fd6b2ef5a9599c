//! Startup handshake and capability exchange. Runs once per session; any
//! deviation is fatal.

use std::io::{Read, Write};

use pktfilter_core::Capability;

use crate::constants::{client_identity, server_identity, version_line};
use crate::error::{violation, FilterError};
use crate::pkt_line::PktChannel;

/// Run the whole startup exchange and return the capabilities in force for
/// the session: exactly `offered`, once each was confirmed by the peer.
pub fn negotiate<R: Read, W: Write>(
    channel: &mut PktChannel<R, W>,
    required: &[Capability],
    offered: &[Capability],
) -> Result<Vec<Capability>, FilterError> {
    initialize(channel)?;
    let remote = read_capabilities(channel)?;

    if let Some(missing) = required.iter().find(|cap| !remote.contains(cap)) {
        return Err(violation(format!(
            "required '{missing}' capability not available from remote"
        )));
    }

    for cap in offered {
        if !remote.contains(cap) {
            return Err(violation(format!(
                "our capability '{cap}' is not available from remote"
            )));
        }
        channel.write_line(&format!("capability={cap}\n"))?;
    }
    channel.write_flush()?;

    tracing::info!(
        remote = ?remote.iter().map(Capability::as_str).collect::<Vec<_>>(),
        agreed = ?offered.iter().map(Capability::as_str).collect::<Vec<_>>(),
        "capability negotiation complete"
    );
    Ok(offered.to_vec())
}

/// Identity and version exchange.
fn initialize<R: Read, W: Write>(channel: &mut PktChannel<R, W>) -> Result<(), FilterError> {
    let expected = client_identity();
    match channel.read_line()? {
        Some(line) if line == expected => {}
        other => {
            return Err(violation(format!(
                "bad initialize: '{}'",
                other.unwrap_or_default()
            )))
        }
    }

    let version = version_line();
    match channel.read_line()? {
        Some(line) if line == version => {}
        other => {
            return Err(violation(format!(
                "bad version: '{}'",
                other.unwrap_or_default()
            )))
        }
    }

    channel.expect_flush("version end")?;

    channel.write_line(&server_identity())?;
    channel.write_line(&version)?;
    channel.write_flush()
}

fn read_capabilities<R: Read, W: Write>(
    channel: &mut PktChannel<R, W>,
) -> Result<Vec<Capability>, FilterError> {
    let mut caps = Vec::new();
    while let Some(line) = channel.read_line()? {
        match line.strip_prefix("capability=") {
            Some(name) if !name.is_empty() => caps.push(Capability::from(name)),
            _ => return Err(violation(format!("bad capability: '{line}'"))),
        }
    }
    Ok(caps)
}
