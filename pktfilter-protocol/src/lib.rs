//! Server side of the long-running content filter protocol.
//!
//! A session negotiates capabilities with the driver, then answers `clean`,
//! `smudge` and `list_available_blobs` requests over pkt-line framing until
//! the driver closes the stream.

pub mod command_loop;
mod config;
pub mod constants;
mod error;
pub mod negotiate;
pub mod pkt_line;
mod runtime;
pub mod session;
pub mod session_log;

pub use command_loop::Request;
pub use config::FilterConfig;
pub use error::FilterError;
pub use negotiate::negotiate;
pub use pkt_line::{Packet, PktChannel};
pub use runtime::{serve, start_blocking};
pub use session::Session;
pub use session_log::SessionLog;
