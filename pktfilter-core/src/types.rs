//! Domain types shared by the filter protocol.
//!
//! Wire spellings live here so the protocol crate never compares raw strings
//! for commands or statuses.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A named optional protocol feature, e.g. `clean`, `smudge` or `delay`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability(pub String);

impl Capability {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A command sent by the driver in a `command=<value>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Clean,
    Smudge,
    ListAvailableBlobs,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Clean => "clean",
            Command::Smudge => "smudge",
            Command::ListAvailableBlobs => "list_available_blobs",
        }
    }

    /// The capability that must have been negotiated before this command may
    /// transform content. `None` for the list query, which needs none.
    pub fn capability(self) -> Option<Capability> {
        match self {
            Command::Clean | Command::Smudge => Some(Capability::from(self.as_str())),
            Command::ListAvailableBlobs => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `command=` value is not one this filter knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command '{}'", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clean" => Ok(Command::Clean),
            "smudge" => Ok(Command::Smudge),
            "list_available_blobs" => Ok(Command::ListAvailableBlobs),
            other => Err(UnknownCommand(other.to_owned())),
        }
    }
}

/// Outcome reported to the driver in a `status=<value>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Abort,
    Delayed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
            Status::Abort => "abort",
            Status::Delayed => "delayed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a delayed pathname. Only ever advances left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DelayState {
    #[default]
    NotRequested,
    Requested,
    Delivered,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
