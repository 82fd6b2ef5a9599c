//! Reserved pathnames that trigger test behaviour instead of a plain
//! transform.
//!
//! Every pathname is resolved once against these tables so the command loop
//! branches on [`TestHook`] / [`ListQuirk`] values rather than literals.

use crate::types::Command;

pub const ERROR_PATHNAME: &str = "error.r";
pub const ABORT_PATHNAME: &str = "abort.r";
pub const CLEAN_WRITE_FAIL_PATHNAME: &str = "clean-write-fail.r";
pub const SMUDGE_WRITE_FAIL_PATHNAME: &str = "smudge-write-fail.r";

pub const INVALID_DELAY_PATHNAME: &str = "invalid-delay.a";
pub const MISSING_DELAY_PATHNAME: &str = "missing-delay.a";

/// Pathname announced by the invalid-delay quirk. It was never delayed.
pub const UNFILTERED_PATHNAME: &str = "unfiltered";

/// Behaviour forced on a single file request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestHook {
    /// Reply `status=error` with no content.
    Error,
    /// Reply `status=abort` and abort every later request of this command.
    Abort,
    /// Declare success, then die before sending content.
    WriteFail,
}

/// Misbehaviour applied to a registry entry while answering
/// `list_available_blobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListQuirk {
    /// Also announce [`UNFILTERED_PATHNAME`].
    AnnounceUnfiltered,
    /// Never announce this entry.
    Suppress,
}

const FILE_HOOKS: &[(&str, Option<Command>, TestHook)] = &[
    (ERROR_PATHNAME, None, TestHook::Error),
    (ABORT_PATHNAME, None, TestHook::Abort),
    (CLEAN_WRITE_FAIL_PATHNAME, Some(Command::Clean), TestHook::WriteFail),
    (SMUDGE_WRITE_FAIL_PATHNAME, Some(Command::Smudge), TestHook::WriteFail),
];

const LIST_QUIRKS: &[(&str, ListQuirk)] = &[
    (INVALID_DELAY_PATHNAME, ListQuirk::AnnounceUnfiltered),
    (MISSING_DELAY_PATHNAME, ListQuirk::Suppress),
];

/// Look up the hook for `pathname` under `command`. A hook bound to a
/// command only fires for that command.
pub fn resolve(command: Command, pathname: &str) -> Option<TestHook> {
    FILE_HOOKS
        .iter()
        .find(|(name, scope, _)| *name == pathname && scope.map_or(true, |c| c == command))
        .map(|(_, _, hook)| *hook)
}

pub fn list_quirk(pathname: &str) -> Option<ListQuirk> {
    LIST_QUIRKS
        .iter()
        .find(|(name, _)| *name == pathname)
        .map(|(_, quirk)| *quirk)
}
