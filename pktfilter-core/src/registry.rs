//! Delay registry: per-pathname bookkeeping for delayed smudge results.
//!
//! Entries are seeded once per session and then only transitioned and
//! decremented; nothing is ever removed. Iteration order is the hash map's
//! and therefore unspecified. Callers that need a stable order sort.

use std::collections::{BTreeSet, HashMap};

use crate::error::RegistryError;
use crate::hooks::{self, ListQuirk, UNFILTERED_PATHNAME};
use crate::types::DelayState;

/// Pathnames seeded into every session with their initial countdown.
pub const DELAY_FIXTURES: &[(&str, u32)] = &[
    ("test-delay10.a", 1),
    ("test-delay11.a", 1),
    ("test-delay20.a", 2),
    ("test-delay10.b", 1),
    (hooks::MISSING_DELAY_PATHNAME, 1),
    (hooks::INVALID_DELAY_PATHNAME, 1),
];

/// Countdown used for entries created on the fly in delay-all mode.
pub const ALWAYS_DELAY_COUNT: u32 = 1;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelayEntry {
    state: DelayState,
    remaining: u32,
    cached_output: Option<Vec<u8>>,
}

impl DelayEntry {
    pub fn new(remaining: u32) -> Self {
        Self {
            remaining,
            ..Self::default()
        }
    }

    pub fn state(&self) -> DelayState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn cached_output(&self) -> Option<&[u8]> {
        self.cached_output.as_deref()
    }

    /// Whether the driver has asked for this pathname to be delayed.
    pub fn is_requested(&self) -> bool {
        self.state != DelayState::NotRequested
    }

    /// `NotRequested → Requested`. Returns `false` if the delay was already
    /// requested.
    pub fn request(&mut self) -> bool {
        if self.state != DelayState::NotRequested {
            return false;
        }
        self.state = DelayState::Requested;
        true
    }

    /// `Requested → Delivered`, caching `output` for the follow-up request.
    /// Returns `false` and leaves the entry untouched in any other state.
    pub fn deliver(&mut self, output: Vec<u8>) -> bool {
        if self.state != DelayState::Requested {
            return false;
        }
        self.state = DelayState::Delivered;
        self.cached_output = Some(output);
        true
    }

    /// Count down one availability query. Returns `true` exactly once: on
    /// the decrement that reaches zero.
    fn tick(&mut self) -> bool {
        if !self.is_requested() {
            return false;
        }
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                left == 0
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Result of one `list_available_blobs` sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableBlobs {
    /// Pathnames to announce, in registry iteration order. May include
    /// pathnames that were never delayed.
    pub announced: Vec<String>,
    /// Registry pathnames that became available, sorted.
    pub ready: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DelayRegistry {
    entries: HashMap<String, DelayEntry>,
}

impl DelayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with [`DELAY_FIXTURES`].
    pub fn with_fixtures() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (pathname, remaining) in DELAY_FIXTURES {
            registry.insert(pathname, *remaining)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, pathname: &str, remaining: u32) -> Result<(), RegistryError> {
        self.insert_entry(pathname, DelayEntry::new(remaining))
    }

    /// Insert an entry that is already `Requested` (delay-all mode).
    pub fn insert_requested(
        &mut self,
        pathname: &str,
        remaining: u32,
    ) -> Result<(), RegistryError> {
        let mut entry = DelayEntry::new(remaining);
        entry.request();
        self.insert_entry(pathname, entry)
    }

    fn insert_entry(&mut self, pathname: &str, entry: DelayEntry) -> Result<(), RegistryError> {
        if self.entries.contains_key(pathname) {
            return Err(RegistryError::DuplicateKey {
                pathname: pathname.to_owned(),
            });
        }
        self.entries.insert(pathname.to_owned(), entry);
        Ok(())
    }

    pub fn get(&self, pathname: &str) -> Option<&DelayEntry> {
        self.entries.get(pathname)
    }

    pub fn get_mut(&mut self, pathname: &str) -> Option<&mut DelayEntry> {
        self.entries.get_mut(pathname)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DelayEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Service one `list_available_blobs` query: count down every requested
    /// entry and collect the pathnames to announce, applying list quirks.
    pub fn poll_available(&mut self) -> AvailableBlobs {
        let mut blobs = AvailableBlobs::default();
        for (pathname, entry) in self.entries.iter_mut() {
            if !entry.is_requested() {
                continue;
            }
            let reached_zero = entry.tick();
            let quirk = hooks::list_quirk(pathname);
            if quirk == Some(ListQuirk::AnnounceUnfiltered) {
                blobs.announced.push(UNFILTERED_PATHNAME.to_owned());
            }
            if reached_zero && quirk != Some(ListQuirk::Suppress) {
                blobs.announced.push(pathname.clone());
                blobs.ready.insert(pathname.clone());
            }
        }
        blobs
    }
}
