//! Mutable state owned by one filter session.

use std::collections::HashSet;

use pktfilter_core::{
    hooks, registry::ALWAYS_DELAY_COUNT, Capability, Command, DelayRegistry, DelayState, TestHook,
};

use crate::error::FilterError;

#[derive(Debug)]
pub struct Session {
    capabilities: Vec<Capability>,
    always_delay: bool,
    registry: DelayRegistry,
    aborted: HashSet<Command>,
}

impl Session {
    /// Start a session with the negotiated capabilities and a freshly seeded
    /// delay registry.
    pub fn new(capabilities: Vec<Capability>, always_delay: bool) -> Result<Self, FilterError> {
        Ok(Self::with_registry(
            capabilities,
            always_delay,
            DelayRegistry::with_fixtures()?,
        ))
    }

    pub fn with_registry(
        capabilities: Vec<Capability>,
        always_delay: bool,
        registry: DelayRegistry,
    ) -> Self {
        Self {
            capabilities,
            always_delay,
            registry,
            aborted: HashSet::new(),
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn supports(&self, command: Command) -> bool {
        command
            .capability()
            .is_some_and(|cap| self.capabilities.contains(&cap))
    }

    pub fn registry(&self) -> &DelayRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DelayRegistry {
        &mut self.registry
    }

    /// Handle `can-delay=1` for `pathname`.
    pub fn request_delay(&mut self, pathname: &str) -> Result<(), FilterError> {
        match self.registry.get_mut(pathname) {
            Some(entry) => {
                entry.request();
            }
            None if self.always_delay => {
                self.registry.insert_requested(pathname, ALWAYS_DELAY_COUNT)?;
            }
            None => {}
        }
        Ok(())
    }

    /// Whether a smudge of `pathname` is waiting to be answered with
    /// `status=delayed`.
    pub fn is_delay_pending(&self, pathname: &str) -> bool {
        self.registry
            .get(pathname)
            .is_some_and(|entry| entry.state() == DelayState::Requested)
    }

    /// Output cached by an earlier delayed response, if any.
    pub fn cached_output(&self, pathname: &str) -> Option<&[u8]> {
        self.registry.get(pathname).and_then(|e| e.cached_output())
    }

    /// Reserved-pathname hook for this request. Once a command has been
    /// aborted every later request with it aborts too.
    pub fn hook_for(&self, command: Command, pathname: &str) -> Option<TestHook> {
        if self.aborted.contains(&command) {
            return Some(TestHook::Abort);
        }
        hooks::resolve(command, pathname)
    }

    pub fn mark_aborted(&mut self, command: Command) {
        self.aborted.insert(command);
    }

    pub fn is_aborted(&self, command: Command) -> bool {
        self.aborted.contains(&command)
    }
}
