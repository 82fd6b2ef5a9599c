//! pktfilter core — domain types, delay registry, reserved pathnames and the
//! content transform.
//!
//! - [`types`] — commands, statuses, capabilities, delay states
//! - [`registry`] — [`DelayRegistry`] and its fixture set
//! - [`hooks`] — reserved pathnames resolved to [`TestHook`] / [`ListQuirk`]
//! - [`transform`] — rot13
//! - [`error`] — [`RegistryError`]

pub mod error;
pub mod hooks;
pub mod registry;
pub mod transform;
pub mod types;

pub use error::RegistryError;
pub use hooks::{ListQuirk, TestHook};
pub use registry::{AvailableBlobs, DelayEntry, DelayRegistry};
pub use types::{Capability, Command, DelayState, Status, UnknownCommand};
