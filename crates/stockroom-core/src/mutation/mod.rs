//! Optimistic mutations of instruments: edit, delete, and issue requests.
//!
//! A mutation validates locally, applies to the shared `InstrumentList`
//! right away, then either reconciles with the server response (patching
//! both cache tiers) or restores the pre-mutation snapshot.

mod controller;
mod state;
mod validate;

pub use controller::MutationController;
pub use state::{InstrumentList, ListHandle, MessageKind, MutationPhase, StatusMessage};
pub use validate::{validate_issue, validate_modification};
