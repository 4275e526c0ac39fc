use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{Instrument, IssueRequest};

/// Where a single-entity mutation currently stands.
///
/// `Idle -> Validating -> Rejected`, or
/// `Idle -> Validating -> OptimisticallyApplied -> Requesting -> Reconciled | RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPhase {
    #[default]
    Idle,
    Validating,
    Rejected,
    OptimisticallyApplied,
    Requesting,
    Reconciled,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// User-visible outcome of the latest mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

/// Locally held instruments of one subcategory, as the UI renders them.
#[derive(Debug, Clone, Default)]
pub struct InstrumentList {
    pub subcategory_id: i64,
    pub items: Vec<Instrument>,
    /// Issue requests created from this list and not yet settled by the server
    pub pending_requests: Vec<IssueRequest>,
    pub message: Option<StatusMessage>,
    phases: HashMap<i64, MutationPhase>,
}

/// Shared handle to an `InstrumentList`. The lock is never held across I/O.
pub type ListHandle = Arc<Mutex<InstrumentList>>;

impl InstrumentList {
    pub fn new(subcategory_id: i64, items: Vec<Instrument>) -> Self {
        Self {
            subcategory_id,
            items,
            ..Self::default()
        }
    }

    pub fn into_handle(self) -> ListHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn get(&self, id: i64) -> Option<&Instrument> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    pub fn phase_of(&self, id: i64) -> MutationPhase {
        self.phases.get(&id).copied().unwrap_or_default()
    }

    pub(crate) fn set_phase(&mut self, id: i64, phase: MutationPhase) {
        self.phases.insert(id, phase);
    }

    /// Replace the instrument with the same id. Returns false if it is not in the list.
    pub(crate) fn replace(&mut self, instrument: Instrument) -> bool {
        match self.items.iter_mut().find(|i| i.id == instrument.id) {
            Some(slot) => {
                *slot = instrument;
                true
            }
            None => false,
        }
    }
}

/// Lock a list handle. A poisoned lock still yields the data; list state is
/// plain values and stays consistent between statements.
pub(crate) fn lock(list: &ListHandle) -> MutexGuard<'_, InstrumentList> {
    list.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Pre-mutation state of a single entity, captured before the optimistic apply.
#[derive(Debug, Clone)]
pub(crate) enum Snapshot {
    /// The entity was edited in place
    Edited(Instrument),
    /// The entity was removed from `index`
    Removed { index: usize, instrument: Instrument },
}

impl Snapshot {
    pub(crate) fn instrument(&self) -> &Instrument {
        match self {
            Snapshot::Edited(instrument) | Snapshot::Removed { instrument, .. } => instrument,
        }
    }

    pub(crate) fn into_instrument(self) -> Instrument {
        match self {
            Snapshot::Edited(instrument) | Snapshot::Removed { instrument, .. } => instrument,
        }
    }

    /// Put the snapshot back in one step.
    pub(crate) fn restore(self, list: &mut InstrumentList) {
        match self {
            Snapshot::Edited(instrument) => {
                if !list.replace(instrument.clone()) {
                    list.items.push(instrument);
                }
            }
            Snapshot::Removed { index, instrument } => {
                list.items.retain(|i| i.id != instrument.id);
                let index = index.min(list.items.len());
                list.items.insert(index, instrument);
            }
        }
    }
}
