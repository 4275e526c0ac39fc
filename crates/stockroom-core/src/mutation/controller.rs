use tracing::{debug, info, warn};

use super::state::{lock, ListHandle, MutationPhase, Snapshot, StatusMessage};
use super::validate::{validate_issue, validate_modification};
use crate::api::{InventoryApi, IssueRequestBody};
use crate::cache::InventoryCache;
use crate::error::InventoryError;
use crate::models::{Instrument, InstrumentChanges, IssueOrder, IssueRequest};

/// Applies edits, deletions and issue requests to a local list before the
/// server confirms them, then reconciles or rolls back.
///
/// Each operation takes the list lock only for short synchronous steps, so
/// the optimistic state is visible to readers while the request is in flight.
/// Two mutations of the same instrument both apply; whichever reconciles last
/// wins.
pub struct MutationController<A: InventoryApi> {
    cache: InventoryCache<A>,
}

impl<A: InventoryApi> Clone for MutationController<A> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<A: InventoryApi> MutationController<A> {
    pub fn new(cache: InventoryCache<A>) -> Self {
        Self { cache }
    }

    /// Edit an instrument. Returns the server's version on success.
    pub async fn modify(
        &self,
        list: &ListHandle,
        id: i64,
        changes: &InstrumentChanges,
    ) -> Result<Instrument, InventoryError> {
        let (subcategory_id, proposed, snapshot) = {
            let mut state = lock(list);
            state.set_phase(id, MutationPhase::Validating);

            let Some(current) = state.get(id).cloned() else {
                state.set_phase(id, MutationPhase::Idle);
                return Err(InventoryError::NotInList(id));
            };
            let proposed = current.merged(changes);
            if let Err(e) = validate_modification(&proposed, changes) {
                debug!(id, error = %e, "Modification rejected");
                state.set_phase(id, MutationPhase::Rejected);
                return Err(e);
            }

            state.replace(proposed.clone());
            state.set_phase(id, MutationPhase::OptimisticallyApplied);
            (state.subcategory_id, proposed, Snapshot::Edited(current))
        };

        lock(list).set_phase(id, MutationPhase::Requesting);
        let result = self.cache.api().update_instrument(&proposed).await;

        match result {
            Ok(server) => {
                let server = with_known_refs(server, &proposed);
                let moved = server.sub_category.id != subcategory_id;
                {
                    let mut state = lock(list);
                    if moved {
                        state.items.retain(|i| i.id != id);
                    } else {
                        state.replace(server.clone());
                    }
                    state.set_phase(id, MutationPhase::Reconciled);
                    state.message = Some(StatusMessage::success(format!("Updated {}", server.name)));
                }
                self.reconcile_modified(subcategory_id, &server);
                info!(id, "Instrument updated");
                Ok(server)
            }
            Err(e) => {
                let error = InventoryError::from_mutation_failure(
                    e,
                    format!("Failed to update {}", proposed.name),
                );
                self.roll_back(list, id, snapshot, &error);
                Err(error)
            }
        }
    }

    /// Delete an instrument. Returns the removed instrument on success.
    pub async fn delete(&self, list: &ListHandle, id: i64) -> Result<Instrument, InventoryError> {
        let (subcategory_id, snapshot) = {
            let mut state = lock(list);
            state.set_phase(id, MutationPhase::Validating);

            let Some(index) = state.position(id) else {
                state.set_phase(id, MutationPhase::Idle);
                return Err(InventoryError::NotInList(id));
            };
            let instrument = state.items.remove(index);
            state.set_phase(id, MutationPhase::OptimisticallyApplied);
            (state.subcategory_id, Snapshot::Removed { index, instrument })
        };
        let name = snapshot.instrument().name.clone();

        lock(list).set_phase(id, MutationPhase::Requesting);
        let result = self.cache.api().delete_instrument(id).await;

        match result {
            Ok(()) => {
                {
                    let mut state = lock(list);
                    state.set_phase(id, MutationPhase::Reconciled);
                    state.message = Some(StatusMessage::success(format!("Deleted {}", name)));
                }
                self.cache
                    .patch_instruments(subcategory_id, |items| items.retain(|i| i.id != id));
                info!(id, "Instrument deleted");
                Ok(snapshot.into_instrument())
            }
            Err(e) => {
                let error =
                    InventoryError::from_mutation_failure(e, format!("Failed to delete {}", name));
                self.roll_back(list, id, snapshot, &error);
                Err(error)
            }
        }
    }

    /// Request `order.quantity` units of an instrument. The local quantity is
    /// decremented immediately and replaced by the server's figure when it
    /// reports one.
    pub async fn issue(
        &self,
        list: &ListHandle,
        id: i64,
        order: &IssueOrder,
    ) -> Result<IssueRequest, InventoryError> {
        let (subcategory_id, name, snapshot) = {
            let mut state = lock(list);
            state.set_phase(id, MutationPhase::Validating);

            let Some(current) = state.get(id).cloned() else {
                state.set_phase(id, MutationPhase::Idle);
                return Err(InventoryError::NotInList(id));
            };
            let available = current.available();
            if let Err(e) = validate_issue(order, available) {
                debug!(id, available, requested = order.quantity, "Issue rejected");
                state.set_phase(id, MutationPhase::Rejected);
                return Err(e);
            }

            let mut decremented = current.clone();
            decremented.quantity = available.saturating_sub(order.quantity).to_string();
            state.replace(decremented);
            state.set_phase(id, MutationPhase::OptimisticallyApplied);
            (state.subcategory_id, current.name.clone(), Snapshot::Edited(current))
        };

        let body = IssueRequestBody {
            item_id: id,
            quantity: order.quantity,
            user_role: order.user_role.clone(),
            remarks: order.remarks.clone(),
        };

        lock(list).set_phase(id, MutationPhase::Requesting);
        let result = self.cache.api().create_issue_request(&body).await;

        match result {
            Ok(request) => {
                let quantity = {
                    let mut state = lock(list);
                    let reported = request.item.reported_quantity().map(str::to_string);
                    let mut quantity = None;
                    if let Some(item) = state.items.iter_mut().find(|i| i.id == id) {
                        if let Some(reported) = reported {
                            item.quantity = reported;
                        }
                        quantity = Some(item.quantity.clone());
                    }
                    state.pending_requests.push(request.clone());
                    state.set_phase(id, MutationPhase::Reconciled);
                    state.message = Some(StatusMessage::success(format!(
                        "Requested {} x {}",
                        order.quantity, name
                    )));
                    quantity
                };
                if let Some(quantity) = quantity {
                    self.cache.patch_instruments(subcategory_id, |items| {
                        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                            item.quantity = quantity.clone();
                        }
                    });
                }
                info!(id, request = request.id, quantity = order.quantity, "Issue request created");
                Ok(request)
            }
            Err(e) => {
                let error =
                    InventoryError::from_mutation_failure(e, format!("Failed to request {}", name));
                self.roll_back(list, id, snapshot, &error);
                Err(error)
            }
        }
    }

    fn roll_back(&self, list: &ListHandle, id: i64, snapshot: Snapshot, error: &InventoryError) {
        warn!(id, error = %error, "Mutation failed, rolling back");
        let mut state = lock(list);
        snapshot.restore(&mut state);
        state.set_phase(id, MutationPhase::RolledBack);
        state.message = Some(StatusMessage::error(error.to_string()));
    }

    /// Bring both cache tiers in line with the server's copy, including a
    /// move to another subcategory.
    fn reconcile_modified(&self, subcategory_id: i64, server: &Instrument) {
        let id = server.id;
        let target = server.sub_category.id;
        if target == subcategory_id {
            self.cache.patch_instruments(subcategory_id, |items| {
                if let Some(slot) = items.iter_mut().find(|i| i.id == id) {
                    *slot = server.clone();
                }
            });
            return;
        }

        self.cache
            .patch_instruments(subcategory_id, |items| items.retain(|i| i.id != id));
        self.cache.patch_instruments(target, |items| {
            items.retain(|i| i.id != id);
            items.push(server.clone());
        });
    }
}

/// Responses that omit `category` or `sub_category` deserialize them as id 0.
/// Keep the local references in that case so the instrument stays where it is.
fn with_known_refs(mut server: Instrument, proposed: &Instrument) -> Instrument {
    if server.sub_category.id == 0 {
        server.sub_category = proposed.sub_category.clone();
    }
    if server.category.id == 0 {
        server.category = proposed.category.clone();
    }
    server
}
