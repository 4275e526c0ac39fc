//! Scripted `InventoryApi` used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Semaphore;

use crate::api::{ApiError, InventoryApi, IssueRequestBody};
use crate::models::{
    Category, CategoryRef, Instrument, IssueRequest, IssueStatus, ItemRef, Subcategory,
};

pub fn instrument(id: i64, subcategory_id: i64, name: &str, quantity: &str) -> Instrument {
    Instrument {
        id,
        name: name.to_string(),
        serial_number: format!("SN-{}", id),
        cost: "100.00".to_string(),
        quantity: quantity.to_string(),
        category: CategoryRef {
            id: 1,
            name: "Optics".to_string(),
        },
        sub_category: CategoryRef {
            id: subcategory_id,
            name: format!("Sub {}", subcategory_id),
        },
        ..Instrument::default()
    }
}

/// Poll `condition` until it holds, yielding to spawned tasks in between.
pub async fn wait_for<F: FnMut() -> bool>(mut condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

#[derive(Clone)]
enum MutationFailure {
    Status(StatusCode, String),
    Transit(String),
}

#[derive(Default)]
pub struct MockApi {
    categories: Vec<Category>,
    subcategories: HashMap<i64, Vec<Subcategory>>,
    instruments: Mutex<HashMap<i64, Vec<Instrument>>>,
    calls: Mutex<HashMap<String, usize>>,
    fail_reads: Mutex<bool>,
    failing_subcategories: Mutex<HashSet<i64>>,
    mutation_failure: Mutex<Option<MutationFailure>>,
    update_override: Mutex<Option<Instrument>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    read_latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_request_id: AtomicI64,
}

impl MockApi {
    /// Two categories, six subcategories, instruments in a few of them.
    /// Subcategory 42 holds instrument 7 (quantity 10) and instrument 9.
    pub fn with_catalog() -> Self {
        let categories = vec![
            Category { id: 1, name: "Optics".to_string() },
            Category { id: 2, name: "Electronics".to_string() },
        ];
        let sub = |id: i64, name: &str, category_id: i64| Subcategory {
            id,
            name: name.to_string(),
            category_id,
        };
        let mut subcategories = HashMap::new();
        subcategories.insert(
            1,
            vec![
                sub(42, "Microscopes", 1),
                sub(43, "Telescopes", 1),
                sub(44, "Spectrometers", 1),
                sub(45, "Lenses", 1),
            ],
        );
        subcategories.insert(2, vec![sub(50, "Oscilloscopes", 2), sub(51, "Multimeters", 2)]);

        let mut instruments = HashMap::new();
        instruments.insert(
            42,
            vec![
                instrument(7, 42, "Compound Microscope", "10"),
                instrument(9, 42, "Stereo Microscope", "2"),
                instrument(11, 42, "Phase Contrast Microscope", "5"),
            ],
        );
        instruments.insert(43, vec![instrument(20, 43, "Refractor", "1")]);
        instruments.insert(50, vec![instrument(30, 50, "Scope 100MHz", "4")]);

        Self {
            categories,
            subcategories,
            instruments: Mutex::new(instruments),
            next_request_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn instruments_for(&self, subcategory_id: i64) -> Vec<Instrument> {
        self.instruments
            .lock()
            .unwrap()
            .get(&subcategory_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn fail_instruments_for(&self, subcategory_id: i64) {
        self.failing_subcategories.lock().unwrap().insert(subcategory_id);
    }

    pub fn fail_mutations(&self, status: StatusCode, body: &str) {
        *self.mutation_failure.lock().unwrap() =
            Some(MutationFailure::Status(status, body.to_string()));
    }

    /// Mutations fail without a server answer, like a dropped connection.
    pub fn fail_mutations_in_transit(&self, reason: &str) {
        *self.mutation_failure.lock().unwrap() = Some(MutationFailure::Transit(reason.to_string()));
    }

    pub fn respond_to_update_with(&self, instrument: Instrument) {
        *self.update_override.lock().unwrap() = Some(instrument);
    }

    pub fn set_read_latency(&self, latency: Duration) {
        *self.read_latency.lock().unwrap() = Some(latency);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Block mutation requests until `release_mutations` is called.
    pub fn hold_mutations(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_mutations(&self) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    fn record(&self, key: String) {
        *self.calls.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    async fn read_gate(&self) -> Result<(), ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.read_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if *self.fail_reads.lock().unwrap() {
            return Err(ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "unavailable"));
        }
        Ok(())
    }

    async fn mutation_gate(&self) -> Result<(), ApiError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let failure = self.mutation_failure.lock().unwrap().clone();
        match failure {
            Some(MutationFailure::Status(status, body)) => Err(ApiError::from_status(status, &body)),
            Some(MutationFailure::Transit(reason)) => Err(ApiError::InvalidResponse(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InventoryApi for MockApi {
    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.record("categories".to_string());
        self.read_gate().await?;
        Ok(self.categories.clone())
    }

    async fn fetch_subcategories(&self, category_id: i64) -> Result<Vec<Subcategory>, ApiError> {
        self.record(format!("subs:{}", category_id));
        self.read_gate().await?;
        Ok(self.subcategories.get(&category_id).cloned().unwrap_or_default())
    }

    async fn fetch_instruments(&self, subcategory_id: i64) -> Result<Vec<Instrument>, ApiError> {
        self.record(format!("items:{}", subcategory_id));
        self.read_gate().await?;
        if self.failing_subcategories.lock().unwrap().contains(&subcategory_id) {
            return Err(ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream timeout"));
        }
        Ok(self.instruments_for(subcategory_id))
    }

    async fn update_instrument(&self, instrument: &Instrument) -> Result<Instrument, ApiError> {
        self.record(format!("put:{}", instrument.id));
        self.mutation_gate().await?;
        let stored = self
            .update_override
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| instrument.clone());
        let mut all = self.instruments.lock().unwrap();
        if let Some(items) = all.get_mut(&stored.sub_category.id) {
            if let Some(slot) = items.iter_mut().find(|i| i.id == stored.id) {
                *slot = stored.clone();
            }
        }
        Ok(stored)
    }

    async fn delete_instrument(&self, id: i64) -> Result<(), ApiError> {
        self.record(format!("delete:{}", id));
        self.mutation_gate().await?;
        for items in self.instruments.lock().unwrap().values_mut() {
            items.retain(|i| i.id != id);
        }
        Ok(())
    }

    async fn create_issue_request(
        &self,
        body: &IssueRequestBody,
    ) -> Result<IssueRequest, ApiError> {
        self.record(format!("issue:{}", body.item_id));
        self.mutation_gate().await?;

        let mut remaining = None;
        let mut name = String::new();
        for items in self.instruments.lock().unwrap().values_mut() {
            if let Some(item) = items.iter_mut().find(|i| i.id == body.item_id) {
                let left = item.available().saturating_sub(body.quantity);
                item.quantity = left.to_string();
                remaining = Some(item.quantity.clone());
                name = item.name.clone();
            }
        }

        Ok(IssueRequest {
            id: self.next_request_id.fetch_add(1, Ordering::SeqCst),
            item: ItemRef::Summary {
                id: body.item_id,
                name,
                quantity: remaining,
            },
            user: Some("lab-admin".to_string()),
            user_id: Some(3),
            quantity: body.quantity,
            status: IssueStatus::Pending,
            created_at: Some("2024-03-01T10:00:00Z".to_string()),
            remarks: Some(body.remarks.clone()),
            user_role: Some(body.user_role.clone()),
        })
    }
}
