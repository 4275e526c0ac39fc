use async_trait::async_trait;
use serde::Serialize;

use super::ApiError;
use crate::models::{Category, Instrument, IssueRequest, Subcategory};

/// Body of `POST /issue-requests/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRequestBody {
    pub item_id: i64,
    pub quantity: u64,
    pub user_role: String,
    pub remarks: String,
}

/// Operations the cache layer needs from the remote inventory API.
#[async_trait]
pub trait InventoryApi: Send + Sync + 'static {
    /// `GET /categories`
    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// `GET /subcategories?category_id={id}`
    async fn fetch_subcategories(&self, category_id: i64) -> Result<Vec<Subcategory>, ApiError>;

    /// `GET /items?subcategory={id}`
    async fn fetch_instruments(&self, subcategory_id: i64) -> Result<Vec<Instrument>, ApiError>;

    /// `PUT /items/{id}` with the full instrument; returns the stored version.
    async fn update_instrument(&self, instrument: &Instrument) -> Result<Instrument, ApiError>;

    /// `DELETE /items/{id}`
    async fn delete_instrument(&self, id: i64) -> Result<(), ApiError>;

    /// `POST /issue-requests/`
    async fn create_issue_request(&self, body: &IssueRequestBody)
        -> Result<IssueRequest, ApiError>;
}
