//! REST API client module for the inventory service.
//!
//! This module provides the `InventoryApi` seam the cache layer talks to and
//! `ApiClient`, its reqwest-backed implementation. Authentication is handled
//! elsewhere; the client only forwards the session cookie.

pub mod client;
pub mod error;
pub mod inventory;

pub use client::ApiClient;
pub use error::ApiError;
pub use inventory::{InventoryApi, IssueRequestBody};
