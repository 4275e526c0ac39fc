//! Data models for inventory entities.
//!
//! This module contains the data structures exchanged with the inventory API:
//!
//! - `Category`, `Subcategory`: the catalog hierarchy
//! - `Instrument`, `InstrumentChanges`: stock items and proposed edits
//! - `IssueRequest`, `IssueOrder`: issue workflow requests

pub mod catalog;
pub mod instrument;
pub mod issue;

pub use catalog::{Category, CategoryRef, Subcategory};
pub use instrument::{Instrument, InstrumentChanges};
pub use issue::{IssueOrder, IssueRequest, IssueStatus, ItemRef};
