use serde::{Deserialize, Serialize};

use super::instrument::opt_string_or_number;

/// Lifecycle state of an issue request. Owned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    #[serde(untagged)]
    Other(String),
}

/// The item an issue request refers to: either a bare id or a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemRef {
    Id(i64),
    Summary {
        id: i64,
        #[serde(default)]
        name: String,
        #[serde(default, deserialize_with = "opt_string_or_number")]
        quantity: Option<String>,
    },
}

impl ItemRef {
    pub fn id(&self) -> i64 {
        match self {
            ItemRef::Id(id) => *id,
            ItemRef::Summary { id, .. } => *id,
        }
    }

    /// Remaining stock reported by the server, when the payload carries it.
    pub fn reported_quantity(&self) -> Option<&str> {
        match self {
            ItemRef::Summary {
                quantity: Some(q), ..
            } => Some(q.as_str()),
            _ => None,
        }
    }
}

/// A request to issue stock, as returned by `POST /issue-requests/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub id: i64,
    pub item: ItemRef,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub quantity: u64,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
}

/// What the user asked for when issuing an instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOrder {
    pub quantity: u64,
    pub user_role: String,
    pub remarks: String,
}

impl IssueOrder {
    pub fn new(quantity: u64, user_role: impl Into<String>) -> Self {
        Self {
            quantity,
            user_role: user_role.into(),
            remarks: String::new(),
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_request_with_item_summary() {
        let json = r#"{
            "id": 11,
            "item": {"id": 7, "name": "Microscope", "quantity": 4},
            "user": "lab-admin",
            "user_id": 3,
            "quantity": 2,
            "status": "pending",
            "created_at": "2024-03-01T10:00:00Z"
        }"#;
        let req: IssueRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.item.id(), 7);
        assert_eq!(req.item.reported_quantity(), Some("4"));
        assert_eq!(req.status, IssueStatus::Pending);
    }

    #[test]
    fn test_issue_request_with_bare_item_id() {
        let json = r#"{"id": 12, "item": 9, "quantity": 1, "status": "on_hold"}"#;
        let req: IssueRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.item, ItemRef::Id(9));
        assert_eq!(req.item.reported_quantity(), None);
        assert_eq!(req.status, IssueStatus::Other("on_hold".to_string()));
    }
}
