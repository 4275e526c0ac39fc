//! Field checks run before any optimistic change.

use chrono::NaiveDate;

use crate::error::InventoryError;
use crate::models::{Instrument, InstrumentChanges, IssueOrder};
use crate::utils::parse_decimal;

/// Date format used by the purchase date field
const PURCHASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Check an edit before it is applied.
///
/// `proposed` is the instrument with `changes` merged in. Name and quantity
/// must hold on the result; format checks apply only to the fields the edit
/// sets.
pub fn validate_modification(
    proposed: &Instrument,
    changes: &InstrumentChanges,
) -> Result<(), InventoryError> {
    if changes.is_empty() {
        return Err(InventoryError::validation("changes", "nothing to update"));
    }

    if proposed.name.trim().is_empty() {
        return Err(InventoryError::validation("name", "is required"));
    }

    match parse_decimal(&proposed.quantity) {
        Some(quantity) if quantity >= 0.0 => {}
        _ => {
            return Err(InventoryError::validation(
                "quantity",
                "must be a number of 0 or more",
            ))
        }
    }

    if let Some(cost) = touched(&changes.cost) {
        match parse_decimal(cost) {
            Some(cost) if cost >= 0.0 => {}
            _ => return Err(InventoryError::validation("cost", "must be a positive amount")),
        }
    }

    if let Some(email) = touched(&changes.buyer_email) {
        if !looks_like_email(email) {
            return Err(InventoryError::validation("buyer_email", "is not a valid email address"));
        }
    }

    if let Some(date) = touched(&changes.purchase_date) {
        if NaiveDate::parse_from_str(date, PURCHASE_DATE_FORMAT).is_err() {
            return Err(InventoryError::validation("purchase_date", "must be a date (YYYY-MM-DD)"));
        }
    }

    Ok(())
}

/// `0 < requested <= available`.
pub fn validate_issue(order: &IssueOrder, available: u64) -> Result<(), InventoryError> {
    if order.quantity == 0 {
        return Err(InventoryError::validation("quantity", "must be at least 1"));
    }
    if order.quantity > available {
        return Err(InventoryError::validation(
            "quantity",
            format!("only {} available", available),
        ));
    }
    if order.user_role.trim().is_empty() {
        return Err(InventoryError::validation("user_role", "is required"));
    }
    Ok(())
}

/// A changed optional field with content. Clearing a field is always allowed.
fn touched(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::instrument;

    fn check(item: &Instrument, changes: InstrumentChanges) -> Result<(), InventoryError> {
        validate_modification(&item.merged(&changes), &changes)
    }

    #[test]
    fn test_valid_modification() {
        let item = instrument(1, 42, "Scope", "3");
        let changes = InstrumentChanges {
            buyer_email: Some("buyer@example.com".to_string()),
            purchase_date: Some("2023-07-14".to_string()),
            ..InstrumentChanges::quantity("4")
        };
        assert!(check(&item, changes).is_ok());
    }

    #[test]
    fn test_quantity_must_be_non_negative_number() {
        let item = instrument(1, 42, "Scope", "3");
        for bad in ["-1", "", "many"] {
            let err = check(&item, InstrumentChanges::quantity(bad)).unwrap_err();
            assert_eq!(err.field(), Some("quantity"), "input {:?}", bad);
        }
        assert!(check(&item, InstrumentChanges::quantity("10.00")).is_ok());
    }

    #[test]
    fn test_field_specific_errors() {
        let item = instrument(1, 42, "Scope", "1");
        let with = |changes: InstrumentChanges| check(&item, changes).unwrap_err().field();

        assert_eq!(
            with(InstrumentChanges { name: Some("  ".to_string()), ..Default::default() }),
            Some("name")
        );
        assert_eq!(
            with(InstrumentChanges { cost: Some("-5".to_string()), ..Default::default() }),
            Some("cost")
        );
        assert_eq!(
            with(InstrumentChanges { buyer_email: Some("nobody".to_string()), ..Default::default() }),
            Some("buyer_email")
        );
        assert_eq!(
            with(InstrumentChanges { purchase_date: Some("14/07/2023".to_string()), ..Default::default() }),
            Some("purchase_date")
        );
    }

    #[test]
    fn test_untouched_fields_are_not_format_checked() {
        let mut item = instrument(1, 42, "Scope", "1");
        item.purchase_date = "2023-07-14T00:00:00Z".to_string();
        item.buyer_email = "front desk".to_string();
        item.cost = "n/a".to_string();

        let changes = InstrumentChanges {
            remarks: Some("recalibrated".to_string()),
            ..Default::default()
        };
        assert!(check(&item, changes).is_ok());
    }

    #[test]
    fn test_clearing_an_optional_field_is_allowed() {
        let item = instrument(1, 42, "Scope", "1");
        let changes = InstrumentChanges {
            purchase_date: Some(String::new()),
            ..Default::default()
        };
        assert!(check(&item, changes).is_ok());
    }

    #[test]
    fn test_issue_bounds() {
        let order = |q| IssueOrder::new(q, "student");
        assert!(validate_issue(&order(5), 5).is_ok());
        assert!(validate_issue(&order(6), 5).is_err());
        assert!(validate_issue(&order(0), 5).is_err());
        assert!(validate_issue(&order(1), 0).is_err());
        assert_eq!(validate_issue(&IssueOrder::new(1, ""), 5).unwrap_err().field(), Some("user_role"));
    }

    #[test]
    fn test_empty_changes_rejected() {
        let item = instrument(1, 42, "Scope", "1");
        assert_eq!(check(&item, InstrumentChanges::default()).unwrap_err().field(), Some("changes"));
    }
}
