use serde::{Deserialize, Deserializer, Serialize};

use super::CategoryRef;
use crate::utils::parse_quantity;

/// A stock item tracked by the inventory.
///
/// Most fields are free text on the server side; `null` and missing values
/// are normalised to empty strings so the UI never has to special-case them.
/// `quantity` is kept as a numeric string, matching the API payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub serial_number: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub cost: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub quantity: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub gst_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub buyer_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub buyer_email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub purchase_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bill_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub remarks: String,
    #[serde(default)]
    pub category: CategoryRef,
    #[serde(default)]
    pub sub_category: CategoryRef,
}

impl Instrument {
    /// Units currently in stock. Non-numeric quantities count as zero.
    pub fn available(&self) -> u64 {
        parse_quantity(&self.quantity)
    }

    /// Return a copy with the proposed changes merged in.
    pub fn merged(&self, changes: &InstrumentChanges) -> Instrument {
        let mut next = self.clone();
        let fields: [(&mut String, &Option<String>); 10] = [
            (&mut next.name, &changes.name),
            (&mut next.serial_number, &changes.serial_number),
            (&mut next.cost, &changes.cost),
            (&mut next.quantity, &changes.quantity),
            (&mut next.gst_number, &changes.gst_number),
            (&mut next.buyer_name, &changes.buyer_name),
            (&mut next.buyer_email, &changes.buyer_email),
            (&mut next.purchase_date, &changes.purchase_date),
            (&mut next.bill_number, &changes.bill_number),
            (&mut next.remarks, &changes.remarks),
        ];
        for (slot, value) in fields {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        next
    }
}

/// Proposed edits to an instrument. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl InstrumentChanges {
    /// Changes that only touch the quantity field.
    pub fn quantity(value: impl Into<String>) -> Self {
        Self {
            quantity: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericText {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<NumericText> for String {
    fn from(raw: NumericText) -> Self {
        match raw {
            NumericText::Text(s) => s,
            NumericText::Int(n) => n.to_string(),
            NumericText::Float(f) => f.to_string(),
        }
    }
}

/// The API sends decimal fields either as strings or as bare numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string_or_number(deserializer)?.unwrap_or_default())
}

pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NumericText>::deserialize(deserializer)?.map(String::from))
}
