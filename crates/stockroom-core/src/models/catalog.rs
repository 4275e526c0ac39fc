use serde::{Deserialize, Serialize};

/// Root of the inventory hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A subcategory belonging to exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
}

/// Compact `{id, name}` reference embedded in instrument payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl From<&Category> for CategoryRef {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
        }
    }
}

impl From<&Subcategory> for CategoryRef {
    fn from(sub: &Subcategory) -> Self {
        Self {
            id: sub.id,
            name: sub.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcategory_deserializes_category_id() {
        let json = r#"{"id": 4, "name": "Oscilloscopes", "category_id": 2}"#;
        let sub: Subcategory = serde_json::from_str(json).unwrap();
        assert_eq!(sub.category_id, 2);
        assert_eq!(CategoryRef::from(&sub).name, "Oscilloscopes");
    }

    #[test]
    fn test_category_ref_missing_name() {
        let r: CategoryRef = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(r.id, 3);
        assert!(r.name.is_empty());
    }
}
