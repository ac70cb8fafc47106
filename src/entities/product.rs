// 📦 Product Entity - catalog record with schema-driven attribute values
//
// attribute_values is keyed by attribute NAME, not by definition. Keys that
// no longer appear in the category's resolved schema are kept as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// ATTRIBUTE VALUE MAP
// ============================================================================

/// Per-product mapping from attribute name to the selected value.
///
/// Updates are copy-on-write: `set_attribute` hands back a new map and
/// leaves the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeValues(BTreeMap<String, String>);

impl AttributeValues {
    pub fn new() -> Self {
        AttributeValues::default()
    }

    /// New map equal to `self` with `name` set to `value`
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.0.insert(name.into(), value.into());
        next
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        AttributeValues(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ============================================================================
// PRODUCT ENTITY
// ============================================================================

/// Persisted product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    /// None = "Uncategorized"
    #[serde(default)]
    pub category_id: Option<String>,
    /// Image URIs in storefront display order
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, alias = "properties")]
    pub attribute_values: AttributeValues,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload assembled by an editing session.
///
/// `id` is None for a product that has never been saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category_id: Option<String>,
    pub images: Vec<String>,
    pub attribute_values: AttributeValues,
}

impl ProductDraft {
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Materialize as a record; `id` and `created_at` come from the store
    pub fn into_product(self, id: String, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            category_id: self.category_id,
            images: self.images,
            attribute_values: self.attribute_values,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        ProductDraft {
            id: Some(product.id.clone()),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            category_id: product.category_id.clone(),
            images: product.images.clone(),
            attribute_values: product.attribute_values.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attribute_is_copy_on_write() {
        let original: AttributeValues = [("color", "red")].into_iter().collect();
        let updated = original.set_attribute("size", "M");

        assert_eq!(original.len(), 1);
        assert_eq!(original.get("size"), None);
        assert_eq!(updated.get("color"), Some("red"));
        assert_eq!(updated.get("size"), Some("M"));
    }

    #[test]
    fn test_set_attribute_overwrites_existing_key() {
        let original: AttributeValues = [("color", "red")].into_iter().collect();
        let updated = original.set_attribute("color", "blue");

        assert_eq!(updated.len(), 1);
        assert_eq!(updated.get("color"), Some("blue"));
        assert_eq!(original.get("color"), Some("red"));
    }

    #[test]
    fn test_attribute_values_serialize_as_plain_object() {
        let values: AttributeValues = [("RAM", "16GB"), ("legacyAttr", "x")].into_iter().collect();
        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json, serde_json::json!({"RAM": "16GB", "legacyAttr": "x"}));
    }

    #[test]
    fn test_product_accepts_properties_alias() {
        let json = r#"{
            "id": "p1",
            "title": "Laptop",
            "properties": {"RAM": "8GB"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.attribute_values.get("RAM"), Some("8GB"));
        assert!(product.images.is_empty());
        assert_eq!(product.category_id, None);
    }

    #[test]
    fn test_draft_from_product_keeps_identity() {
        let draft = ProductDraft {
            id: None,
            title: "Tee".to_string(),
            description: String::new(),
            price: 12.5,
            category_id: None,
            images: vec!["u1".to_string()],
            attribute_values: AttributeValues::new(),
        };
        assert!(draft.is_new());

        let created_at = Utc::now();
        let product = draft.into_product("p1".to_string(), created_at);
        let back = ProductDraft::from(&product);
        assert_eq!(back.id.as_deref(), Some("p1"));
        assert!(!back.is_new());
        assert_eq!(back.images, vec!["u1"]);
    }
}
