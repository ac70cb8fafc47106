// 🏛️ Attribute Binding - product values onto a resolved schema
//
// The binder pairs every definition in the resolved schema with the
// product's current value for that name. It never invents values: a name
// the user has not chosen stays absent and the control's first option is
// only a *display* default (see DefaultPolicy for what a save does).
//
// Values whose name is not in the schema are kept in the map but not shown,
// so flipping the category back and forth loses nothing.

use crate::entities::{AttributeDefinition, AttributeValues};
use crate::schema::ResolvedSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// DEFAULT POLICY
// ============================================================================

/// What a snapshot does with schema attributes the user never touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultPolicy {
    /// Leave the key absent (the stored map only holds real choices)
    #[default]
    LeaveAbsent,
    /// Persist the first allowed value, i.e. what the control displayed
    FirstValue,
}

impl DefaultPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultPolicy::LeaveAbsent => "leave-absent",
            DefaultPolicy::FirstValue => "first-value",
        }
    }
}

impl FromStr for DefaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "leave-absent" | "absent" => Ok(DefaultPolicy::LeaveAbsent),
            "first-value" | "first" => Ok(DefaultPolicy::FirstValue),
            other => Err(format!("unknown default policy: {}", other)),
        }
    }
}

// ============================================================================
// BOUND ATTRIBUTE (view model)
// ============================================================================

/// One editable control: a definition plus the product's value for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundAttribute<'a> {
    pub definition: &'a AttributeDefinition,
    /// Stored value; None when the user never chose one
    pub current: Option<&'a str>,
}

impl<'a> BoundAttribute<'a> {
    pub fn name(&self) -> &'a str {
        &self.definition.name
    }

    pub fn label(&self) -> String {
        self.definition.label()
    }

    /// What the selection control shows: the stored value, else the first option
    pub fn displayed(&self) -> Option<&'a str> {
        self.current.or_else(|| self.definition.first_value())
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.displayed() == Some(value)
    }

    /// Stored value exists but is not one of the allowed options
    pub fn is_out_of_range(&self) -> bool {
        self.current.is_some_and(|v| !self.definition.allows(v))
    }
}

// ============================================================================
// ATTRIBUTE BINDER
// ============================================================================

/// Holds the resolved schema and the current value map of one product.
///
/// The map lives behind an `Arc` and is replaced, never mutated, on each
/// edit: a `values()` handle taken before an edit keeps seeing the old map.
#[derive(Debug, Clone, Default)]
pub struct AttributeBinder {
    schema: ResolvedSchema,
    values: Arc<AttributeValues>,
}

impl AttributeBinder {
    pub fn new(schema: ResolvedSchema, values: AttributeValues) -> Self {
        AttributeBinder {
            schema,
            values: Arc::new(values),
        }
    }

    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    pub fn current(&self) -> &AttributeValues {
        &self.values
    }

    /// Shared handle to the current map
    pub fn values(&self) -> Arc<AttributeValues> {
        Arc::clone(&self.values)
    }

    /// Swap the schema (category changed). Values are kept untouched.
    pub fn rebind(&mut self, schema: ResolvedSchema) {
        self.schema = schema;
    }

    /// Editing view, one entry per definition in schema order
    pub fn fields(&self) -> Vec<BoundAttribute<'_>> {
        self.schema
            .iter()
            .map(|definition| BoundAttribute {
                definition,
                current: self.values.get(&definition.name),
            })
            .collect()
    }

    /// Stored keys the current schema does not render
    pub fn hidden_names(&self) -> Vec<&str> {
        self.values
            .names()
            .filter(|name| !self.schema.contains(name))
            .collect()
    }

    /// Record a user choice; returns the new map
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Arc<AttributeValues> {
        if !self.schema.contains(name) {
            debug!(attribute = name, "setting attribute outside the resolved schema");
        }
        self.values = Arc::new(self.values.set_attribute(name, value));
        self.values()
    }

    /// Full map for persistence, stale keys included
    pub fn snapshot(&self, policy: DefaultPolicy) -> AttributeValues {
        match policy {
            DefaultPolicy::LeaveAbsent => (*self.values).clone(),
            DefaultPolicy::FirstValue => {
                let mut out = (*self.values).clone();
                for name in self.schema.names() {
                    if out.contains(name) {
                        continue;
                    }
                    let first = self
                        .schema
                        .last_definition(name)
                        .and_then(AttributeDefinition::first_value);
                    if let Some(first) = first {
                        out = out.set_attribute(name, first);
                    }
                }
                out
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Category;
    use crate::schema::resolve;

    fn laptops() -> (Vec<Category>, String) {
        let electronics = Category::new("Electronics", None)
            .with_property(AttributeDefinition::new("Warranty", ["1yr", "2yr"]));
        let laptops = Category::new("Laptops", Some(electronics.id.clone()))
            .with_property(AttributeDefinition::new("RAM", ["8GB", "16GB"]));
        let id = laptops.id.clone();
        (vec![electronics, laptops], id)
    }

    fn values(pairs: &[(&str, &str)]) -> AttributeValues {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_fields_pair_definitions_with_current_values() {
        let (cats, laptops_id) = laptops();
        let binder = AttributeBinder::new(
            resolve(Some(&laptops_id), &cats),
            values(&[("RAM", "16GB")]),
        );

        let fields = binder.fields();
        assert_eq!(fields.len(), 2);

        assert_eq!(fields[0].name(), "RAM");
        assert_eq!(fields[0].current, Some("16GB"));
        assert!(fields[0].is_selected("16GB"));

        assert_eq!(fields[1].name(), "Warranty");
        assert_eq!(fields[1].current, None);
        assert_eq!(fields[1].displayed(), Some("1yr"));

        // displaying a default does not write it
        assert!(!binder.values().contains("Warranty"));
    }

    #[test]
    fn test_set_attribute_does_not_touch_rendered_map() {
        let mut binder = AttributeBinder::new(ResolvedSchema::empty(), values(&[("color", "red")]));
        let rendered = binder.values();

        let updated = binder.set_attribute("size", "M");

        assert_eq!(*rendered, values(&[("color", "red")]));
        assert_eq!(*updated, values(&[("color", "red"), ("size", "M")]));
        assert_eq!(*binder.values(), *updated);
    }

    #[test]
    fn test_stale_keys_hidden_but_kept() {
        let color_only = Category::new("Paint", None)
            .with_property(AttributeDefinition::new("color", ["red", "blue"]));
        let cats = vec![color_only.clone()];
        let binder = AttributeBinder::new(
            resolve(Some(&color_only.id), &cats),
            values(&[("color", "red"), ("legacyAttr", "x")]),
        );

        let rendered: Vec<&str> = binder.fields().iter().map(|f| f.name()).collect();
        assert_eq!(rendered, vec!["color"]);
        assert_eq!(binder.hidden_names(), vec!["legacyAttr"]);

        let saved = binder.snapshot(DefaultPolicy::LeaveAbsent);
        assert_eq!(saved.get("legacyAttr"), Some("x"));
    }

    #[test]
    fn test_rebind_keeps_values_across_category_switch() {
        let (cats, laptops_id) = laptops();
        let mut binder = AttributeBinder::new(resolve(Some(&laptops_id), &cats), AttributeValues::new());
        binder.set_attribute("RAM", "8GB");

        binder.rebind(ResolvedSchema::empty());
        assert!(binder.fields().is_empty());
        assert_eq!(binder.hidden_names(), vec!["RAM"]);

        binder.rebind(resolve(Some(&laptops_id), &cats));
        assert_eq!(binder.fields()[0].current, Some("8GB"));
    }

    #[test]
    fn test_leave_absent_policy_skips_untouched() {
        let (cats, laptops_id) = laptops();
        let binder = AttributeBinder::new(resolve(Some(&laptops_id), &cats), values(&[("RAM", "16GB")]));

        let saved = binder.snapshot(DefaultPolicy::LeaveAbsent);
        assert_eq!(saved, values(&[("RAM", "16GB")]));
    }

    #[test]
    fn test_first_value_policy_fills_untouched() {
        let (cats, laptops_id) = laptops();
        let binder = AttributeBinder::new(resolve(Some(&laptops_id), &cats), values(&[("RAM", "16GB")]));

        let saved = binder.snapshot(DefaultPolicy::FirstValue);
        assert_eq!(saved, values(&[("RAM", "16GB"), ("Warranty", "1yr")]));
    }

    #[test]
    fn test_first_value_policy_uses_last_duplicate() {
        let clothing = Category::new("Clothing", None)
            .with_property(AttributeDefinition::new("Color", ["Black", "White"]));
        let tees = Category::new("T-Shirts", Some(clothing.id.clone()))
            .with_property(AttributeDefinition::new("Color", ["Navy", "Grey"]));
        let tees_id = tees.id.clone();
        let cats = vec![clothing, tees];

        let binder = AttributeBinder::new(resolve(Some(&tees_id), &cats), AttributeValues::new());
        assert_eq!(binder.fields().len(), 2);

        let saved = binder.snapshot(DefaultPolicy::FirstValue);
        assert_eq!(saved, values(&[("Color", "Black")]));
    }

    #[test]
    fn test_out_of_range_value_is_flagged() {
        let (cats, laptops_id) = laptops();
        let binder = AttributeBinder::new(resolve(Some(&laptops_id), &cats), values(&[("RAM", "4GB")]));
        assert!(binder.fields()[0].is_out_of_range());
        assert!(!binder.fields()[1].is_out_of_range());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("leave-absent".parse::<DefaultPolicy>().unwrap(), DefaultPolicy::LeaveAbsent);
        assert_eq!("First-Value".parse::<DefaultPolicy>().unwrap(), DefaultPolicy::FirstValue);
        assert!("whatever".parse::<DefaultPolicy>().is_err());
        assert_eq!(DefaultPolicy::default().as_str(), "leave-absent");
    }
}
