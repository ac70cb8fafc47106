// 🏷️ Category Entity - Hierarchical categories that own an attribute schema
//
// A category only stores its OWN properties. What a product actually sees is
// computed by walking the parent chain (see schema::SchemaResolver).
//
// Problem solved:
// - Category trees: "Electronics" → "Laptops"
// - Schema inheritance: a laptop gets RAM (Laptops) and Warranty (Electronics)
// - Renaming a category never breaks products, they reference the UUID

use crate::error::{CatalogError, CatalogResult};
use crate::schema::SchemaResolver;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

// ============================================================================
// ATTRIBUTE DEFINITION
// ============================================================================

/// A named property with an enumerated list of allowed values.
///
/// The first allowed value is what a selection control shows when the
/// product has no value for this name yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute identifier (e.g., "color"), unique within one category only
    pub name: String,

    /// Enumerated choices, in display order
    #[serde(rename = "values", alias = "allowed_values", default)]
    pub allowed_values: Vec<String>,
}

impl AttributeDefinition {
    pub fn new<I, S>(name: impl Into<String>, allowed_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeDefinition {
            name: name.into(),
            allowed_values: allowed_values.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the admin form's comma separated value list ("S, M ,L")
    pub fn from_csv_values(name: impl Into<String>, values: &str) -> Self {
        let allowed_values = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();

        AttributeDefinition {
            name: name.into(),
            allowed_values,
        }
    }

    /// Value a selection control falls back to when nothing was chosen
    pub fn first_value(&self) -> Option<&str> {
        self.allowed_values.first().map(String::as_str)
    }

    pub fn allows(&self, value: &str) -> bool {
        self.allowed_values.iter().any(|v| v == value)
    }

    /// Display label: first character upper-cased ("color" → "Color")
    pub fn label(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

// ============================================================================
// CATEGORY ENTITY
// ============================================================================

/// Category Entity
///
/// Identity: UUID (never changes)
/// Values: name, parent_id, properties (can change)
/// Hierarchy: parent_id creates a forest, several roots are fine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Stable identity (UUID)
    pub id: String,

    /// Category name (e.g., "Laptops")
    pub name: String,

    /// Parent category UUID. Root categories have parent_id = None
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Local attribute schema, NOT merged with ancestors
    #[serde(default)]
    pub properties: Vec<AttributeDefinition>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Create new category entity with UUID
    pub fn new(name: impl Into<String>, parent_id: Option<String>) -> Self {
        let now = Utc::now();

        Category {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            parent_id,
            properties: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: append a local property
    pub fn with_property(mut self, property: AttributeDefinition) -> Self {
        self.properties.push(property);
        self
    }

    /// Check if this is a root category (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn property(&self, name: &str) -> Option<&AttributeDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }
}

// ============================================================================
// CATEGORY DRAFT (admin form state)
// ============================================================================

/// One row of the category form: a name plus "a,b,c" style values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub name: String,
    pub values: String,
}

/// Editable category form.
///
/// An empty `parent_id` string means "no parent category".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub parent_id: String,
    pub properties: Vec<PropertyDraft>,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        CategoryDraft {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load an existing category into the form (values joined with ",")
    pub fn from_category(category: &Category) -> Self {
        CategoryDraft {
            name: category.name.clone(),
            parent_id: category.parent_id.clone().unwrap_or_default(),
            properties: category
                .properties
                .iter()
                .map(|p| PropertyDraft {
                    name: p.name.clone(),
                    values: p.allowed_values.join(","),
                })
                .collect(),
        }
    }

    /// Append an empty property row
    pub fn add_property(&mut self) -> &mut PropertyDraft {
        self.properties.push(PropertyDraft::default());
        let last = self.properties.len() - 1;
        &mut self.properties[last]
    }

    /// Remove the property row at `index`; out of range is a no-op
    pub fn remove_property(&mut self, index: usize) {
        if index < self.properties.len() {
            self.properties.remove(index);
        }
    }

    /// Replace the values of the row named `name`, or append a new row
    pub fn set_property(&mut self, name: &str, values: impl Into<String>) {
        let values = values.into();
        match self.properties.iter_mut().find(|p| p.name.trim() == name.trim()) {
            Some(row) => row.values = values,
            None => self.properties.push(PropertyDraft {
                name: name.to_string(),
                values,
            }),
        }
    }

    /// Drop the row named `name`. Returns false when there was none.
    pub fn remove_property_named(&mut self, name: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|p| p.name.trim() != name.trim());
        self.properties.len() != before
    }

    /// Turn the form into a category.
    ///
    /// `id` is Some when editing an existing category, None for a new one.
    pub fn into_category(self, id: Option<String>) -> CatalogResult<Category> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::Validation("category name is empty".to_string()));
        }

        let parent_id = Some(self.parent_id.trim().to_string()).filter(|p| !p.is_empty());
        if let (Some(id), Some(parent)) = (id.as_deref(), parent_id.as_deref()) {
            if id == parent {
                return Err(CatalogError::Validation(format!(
                    "category {} cannot be its own parent",
                    id
                )));
            }
        }

        let mut seen = HashSet::new();
        let mut properties = Vec::with_capacity(self.properties.len());
        for draft in self.properties {
            let prop_name = draft.name.trim().to_string();
            if prop_name.is_empty() {
                return Err(CatalogError::Validation("property name is empty".to_string()));
            }
            if !seen.insert(prop_name.clone()) {
                return Err(CatalogError::Validation(format!(
                    "property `{}` is defined twice in category `{}`",
                    prop_name, name
                )));
            }
            properties.push(AttributeDefinition::from_csv_values(prop_name, &draft.values));
        }

        let mut category = Category::new(name, parent_id);
        if let Some(id) = id {
            category.id = id;
        }
        category.properties = properties;
        Ok(category)
    }
}

// ============================================================================
// CATEGORY REGISTRY
// ============================================================================

/// In-memory store of categories.
///
/// Holds all Category entities and answers hierarchy queries. The SQLite
/// store (db::SqliteStore) is the durable counterpart.
#[derive(Clone, Default)]
pub struct CategoryRegistry {
    categories: Arc<RwLock<Vec<Category>>>,
}

impl CategoryRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        CategoryRegistry::default()
    }

    /// Create registry with the demo catalog pre-loaded
    pub fn with_defaults() -> Self {
        let registry = CategoryRegistry::new();
        for category in default_categories() {
            registry.register(category);
        }
        registry
    }

    /// Insert or replace a category (matched by id)
    pub fn register(&self, category: Category) {
        let mut categories = self.categories.write().unwrap_or_else(PoisonError::into_inner);
        match categories.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => *existing = category,
            None => categories.push(category),
        }
    }

    /// Apply `update_fn` to the category with this id
    pub fn update_category<F>(&self, id: &str, update_fn: F) -> CatalogResult<Category>
    where
        F: FnOnce(&mut Category),
    {
        let mut categories = self.categories.write().unwrap_or_else(PoisonError::into_inner);
        let category = categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CatalogError::category_not_found(id))?;

        update_fn(category);
        category.id = id.to_string();
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    /// Remove a category. Children keep their (now dangling) parent_id.
    pub fn remove(&self, id: &str) -> CatalogResult<Category> {
        let mut categories = self.categories.write().unwrap_or_else(PoisonError::into_inner);
        let index = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CatalogError::category_not_found(id))?;
        Ok(categories.remove(index))
    }

    /// Find category by UUID
    pub fn find_by_id(&self, id: &str) -> Option<Category> {
        let categories = self.categories.read().unwrap_or_else(PoisonError::into_inner);
        categories.iter().find(|c| c.id == id).cloned()
    }

    /// Find category by name (exact match, case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<Category> {
        let categories = self.categories.read().unwrap_or_else(PoisonError::into_inner);
        let lower_name = name.to_lowercase();
        categories
            .iter()
            .find(|c| c.name.to_lowercase() == lower_name)
            .cloned()
    }

    /// All categories, in registration order
    pub fn all_categories(&self) -> Vec<Category> {
        self.categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.categories.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Get root categories (no parent)
    pub fn root_categories(&self) -> Vec<Category> {
        self.all_categories().into_iter().filter(Category::is_root).collect()
    }

    /// Get direct children of a category
    pub fn get_children(&self, parent_id: &str) -> Vec<Category> {
        self.all_categories()
            .into_iter()
            .filter(|cat| cat.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Get parent of a category
    pub fn get_parent(&self, category: &Category) -> Option<Category> {
        category.parent_id.as_ref().and_then(|parent_id| self.find_by_id(parent_id))
    }

    /// Registered category followed by its ancestors, leaf first. Same walk
    /// as schema resolution, so it stops at a missing parent or a cycle.
    pub fn ancestry(&self, category: &Category) -> Vec<Category> {
        let categories = self.categories.read().unwrap_or_else(PoisonError::into_inner);
        let (chain, _) = SchemaResolver::new(&categories).ancestry(Some(&category.id));
        chain.into_iter().cloned().collect()
    }

    /// Get full path of a category (root → ... → leaf)
    ///
    /// Example: "Laptops" → ["Electronics", "Laptops"]
    pub fn get_path(&self, category: &Category) -> Vec<String> {
        self.ancestry(category)
            .into_iter()
            .rev()
            .map(|c| c.name)
            .collect()
    }

    /// Example: "Laptops" → "Electronics → Laptops"
    pub fn get_path_string(&self, category: &Category) -> String {
        self.get_path(category).join(" → ")
    }

    /// Number of ancestors (roots are depth 0)
    pub fn get_depth(&self, category: &Category) -> usize {
        self.ancestry(category).len().saturating_sub(1)
    }
}

impl From<Vec<Category>> for CategoryRegistry {
    fn from(categories: Vec<Category>) -> Self {
        CategoryRegistry {
            categories: Arc::new(RwLock::new(categories)),
        }
    }
}

/// Demo catalog used by `catalog-admin seed` and by tests
///
/// Structure:
/// - Electronics        [Warranty]
///   - Laptops          [RAM]
///   - Phones           [Storage, Color]
/// - Clothing           [Size, Color]
///   - T-Shirts         [Fit, Color]
pub fn default_categories() -> Vec<Category> {
    let electronics = Category::new("Electronics", None)
        .with_property(AttributeDefinition::new("Warranty", ["1yr", "2yr"]));
    let electronics_id = electronics.id.clone();

    let laptops = Category::new("Laptops", Some(electronics_id.clone()))
        .with_property(AttributeDefinition::new("RAM", ["8GB", "16GB"]));

    let phones = Category::new("Phones", Some(electronics_id))
        .with_property(AttributeDefinition::new("Storage", ["64GB", "128GB", "256GB"]))
        .with_property(AttributeDefinition::new("Color", ["Black", "White"]));

    let clothing = Category::new("Clothing", None)
        .with_property(AttributeDefinition::new("Size", ["S", "M", "L", "XL"]))
        .with_property(AttributeDefinition::new("Color", ["Black", "White", "Red"]));
    let clothing_id = clothing.id.clone();

    let t_shirts = Category::new("T-Shirts", Some(clothing_id))
        .with_property(AttributeDefinition::new("Fit", ["Regular", "Slim"]))
        .with_property(AttributeDefinition::new("Color", ["Navy", "Grey"]));

    vec![electronics, laptops, phones, clothing, t_shirts]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_creation() {
        let category = Category::new("Test Category", None);

        assert!(!category.id.is_empty());
        assert_eq!(category.name, "Test Category");
        assert_eq!(category.parent_id, None);
        assert!(category.properties.is_empty());
        assert!(category.is_root());
    }

    #[test]
    fn test_attribute_label_and_first_value() {
        let color = AttributeDefinition::new("color", ["red", "blue"]);
        assert_eq!(color.label(), "Color");
        assert_eq!(color.first_value(), Some("red"));
        assert!(color.allows("blue"));
        assert!(!color.allows("green"));

        let empty = AttributeDefinition::new("", Vec::<String>::new());
        assert_eq!(empty.label(), "");
        assert_eq!(empty.first_value(), None);
    }

    #[test]
    fn test_from_csv_values_keeps_order() {
        let size = AttributeDefinition::from_csv_values("size", "S, M ,L,,XL");
        assert_eq!(size.allowed_values, vec!["S", "M", "L", "XL"]);
    }

    #[test]
    fn test_attribute_definition_wire_shape() {
        let def = AttributeDefinition::new("RAM", ["8GB", "16GB"]);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json, serde_json::json!({"name": "RAM", "values": ["8GB", "16GB"]}));

        let back: AttributeDefinition =
            serde_json::from_str(r#"{"name":"RAM","allowed_values":["8GB"]}"#).unwrap();
        assert_eq!(back.allowed_values, vec!["8GB"]);
    }

    #[test]
    fn test_draft_round_trip_through_form() {
        let category = Category::new("Phones", Some("root".to_string()))
            .with_property(AttributeDefinition::new("Color", ["Black", "White"]));

        let draft = CategoryDraft::from_category(&category);
        assert_eq!(draft.parent_id, "root");
        assert_eq!(draft.properties[0].values, "Black,White");

        let rebuilt = draft.into_category(Some(category.id.clone())).unwrap();
        assert_eq!(rebuilt.id, category.id);
        assert_eq!(rebuilt.properties, category.properties);
    }

    #[test]
    fn test_draft_add_and_remove_properties() {
        let mut draft = CategoryDraft::new("Shoes");
        {
            let row = draft.add_property();
            row.name = "size".to_string();
            row.values = "40,41,42".to_string();
        }
        draft.add_property().name = "width".to_string();
        draft.remove_property(1);
        draft.remove_property(7);

        let category = draft.into_category(None).unwrap();
        assert_eq!(category.properties.len(), 1);
        assert_eq!(category.properties[0].allowed_values, vec!["40", "41", "42"]);
        assert!(category.is_root());
    }

    #[test]
    fn test_draft_validation() {
        let mut self_parent = CategoryDraft::new("Loop");
        self_parent.parent_id = "c1".to_string();
        assert!(matches!(
            self_parent.into_category(Some("c1".to_string())),
            Err(CatalogError::Validation(_))
        ));

        let mut dupes = CategoryDraft::new("Dupes");
        dupes.properties.push(PropertyDraft { name: "color".into(), values: "a".into() });
        dupes.properties.push(PropertyDraft { name: "color".into(), values: "b".into() });
        assert!(dupes.into_category(None).is_err());

        assert!(CategoryDraft::new("   ").into_category(None).is_err());
    }

    #[test]
    fn test_category_registry_initialization() {
        let registry = CategoryRegistry::with_defaults();
        assert_eq!(registry.count(), 5);

        let roots = registry.root_categories();
        let root_names: Vec<String> = roots.iter().map(|c| c.name.clone()).collect();
        assert_eq!(root_names, vec!["Electronics", "Clothing"]);
    }

    #[test]
    fn test_category_registry_find_by_name() {
        let registry = CategoryRegistry::with_defaults();

        assert!(registry.find_by_name("Laptops").is_some());
        assert!(registry.find_by_name("t-shirts").is_some());
        assert!(registry.find_by_name("Unknown Category").is_none());
    }

    #[test]
    fn test_category_registry_hierarchy() {
        let registry = CategoryRegistry::with_defaults();

        let electronics = registry.find_by_name("Electronics").unwrap();
        let children = registry.get_children(&electronics.id);
        assert_eq!(children.len(), 2);

        let laptops = registry.find_by_name("Laptops").unwrap();
        assert_eq!(registry.get_parent(&laptops).unwrap().name, "Electronics");
        assert_eq!(registry.get_path_string(&laptops), "Electronics → Laptops");
        assert_eq!(registry.get_depth(&laptops), 1);
        assert_eq!(registry.get_depth(&electronics), 0);
    }

    #[test]
    fn test_registry_walks_terminate_on_cycle() {
        let registry = CategoryRegistry::new();
        let mut a = Category::new("A", None);
        let mut b = Category::new("B", None);
        a.parent_id = Some(b.id.clone());
        b.parent_id = Some(a.id.clone());
        registry.register(a.clone());
        registry.register(b);

        assert_eq!(registry.get_path(&a), vec!["B", "A"]);
        assert_eq!(registry.get_depth(&a), 1);
    }

    #[test]
    fn test_update_and_remove() {
        let registry = CategoryRegistry::with_defaults();
        let phones = registry.find_by_name("Phones").unwrap();

        let updated = registry
            .update_category(&phones.id, |c| c.name = "Mobile Phones".to_string())
            .unwrap();
        assert_eq!(updated.id, phones.id);
        assert_eq!(registry.find_by_id(&phones.id).unwrap().name, "Mobile Phones");

        // Removing a parent leaves its children dangling, nothing cascades
        let electronics = registry.find_by_name("Electronics").unwrap();
        registry.remove(&electronics.id).unwrap();
        let laptops = registry.find_by_name("Laptops").unwrap();
        assert_eq!(laptops.parent_id, Some(electronics.id.clone()));
        assert!(registry.get_parent(&laptops).is_none());

        assert!(registry.remove("non-existent-uuid").is_err());
        assert!(registry.update_category("non-existent-uuid", |_| {}).is_err());
    }

    #[test]
    fn test_registry_path_stops_at_missing_parent() {
        let orphan = Category::new("Orphan", Some("gone".to_string()));
        let child = Category::new("Child", Some(orphan.id.clone()));
        let registry = CategoryRegistry::from(vec![orphan, child.clone()]);

        assert_eq!(registry.get_path_string(&child), "Orphan → Child");
        assert_eq!(registry.get_depth(&child), 1);

        // unregistered categories have no path
        let stranger = Category::new("Stranger", None);
        assert!(registry.get_path(&stranger).is_empty());
    }

    #[test]
    fn test_edit_existing_category_through_draft() {
        let phones = Category::new("Phones", Some("electronics".to_string()))
            .with_property(AttributeDefinition::new("Storage", ["64GB", "128GB"]))
            .with_property(AttributeDefinition::new("Color", ["Black", "White"]));

        let mut draft = CategoryDraft::from_category(&phones);
        draft.name = "Mobile Phones".to_string();
        draft.parent_id.clear();
        draft.set_property("Storage", "128GB,256GB");
        draft.set_property("Battery", "4000mAh,5000mAh");
        assert!(draft.remove_property_named("Color"));
        assert!(!draft.remove_property_named("Color"));

        let edited = draft.into_category(Some(phones.id.clone())).unwrap();
        assert_eq!(edited.id, phones.id);
        assert_eq!(edited.name, "Mobile Phones");
        assert!(edited.is_root());
        let names: Vec<&str> = edited.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Storage", "Battery"]);
        assert_eq!(edited.properties[0].allowed_values, vec!["128GB", "256GB"]);
    }
}
