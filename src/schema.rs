// 📐 Schema Resolution - effective attribute schema of a category
//
// Walks the parent chain leaf → root and concatenates every level's local
// properties. Definitions are NOT deduplicated by name: products key values
// by name, so a repeated name just means two controls bound to one value.
//
// The walk is an explicit loop with a visited set, so a malformed cyclic
// graph truncates instead of spinning forever.

use crate::entities::{AttributeDefinition, Category};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

// ============================================================================
// RESOLVED SCHEMA
// ============================================================================

/// Why the ancestor walk stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WalkEnd {
    /// No category was selected
    NoCategory,
    /// Reached a category without a parent
    Root,
    /// Referenced id is not in the collection (the requested one or an ancestor)
    MissingCategory(String),
    /// This id was already visited, the graph has a cycle
    Cycle(String),
}

impl WalkEnd {
    /// False when the walk was cut short by bad data
    pub fn is_complete(&self) -> bool {
        matches!(self, WalkEnd::NoCategory | WalkEnd::Root)
    }
}

/// Transient, ordered list of definitions visible to one category.
///
/// Recomputed on every resolution, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSchema {
    category_id: Option<String>,
    definitions: Vec<AttributeDefinition>,
    end: WalkEnd,
}

impl ResolvedSchema {
    pub fn empty() -> Self {
        ResolvedSchema {
            category_id: None,
            definitions: Vec::new(),
            end: WalkEnd::NoCategory,
        }
    }

    pub fn category_id(&self) -> Option<&str> {
        self.category_id.as_deref()
    }

    pub fn definitions(&self) -> &[AttributeDefinition] {
        &self.definitions
    }

    pub fn into_definitions(self) -> Vec<AttributeDefinition> {
        self.definitions
    }

    pub fn end(&self) -> &WalkEnd {
        &self.end
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeDefinition> {
        self.definitions.iter()
    }

    /// Attribute names in schema order (duplicates included)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// Last definition carrying `name`, i.e. the control rendered last
    pub fn last_definition(&self, name: &str) -> Option<&AttributeDefinition> {
        self.definitions.iter().rev().find(|d| d.name == name)
    }
}

impl Default for ResolvedSchema {
    fn default() -> Self {
        ResolvedSchema::empty()
    }
}

impl<'a> IntoIterator for &'a ResolvedSchema {
    type Item = &'a AttributeDefinition;
    type IntoIter = std::slice::Iter<'a, AttributeDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}

// ============================================================================
// SCHEMA RESOLVER
// ============================================================================

/// Id index over an in-memory category collection.
///
/// Build once per collection snapshot, resolve as many ids as needed.
pub struct SchemaResolver<'a> {
    by_id: HashMap<&'a str, &'a Category>,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(categories: &'a [Category]) -> Self {
        let mut by_id = HashMap::with_capacity(categories.len());
        for category in categories {
            // First record wins if the collection holds duplicate ids
            by_id.entry(category.id.as_str()).or_insert(category);
        }
        SchemaResolver { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a Category> {
        self.by_id.get(id).copied()
    }

    /// The category and its ancestors, leaf first, plus why the walk stopped
    pub fn ancestry(&self, category_id: Option<&str>) -> (Vec<&'a Category>, WalkEnd) {
        let Some(start) = category_id.filter(|id| !id.is_empty()) else {
            return (Vec::new(), WalkEnd::NoCategory);
        };

        let mut chain = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut next_id = start;

        let end = loop {
            if !visited.insert(next_id) {
                break WalkEnd::Cycle(next_id.to_string());
            }
            let Some(category) = self.get(next_id) else {
                break WalkEnd::MissingCategory(next_id.to_string());
            };
            chain.push(category);

            match category.parent_id.as_deref().filter(|p| !p.is_empty()) {
                Some(parent_id) => next_id = parent_id,
                None => break WalkEnd::Root,
            }
        };

        (chain, end)
    }

    /// Effective schema for `category_id`: own properties, then each
    /// ancestor's, in stored order. Missing ids give an empty contribution.
    pub fn resolve(&self, category_id: Option<&str>) -> ResolvedSchema {
        let (chain, end) = self.ancestry(category_id);

        let definitions: Vec<AttributeDefinition> = chain
            .iter()
            .flat_map(|category| category.properties.iter().cloned())
            .collect();

        match &end {
            WalkEnd::Cycle(id) => warn!(
                category_id = ?category_id,
                revisited = %id,
                "category graph has a cycle, schema truncated"
            ),
            WalkEnd::MissingCategory(id) if !chain.is_empty() => warn!(
                category_id = ?category_id,
                missing = %id,
                "ancestor category not found, schema truncated"
            ),
            WalkEnd::MissingCategory(id) => {
                debug!(missing = %id, "category not found, empty schema")
            }
            _ => debug!(
                category_id = ?category_id,
                levels = chain.len(),
                attributes = definitions.len(),
                "schema resolved"
            ),
        }

        ResolvedSchema {
            category_id: category_id.filter(|id| !id.is_empty()).map(str::to_string),
            definitions,
            end,
        }
    }
}

/// One-shot resolution over a category collection
pub fn resolve(category_id: Option<&str>, categories: &[Category]) -> ResolvedSchema {
    SchemaResolver::new(categories).resolve(category_id)
}

// ============================================================================
// TESTS
// ============================================================================
