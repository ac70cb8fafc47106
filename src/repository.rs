// 🗄️ Repositories - collaborator contracts consumed by the editing core
//
// Two implementations exist: the in-memory ones below (CategoryRegistry,
// ProductCatalog) and the SQLite store in db.rs.

use crate::entities::{Category, CategoryRegistry, Product, ProductDraft};
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock};

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Every category; the resolver walks this collection
    async fn list_all(&self) -> CatalogResult<Vec<Category>>;

    async fn get(&self, id: &str) -> CatalogResult<Option<Category>>;

    async fn create(&self, category: Category) -> CatalogResult<Category>;

    /// Fails with NotFound for unknown ids
    async fn update(&self, category: Category) -> CatalogResult<Category>;

    /// Children keep their parent_id, nothing cascades
    async fn delete(&self, id: &str) -> CatalogResult<()>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Store a new product; the repository assigns id and timestamps
    async fn create(&self, draft: ProductDraft) -> CatalogResult<Product>;

    /// Replace an existing product; `draft.id` must be set
    async fn update(&self, draft: ProductDraft) -> CatalogResult<Product>;

    async fn get(&self, id: &str) -> CatalogResult<Option<Product>>;

    async fn list_all(&self) -> CatalogResult<Vec<Product>>;

    async fn delete(&self, id: &str) -> CatalogResult<()>;
}

// ============================================================================
// IN-MEMORY CATEGORIES
// ============================================================================

#[async_trait]
impl CategoryRepository for CategoryRegistry {
    async fn list_all(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.all_categories())
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Category>> {
        Ok(self.find_by_id(id))
    }

    async fn create(&self, category: Category) -> CatalogResult<Category> {
        if self.find_by_id(&category.id).is_some() {
            return Err(CatalogError::Validation(format!(
                "category {} already exists",
                category.id
            )));
        }
        self.register(category.clone());
        Ok(category)
    }

    async fn update(&self, category: Category) -> CatalogResult<Category> {
        let id = category.id.clone();
        self.update_category(&id, move |existing| {
            existing.name = category.name;
            existing.parent_id = category.parent_id;
            existing.properties = category.properties;
        })
    }

    async fn delete(&self, id: &str) -> CatalogResult<()> {
        self.remove(id).map(|_| ())
    }
}

// ============================================================================
// IN-MEMORY PRODUCTS
// ============================================================================

/// Product store kept in memory, in insertion order
#[derive(Clone, Default)]
pub struct ProductCatalog {
    products: Arc<RwLock<Vec<Product>>>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        ProductCatalog::default()
    }

    pub fn count(&self) -> usize {
        self.products.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ProductRepository for ProductCatalog {
    async fn create(&self, draft: ProductDraft) -> CatalogResult<Product> {
        let product = draft.into_product(uuid::Uuid::new_v4().to_string(), Utc::now());
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(product.clone());
        Ok(product)
    }

    async fn update(&self, draft: ProductDraft) -> CatalogResult<Product> {
        let id = draft
            .id
            .clone()
            .ok_or_else(|| CatalogError::Validation("update requires a product id".to_string()))?;

        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        let existing = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CatalogError::product_not_found(&id))?;

        let updated = draft.into_product(id, existing.created_at);
        *existing = updated.clone();
        Ok(updated)
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Product>> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_all(&self) -> CatalogResult<Vec<Product>> {
        Ok(self.products.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn delete(&self, id: &str) -> CatalogResult<()> {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CatalogError::product_not_found(id))?;
        products.remove(index);
        Ok(())
    }
}
