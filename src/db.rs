// 💾 SQLite persistence for categories and products
//
// Ordered data (category properties, product images) is stored as JSON
// arrays so order survives the round trip. attribute_values is a JSON object.

use crate::entities::{AttributeDefinition, AttributeValues, Category, Product, ProductDraft};
use crate::error::{CatalogError, CatalogResult};
use crate::repository::{CategoryRepository, ProductRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

pub fn setup_database(conn: &Connection) -> CatalogResult<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Categories Table
    // parent_id is NOT a foreign key: deleting a parent leaves children as-is
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            parent_id TEXT,
            properties TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Products Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL DEFAULT 0,
            category_id TEXT,
            images TEXT NOT NULL DEFAULT '[]',
            attribute_values TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id)",
        [],
    )?;

    Ok(())
}

fn parse_time(value: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_json<T: serde::de::DeserializeOwned>(value: &str, column: usize) -> rusqlite::Result<T> {
    serde_json::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e)))
}

// ============================================================================
// CATEGORIES
// ============================================================================

const CATEGORY_COLUMNS: &str = "id, name, parent_id, properties, created_at, updated_at";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let properties_json: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        properties: parse_json::<Vec<AttributeDefinition>>(&properties_json, 3)?,
        created_at: parse_time(&created_at, 4)?,
        updated_at: parse_time(&updated_at, 5)?,
    })
}

pub fn insert_category(conn: &Connection, category: &Category) -> CatalogResult<()> {
    let properties_json = serde_json::to_string(&category.properties)?;

    conn.execute(
        "INSERT INTO categories (id, name, parent_id, properties, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            category.id,
            category.name,
            category.parent_id,
            properties_json,
            category.created_at.to_rfc3339(),
            category.updated_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

/// Overwrite name/parent/properties; NotFound when the id is unknown
pub fn update_category(conn: &Connection, category: &Category) -> CatalogResult<Category> {
    let properties_json = serde_json::to_string(&category.properties)?;
    let now = Utc::now();

    let changed = conn.execute(
        "UPDATE categories
         SET name = ?2, parent_id = ?3, properties = ?4, updated_at = ?5
         WHERE id = ?1",
        params![
            category.id,
            category.name,
            category.parent_id,
            properties_json,
            now.to_rfc3339(),
        ],
    )?;

    if changed == 0 {
        return Err(CatalogError::category_not_found(&category.id));
    }

    get_category(conn, &category.id)?.ok_or_else(|| CatalogError::category_not_found(&category.id))
}

pub fn get_category(conn: &Connection, id: &str) -> CatalogResult<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS);
    let category = conn.query_row(&sql, [id], category_from_row).optional()?;
    Ok(category)
}

pub fn get_all_categories(conn: &Connection) -> CatalogResult<Vec<Category>> {
    let sql = format!("SELECT {} FROM categories ORDER BY name, id", CATEGORY_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(categories)
}

pub fn delete_category(conn: &Connection, id: &str) -> CatalogResult<()> {
    let changed = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(CatalogError::category_not_found(id));
    }
    Ok(())
}

// ============================================================================
// PRODUCTS
// ============================================================================

const PRODUCT_COLUMNS: &str =
    "id, title, description, price, category_id, images, attribute_values, created_at, updated_at";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let images_json: String = row.get(5)?;
    let values_json: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Product {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category_id: row.get(4)?,
        images: parse_json::<Vec<String>>(&images_json, 5)?,
        attribute_values: parse_json::<AttributeValues>(&values_json, 6)?,
        created_at: parse_time(&created_at, 7)?,
        updated_at: parse_time(&updated_at, 8)?,
    })
}

pub fn insert_product(conn: &Connection, product: &Product) -> CatalogResult<()> {
    conn.execute(
        "INSERT INTO products (
            id, title, description, price, category_id, images, attribute_values, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            product.id,
            product.title,
            product.description,
            product.price,
            product.category_id,
            serde_json::to_string(&product.images)?,
            serde_json::to_string(&product.attribute_values)?,
            product.created_at.to_rfc3339(),
            product.updated_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

/// Replace every mutable column; created_at is kept from the stored row
pub fn update_product(conn: &Connection, product: &Product) -> CatalogResult<()> {
    let changed = conn.execute(
        "UPDATE products
         SET title = ?2, description = ?3, price = ?4, category_id = ?5,
             images = ?6, attribute_values = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            product.id,
            product.title,
            product.description,
            product.price,
            product.category_id,
            serde_json::to_string(&product.images)?,
            serde_json::to_string(&product.attribute_values)?,
            product.updated_at.to_rfc3339(),
        ],
    )?;

    if changed == 0 {
        return Err(CatalogError::product_not_found(&product.id));
    }
    Ok(())
}

pub fn get_product(conn: &Connection, id: &str) -> CatalogResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let product = conn.query_row(&sql, [id], product_from_row).optional()?;
    Ok(product)
}

pub fn get_all_products(conn: &Connection) -> CatalogResult<Vec<Product>> {
    let sql = format!("SELECT {} FROM products ORDER BY created_at DESC", PRODUCT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    let products = stmt
        .query_map([], product_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(products)
}

pub fn delete_product(conn: &Connection, id: &str) -> CatalogResult<()> {
    let changed = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(CatalogError::product_not_found(id));
    }
    Ok(())
}

pub fn count_products(conn: &Connection) -> CatalogResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// SQLITE STORE (repository adapter)
// ============================================================================

/// Shared connection implementing both repositories
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with the locked connection
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }
}

#[async_trait]
impl CategoryRepository for SqliteStore {
    async fn list_all(&self) -> CatalogResult<Vec<Category>> {
        self.with_conn(get_all_categories)
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Category>> {
        self.with_conn(|conn| get_category(conn, id))
    }

    async fn create(&self, category: Category) -> CatalogResult<Category> {
        self.with_conn(|conn| insert_category(conn, &category))?;
        debug!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    async fn update(&self, category: Category) -> CatalogResult<Category> {
        self.with_conn(|conn| update_category(conn, &category))
    }

    async fn delete(&self, id: &str) -> CatalogResult<()> {
        self.with_conn(|conn| delete_category(conn, id))
    }
}

#[async_trait]
impl ProductRepository for SqliteStore {
    async fn create(&self, draft: ProductDraft) -> CatalogResult<Product> {
        let product = draft.into_product(uuid::Uuid::new_v4().to_string(), Utc::now());
        self.with_conn(|conn| insert_product(conn, &product))?;
        debug!(product_id = %product.id, "product created");
        Ok(product)
    }

    async fn update(&self, draft: ProductDraft) -> CatalogResult<Product> {
        let id = draft
            .id
            .clone()
            .ok_or_else(|| CatalogError::Validation("update requires a product id".to_string()))?;

        self.with_conn(|conn| {
            let existing = get_product(conn, &id)?.ok_or_else(|| CatalogError::product_not_found(&id))?;
            let product = draft.into_product(id.clone(), existing.created_at);
            update_product(conn, &product)?;
            debug!(product_id = %product.id, "product updated");
            Ok(product)
        })
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Product>> {
        self.with_conn(|conn| get_product(conn, id))
    }

    async fn list_all(&self) -> CatalogResult<Vec<Product>> {
        self.with_conn(get_all_products)
    }

    async fn delete(&self, id: &str) -> CatalogResult<()> {
        self.with_conn(|conn| delete_product(conn, id))
    }
}
