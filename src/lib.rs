// Catalog Admin - Core Library
// Category attribute schemas, product attribute binding and editing sessions.
// Exposes all modules for use in the CLI and tests.

pub mod attributes;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod images;
pub mod repository;
pub mod schema;
pub mod session;
pub mod upload;

// Re-export commonly used types
pub use attributes::{AttributeBinder, BoundAttribute, DefaultPolicy};
pub use config::Config;
pub use db::{setup_database, SqliteStore};
pub use entities::{
    AttributeDefinition, AttributeValues, Category, CategoryDraft, CategoryRegistry, Product,
    ProductDraft, PropertyDraft,
};
pub use error::{CatalogError, CatalogResult, SessionError};
pub use images::ImageSequence;
pub use repository::{CategoryRepository, ProductCatalog, ProductRepository};
pub use schema::{resolve, ResolvedSchema, SchemaResolver, WalkEnd};
pub use session::{ProductEditingSession, SaveTicket, SessionState, UploadTicket};
pub use upload::{LocalUploadService, UploadFile, UploadService};
