// Entity Models
// Categories carry the attribute schema, products carry the chosen values

pub mod category;
pub mod product;

pub use category::{
    default_categories, AttributeDefinition, Category, CategoryDraft, CategoryRegistry, PropertyDraft,
};
pub use product::{AttributeValues, Product, ProductDraft};
