use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use catalog_admin::entities::default_categories;
use catalog_admin::{
    Category, CategoryDraft, CategoryRegistry, CategoryRepository, Config, LocalUploadService,
    ProductEditingSession, ProductRepository, SchemaResolver, SqliteStore, UploadFile,
};

const USAGE: &str = "usage: catalog-admin <command>

commands:
  init                                   create the database schema
  seed                                   load the demo category tree
  categories                             list categories with their paths
  add-category <name> [parent] [prop=a,b,c ...]
  edit-category <category> [--name <new name>] [--parent <category|none>] [prop=a,b,c ...] [-prop ...]
  delete-category <category>             children keep pointing at it
  schema <category id or name>           show the resolved attribute schema
  products                               list products
  new-product <title> <category> [attr=value ...]
  add-images <product id> <file> [file ...]";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Invalid configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;

    match command.as_str() {
        "init" => {
            println!("✓ Database ready: {:?}", config.database_path);
        }
        "seed" => run_seed(&store).await?,
        "categories" => run_categories(&store).await?,
        "add-category" => run_add_category(&store, &args[1..]).await?,
        "edit-category" => run_edit_category(&store, &args[1..]).await?,
        "delete-category" => {
            let key = args.get(1).ok_or_else(|| anyhow!("delete-category needs a category"))?;
            run_delete_category(&store, key).await?
        }
        "schema" => {
            let key = args.get(1).ok_or_else(|| anyhow!("schema needs a category id or name"))?;
            run_schema(&store, key).await?
        }
        "products" => run_products(&store).await?,
        "new-product" => run_new_product(&store, &config, &args[1..]).await?,
        "add-images" => run_add_images(&store, &config, &args[1..]).await?,
        other => bail!("unknown command `{}`\n\n{}", other, USAGE),
    }

    Ok(())
}

async fn run_seed(store: &SqliteStore) -> Result<()> {
    println!("🌱 Seeding demo categories...");

    let existing = CategoryRepository::list_all(store).await?;
    if !existing.is_empty() {
        println!("✓ {} categories already present, nothing to do", existing.len());
        return Ok(());
    }

    for category in default_categories() {
        let name = category.name.clone();
        CategoryRepository::create(store, category).await?;
        println!("  + {}", name);
    }
    println!("✓ Demo catalog loaded");
    Ok(())
}

async fn run_categories(store: &SqliteStore) -> Result<()> {
    let categories = CategoryRepository::list_all(store).await?;
    let registry = CategoryRegistry::from(categories.clone());

    println!("📂 {} categories", categories.len());
    for category in &categories {
        let props: Vec<&str> = category.properties.iter().map(|p| p.name.as_str()).collect();
        println!(
            "  {:<40} {}  [{}]",
            registry.get_path_string(category),
            category.id,
            props.join(", ")
        );
    }
    Ok(())
}

async fn run_add_category(store: &SqliteStore, args: &[String]) -> Result<()> {
    let name = args.first().ok_or_else(|| anyhow!("add-category needs a name"))?;
    let categories = CategoryRepository::list_all(store).await?;

    let mut draft = CategoryDraft::new(name.clone());
    for arg in &args[1..] {
        match arg.split_once('=') {
            Some((prop, values)) => draft.set_property(prop, values),
            None => {
                let parent = find_category(&categories, arg)
                    .ok_or_else(|| anyhow!("parent category `{}` not found", arg))?;
                draft.parent_id = parent.id.clone();
            }
        }
    }

    let category = draft.into_category(None)?;
    let created = CategoryRepository::create(store, category).await?;
    println!("✓ Created category {} ({})", created.name, created.id);
    Ok(())
}

async fn run_edit_category(store: &SqliteStore, args: &[String]) -> Result<()> {
    let key = args.first().ok_or_else(|| anyhow!("edit-category needs a category"))?;
    let categories = CategoryRepository::list_all(store).await?;
    let existing = find_category(&categories, key)
        .ok_or_else(|| anyhow!("category `{}` not found", key))?;

    let mut draft = CategoryDraft::from_category(existing);
    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--name" => {
                draft.name = rest.next().ok_or_else(|| anyhow!("--name needs a value"))?.clone();
            }
            "--parent" => {
                let parent = rest.next().ok_or_else(|| anyhow!("--parent needs a value"))?;
                draft.parent_id = if parent.eq_ignore_ascii_case("none") {
                    String::new()
                } else {
                    find_category(&categories, parent)
                        .ok_or_else(|| anyhow!("parent category `{}` not found", parent))?
                        .id
                        .clone()
                };
            }
            _ => match (arg.strip_prefix('-'), arg.split_once('=')) {
                (_, Some((prop, values))) => draft.set_property(prop, values),
                (Some(prop), None) => {
                    if !draft.remove_property_named(prop) {
                        bail!("category has no property `{}`", prop);
                    }
                }
                (None, None) => bail!("expected prop=values or -prop, got `{}`", arg),
            },
        }
    }

    let mut category = draft.into_category(Some(existing.id.clone()))?;
    category.created_at = existing.created_at;
    let updated = CategoryRepository::update(store, category).await?;
    println!("✓ Updated category {} ({})", updated.name, updated.id);
    Ok(())
}

async fn run_delete_category(store: &SqliteStore, key: &str) -> Result<()> {
    let categories = CategoryRepository::list_all(store).await?;
    let category = find_category(&categories, key)
        .ok_or_else(|| anyhow!("category `{}` not found", key))?;

    let orphans = categories
        .iter()
        .filter(|c| c.parent_id.as_deref() == Some(category.id.as_str()))
        .count();
    CategoryRepository::delete(store, &category.id).await?;

    println!("✓ Deleted category {} ({})", category.name, category.id);
    if orphans > 0 {
        println!("⚠️  {} child categories still point at it", orphans);
    }
    Ok(())
}

async fn run_schema(store: &SqliteStore, key: &str) -> Result<()> {
    let categories = CategoryRepository::list_all(store).await?;
    let category_id = find_category(&categories, key)
        .map(|c| c.id.clone())
        .unwrap_or_else(|| key.to_string());

    let schema = SchemaResolver::new(&categories).resolve(Some(&category_id));
    println!("📐 Schema for {} ({} attributes)", key, schema.len());
    for definition in &schema {
        println!("  {:<16} {}", definition.label(), definition.allowed_values.join(" | "));
    }
    if !schema.end().is_complete() {
        println!("⚠️  walk stopped early: {:?}", schema.end());
    }
    Ok(())
}

async fn run_products(store: &SqliteStore) -> Result<()> {
    let products = ProductRepository::list_all(store).await?;
    println!("📦 {} products", products.len());
    for product in &products {
        let values: Vec<String> = product
            .attribute_values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        println!(
            "  {}  {:<30} ${:>8.2}  images={}  {}",
            product.id,
            product.title,
            product.price,
            product.images.len(),
            values.join(" ")
        );
    }
    Ok(())
}

async fn run_new_product(store: &SqliteStore, config: &Config, args: &[String]) -> Result<()> {
    let title = args.first().ok_or_else(|| anyhow!("new-product needs a title"))?;
    let category_key = args.get(1).ok_or_else(|| anyhow!("new-product needs a category"))?;

    let mut session = ProductEditingSession::open(None, store)
        .await?
        .with_default_policy(config.default_policy);

    let category_id = find_category(session.category_options(), category_key)
        .map(|c| c.id.clone())
        .ok_or_else(|| anyhow!("category `{}` not found", category_key))?;

    session.set_title(title.clone())?;
    session.select_category(Some(&category_id))?;
    for arg in &args[2..] {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("expected attr=value, got `{}`", arg))?;
        session.set_attribute(name, value)?;
    }

    for field in session.fields() {
        println!(
            "  {:<16} {}{}",
            field.label(),
            field.displayed().unwrap_or("-"),
            if field.current.is_none() { "  (not chosen)" } else { "" }
        );
    }

    let product = session.save(store).await?;
    println!("✓ Saved product {} ({})", product.title, product.id);
    Ok(())
}

async fn run_add_images(store: &SqliteStore, config: &Config, args: &[String]) -> Result<()> {
    let product_id = args.first().ok_or_else(|| anyhow!("add-images needs a product id"))?;
    let product = ProductRepository::get(store, product_id)
        .await?
        .ok_or_else(|| anyhow!("product `{}` not found", product_id))?;

    let mut files = Vec::new();
    for path in &args[1..] {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path))?;
        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path.as_str())
            .to_string();
        files.push(UploadFile::new(file_name, bytes));
    }

    let uploader = LocalUploadService::new(&config.upload_dir, config.upload_base_url.clone());
    let mut session = ProductEditingSession::open(Some(&product), store).await?;
    let added = session.upload_images(&uploader, files).await?;
    let saved = session.save(store).await?;

    println!("✓ Added {} images, {} total", added, saved.images.len());
    for uri in &saved.images {
        println!("  {}", uri);
    }
    Ok(())
}

fn find_category<'a>(categories: &'a [Category], key: &str) -> Option<&'a Category> {
    categories
        .iter()
        .find(|c| c.id == key)
        .or_else(|| categories.iter().find(|c| c.name.eq_ignore_ascii_case(key)))
}
