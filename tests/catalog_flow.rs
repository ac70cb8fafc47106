// End-to-end: SQLite store + schema resolution + editing session

use catalog_admin::entities::default_categories;
use catalog_admin::{
    AttributeDefinition, Category, CategoryRepository, LocalUploadService, Product,
    ProductEditingSession, ProductRepository, SessionState, SqliteStore, UploadFile, WalkEnd,
};

async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    for category in default_categories() {
        CategoryRepository::create(&store, category).await.unwrap();
    }
    store
}

async fn category_named(store: &SqliteStore, name: &str) -> Category {
    CategoryRepository::list_all(store)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == name)
        .unwrap()
}

#[tokio::test]
async fn test_laptop_scenario_end_to_end() {
    let store = seeded_store().await;
    let laptops = category_named(&store, "Laptops").await;

    // create with only RAM chosen
    let mut session = ProductEditingSession::open(None, &store).await.unwrap();
    session.set_title("ThinkPad").unwrap();
    session.select_category(Some(&laptops.id)).unwrap();
    session.set_attribute("RAM", "16GB").unwrap();

    let schema: Vec<(&str, Vec<String>)> = session
        .schema()
        .iter()
        .map(|d| (d.name.as_str(), d.allowed_values.clone()))
        .collect();
    assert_eq!(
        schema,
        vec![
            ("RAM", vec!["8GB".to_string(), "16GB".to_string()]),
            ("Warranty", vec!["1yr".to_string(), "2yr".to_string()]),
        ]
    );

    let saved = session.save(&store).await.unwrap();
    assert_eq!(session.state(), SessionState::Saved);
    assert!(!saved.attribute_values.contains("Warranty"));

    // reopen for edit: RAM pre-selected, Warranty shown as first value but unset
    let stored: Product = ProductRepository::get(&store, &saved.id).await.unwrap().unwrap();
    let edit = ProductEditingSession::open(Some(&stored), &store).await.unwrap();
    let fields = edit.fields();
    assert_eq!(fields[0].current, Some("16GB"));
    assert_eq!(fields[1].current, None);
    assert_eq!(fields[1].displayed(), Some("1yr"));
}

#[tokio::test]
async fn test_stale_keys_survive_schema_change_and_save() {
    let store = seeded_store().await;
    let paint = Category::new("Paint", None)
        .with_property(AttributeDefinition::new("color", ["red", "blue"]))
        .with_property(AttributeDefinition::new("finish", ["matte", "gloss"]));
    CategoryRepository::create(&store, paint.clone()).await.unwrap();

    let mut session = ProductEditingSession::open(None, &store).await.unwrap();
    session.set_title("Wall paint").unwrap();
    session.select_category(Some(&paint.id)).unwrap();
    session.set_attribute("color", "red").unwrap();
    session.set_attribute("finish", "matte").unwrap();
    let created = session.save(&store).await.unwrap();

    // admin drops the "finish" property
    let mut trimmed = paint.clone();
    trimmed.properties.retain(|p| p.name == "color");
    CategoryRepository::update(&store, trimmed).await.unwrap();

    let mut edit = ProductEditingSession::open(Some(&created), &store).await.unwrap();
    let rendered: Vec<&str> = edit.fields().iter().map(|f| f.name()).collect();
    assert_eq!(rendered, vec!["color"]);

    edit.set_attribute("color", "blue").unwrap();
    let saved = edit.save(&store).await.unwrap();
    assert_eq!(saved.id, created.id);
    assert_eq!(saved.attribute_values.get("color"), Some("blue"));
    assert_eq!(saved.attribute_values.get("finish"), Some("matte"));
}

#[tokio::test]
async fn test_deleted_parent_truncates_schema() {
    let store = seeded_store().await;
    let electronics = category_named(&store, "Electronics").await;
    let phones = category_named(&store, "Phones").await;

    CategoryRepository::delete(&store, &electronics.id).await.unwrap();

    let mut session = ProductEditingSession::open(None, &store).await.unwrap();
    session.select_category(Some(&phones.id)).unwrap();

    let names: Vec<&str> = session.schema().names().collect();
    assert_eq!(names, vec!["Storage", "Color"]);
    assert_eq!(session.schema().end(), &WalkEnd::MissingCategory(electronics.id.clone()));
}

#[tokio::test]
async fn test_uploaded_images_keep_order_through_save() {
    let store = seeded_store().await;
    let dir = tempfile::tempdir().unwrap();
    let uploader = LocalUploadService::new(dir.path(), "/uploads");

    let mut session = ProductEditingSession::open(None, &store).await.unwrap();
    session.set_title("Tee").unwrap();
    session
        .upload_images(
            &uploader,
            vec![
                UploadFile::new("front.jpg", b"front".to_vec()),
                UploadFile::new("back.jpg", b"back".to_vec()),
            ],
        )
        .await
        .unwrap();

    let mut order = session.images().snapshot();
    order.reverse();
    session.reorder_images(order.clone()).unwrap();

    let saved = session.save(&store).await.unwrap();
    let stored = ProductRepository::get(&store, &saved.id).await.unwrap().unwrap();
    assert_eq!(stored.images, order);
    assert!(stored.images[0].ends_with(".jpg"));
}
