// ✏️ Product Editing Session - one create/edit interaction
//
// State machine:
//   Editing ──begin_save──▶ Submitting ──ok──▶ Saved   (terminal)
//      ▲                        │
//      └────── Failed ◀──err────┘   (edits intact, user may retry)
//
// Any state ──close──▶ Closed. A save that completes after close is dropped.
//
// Uploads run beside the state machine: begin_upload marks one batch in
// flight until complete_upload (or a dropped upload_images future) clears it.
//
// All mutation goes through &mut self, so nothing can edit the session
// while `save` is awaiting the repository. The payload is frozen when the
// save starts.

use crate::attributes::{AttributeBinder, BoundAttribute, DefaultPolicy};
use crate::entities::{AttributeValues, Category, Product, ProductDraft};
use crate::error::{CatalogError, CatalogResult, SessionError};
use crate::images::ImageSequence;
use crate::repository::{CategoryRepository, ProductRepository};
use crate::schema::{ResolvedSchema, SchemaResolver};
use crate::upload::{UploadFile, UploadService};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Editing,
    Submitting,
    Saved,
    /// Last save failed; behaves like Editing
    Failed,
    /// User navigated away
    Closed,
}

impl SessionState {
    pub fn is_editable(&self) -> bool {
        matches!(self, SessionState::Editing | SessionState::Failed)
    }
}

/// A save in flight: the frozen payload plus a token to match the response
#[derive(Debug, Clone)]
pub struct SaveTicket {
    seq: u64,
    draft: ProductDraft,
}

impl SaveTicket {
    pub fn draft(&self) -> &ProductDraft {
        &self.draft
    }
}

/// An upload batch in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    seq: u64,
}

/// Clears the uploading flag when an upload future is dropped before the
/// uploader answers.
struct UploadGuard<'a> {
    uploading: &'a mut Option<u64>,
    armed: bool,
}

impl UploadGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.uploading = None;
        }
    }
}

pub struct ProductEditingSession {
    product_id: Option<String>,
    title: String,
    description: String,
    price: f64,
    category_id: Option<String>,
    categories: Vec<Category>,
    binder: AttributeBinder,
    images: ImageSequence,
    policy: DefaultPolicy,
    state: SessionState,
    last_error: Option<String>,
    uploading: Option<u64>,
    upload_seq: u64,
    save_seq: u64,
    in_flight: Option<u64>,
    saved: Option<Product>,
}

impl ProductEditingSession {
    /// Start a session over an already loaded category collection.
    ///
    /// `existing` is None for a brand new product.
    pub fn new(existing: Option<&Product>, categories: Vec<Category>) -> Self {
        let category_id = existing
            .and_then(|p| p.category_id.clone())
            .filter(|id| !id.is_empty());
        let values = existing
            .map(|p| p.attribute_values.clone())
            .unwrap_or_default();

        let mut session = ProductEditingSession {
            product_id: existing.map(|p| p.id.clone()),
            title: existing.map(|p| p.title.clone()).unwrap_or_default(),
            description: existing.map(|p| p.description.clone()).unwrap_or_default(),
            price: existing.map(|p| p.price).unwrap_or_default(),
            category_id,
            categories,
            binder: AttributeBinder::new(ResolvedSchema::empty(), values),
            images: existing
                .map(|p| ImageSequence::from(p.images.clone()))
                .unwrap_or_default(),
            policy: DefaultPolicy::default(),
            state: SessionState::Editing,
            last_error: None,
            uploading: None,
            upload_seq: 0,
            save_seq: 0,
            in_flight: None,
            saved: None,
        };
        session.resolve_schema();
        session
    }

    /// Load categories from the repository, then start the session
    pub async fn open(
        existing: Option<&Product>,
        categories: &dyn CategoryRepository,
    ) -> CatalogResult<Self> {
        let all = categories.list_all().await?;
        debug!(categories = all.len(), product = ?existing.map(|p| &p.id), "editing session opened");
        Ok(Self::new(existing, all))
    }

    pub fn with_default_policy(mut self, policy: DefaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ========================================================================
    // READ SIDE
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn category_id(&self) -> Option<&str> {
        self.category_id.as_deref()
    }

    /// Categories offered in the category picker
    pub fn category_options(&self) -> &[Category] {
        &self.categories
    }

    pub fn schema(&self) -> &ResolvedSchema {
        self.binder.schema()
    }

    /// Attribute controls to render, in schema order
    pub fn fields(&self) -> Vec<BoundAttribute<'_>> {
        self.binder.fields()
    }

    pub fn attribute_values(&self) -> &AttributeValues {
        self.binder.current()
    }

    pub fn images(&self) -> &ImageSequence {
        &self.images
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Product returned by the successful save, if any
    pub fn saved_product(&self) -> Option<&Product> {
        self.saved.as_ref()
    }

    /// Payload a save would send right now
    pub fn draft(&self) -> ProductDraft {
        ProductDraft {
            id: self.product_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            category_id: self.category_id.clone(),
            images: self.images.snapshot(),
            attribute_values: self.binder.snapshot(self.policy),
        }
    }

    // ========================================================================
    // EDITS
    // ========================================================================

    fn ensure_editable(&mut self) -> Result<(), SessionError> {
        if !self.state.is_editable() {
            return Err(SessionError::NotEditable { state: self.state });
        }
        self.state = SessionState::Editing;
        Ok(())
    }

    fn resolve_schema(&mut self) {
        let schema = SchemaResolver::new(&self.categories).resolve(self.category_id.as_deref());
        self.binder.rebind(schema);
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.title = title.into();
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.description = description.into();
        Ok(())
    }

    /// Price must be a finite, non-negative number
    pub fn set_price(&mut self, price: f64) -> Result<(), SessionError> {
        self.ensure_editable()?;
        if !price.is_finite() || price < 0.0 {
            return Err(SessionError::InvalidEdit(CatalogError::Validation(format!(
                "price must be a non-negative number, got {}",
                price
            ))));
        }
        self.price = price;
        Ok(())
    }

    /// Change category (None or "" = Uncategorized) and re-resolve the schema.
    /// Attribute values are kept, including ones the new schema hides.
    pub fn select_category(&mut self, category_id: Option<&str>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.category_id = category_id.filter(|id| !id.is_empty()).map(str::to_string);
        self.resolve_schema();
        debug!(
            category_id = ?self.category_id,
            attributes = self.binder.schema().len(),
            "category selected"
        );
        Ok(())
    }

    /// Reload the category collection and re-resolve the current selection
    pub async fn refresh_categories(
        &mut self,
        categories: &dyn CategoryRepository,
    ) -> CatalogResult<()> {
        self.categories = categories.list_all().await?;
        self.resolve_schema();
        Ok(())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.binder.set_attribute(name, value);
        Ok(())
    }

    pub fn reorder_images(&mut self, new_order: Vec<String>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.images.reorder(new_order);
        Ok(())
    }

    pub fn move_image(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.images.move_image(from, to);
        Ok(())
    }

    /// Mark an upload batch as in flight. Only one batch at a time.
    pub fn begin_upload(&mut self) -> Result<UploadTicket, SessionError> {
        self.ensure_editable()?;
        if self.uploading.is_some() {
            return Err(SessionError::UploadInFlight);
        }

        self.upload_seq += 1;
        self.uploading = Some(self.upload_seq);
        Ok(UploadTicket { seq: self.upload_seq })
    }

    /// Apply the uploader's answer: append the URIs on success, leave the
    /// image sequence untouched on failure. A session closed in the
    /// meantime discards the result and reports 0.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: CatalogResult<Vec<String>>,
    ) -> Result<usize, SessionError> {
        if self.uploading != Some(ticket.seq) {
            return Err(SessionError::NoUploadInFlight);
        }
        self.uploading = None;

        if self.state == SessionState::Closed {
            debug!(seq = ticket.seq, "session closed, discarding upload result");
            return Ok(0);
        }

        match result {
            Ok(uris) => {
                let count = uris.len();
                self.images.append(uris);
                info!(count, total = self.images.len(), "images appended");
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "image upload failed");
                Err(SessionError::UploadFailure(err))
            }
        }
    }

    /// Upload a batch and append the returned URIs. On failure, or when this
    /// future is dropped early, the image sequence is left exactly as it was.
    pub async fn upload_images(
        &mut self,
        uploader: &dyn UploadService,
        files: Vec<UploadFile>,
    ) -> Result<usize, SessionError> {
        if files.is_empty() {
            self.ensure_editable()?;
            return Ok(0);
        }

        let ticket = self.begin_upload()?;
        let guard = UploadGuard {
            uploading: &mut self.uploading,
            armed: true,
        };
        let result = uploader.upload(files).await;
        guard.disarm();

        self.complete_upload(ticket, result)
    }

    // ========================================================================
    // SAVE
    // ========================================================================

    /// Freeze the payload and enter Submitting
    pub fn begin_save(&mut self) -> Result<SaveTicket, SessionError> {
        self.ensure_editable()?;

        self.save_seq += 1;
        self.in_flight = Some(self.save_seq);
        self.state = SessionState::Submitting;
        self.last_error = None;

        Ok(SaveTicket {
            seq: self.save_seq,
            draft: self.draft(),
        })
    }

    /// Apply the repository's answer to a save.
    ///
    /// Returns Ok(None) when the session was closed in the meantime and the
    /// result has been discarded.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: CatalogResult<Product>,
    ) -> Result<Option<Product>, SessionError> {
        if self.state == SessionState::Closed {
            debug!(seq = ticket.seq, "session closed, discarding save result");
            return Ok(None);
        }
        if self.in_flight != Some(ticket.seq) {
            return Err(SessionError::NoSaveInFlight);
        }
        self.in_flight = None;

        match result {
            Ok(product) => {
                info!(product_id = %product.id, created = ticket.draft.is_new(), "product saved");
                self.product_id = Some(product.id.clone());
                self.state = SessionState::Saved;
                self.saved = Some(product.clone());
                Ok(Some(product))
            }
            Err(err) => {
                warn!(error = %err, "product save failed, edits kept");
                self.state = SessionState::Failed;
                self.last_error = Some(err.to_string());
                Err(SessionError::PersistenceFailure(err))
            }
        }
    }

    /// Create when the product has no id yet, update otherwise
    pub async fn save(&mut self, products: &dyn ProductRepository) -> Result<Product, SessionError> {
        let ticket = self.begin_save()?;
        let payload = ticket.draft().clone();

        let result = if payload.is_new() {
            products.create(payload).await
        } else {
            products.update(payload).await
        };

        self.complete_save(ticket, result)?
            .ok_or(SessionError::NotEditable { state: self.state })
    }

    /// Navigate away. Any save still in flight will be discarded.
    pub fn close(&mut self) {
        if self.in_flight.is_some() {
            debug!("closing session with a save in flight");
        }
        self.state = SessionState::Closed;
    }
}

// ============================================================================
// TESTS
// ============================================================================
