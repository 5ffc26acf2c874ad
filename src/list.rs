//! Product list with inline edit and confirmed delete.
//!
//! The list never patches its own copy after a mutation: it notifies the
//! refresh bus and refetches the whole collection. Fetches are ticketed so a
//! slow response cannot overwrite the result of a request issued after it.

use tracing::{debug, error, info, warn};

use crate::api::DeleteOutcome;
use crate::error::{ClientError, Result};
use crate::form::{resolve_image_url, ProductDraft};
use crate::models::{ImageFile, Product};
use crate::ui::{AppContext, RefreshBus, RefreshListener};

/// Identifies one list fetch. Only the most recently issued ticket may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
}

struct EditSession {
    id: u64,
    draft: ProductDraft,
}

pub struct ProductList {
    ctx: AppContext,
    refresh: RefreshBus,
    listener: RefreshListener,
    products: Vec<Product>,
    error: Option<String>,
    latest_seq: u64,
    loading: bool,
    editing: Option<EditSession>,
    saving: bool,
}

impl ProductList {
    pub fn new(ctx: AppContext, refresh: RefreshBus) -> Self {
        let listener = refresh.subscribe();
        Self {
            ctx,
            refresh,
            listener,
            products: Vec::new(),
            error: None,
            latest_seq: 0,
            loading: false,
            editing: None,
            saving: false,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: u64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_seq += 1;
        self.loading = true;
        FetchTicket {
            seq: self.latest_seq,
        }
    }

    /// Applies a fetch result. Returns `false` when the ticket is stale and
    /// the result was dropped. Failures keep the previous products.
    pub fn apply(&mut self, ticket: FetchTicket, result: Result<Vec<Product>>) -> bool {
        if ticket.seq != self.latest_seq {
            debug!(ticket = ticket.seq, latest = self.latest_seq, "Dropping stale product list");
            return false;
        }
        self.loading = false;
        match result {
            Ok(products) => {
                self.products = products;
                self.error = None;
            }
            Err(e) => {
                error!(error = %e, "Error fetching products");
                self.error = Some("Failed to load products".to_string());
            }
        }
        true
    }

    pub async fn refresh(&mut self) {
        let ticket = self.begin_fetch();
        let result = self.ctx.api.list_products().await;
        self.apply(ticket, result);
    }

    /// Refetches if the bus fired since the last look. Returns whether it did.
    pub async fn sync(&mut self) -> bool {
        if !self.listener.has_changed() {
            return false;
        }
        self.listener.mark_seen();
        self.refresh().await;
        true
    }

    /// Waits for the next change notification, then refetches.
    pub async fn watch(&mut self) -> bool {
        if !self.listener.changed().await {
            return false;
        }
        self.listener.mark_seen();
        self.refresh().await;
        true
    }

    pub fn editing(&self) -> Option<u64> {
        self.editing.as_ref().map(|e| e.id)
    }

    pub fn edit_draft(&self) -> Option<&ProductDraft> {
        self.editing.as_ref().map(|e| &e.draft)
    }

    pub fn edit_draft_mut(&mut self) -> Option<&mut ProductDraft> {
        self.editing.as_mut().map(|e| &mut e.draft)
    }

    /// Opens the editor on `id`, discarding any other row's unsaved edits.
    pub fn start_edit(&mut self, id: u64) -> bool {
        let Some(product) = self.product(id) else {
            return false;
        };
        let draft = ProductDraft::from_product(product);
        if let Some(previous) = self.editing.replace(EditSession { id, draft }) {
            if previous.id != id {
                debug!(abandoned = previous.id, "Abandoned unsaved edit");
            }
        }
        self.error = None;
        true
    }

    pub fn attach_edit_image(&mut self, file: ImageFile) -> bool {
        match self.edit_draft_mut() {
            Some(draft) => {
                draft.image_file = Some(file);
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.error = None;
    }

    /// Saves the open edit. Does nothing when no row is being edited.
    pub async fn save_edit(&mut self) -> Result<()> {
        let Some(session) = self.editing.as_ref() else {
            return Ok(());
        };
        let id = session.id;
        self.saving = true;
        self.error = None;
        let outcome = self.try_save(id, &session.draft).await;
        self.saving = false;

        match outcome {
            Ok(()) => {
                info!(id, "Updated product");
                self.editing = None;
                self.refresh.notify();
                Ok(())
            }
            Err(err) => {
                let fallback = match &err {
                    ClientError::AuthRequired => {
                        self.ctx.redirect_to_login();
                        "Failed to update product"
                    }
                    ClientError::NetworkFailure(e) => {
                        error!(id, error = %e, "Error updating product");
                        "Error updating product"
                    }
                    other => {
                        warn!(id, error = %other, "Update failed");
                        "Failed to update product"
                    }
                };
                self.error = Some(err.inline_message(fallback));
                Err(err)
            }
        }
    }

    async fn try_save(&self, id: u64, draft: &ProductDraft) -> Result<()> {
        draft.to_payload(String::new())?;
        let token = self.ctx.require_token()?;
        let image_url = resolve_image_url(&self.ctx, &token, draft).await?;
        let payload = draft.to_payload(image_url)?;
        self.ctx.api.update_product(&token, id, &payload).await
    }

    /// Deletes after a yes/no confirmation. Returns `Ok(false)` if the user
    /// declined. A 404 counts as deleted.
    pub async fn delete(&mut self, id: u64) -> Result<bool> {
        let token = match self.ctx.require_token() {
            Ok(token) => token,
            Err(err) => {
                self.ctx.redirect_to_login();
                return Err(err);
            }
        };
        let question = format!("Are you sure you want to delete product #{}?", id);
        if !self.ctx.ui.confirm(&question) {
            return Ok(false);
        }

        match self.ctx.api.delete_product(&token, id).await {
            Ok(outcome) => {
                if outcome == DeleteOutcome::AlreadyGone {
                    info!(id, "Product was already deleted");
                } else {
                    info!(id, "Deleted product");
                }
                self.refresh.notify();
                Ok(true)
            }
            Err(err @ ClientError::ServerRejected { .. }) => {
                warn!(id, error = %err, "Delete failed");
                self.ctx.ui.alert("Failed to delete product");
                Err(err)
            }
            Err(err) => {
                error!(id, error = %err, "Error deleting product");
                self.ctx.ui.alert("Error deleting product");
                Err(err)
            }
        }
    }
}
