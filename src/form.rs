//! Create-product form: draft fields, optional image upload, submit.
//!
//! Submit runs `Idle -> Submitting -> (Idle | Error)`. A successful create
//! clears the draft and notifies the refresh bus; every failure leaves the
//! draft exactly as the user typed it.

use std::path::Path;
use tracing::{error, info, warn};

use crate::error::{ClientError, Result};
use crate::models::{ImageFile, Product, ProductPayload};
use crate::ui::{AppContext, RefreshBus};

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    Submitting,
    Error(String),
}

/// Raw user input for one product. Numbers stay text until submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub description: String,
    pub price: String,
    pub stock: String,
    pub image_url: String,
    pub image_file: Option<ImageFile>,
}

impl ProductDraft {
    /// Seeds a draft from an existing product; missing numbers become 0.
    pub fn from_product(product: &Product) -> Self {
        Self {
            description: product.description.clone(),
            price: product.price.to_string(),
            stock: product.stock_or_default().to_string(),
            image_url: product.image_url.clone().unwrap_or_default(),
            image_file: None,
        }
    }

    /// Checks the fields and builds the wire body around `image_url`.
    pub fn to_payload(&self, image_url: String) -> Result<ProductPayload> {
        if self.description.trim().is_empty() {
            return Err(ClientError::ValidationFailure("Description is required".into()));
        }
        Ok(ProductPayload {
            description: self.description.clone(),
            price: parse_price(&self.price)?,
            image_url,
            stock: parse_stock(&self.stock)?,
        })
    }

    pub fn preview(&self) -> Option<String> {
        self.image_file.as_ref().map(ImageFile::preview)
    }
}

fn parse_price(input: &str) -> Result<f64> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0.0);
    }
    match input.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(ClientError::ValidationFailure(
            "Price must be a number of 0 or more".into(),
        )),
    }
}

fn parse_stock(input: &str) -> Result<u32> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0);
    }
    input.parse::<u32>().map_err(|_| {
        ClientError::ValidationFailure("Stock must be a whole number of 0 or more".into())
    })
}

/// Uploads the draft's pending file, or falls back to the typed URL.
pub(crate) async fn resolve_image_url(
    ctx: &AppContext,
    token: &str,
    draft: &ProductDraft,
) -> Result<String> {
    match &draft.image_file {
        Some(file) => {
            let url = ctx.api.upload_image(token, file).await?;
            info!(file = %file.file_name, url = %url, "Uploaded product image");
            Ok(url)
        }
        None => Ok(draft.image_url.trim().to_string()),
    }
}

pub struct ProductForm {
    ctx: AppContext,
    refresh: RefreshBus,
    draft: ProductDraft,
    state: FormState,
}

impl ProductForm {
    pub fn new(ctx: AppContext, refresh: RefreshBus) -> Self {
        Self {
            ctx,
            refresh,
            draft: ProductDraft::default(),
            state: FormState::Idle,
        }
    }

    pub fn draft(&self) -> &ProductDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ProductDraft {
        &mut self.draft
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            FormState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn attach(&mut self, file: ImageFile) {
        self.draft.image_file = Some(file);
    }

    pub async fn attach_file(&mut self, path: &Path) -> Result<()> {
        let file = ImageFile::from_path(path).await?;
        self.attach(file);
        Ok(())
    }

    pub fn clear_file(&mut self) {
        self.draft.image_file = None;
    }

    pub fn preview(&self) -> Option<String> {
        self.draft.preview()
    }

    pub fn reset(&mut self) {
        self.draft = ProductDraft::default();
        self.state = FormState::Idle;
    }

    pub async fn submit(&mut self) -> Result<()> {
        self.state = FormState::Submitting;

        match self.try_submit().await {
            Ok(()) => {
                self.reset();
                self.refresh.notify();
                Ok(())
            }
            Err((err, fallback)) => {
                match &err {
                    ClientError::AuthRequired => self.ctx.redirect_to_login(),
                    ClientError::ValidationFailure(_) => {}
                    ClientError::ServerRejected { .. } => warn!(error = %err, "Create product failed"),
                    other => error!(error = %other, "Create product failed"),
                }
                self.state = FormState::Error(err.inline_message(fallback));
                Err(err)
            }
        }
    }

    async fn try_submit(&self) -> std::result::Result<(), (ClientError, &'static str)> {
        let fallback = "Failed to create product";
        // Validate before anything else so bad input never costs an upload.
        self.draft
            .to_payload(String::new())
            .map_err(|e| (e, fallback))?;
        let token = self.ctx.require_token().map_err(|e| (e, fallback))?;

        let image_url = resolve_image_url(&self.ctx, &token, &self.draft)
            .await
            .map_err(|e| (e, "Image upload failed"))?;
        let payload = self.draft.to_payload(image_url).map_err(|e| (e, fallback))?;

        self.ctx
            .api
            .create_product(&token, &payload)
            .await
            .map_err(|e| (e, fallback))?;
        info!(description = %payload.description, "Created product");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpCatalogApi;
    use crate::dev_backend::{DevBackend, UploadStyle};
    use crate::models::{Session, ADMIN_ROLE};
    use crate::session::SessionStore;
    use crate::ui::testing::RecordingUi;
    use crate::ui::Route;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    struct Harness {
        backend: DevBackend,
        ui: Arc<RecordingUi>,
        bus: RefreshBus,
        form: ProductForm,
    }

    async fn harness(logged_in: bool) -> Harness {
        let backend = DevBackend::new();
        let origin = backend.clone().spawn_local().await.unwrap();
        let session = SessionStore::temporary().unwrap();
        if logged_in {
            let token = backend.issue_token("admin@example.com", ADMIN_ROLE);
            session
                .save(&Session {
                    token,
                    email: "admin@example.com".into(),
                    role: ADMIN_ROLE.into(),
                })
                .unwrap();
        }
        let ui = Arc::new(RecordingUi::default());
        let ctx = AppContext::new(Arc::new(HttpCatalogApi::new(&origin)), session, ui.clone());
        let bus = RefreshBus::new();
        let form = ProductForm::new(ctx, bus.clone());
        Harness {
            backend,
            ui,
            bus,
            form,
        }
    }

    fn fill(form: &mut ProductForm, description: &str, price: &str, stock: &str, url: &str) {
        let draft = form.draft_mut();
        draft.description = description.into();
        draft.price = price.into();
        draft.stock = stock.into();
        draft.image_url = url.into();
    }

    #[test]
    fn test_blank_numbers_coerce_to_zero() {
        let draft = ProductDraft {
            description: "Bag".into(),
            ..Default::default()
        };
        let payload = draft.to_payload(String::new()).unwrap();
        assert_eq!(payload.price, 0.0);
        assert_eq!(payload.stock, 0);

        let bad = ProductDraft {
            description: "Bag".into(),
            price: "-1".into(),
            ..Default::default()
        };
        assert!(matches!(
            bad.to_payload(String::new()),
            Err(ClientError::ValidationFailure(_))
        ));
        let fractional_stock = ProductDraft {
            description: "Bag".into(),
            stock: "2.5".into(),
            ..Default::default()
        };
        assert!(fractional_stock.to_payload(String::new()).is_err());
    }

    #[tokio::test]
    async fn test_submit_without_file_sends_trimmed_url_and_notifies() {
        let mut h = harness(true).await;
        let mut listener = h.bus.subscribe();
        fill(&mut h.form, "Widget", "9.99", "5", "  http://x/img.png ");

        h.form.submit().await.expect("submit");

        let creates = h.backend.requests_for(Method::POST, "/api/products");
        assert_eq!(creates.len(), 1);
        assert_eq!(
            creates[0].body,
            Some(json!({"description": "Widget", "price": 9.99, "imageUrl": "http://x/img.png", "stock": 5}))
        );
        assert_eq!(h.form.draft(), &ProductDraft::default());
        assert_eq!(h.form.state(), &FormState::Idle);
        assert!(listener.has_changed());
        listener.mark_seen();

        fill(&mut h.form, "Plain", "", "", "   ");
        h.form.submit().await.expect("submit without image");
        let creates = h.backend.requests_for(Method::POST, "/api/products");
        assert_eq!(creates[1].body.as_ref().unwrap()["imageUrl"], json!(""));
        assert_eq!(creates[1].body.as_ref().unwrap()["price"], json!(0.0));
    }

    #[tokio::test]
    async fn test_submit_with_file_uploads_first() {
        let mut h = harness(true).await;
        h.backend.set_upload_style(UploadStyle::JsonQuotedRelative);
        fill(&mut h.form, "Lamp", "20", "1", "http://ignored/when-file.png");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lamp.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();
        h.form.attach_file(&path).await.unwrap();
        assert!(h.form.preview().unwrap().starts_with("lamp.png ("));

        h.form.submit().await.expect("submit");

        let journal = h.backend.journal();
        let paths: Vec<_> = journal
            .iter()
            .map(|r| (r.method.clone(), r.path.clone()))
            .collect();
        assert_eq!(
            paths,
            vec![
                (Method::POST, "/api/products/upload".to_string()),
                (Method::POST, "/api/products".to_string()),
            ]
        );
        let image_url = journal[1].body.as_ref().unwrap()["imageUrl"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(image_url.starts_with(h.form.ctx.api.origin()));
        assert!(image_url.ends_with("_lamp.png"));
        assert!(h.form.draft().image_file.is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_blocks_create_and_keeps_draft() {
        let mut h = harness(true).await;
        fill(&mut h.form, "Lamp", "20", "1", "");
        h.form.attach(ImageFile::new("lamp.png", vec![1, 2, 3]));
        let before = h.form.draft().clone();
        h.backend.fail_next(Method::POST, "/api/products/upload", StatusCode::INTERNAL_SERVER_ERROR);
        let mut listener = h.bus.subscribe();

        assert!(h.form.submit().await.is_err());

        assert!(h.backend.requests_for(Method::POST, "/api/products").is_empty());
        assert_eq!(h.form.draft(), &before);
        assert!(h.form.error().is_some());
        assert!(!listener.has_changed());
        listener.mark_seen();
    }

    #[tokio::test]
    async fn test_empty_upload_response_blocks_create() {
        let mut h = harness(true).await;
        h.backend.set_upload_style(UploadStyle::Empty);
        fill(&mut h.form, "Lamp", "20", "1", "");
        h.form.attach(ImageFile::new("lamp.png", vec![1, 2, 3]));
        let before = h.form.draft().clone();

        let err = h.form.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::EmptyUploadResponse));
        assert_eq!(h.backend.requests_for(Method::POST, "/api/products/upload").len(), 1);
        assert!(h.backend.requests_for(Method::POST, "/api/products").is_empty());
        assert_eq!(h.form.error(), Some("Image upload failed"));
        assert_eq!(h.form.draft(), &before);
        assert_eq!(h.bus.generation(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_redirects_before_any_request() {
        let mut h = harness(false).await;
        h.form
            .ctx
            .session
            .save(&Session {
                token: crate::auth::make_jwt(chrono::Utc::now().timestamp() - 60),
                email: "admin@example.com".into(),
                role: ADMIN_ROLE.into(),
            })
            .unwrap();
        fill(&mut h.form, "Lamp", "20", "1", "");
        h.form.attach(ImageFile::new("lamp.png", vec![1, 2, 3]));

        let err = h.form.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::AuthRequired));
        assert_eq!(h.ui.routes(), vec![Route::Login]);
        assert_eq!(h.ui.alerts(), vec!["Please log in again".to_string()]);
        assert!(h.backend.journal().is_empty());
        assert_eq!(h.form.draft().description, "Lamp");
    }

    #[tokio::test]
    async fn test_server_rejection_surfaces_body() {
        let mut h = harness(true).await;
        fill(&mut h.form, "Lamp", "20", "1", "");
        h.backend.fail_next(Method::POST, "/api/products", StatusCode::BAD_REQUEST);

        assert!(h.form.submit().await.is_err());
        assert_eq!(h.form.error(), Some("Injected failure"));
        assert_eq!(h.form.draft().description, "Lamp");
    }

    #[tokio::test]
    async fn test_validation_and_missing_session_never_hit_network() {
        let mut h = harness(false).await;
        fill(&mut h.form, "   ", "1", "1", "");
        let err = h.form.submit().await.unwrap_err();
        assert!(matches!(err, ClientError::ValidationFailure(_)));
        assert_eq!(h.form.error(), Some("Description is required"));

        fill(&mut h.form, "Lamp", "1", "1", "");
        let err = h.form.submit().await.unwrap_err();
        assert!(matches!(err, ClientError::AuthRequired));
        assert_eq!(h.ui.routes(), vec![Route::Login]);
        assert_eq!(h.ui.alerts(), vec!["Please log in again".to_string()]);
        assert_eq!(h.form.draft().description, "Lamp");
        assert!(h.backend.journal().is_empty());
    }
}
