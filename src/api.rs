//! HTTP client for the catalog backend.
//!
//! `CatalogApi` is the seam the controllers talk to; `HttpCatalogApi` is the
//! reqwest implementation of the REST contract:
//! - `/api/products` (GET list, POST create), `/api/products/{id}` (PUT, DELETE)
//! - `/api/products/upload` (multipart `file`, returns the stored image URL)
//! - `/api/auth/login`, `/api/auth/register`

use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::models::{ImageFile, LoginRequest, Product, ProductPayload, RegisterRequest, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The backend answered 404: someone else already removed it.
    AlreadyGone,
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Origin used to absolutize server-relative image paths.
    fn origin(&self) -> &str;

    async fn list_products(&self) -> Result<Vec<Product>>;
    async fn create_product(&self, token: &str, payload: &ProductPayload) -> Result<()>;
    async fn update_product(&self, token: &str, id: u64, payload: &ProductPayload) -> Result<()>;
    async fn delete_product(&self, token: &str, id: u64) -> Result<DeleteOutcome>;
    /// Uploads an image and returns its absolute URL.
    async fn upload_image(&self, token: &str, image: &ImageFile) -> Result<String>;
    async fn login(&self, request: &LoginRequest) -> Result<Session>;
    /// Returns the backend's plain-text acknowledgment.
    async fn register(&self, request: &RegisterRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct HttpCatalogApi {
    client: Client,
    origin: String,
}

impl HttpCatalogApi {
    pub fn new(origin: &str) -> Self {
        Self::with_client(Client::new(), origin)
    }

    pub fn with_client(client: Client, origin: &str) -> Self {
        Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }
}

/// Turns a non-2xx response into `ServerRejected`, keeping the body text.
async fn ensure_success(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.ok().filter(|text| !text.trim().is_empty());
    warn!(%status, body = body.as_deref().unwrap_or(""), "Backend rejected request");
    Err(ClientError::ServerRejected { status, body })
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let res = self.client.get(self.url("/api/products")).send().await?;
        let text = ensure_success(res).await?.text().await?;
        let products: Vec<Product> = serde_json::from_str(&text)?;
        debug!(count = products.len(), "Fetched product list");
        Ok(products)
    }

    async fn create_product(&self, token: &str, payload: &ProductPayload) -> Result<()> {
        let res = self
            .client
            .post(self.url("/api/products"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn update_product(&self, token: &str, id: u64, payload: &ProductPayload) -> Result<()> {
        let res = self
            .client
            .put(self.url(&format!("/api/products/{}", id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn delete_product(&self, token: &str, id: u64) -> Result<DeleteOutcome> {
        let res = self
            .client
            .delete(self.url(&format!("/api/products/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::AlreadyGone);
        }
        ensure_success(res).await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn upload_image(&self, token: &str, image: &ImageFile) -> Result<String> {
        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        let form = multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.url("/api/products/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        let raw = ensure_success(res).await?.text().await?;
        decode_upload_url(&raw, &self.origin)
    }

    async fn login(&self, request: &LoginRequest) -> Result<Session> {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(request)
            .send()
            .await?;
        if !res.status().is_success() {
            warn!(status = %res.status(), "Login rejected");
            return Err(ClientError::InvalidCredentials);
        }
        let text = res.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(request)
            .send()
            .await?;
        if !res.status().is_success() {
            warn!(status = %res.status(), "Registration rejected");
            return Err(ClientError::RegistrationFailed);
        }
        Ok(res.text().await?)
    }
}

/// Normalizes the body of an upload response into an absolute URL.
///
/// The backend may answer with plain text or a JSON string literal, and with
/// either an absolute URL or a path relative to its own origin. An empty
/// value is `EmptyUploadResponse`.
pub fn decode_upload_url(raw: &str, origin: &str) -> Result<String> {
    let trimmed = raw.trim();
    let unquoted = match serde_json::from_str::<String>(trimmed) {
        Ok(decoded) => decoded,
        Err(_) => trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(trimmed)
            .to_string(),
    };
    let unquoted = unquoted.trim();
    if unquoted.is_empty() {
        warn!("Upload response carried no image URL");
        return Err(ClientError::EmptyUploadResponse);
    }

    if has_url_scheme(unquoted) {
        return Ok(unquoted.to_string());
    }
    Ok(format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        unquoted.trim_start_matches('/')
    ))
}

fn has_url_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
