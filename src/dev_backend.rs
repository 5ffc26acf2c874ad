//! In-memory catalog backend using Axum.
//!
//! Implements the same REST contract the client consumes, for local runs and
//! for tests:
//! - products CRUD under `/api/products`, multipart upload, login/register
//! - a journal of every request (method, path, JSON body) for assertions
//! - one-shot fault injection per method + path
//!
//! Passwords are compared as plain text and uploads stay in memory.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{LoginRequest, Product, ProductPayload, RegisterRequest, Session, ADMIN_ROLE};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shape of the upload endpoint's response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStyle {
    /// `http://host:port/uploads/<name>` as plain text
    Absolute,
    /// `/uploads/<name>` as plain text
    Relative,
    /// `"/uploads/<name>"` as a JSON string literal
    JsonQuotedRelative,
    /// 200 with an empty body
    Empty,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    /// Parsed body for JSON requests; `None` otherwise.
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

struct UserRecord {
    full_name: String,
    password: String,
    role: String,
}

struct Fault {
    method: Method,
    path: String,
    status: StatusCode,
}

struct BackendState {
    origin: String,
    products: BTreeMap<u64, Product>,
    next_id: u64,
    users: HashMap<String, UserRecord>,
    /// token -> (email, role)
    tokens: HashMap<String, (String, String)>,
    uploads: HashMap<String, Vec<u8>>,
    upload_style: UploadStyle,
    journal: Vec<RecordedRequest>,
    faults: Vec<Fault>,
}

#[derive(Clone)]
pub struct DevBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl Default for DevBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DevBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BackendState {
                origin: "http://localhost:8080".to_string(),
                products: BTreeMap::new(),
                next_id: 1,
                users: HashMap::new(),
                tokens: HashMap::new(),
                uploads: HashMap::new(),
                upload_style: UploadStyle::Absolute,
                journal: Vec::new(),
                faults: Vec::new(),
            })),
        }
    }

    /// Sample catalog plus the default administrator account.
    pub fn seeded() -> Self {
        let backend = Self::new();
        backend.insert_product("Wireless Bluetooth Headphones, 20h battery", 2499.0, None, Some(50));
        backend.insert_product("Smart LED TV 43\", 4K HDR", 32999.0, None, Some(12));
        backend.insert_product("Stainless Steel Water Bottle 1L", 799.0, None, Some(200));
        backend.insert_product("Running Shoes, breathable mesh, sizes 6-12", 2999.0, None, Some(80));
        backend.insert_product("USB-C Fast Charger 30W", 699.0, None, Some(150));
        backend.add_user("Administrator", "admin@example.com", "admin123", ADMIN_ROLE);
        backend
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_user(&self, full_name: &str, email: &str, password: &str, role: &str) {
        self.state().users.insert(
            email.to_string(),
            UserRecord {
                full_name: full_name.to_string(),
                password: password.to_string(),
                role: role.to_string(),
            },
        );
    }

    /// Mints a token directly, skipping the login round-trip.
    pub fn issue_token(&self, email: &str, role: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.state()
            .tokens
            .insert(token.clone(), (email.to_string(), role.to_string()));
        token
    }

    pub fn token_is_valid(&self, token: &str) -> bool {
        self.state().tokens.contains_key(token)
    }

    pub fn insert_product(
        &self,
        description: &str,
        price: f64,
        image_url: Option<&str>,
        stock: Option<u32>,
    ) -> u64 {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        state.products.insert(
            id,
            Product {
                id,
                description: description.to_string(),
                price,
                image_url: image_url.map(str::to_string),
                stock,
            },
        );
        id
    }

    pub fn products(&self) -> Vec<Product> {
        self.state().products.values().cloned().collect()
    }

    pub fn set_upload_style(&self, style: UploadStyle) {
        self.state().upload_style = style;
    }

    /// The next request matching `method` and `path` fails with `status`.
    pub fn fail_next(&self, method: Method, path: &str, status: StatusCode) {
        self.state().faults.push(Fault {
            method,
            path: path.to_string(),
            status,
        });
    }

    pub fn journal(&self) -> Vec<RecordedRequest> {
        self.state().journal.clone()
    }

    pub fn requests_for(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.state()
            .journal
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.state().journal.clear();
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/products", get(list_products).post(create_product))
            .route("/api/products/upload", post(upload_image))
            .route("/api/products/:id", put(update_product).delete(delete_product))
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/uploads/:name", get(serve_upload))
            .layer(middleware::from_fn_with_state(self.clone(), journal_middleware))
            .with_state(self.clone())
    }

    /// Serves on an already-bound listener until the task is dropped.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        self.state().origin = origin_for(addr);
        info!(%addr, "Development backend listening");
        axum::serve(listener, self.router().into_make_service()).await
    }

    /// Binds an ephemeral localhost port, serves in the background and
    /// returns the origin to point a client at.
    pub async fn spawn_local(self) -> std::io::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let origin = origin_for(listener.local_addr()?);
        tokio::spawn(async move {
            if let Err(e) = self.serve(listener).await {
                warn!(error = %e, "Development backend stopped");
            }
        });
        Ok(origin)
    }
}

/// Wildcard binds are reachable as localhost.
fn origin_for(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("http://localhost:{}", addr.port())
    } else {
        format!("http://{}", addr)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Records the request, then either injects a queued fault or passes it on.
async fn journal_middleware(
    State(backend): State<DevBackend>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let (parts, body) = req.into_parts();
    let bytes: Bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    let recorded = RecordedRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        body: if is_json {
            serde_json::from_slice(&bytes).ok()
        } else {
            None
        },
        bearer: bearer_token(&parts.headers),
    };

    let fault = {
        let mut state = backend.state();
        state.journal.push(recorded.clone());
        let position = state
            .faults
            .iter()
            .position(|f| f.method == recorded.method && f.path == recorded.path);
        position.map(|i| state.faults.remove(i).status)
    };
    if let Some(status) = fault {
        return Ok((status, "Injected failure").into_response());
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Mutations need a known token carrying the administrator role.
fn authorize(backend: &DevBackend, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let state = backend.state();
    let (_, role) = state.tokens.get(&token).ok_or(StatusCode::UNAUTHORIZED)?;
    if role != ADMIN_ROLE {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(())
}

fn validate(payload: &ProductPayload) -> Result<(), Response> {
    let mut errors = serde_json::Map::new();
    if payload.description.trim().is_empty() {
        errors.insert("description".into(), json!("Description is required"));
    }
    if payload.price < 0.0 {
        errors.insert("price".into(), json!("Price must be >= 0"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err((StatusCode::BAD_REQUEST, Json(Value::Object(errors))).into_response())
    }
}

fn image_or_none(url: String) -> Option<String> {
    if url.is_empty() {
        None
    } else {
        Some(url)
    }
}

async fn list_products(State(backend): State<DevBackend>) -> Json<Vec<Product>> {
    Json(backend.products())
}

async fn create_product(
    State(backend): State<DevBackend>,
    headers: HeaderMap,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, Response> {
    authorize(&backend, &headers).map_err(IntoResponse::into_response)?;
    validate(&payload)?;

    let id = backend.insert_product(
        &payload.description,
        payload.price,
        image_or_none(payload.image_url).as_deref(),
        Some(payload.stock),
    );
    let product = backend.state().products.get(&id).cloned();
    product.map(Json).ok_or_else(|| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn update_product(
    State(backend): State<DevBackend>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, Response> {
    authorize(&backend, &headers).map_err(IntoResponse::into_response)?;
    validate(&payload)?;

    let mut state = backend.state();
    let existing = state
        .products
        .get_mut(&id)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    existing.description = payload.description;
    existing.price = payload.price;
    existing.image_url = image_or_none(payload.image_url);
    existing.stock = Some(payload.stock);
    Ok(Json(existing.clone()))
}

async fn delete_product(
    State(backend): State<DevBackend>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> StatusCode {
    if let Err(status) = authorize(&backend, &headers) {
        return status;
    }
    match backend.state().products.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn upload_image(
    State(backend): State<DevBackend>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<String, StatusCode> {
    authorize(&backend, &headers)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or("upload").replace(['/', '\\'], "_");
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let name = format!("{}_{}", Uuid::new_v4().simple(), original);

        let mut state = backend.state();
        state.uploads.insert(name.clone(), data.to_vec());
        let path = format!("/uploads/{}", name);
        return Ok(match state.upload_style {
            UploadStyle::Absolute => format!("{}{}", state.origin, path),
            UploadStyle::Relative => path,
            UploadStyle::JsonQuotedRelative => Value::String(path).to_string(),
            UploadStyle::Empty => String::new(),
        });
    }
    Err(StatusCode::BAD_REQUEST)
}

async fn serve_upload(
    State(backend): State<DevBackend>,
    Path(name): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    backend
        .state()
        .uploads
        .get(&name)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn login(
    State(backend): State<DevBackend>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>, (StatusCode, &'static str)> {
    let role = {
        let state = backend.state();
        match state.users.get(&payload.email) {
            Some(user) if user.password == payload.password => {
                info!(email = %payload.email, name = %user.full_name, "User logged in");
                user.role.clone()
            }
            _ => return Err((StatusCode::UNAUTHORIZED, "Invalid credentials")),
        }
    };
    let token = backend.issue_token(&payload.email, &role);
    Ok(Json(Session {
        token,
        email: payload.email,
        role,
    }))
}

async fn register(
    State(backend): State<DevBackend>,
    Json(payload): Json<RegisterRequest>,
) -> Result<&'static str, (StatusCode, &'static str)> {
    {
        let state = backend.state();
        if state.users.contains_key(&payload.email) {
            return Err((StatusCode::BAD_REQUEST, "Email already in use"));
        }
    }
    backend.add_user(&payload.full_name, &payload.email, &payload.password, "CUSTOMER");
    info!(email = %payload.email, "Registered user");
    Ok("User registered successfully")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_seeded_catalog_and_admin_login() {
        let backend = DevBackend::seeded();
        let app = backend.router();

        let response = app
            .clone()
            .oneshot(Request::get("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), MAX_BODY_BYTES).await.unwrap();
        let products: Vec<Product> = serde_json::from_slice(&body).unwrap();
        assert_eq!(products.len(), 5);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": "admin@example.com", "password": "admin123"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), MAX_BODY_BYTES).await.unwrap();
        let session: Session = serde_json::from_slice(&body).unwrap();
        assert_eq!(session.role, ADMIN_ROLE);
        assert!(backend.token_is_valid(&session.token));
    }

    #[tokio::test]
    async fn test_mutations_require_admin_token_and_validate() {
        let backend = DevBackend::new();
        let app = backend.router();
        let product = json!({"description": "Mug", "price": 3.5, "imageUrl": "", "stock": 2});

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/products", None, product.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let customer = backend.issue_token("shopper@example.com", "CUSTOMER");
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/products", Some(&customer), product.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = backend.issue_token("admin@example.com", ADMIN_ROLE);
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/products",
                Some(&admin),
                json!({"description": " ", "price": -1, "imageUrl": "", "stock": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request(Method::POST, "/api/products", Some(&admin), product))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(backend.products()[0].image_url, None);
        assert_eq!(backend.journal().len(), 4);
        assert_eq!(backend.journal()[3].bearer.as_deref(), Some(admin.as_str()));
    }

    #[tokio::test]
    async fn test_fault_injection_is_one_shot() {
        let backend = DevBackend::new();
        let app = backend.router();
        backend.fail_next(Method::GET, "/api/products", StatusCode::SERVICE_UNAVAILABLE);

        let first = app
            .clone()
            .oneshot(Request::get("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);
        let second = app
            .oneshot(Request::get("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
    }
}
