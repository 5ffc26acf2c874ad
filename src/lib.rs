//! catalog_admin: administrative client for a REST product catalog
//!
//! UI-agnostic controllers for the admin workflow:
//! - Session: persisted login record (sled) with token-expiry checks
//! - Product form: draft validation, optional image upload, create
//! - Product list: full re-fetch on change, inline edit, confirmed delete
//! - Pages: Login, Register and the role-guarded Dashboard
//!
//! Front ends implement `ui::UserInterface`; `terminal` is the bundled one.
//! `dev_backend` serves the same REST contract in memory for tests and local runs.

pub mod api;
pub mod auth;
pub mod config;
// In-memory axum backend for /api/products and /api/auth
pub mod dev_backend;
pub mod error;
pub mod form;
pub mod list;
pub mod logging;
pub mod models;
pub mod pages;
pub mod session;
pub mod terminal;
pub mod ui;

pub use error::{ClientError, Result};
