//! Persisted session record (token, email, role).
//!
//! Exactly one record lives under a single key of a sled tree. Reads are
//! local; only `login` and `register` talk to the backend.

use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use crate::api::CatalogApi;
use crate::auth::is_token_expired;
use crate::error::Result;
use crate::models::{LoginRequest, RegisterRequest, Session};

const SESSION_TREE: &str = "catalog_admin";
const SESSION_KEY: &[u8] = b"auth";

#[derive(Clone)]
pub struct SessionStore {
    tree: sled::Tree,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Self::with_db(&db)
    }

    pub fn with_db(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(SESSION_TREE)?,
        })
    }

    /// Store backed by a throwaway database, for tests and dry runs.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(&db)
    }

    /// Authenticates and persists the record the backend returned.
    /// Any rejection surfaces as `InvalidCredentials`; nothing is stored then.
    pub async fn login(&self, api: &dyn CatalogApi, email: &str, password: &str) -> Result<Session> {
        let session = api
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.save(&session)?;
        info!(email = %session.email, role = %session.role, "Logged in");
        Ok(session)
    }

    /// Creates an account. Does not sign in.
    pub async fn register(
        &self,
        api: &dyn CatalogApi,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<String> {
        let ack = api
            .register(&RegisterRequest {
                full_name: full_name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(email, "Registered account");
        Ok(ack)
    }

    /// Replaces whatever session was stored before.
    pub fn save(&self, session: &Session) -> Result<()> {
        let bytes = serde_json::to_vec(session)?;
        self.tree.insert(SESSION_KEY, bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Absent and unreadable records both mean "logged out".
    pub fn get_session(&self) -> Option<Session> {
        let raw = match self.tree.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Session store read failed");
                return None;
            }
        };
        match serde_json::from_slice::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "Ignoring corrupt session record");
                None
            }
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.tree.remove(SESSION_KEY)?;
        self.tree.flush()?;
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.get_session().map(|s| s.token)
    }

    pub fn email(&self) -> Option<String> {
        self.get_session().map(|s| s.email)
    }

    pub fn role(&self) -> Option<String> {
        self.get_session().map(|s| s.role)
    }

    pub fn is_admin(&self) -> bool {
        self.get_session().is_some_and(|s| s.is_admin())
    }

    /// Token usable for a protected request: present and not past its expiry.
    pub fn valid_token(&self) -> Option<String> {
        let token = self.token()?;
        if is_token_expired(&token, Utc::now()) {
            warn!("Stored session token has expired");
            return None;
        }
        Some(token)
    }

    #[cfg(test)]
    pub(crate) fn write_raw(&self, bytes: &[u8]) {
        self.tree.insert(SESSION_KEY, bytes).expect("raw session write");
    }
}
