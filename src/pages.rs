//! Page shells: Login, Register and the admin Dashboard.

use tracing::{info, warn};

use crate::form::ProductForm;
use crate::list::ProductList;
use crate::session::SessionStore;
use crate::ui::{AppContext, RefreshBus, Route};

pub const LOGIN_FAILED: &str = "Invalid email or password";
pub const REGISTER_OK: &str = "Registration successful. Please login.";
pub const REGISTER_FAILED: &str = "Registration failed";

/// Where a freshly started client should land.
pub fn initial_route(session: &SessionStore) -> Route {
    if session.is_admin() {
        Route::Dashboard
    } else {
        Route::Login
    }
}

pub struct LoginPage {
    ctx: AppContext,
    error: Option<String>,
}

impl LoginPage {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, error: None }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn submit(&mut self, email: &str, password: &str) -> bool {
        self.error = None;
        match self.ctx.session.login(self.ctx.api.as_ref(), email, password).await {
            Ok(_) => {
                self.ctx.ui.alert("Login successful");
                self.ctx.ui.navigate(Route::Dashboard);
                true
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.error = Some(LOGIN_FAILED.to_string());
                false
            }
        }
    }
}

pub struct RegisterPage {
    ctx: AppContext,
    message: Option<String>,
    error: Option<String>,
}

impl RegisterPage {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            message: None,
            error: None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn submit(&mut self, full_name: &str, email: &str, password: &str) -> bool {
        self.message = None;
        self.error = None;
        match self
            .ctx
            .session
            .register(self.ctx.api.as_ref(), full_name, email, password)
            .await
        {
            Ok(_) => {
                self.message = Some(REGISTER_OK.to_string());
                true
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.error = Some(REGISTER_FAILED.to_string());
                false
            }
        }
    }
}

/// Admin screen: the create form above the product list, sharing one
/// refresh bus so any mutation reloads the list.
pub struct Dashboard {
    ctx: AppContext,
    refresh: RefreshBus,
    form: ProductForm,
    list: ProductList,
}

impl Dashboard {
    pub fn new(ctx: AppContext) -> Self {
        let refresh = RefreshBus::new();
        Self {
            form: ProductForm::new(ctx.clone(), refresh.clone()),
            list: ProductList::new(ctx.clone(), refresh.clone()),
            ctx,
            refresh,
        }
    }

    /// Guards on the administrator role, then loads the list. Returns `false`
    /// after redirecting to Login when the guard fails.
    pub async fn mount(&mut self) -> bool {
        if !self.ctx.session.is_admin() {
            info!(role = ?self.ctx.session.role(), "Dashboard requires the admin role");
            self.ctx.ui.navigate(Route::Login);
            return false;
        }
        self.list.refresh().await;
        true
    }

    pub fn email(&self) -> Option<String> {
        self.ctx.session.email()
    }

    pub fn refresh_bus(&self) -> &RefreshBus {
        &self.refresh
    }

    pub fn form(&self) -> &ProductForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProductForm {
        &mut self.form
    }

    pub fn list(&self) -> &ProductList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ProductList {
        &mut self.list
    }

    /// Picks up pending change notifications. Returns whether the list reloaded.
    pub async fn sync(&mut self) -> bool {
        self.list.sync().await
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.ctx.session.logout() {
            warn!(error = %e, "Failed to clear session");
        }
        self.ctx.ui.navigate(Route::Login);
    }
}
