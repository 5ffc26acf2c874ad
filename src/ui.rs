//! Seams between the controllers and whatever front end drives them.

use std::sync::Arc;
use tokio::sync::watch;

use crate::api::CatalogApi;
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
}

pub trait UserInterface: Send + Sync {
    /// Modal notice; the user just acknowledges it.
    fn alert(&self, message: &str);
    /// Yes/no question. `false` means the user declined.
    fn confirm(&self, question: &str) -> bool;
    fn navigate(&self, route: Route);
}

/// Change notification shared by every view that shows catalog data.
/// Any successful mutation calls `notify`; listeners refetch.
#[derive(Clone)]
pub struct RefreshBus {
    tx: Arc<watch::Sender<u64>>,
}

impl RefreshBus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn notify(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// New listeners start with every change so far already seen.
    pub fn subscribe(&self) -> RefreshListener {
        RefreshListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RefreshListener {
    rx: watch::Receiver<u64>,
}

impl RefreshListener {
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    pub fn mark_seen(&mut self) {
        self.rx.borrow_and_update();
    }

    /// Waits for the next notification. The bus lives as long as any
    /// listener's owner holds it, so this only returns `false` on teardown.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Everything a controller needs to reach the outside world.
#[derive(Clone)]
pub struct AppContext {
    pub api: Arc<dyn CatalogApi>,
    pub session: SessionStore,
    pub ui: Arc<dyn UserInterface>,
}

impl AppContext {
    pub fn new(api: Arc<dyn CatalogApi>, session: SessionStore, ui: Arc<dyn UserInterface>) -> Self {
        Self { api, session, ui }
    }

    /// Token for a protected request, or `AuthRequired` before anything is sent.
    pub fn require_token(&self) -> Result<String> {
        self.session.valid_token().ok_or(ClientError::AuthRequired)
    }

    pub fn redirect_to_login(&self) {
        self.ui.alert("Please log in again");
        self.ui.navigate(Route::Login);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every interaction; confirmations answer from a queue (yes when empty).
    #[derive(Default)]
    pub struct RecordingUi {
        pub alerts: Mutex<Vec<String>>,
        pub questions: Mutex<Vec<String>>,
        pub routes: Mutex<Vec<Route>>,
        answers: Mutex<VecDeque<bool>>,
    }

    impl RecordingUi {
        pub fn answer_next(&self, yes: bool) {
            self.answers.lock().unwrap().push_back(yes);
        }

        pub fn alerts(&self) -> Vec<String> {
            self.alerts.lock().unwrap().clone()
        }

        pub fn routes(&self) -> Vec<Route> {
            self.routes.lock().unwrap().clone()
        }

        pub fn questions(&self) -> Vec<String> {
            self.questions.lock().unwrap().clone()
        }
    }

    impl UserInterface for RecordingUi {
        fn alert(&self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_string());
        }

        fn confirm(&self, question: &str) -> bool {
            self.questions.lock().unwrap().push(question.to_string());
            self.answers.lock().unwrap().pop_front().unwrap_or(true)
        }

        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }
}
