//! Terminal front end: line-based prompts and plain-text screens.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::sync::Mutex;

use crate::error::Result;
use crate::form::FormState;
use crate::list::ProductList;
use crate::models::Product;
use crate::pages::Dashboard;
use crate::ui::{Route, UserInterface};

#[derive(Default)]
pub struct TerminalUi {
    assume_yes: bool,
    pending_route: Mutex<Option<Route>>,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every confirmation with "yes" (non-interactive runs).
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Most recent navigation request since the last call, if any.
    pub fn take_route(&self) -> Option<Route> {
        self.pending_route
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl UserInterface for TerminalUi {
    fn alert(&self, message: &str) {
        println!("! {}", message);
    }

    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        match read_line(&format!("{} [y/N] ", question)) {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }

    fn navigate(&self, route: Route) {
        *self
            .pending_route
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(route);
    }
}

thread_local! {
    // One editor per thread keeps history across prompts; the shell reads
    // from the runtime's main thread only.
    static EDITOR: RefCell<Option<DefaultEditor>> = const { RefCell::new(None) };
}

/// Reads one line after `prompt`. `None` on Ctrl-D or Ctrl-C.
pub fn read_line(prompt: &str) -> Result<Option<String>> {
    EDITOR.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(DefaultEditor::new()?);
        }
        let Some(editor) = slot.as_mut() else {
            return Ok(None);
        };
        line_or_end(editor.readline(prompt))
    })
}

/// Ctrl-D and Ctrl-C end input; other editor failures are errors.
fn line_or_end(read: rustyline::Result<String>) -> Result<Option<String>> {
    match read {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Adds a command line to the editor history (Up-arrow recall).
pub fn remember(line: &str) {
    EDITOR.with(|cell| {
        if let Some(editor) = cell.borrow_mut().as_mut() {
            if let Err(e) = editor.add_history_entry(line) {
                tracing::debug!(error = %e, "History entry dropped");
            }
        }
    });
}

/// Like `read_line`, but an empty answer keeps `current`.
pub fn read_with_default(label: &str, current: &str) -> Result<Option<String>> {
    let answer = read_line(&format!("{} [{}]: ", label, current))?;
    Ok(answer.map(|a| if a.trim().is_empty() { current.to_string() } else { a }))
}

pub fn render_product(product: &Product) -> String {
    let mut line = format!(
        "#{:<4} {}  ₹{}  stock: {}",
        product.id,
        product.description,
        product.price,
        product.stock_or_default()
    );
    if let Some(url) = product.image() {
        let _ = write!(line, "  image: {}", url);
    }
    line
}

pub fn render_list(list: &ProductList) -> String {
    let mut out = String::from("Products\n");
    if let Some(error) = list.error() {
        let _ = writeln!(out, "  error: {}", error);
    }
    if list.products().is_empty() {
        out.push_str("  (no products)\n");
    }
    for product in list.products() {
        let _ = writeln!(out, "  {}", render_product(product));
        if list.editing() == Some(product.id) {
            if let Some(draft) = list.edit_draft() {
                let _ = writeln!(
                    out,
                    "      editing: {} / {} / stock {} / image {}",
                    draft.description,
                    draft.price,
                    draft.stock,
                    draft.preview().unwrap_or_else(|| draft.image_url.clone())
                );
            }
        }
    }
    out
}

pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::from("== Ecommerce Admin ==\n");
    if let Some(email) = dashboard.email() {
        let _ = writeln!(out, "Signed in as {}", email);
    }
    match dashboard.form().state() {
        FormState::Submitting => out.push_str("Create product: saving...\n"),
        FormState::Error(message) => {
            let _ = writeln!(out, "Create product failed: {}", message);
        }
        FormState::Idle => {}
    }
    out.push_str(&render_list(dashboard.list()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_product_line() {
        let product = Product {
            id: 7,
            description: "USB-C Fast Charger 30W".into(),
            price: 699.0,
            image_url: Some("http://localhost:8080/uploads/c.png".into()),
            stock: None,
        };
        assert_eq!(
            render_product(&product),
            "#7    USB-C Fast Charger 30W  ₹699  stock: 0  image: http://localhost:8080/uploads/c.png"
        );
    }

    #[test]
    fn test_end_of_input_is_not_an_error() {
        assert_eq!(line_or_end(Ok("edit 3".into())).unwrap(), Some("edit 3".to_string()));
        assert_eq!(line_or_end(Err(ReadlineError::Eof)).unwrap(), None);
        assert_eq!(line_or_end(Err(ReadlineError::Interrupted)).unwrap(), None);

        let broken = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "tty gone");
        assert!(matches!(
            line_or_end(Err(ReadlineError::Io(broken))),
            Err(crate::error::ClientError::Input(_))
        ));
    }

    #[test]
    fn test_navigation_is_taken_once() {
        let ui = TerminalUi::new().assume_yes(true);
        assert!(ui.confirm("Delete?"));
        ui.navigate(Route::Login);
        assert_eq!(ui.take_route(), Some(Route::Login));
        assert_eq!(ui.take_route(), None);
    }
}
