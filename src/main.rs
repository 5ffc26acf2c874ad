//! catalog_admin - interactive admin shell for the product catalog
//!
//! Drives the Login, Register and Dashboard pages from the terminal.
//! - Backend origin: CATALOG_API_URL (default http://localhost:8080)
//! - Session: sled store under CATALOG_DATA_DIR
//! - Logs: stderr, plus a daily file when CATALOG_LOG_DIR is set
//!
//! Usage:
//!   cargo run --bin dev_backend      # local backend on :8080
//!   cargo run --bin catalog_admin    # then log in as admin@example.com

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use catalog_admin::api::HttpCatalogApi;
use catalog_admin::config::AppConfig;
use catalog_admin::logging::init_tracing;
use catalog_admin::models::ImageFile;
use catalog_admin::pages::{initial_route, Dashboard, LoginPage, RegisterPage};
use catalog_admin::session::SessionStore;
use catalog_admin::terminal::{read_line, read_with_default, remember, render_dashboard, TerminalUi};
use catalog_admin::ui::{AppContext, Route};

type ShellResult<T> = Result<T, Box<dyn std::error::Error>>;

const HELP: &str = "\
Commands:
  new            create a product
  edit <id>      edit a product in place
  delete <id>    delete a product (asks first)
  refresh        reload the product list
  logout         end the session
  help           show this text
  quit           leave the shell";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let _guard = init_tracing(&config);

    let ui = Arc::new(TerminalUi::new());
    let session = SessionStore::open(&config.session_path())?;
    let ctx = AppContext::new(Arc::new(HttpCatalogApi::new(&config.api_url)), session, ui.clone());
    info!(api = %config.api_url, "catalog_admin starting");

    let mut route = initial_route(&ctx.session);
    loop {
        let next = match route {
            Route::Login => login_screen(&ctx, &ui).await?,
            Route::Register => register_screen(&ctx).await?,
            Route::Dashboard => dashboard_screen(&ctx, &ui).await?,
        };
        match next {
            Some(r) => route = r,
            None => break,
        }
    }

    println!("Bye.");
    Ok(())
}

/// `None` means the user asked to leave (or stdin closed).
async fn login_screen(ctx: &AppContext, ui: &TerminalUi) -> ShellResult<Option<Route>> {
    println!("\n== Login ==  (enter 'register' to sign up, 'quit' to exit)");
    let Some(email) = read_line("Email: ")? else {
        return Ok(None);
    };
    match email.trim() {
        "quit" | "exit" => return Ok(None),
        "register" => return Ok(Some(Route::Register)),
        _ => {}
    }
    let Some(password) = read_line("Password: ")? else {
        return Ok(None);
    };

    let mut page = LoginPage::new(ctx.clone());
    if page.submit(email.trim(), &password).await {
        return Ok(Some(ui.take_route().unwrap_or(Route::Dashboard)));
    }
    if let Some(error) = page.error() {
        println!("{}", error);
    }
    Ok(Some(Route::Login))
}

async fn register_screen(ctx: &AppContext) -> ShellResult<Option<Route>> {
    println!("\n== Register ==  (enter 'login' to go back)");
    let Some(full_name) = read_line("Full name: ")? else {
        return Ok(None);
    };
    if full_name.trim() == "login" {
        return Ok(Some(Route::Login));
    }
    let Some(email) = read_line("Email: ")? else {
        return Ok(None);
    };
    let Some(password) = read_line("Password: ")? else {
        return Ok(None);
    };

    let mut page = RegisterPage::new(ctx.clone());
    let registered = page.submit(full_name.trim(), email.trim(), &password).await;
    if let Some(text) = page.message().or(page.error()) {
        println!("{}", text);
    }
    Ok(Some(if registered { Route::Login } else { Route::Register }))
}

async fn dashboard_screen(ctx: &AppContext, ui: &TerminalUi) -> ShellResult<Option<Route>> {
    let mut dashboard = Dashboard::new(ctx.clone());
    if !dashboard.mount().await {
        return Ok(Some(ui.take_route().unwrap_or(Route::Login)));
    }
    println!("\n{}\n{}", render_dashboard(&dashboard), HELP);

    loop {
        let Some(line) = read_line("> ")? else {
            return Ok(None);
        };
        if !line.trim().is_empty() {
            remember(line.trim());
        }
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("help"), _) => {
                println!("{}", HELP);
                continue;
            }
            (Some("quit" | "exit"), _) => return Ok(None),
            (Some("new"), _) => create_product(&mut dashboard).await?,
            (Some("edit"), Some(id)) => match id.parse() {
                Ok(id) => edit_product(&mut dashboard, id).await?,
                Err(_) => println!("Not a product id: {}", id),
            },
            (Some("delete"), Some(id)) => match id.parse() {
                Ok(id) => {
                    if let Err(e) = dashboard.list_mut().delete(id).await {
                        debug!(error = %e, "Delete did not complete");
                    }
                }
                Err(_) => println!("Not a product id: {}", id),
            },
            (Some("refresh" | "list"), _) => dashboard.list_mut().refresh().await,
            (Some("logout"), _) => dashboard.logout(),
            _ => {
                println!("Unknown command, type 'help'");
                continue;
            }
        }

        dashboard.sync().await;
        if let Some(route) = ui.take_route() {
            return Ok(Some(route));
        }
        println!("{}", render_dashboard(&dashboard));
    }
}

async fn create_product(dashboard: &mut Dashboard) -> ShellResult<()> {
    println!("New product (blank price or stock means 0)");
    let form = dashboard.form_mut();
    let Some(description) = read_with_default("Description", &form.draft().description)? else {
        return Ok(());
    };
    let Some(price) = read_with_default("Price", &form.draft().price)? else {
        return Ok(());
    };
    let Some(stock) = read_with_default("Stock", &form.draft().stock)? else {
        return Ok(());
    };
    let Some(image_url) = read_line("Image URL (optional): ")? else {
        return Ok(());
    };
    let Some(file) = read_line("Image file path (optional, replaces the URL): ")? else {
        return Ok(());
    };

    {
        let draft = form.draft_mut();
        draft.description = description;
        draft.price = price;
        draft.stock = stock;
        draft.image_url = image_url;
    }
    form.clear_file();
    if !file.trim().is_empty() {
        if let Err(e) = form.attach_file(Path::new(file.trim())).await {
            println!("Cannot read image file: {}", e);
            return Ok(());
        }
        if let Some(preview) = form.preview() {
            println!("Selected {}", preview);
        }
    }

    if let Err(e) = form.submit().await {
        debug!(error = %e, "Create did not complete");
    }
    Ok(())
}

async fn edit_product(dashboard: &mut Dashboard, id: u64) -> ShellResult<()> {
    let list = dashboard.list_mut();
    if !list.start_edit(id) {
        println!("No product #{} in the list", id);
        return Ok(());
    }
    let Some(current) = list.edit_draft().cloned() else {
        return Ok(());
    };

    println!("Editing product #{} (blank keeps the current value)", id);
    let Some(description) = read_with_default("Description", &current.description)? else {
        list.cancel_edit();
        return Ok(());
    };
    let Some(price) = read_with_default("Price", &current.price)? else {
        list.cancel_edit();
        return Ok(());
    };
    let Some(stock) = read_with_default("Stock", &current.stock)? else {
        list.cancel_edit();
        return Ok(());
    };
    let Some(image_url) = read_with_default("Image URL", &current.image_url)? else {
        list.cancel_edit();
        return Ok(());
    };
    let Some(file) = read_line("New image file (optional): ")? else {
        list.cancel_edit();
        return Ok(());
    };

    if let Some(draft) = list.edit_draft_mut() {
        draft.description = description;
        draft.price = price;
        draft.stock = stock;
        draft.image_url = image_url;
    }
    if !file.trim().is_empty() {
        match ImageFile::from_path(Path::new(file.trim())).await {
            Ok(image) => {
                println!("Selected {}", image.preview());
                list.attach_edit_image(image);
            }
            Err(e) => {
                println!("Cannot read image file: {}", e);
                list.cancel_edit();
                return Ok(());
            }
        }
    }

    let Some(answer) = read_line("Save changes? [Y/n] ")? else {
        list.cancel_edit();
        return Ok(());
    };
    if matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no") {
        list.cancel_edit();
        return Ok(());
    }
    if let Err(e) = list.save_edit().await {
        debug!(error = %e, "Update did not complete");
    }
    Ok(())
}
