use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use catalog_admin::api::HttpCatalogApi;
use catalog_admin::auth::token_expiry;
use catalog_admin::config::AppConfig;
use catalog_admin::list::ProductList;
use catalog_admin::logging::init_tracing;
use catalog_admin::pages::{Dashboard, LoginPage, RegisterPage};
use catalog_admin::session::SessionStore;
use catalog_admin::terminal::{render_list, TerminalUi};
use catalog_admin::ui::{AppContext, RefreshBus};

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "One-shot commands for the catalog admin client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend origin (overrides CATALOG_API_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Session directory (overrides CATALOG_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(short = 'n', long)]
        full_name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    Whoami,
    List,
    Create {
        #[arg(short, long)]
        description: String,
        #[arg(short, long, default_value = "")]
        price: String,
        #[arg(short, long, default_value = "")]
        stock: String,
        #[arg(short, long, default_value = "")]
        image_url: String,
        /// Image to upload; its URL replaces --image-url
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    Update {
        #[arg(long)]
        id: u64,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        price: Option<String>,
        #[arg(short, long)]
        stock: Option<String>,
        #[arg(short, long)]
        image_url: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    Delete {
        #[arg(long)]
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(url) = &cli.url {
        config = config.with_api_url(url)?;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let _guard = init_tracing(&config);

    let assume_yes = matches!(cli.command, Commands::Delete { yes: true, .. });
    let ui = Arc::new(TerminalUi::new().assume_yes(assume_yes));
    let session = SessionStore::open(&config.session_path())?;
    let ctx = AppContext::new(Arc::new(HttpCatalogApi::new(&config.api_url)), session, ui);

    match cli.command {
        Commands::Register { full_name, email, password } => {
            let mut page = RegisterPage::new(ctx);
            let ok = page.submit(&full_name, &email, &password).await;
            if let Some(text) = page.message().or(page.error()) {
                println!("{}", text);
            }
            if !ok {
                return Err("registration failed".into());
            }
        }
        Commands::Login { email, password } => {
            let mut page = LoginPage::new(ctx.clone());
            if !page.submit(&email, &password).await {
                return Err(page.error().unwrap_or("Login failed").into());
            }
            if !ctx.session.is_admin() {
                println!("Note: {} is not an administrator; management commands will refuse.", email);
            }
        }
        Commands::Logout => {
            ctx.session.logout()?;
            println!("Logged out (session removed).");
        }
        Commands::Whoami => match ctx.session.get_session() {
            Some(session) => {
                println!("{} ({})", session.email, session.role);
                match token_expiry(&session.token) {
                    Some(at) if ctx.session.valid_token().is_none() => println!("Token expired at {}", at),
                    Some(at) => println!("Token valid until {}", at),
                    None => println!("Token has no expiry"),
                }
            }
            None => println!("Not logged in."),
        },
        Commands::List => {
            let mut list = ProductList::new(ctx, RefreshBus::new());
            list.refresh().await;
            print!("{}", render_list(&list));
            if let Some(error) = list.error() {
                return Err(error.to_string().into());
            }
        }
        Commands::Create { description, price, stock, image_url, file } => {
            let mut dashboard = admin_dashboard(ctx).await?;
            let form = dashboard.form_mut();
            {
                let draft = form.draft_mut();
                draft.description = description;
                draft.price = price;
                draft.stock = stock;
                draft.image_url = image_url;
            }
            if let Some(path) = file {
                form.attach_file(&path).await?;
            }
            if form.submit().await.is_err() {
                return Err(form.error().unwrap_or("Failed to create product").into());
            }
            dashboard.sync().await;
            print!("{}", render_list(dashboard.list()));
        }
        Commands::Update { id, description, price, stock, image_url, file } => {
            let mut dashboard = admin_dashboard(ctx).await?;
            let list = dashboard.list_mut();
            if !list.start_edit(id) {
                return Err(format!("No product #{}", id).into());
            }
            if let Some(draft) = list.edit_draft_mut() {
                if let Some(description) = description {
                    draft.description = description;
                }
                if let Some(price) = price {
                    draft.price = price;
                }
                if let Some(stock) = stock {
                    draft.stock = stock;
                }
                if let Some(image_url) = image_url {
                    draft.image_url = image_url;
                }
            }
            if let Some(path) = file {
                let image = catalog_admin::models::ImageFile::from_path(&path).await?;
                list.attach_edit_image(image);
            }
            if list.save_edit().await.is_err() {
                return Err(list.error().unwrap_or("Failed to update product").into());
            }
            dashboard.sync().await;
            print!("{}", render_list(dashboard.list()));
        }
        Commands::Delete { id, .. } => {
            let mut dashboard = admin_dashboard(ctx).await?;
            if dashboard.list_mut().delete(id).await? {
                dashboard.sync().await;
                println!("Deleted product #{}.", id);
            } else {
                println!("Cancelled.");
            }
        }
    }

    Ok(())
}

async fn admin_dashboard(ctx: AppContext) -> Result<Dashboard, Box<dyn std::error::Error>> {
    let mut dashboard = Dashboard::new(ctx);
    if !dashboard.mount().await {
        return Err("Please log in as an administrator first (catalog-cli login)".into());
    }
    Ok(dashboard)
}
