//! Development backend for the catalog admin client
//!
//! Serves the /api/products and /api/auth contract from memory, seeded with:
//! - five sample products
//! - the administrator account admin@example.com / admin123
//! Run: cargo run --bin dev_backend
//! Address: DEV_BACKEND_ADDR (default 0.0.0.0:8080). Data is lost on exit.

use catalog_admin::config::AppConfig;
use catalog_admin::dev_backend::DevBackend;
use catalog_admin::logging::init_tracing;
use std::env;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let _guard = init_tracing(&config);

    let addr = env::var("DEV_BACKEND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = TcpListener::bind(&addr).await?;

    let backend = DevBackend::seeded();
    println!("Catalog dev backend on {}", addr);
    println!("{} products loaded; admin login: admin@example.com / admin123", backend.products().len());

    tokio::select! {
        res = backend.serve(listener) => res?,
        _ = tokio::signal::ctrl_c() => println!("Shutting down..."),
    }
    Ok(())
}
