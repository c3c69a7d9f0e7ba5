use anyhow::Context;
use mongodb::{bson::doc, options::ClientOptions, Client};
use shuttle_runtime::{SecretStore, Secrets};
use tracing::info;

mod config;
mod controllers;
pub mod models;
mod routes;
mod seat_map;
mod utils;

use config::AppConfig;

#[shuttle_runtime::main]
async fn main(#[Secrets] secret_store: SecretStore) -> shuttle_axum::ShuttleAxum {
    // Secrets come from `Secrets.toml`.
    let config = AppConfig::from_secrets(&secret_store)?;
    let allowed_origin = config.allowed_origin()?;

    let client_options = ClientOptions::parse(&config.mongodb_uri)
        .await
        .context("Failed to parse MONGODB_URI")?;
    let client =
        Client::with_options(client_options).context("Failed to initialize MongoDB client")?;
    let db = client.database(&config.database_name);

    db.run_command(doc! { "ping": 1 }, None)
        .await
        .context("Failed to reach MongoDB")?;
    info!(database = %config.database_name, "Connected to MongoDB");

    let app = routes::create_router(db, allowed_origin);

    Ok(app.into())
}
