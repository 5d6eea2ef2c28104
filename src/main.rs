use anyhow::Result;
use clap::Parser;
use log::info;
use std::sync::Arc;

use msrest_cli::api::ApiClient;
use msrest_cli::cli::{commands, Cli};
use msrest_cli::storage::{BlobStore, FileStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up MSREST_* variables from a local .env, if any.
    dotenvy::dotenv().ok();

    // Log to file so stdout stays clean for response output.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("msrest-cli.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    info!("Starting msrest-cli");

    let session: Arc<dyn BlobStore> = Arc::new(FileStore::session());
    let permanent: Arc<dyn BlobStore> = Arc::new(FileStore::permanent()?);
    let client = ApiClient::with_stores(session, permanent.clone());

    commands::run(cli, &client, permanent).await
}
