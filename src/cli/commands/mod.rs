use anyhow::Result;
use std::sync::Arc;

use super::{Cli, Commands};
use crate::api::ApiClient;
use crate::storage::BlobStore;

pub mod auth;
pub mod batch;
pub mod env;
pub mod history;
pub mod limits;
pub mod request;
pub mod services;
pub mod vars;

/// Dispatch a parsed command line.
pub async fn run(cli: Cli, client: &ApiClient, permanent: Arc<dyn BlobStore>) -> Result<()> {
    match cli.command {
        Commands::Auth(cmd) => auth::handle(cmd, client).await,
        Commands::Services { service } => services::handle(service.as_deref()),
        Commands::Limits { service } => limits::handle(service.as_deref(), client),
        Commands::Env { environment } => env::handle(environment.as_deref(), &permanent),
        Commands::Vars(cmd) => vars::handle(cmd, permanent),
        Commands::Request(args) => request::handle(args, client, permanent).await,
        Commands::Batch(cmd) => batch::handle(cmd, client, permanent).await,
        Commands::History { clear } => history::handle(clear, permanent),
    }
}
