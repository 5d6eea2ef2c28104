use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "msrest-cli")]
#[command(about = "A command-line REST client for Microsoft cloud service APIs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Service principal credential management
    Auth(commands::auth::AuthCommands),
    /// Browse the service catalog
    Services {
        /// Service id to show in detail (e.g. graph, powerbi)
        service: Option<String>,
    },
    /// Show rate-limit usage per service
    Limits {
        /// Service id, or all services when omitted
        service: Option<String>,
    },
    /// Show or select the target environment (prod, dev, qa)
    Env {
        /// Environment to select; prints the current one when omitted
        environment: Option<String>,
    },
    /// Template variable management
    #[command(subcommand)]
    Vars(commands::vars::VarsCommands),
    /// Execute a request against a service API
    Request(commands::request::RequestArgs),
    /// Queue requests and run them sequentially
    #[command(subcommand)]
    Batch(commands::batch::BatchCommands),
    /// Request history
    History {
        /// Clear the stored history
        #[arg(long)]
        clear: bool,
    },
}
