//! Credential management commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;

use crate::api::{ApiClient, Credential};

#[derive(Args)]
pub struct AuthCommands {
    #[command(subcommand)]
    pub command: AuthSubcommands,
}

#[derive(Subcommand)]
pub enum AuthSubcommands {
    /// Save service principal credentials
    Set {
        /// Azure AD tenant GUID
        #[arg(long)]
        tenant_id: Option<String>,
        /// Application (client) GUID
        #[arg(long)]
        client_id: Option<String>,
        /// Client secret; prompted for when omitted
        #[arg(long)]
        client_secret: Option<String>,
        /// Azure subscription id, used by ARM endpoints
        #[arg(long)]
        subscription_id: Option<String>,
        /// Read all fields from MSREST_* environment variables
        #[arg(long)]
        from_env: bool,
        /// Persist across sessions instead of session-only
        #[arg(long)]
        remember: bool,
    },
    /// Display credential status
    Status,
    /// Remove stored credentials and cached tokens
    Clear,
}

pub async fn handle(cmd: AuthCommands, client: &ApiClient) -> Result<()> {
    match cmd.command {
        AuthSubcommands::Set {
            tenant_id,
            client_id,
            client_secret,
            subscription_id,
            from_env,
            remember,
        } => {
            let credential = if from_env {
                Credential::from_env()?
            } else {
                let tenant_id = tenant_id
                    .ok_or_else(|| anyhow::anyhow!("--tenant-id required (or use --from-env)"))?;
                let client_id = client_id
                    .ok_or_else(|| anyhow::anyhow!("--client-id required (or use --from-env)"))?;
                let client_secret = match client_secret {
                    Some(secret) => secret,
                    None => rpassword::prompt_password("Client secret: ")?,
                };
                Credential {
                    tenant_id,
                    client_id,
                    client_secret,
                    subscription_id,
                }
            };

            client.save_credentials(&credential, remember)?;
            println!(
                "{} Credentials saved ({})",
                "✓".bright_green().bold(),
                if remember { "remembered" } else { "this session only" }
            );
            Ok(())
        }
        AuthSubcommands::Status => {
            match client.credentials().load() {
                Some(credential) if credential.validate().is_ok() => {
                    println!("{}", "Credentials configured".bright_green().bold());
                    println!("  Tenant:       {}", credential.tenant_id);
                    println!("  Client:       {}", credential.client_id);
                    println!("  Secret:       {}", "********".dimmed());
                    if let Some(sub) = &credential.subscription_id {
                        println!("  Subscription: {}", sub);
                    }
                    println!(
                        "  Storage:      {}",
                        if client.credentials().remembered() {
                            "permanent"
                        } else {
                            "session"
                        }
                    );
                }
                Some(_) => {
                    println!(
                        "{}",
                        "⚠ Stored credentials are malformed; run `auth set` again"
                            .bright_yellow()
                            .bold()
                    );
                }
                None => {
                    println!("{}", "⚠ No credentials configured".bright_yellow().bold());
                    println!("  {}", "Run `msrest-cli auth set` to get started.".dimmed());
                }
            }
            Ok(())
        }
        AuthSubcommands::Clear => {
            client.clear_credentials();
            println!("{} Credentials cleared", "✓".bright_green().bold());
            Ok(())
        }
    }
}
