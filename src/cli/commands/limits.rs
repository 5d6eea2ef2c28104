//! Rate-limit usage display.

use anyhow::Result;
use colored::*;

use crate::api::ApiClient;
use crate::services;

pub fn handle(service_id: Option<&str>, client: &ApiClient) -> Result<()> {
    match service_id {
        Some(id) => {
            services::find(id)
                .ok_or_else(|| anyhow::anyhow!("Unknown service '{}'", id))?;
            show_service(id, client);
            Ok(())
        }
        None => {
            for service in services::catalog() {
                show_service(service.id, client);
            }
            Ok(())
        }
    }
}

fn show_service(service_id: &str, client: &ApiClient) {
    let Some(status) = client.rate_limit_status(service_id) else {
        println!("  {:<12} {}", service_id.bright_yellow(), "unlimited".dimmed());
        return;
    };

    println!();
    println!("  {}", status.name.bright_white().bold());
    for window in &status.windows {
        let usage = format!(
            "{}/{} ({:.0}%)",
            window.used, window.limit, window.percentage
        );
        let usage = if window.danger {
            usage.bright_red().bold()
        } else if window.warning {
            usage.bright_yellow()
        } else {
            usage.bright_green()
        };
        println!("    {:<22} {}", usage, window.description.dimmed());

        if window.used > 0 {
            if let Some(reset) = client.limits().reset_time(service_id, window.window_seconds) {
                println!(
                    "    {}",
                    format!("window resets {}", reset.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
                );
            }
        }
    }
}
