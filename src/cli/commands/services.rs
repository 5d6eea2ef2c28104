//! Service catalog browser.

use anyhow::Result;
use colored::*;

use crate::services;

pub fn handle(service_id: Option<&str>) -> Result<()> {
    match service_id {
        Some(id) => show_service(id),
        None => {
            println!();
            println!("  {}", "Available services:".bright_white().bold());
            for service in services::catalog() {
                println!(
                    "  {:<12} {:<28} {}",
                    service.id.bright_yellow(),
                    service.name,
                    service.base_url.dimmed()
                );
            }
            println!();
            println!(
                "  {}",
                "Use `msrest-cli services <id>` to list endpoints.".dimmed()
            );
            Ok(())
        }
    }
}

fn show_service(id: &str) -> Result<()> {
    let service = services::find(id)
        .ok_or_else(|| anyhow::anyhow!("Unknown service '{}'; run `services` to list ids", id))?;

    println!();
    println!("  {} ({})", service.name.bright_white().bold(), service.id);
    println!("  Base URL: {}", service.base_url);
    println!("  Scope:    {}", service.auth_scope.dimmed());

    for category in &service.categories {
        println!();
        println!("  {}", category.name.bright_cyan().bold());
        for endpoint in &category.endpoints {
            println!(
                "    {:<7} {}",
                endpoint.method.bright_yellow(),
                endpoint.path
            );
            println!("            {}", endpoint.description.dimmed());
        }
    }
    Ok(())
}
