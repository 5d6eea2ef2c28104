//! Request history display.

use anyhow::Result;
use colored::*;
use std::sync::Arc;

use crate::storage::{BlobStore, RequestHistory};

pub fn handle(clear: bool, store: Arc<dyn BlobStore>) -> Result<()> {
    let history = RequestHistory::new(store);

    if clear {
        history.clear();
        println!("{} History cleared", "✓".bright_green().bold());
        return Ok(());
    }

    let entries = history.list();
    if entries.is_empty() {
        println!("{}", "No request history yet".dimmed());
        return Ok(());
    }

    for entry in entries {
        let status = match entry.status {
            Some(code) if (200..400).contains(&code) => code.to_string().bright_green(),
            Some(code) => code.to_string().bright_red(),
            None => "ERR".bright_red(),
        };
        println!(
            "  {}  {:>4}  {:<7} {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            status,
            entry.method.bright_yellow(),
            entry.url,
            format!("{}ms", entry.duration_ms).dimmed()
        );
    }
    Ok(())
}
