//! Batch queue: collect requests, run them sequentially.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use log::warn;
use std::sync::Arc;

use super::request::{self, RequestArgs};
use crate::api::{ApiClient, PendingRequest, VariableSet};
use crate::storage::{keys, BlobStore, HistoryEntry, RequestHistory};

#[derive(Subcommand)]
pub enum BatchCommands {
    /// Add a request to the queue
    Add(RequestArgs),
    /// List queued requests
    List,
    /// Empty the queue
    Clear,
    /// Execute the queue in order
    Run,
}

pub async fn handle(
    cmd: BatchCommands,
    client: &ApiClient,
    permanent: Arc<dyn BlobStore>,
) -> Result<()> {
    match cmd {
        BatchCommands::Add(args) => {
            let request = request::build_request(&args, &permanent)?;
            let mut queue = load_queue(&permanent);
            queue.push(request);
            save_queue(&permanent, &queue);
            println!(
                "{} Added to batch queue ({} queued)",
                "✓".bright_green().bold(),
                queue.len()
            );
            Ok(())
        }
        BatchCommands::List => {
            let queue = load_queue(&permanent);
            if queue.is_empty() {
                println!("{}", "Batch queue is empty".dimmed());
                return Ok(());
            }
            for (i, request) in queue.iter().enumerate() {
                println!(
                    "  {:>2}. {:<7} {}",
                    i + 1,
                    request.method.bright_yellow(),
                    request.url
                );
            }
            Ok(())
        }
        BatchCommands::Clear => {
            permanent.remove_blob(keys::BATCH_QUEUE);
            println!("{} Batch queue cleared", "✓".bright_green().bold());
            Ok(())
        }
        BatchCommands::Run => run_queue(client, permanent).await,
    }
}

async fn run_queue(client: &ApiClient, permanent: Arc<dyn BlobStore>) -> Result<()> {
    let queue = load_queue(&permanent);
    if queue.is_empty() {
        println!("{}", "Batch queue is empty".dimmed());
        return Ok(());
    }

    let variables = VariableSet::load(permanent.clone());
    let history = RequestHistory::new(permanent.clone());
    let total = queue.len();

    let results = client.execute_batch(&queue, variables.map()).await;

    let mut succeeded = 0;
    for (i, (request, result)) in queue.iter().zip(&results).enumerate() {
        println!();
        println!(
            "{} {} {}",
            format!("[{}/{}]", i + 1, total).bright_white().bold(),
            request.method.bright_yellow(),
            request.url
        );
        match result {
            Ok(result) => {
                if result.outcome.is_success() {
                    succeeded += 1;
                }
                request::print_result(result);
                history.add(HistoryEntry::new(
                    request.service_id.clone(),
                    request.method.clone(),
                    request.url.clone(),
                    result.outcome.status(),
                    result.duration_ms,
                ));
            }
            Err(e) => request::print_pipeline_error(e),
        }
    }

    println!();
    println!(
        "{} Batch completed: {}/{} successful",
        if succeeded == total { "✓".bright_green().bold() } else { "⚠".bright_yellow().bold() },
        succeeded,
        total
    );
    Ok(())
}

fn load_queue(store: &Arc<dyn BlobStore>) -> Vec<PendingRequest> {
    store
        .get_blob(keys::BATCH_QUEUE)
        .and_then(|raw| match serde_json::from_str(&raw) {
            Ok(queue) => Some(queue),
            Err(e) => {
                warn!("Discarding unreadable batch queue: {}", e);
                None
            }
        })
        .unwrap_or_default()
}

fn save_queue(store: &Arc<dyn BlobStore>, queue: &[PendingRequest]) {
    match serde_json::to_string(queue) {
        Ok(json) => store.set_blob(keys::BATCH_QUEUE, &json),
        Err(e) => warn!("Failed to serialize batch queue: {}", e),
    }
}
