//! Single request execution.

use anyhow::Result;
use clap::Args;
use colored::*;
use std::sync::Arc;

use super::env;
use crate::api::{
    ApiClient, ApiError, ExecutionResult, PendingRequest, ResponseBody, ResponseOutcome,
    VariableSet,
};
use crate::services;
use crate::storage::{BlobStore, HistoryEntry, RequestHistory};

#[derive(Args, Clone)]
pub struct RequestArgs {
    /// Service id (e.g. graph, powerbi)
    pub service: String,
    /// Endpoint path; may contain {{variables}}
    pub path: String,
    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,
    /// JSON request body for POST/PUT/PATCH; may contain {{variables}}
    #[arg(long)]
    pub body: Option<String>,
    /// Custom header as NAME:VALUE; repeatable
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
    /// Retry failed requests with backoff
    #[arg(long)]
    pub retry: bool,
}

/// Turn CLI arguments into a pipeline request.
pub fn build_request(args: &RequestArgs, store: &Arc<dyn BlobStore>) -> Result<PendingRequest> {
    let service = services::find(&args.service).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown service '{}'; run `services` to list ids",
            args.service
        )
    })?;

    let environment = env::current(store);
    let mut request =
        PendingRequest::for_service(service, environment, &args.method, &args.path)
            .with_retry(args.retry);

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Header '{}' is not NAME:VALUE", header))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(body) = &args.body {
        request = request.with_body(body.clone());
    }
    Ok(request)
}

pub async fn handle(
    args: RequestArgs,
    client: &ApiClient,
    permanent: Arc<dyn BlobStore>,
) -> Result<()> {
    let request = build_request(&args, &permanent)?;
    let variables = VariableSet::load(permanent.clone());

    match client.execute(&request, variables.map()).await {
        Ok(result) => {
            print_result(&result);
            let history = RequestHistory::new(permanent);
            history.add(HistoryEntry::new(
                request.service_id.clone(),
                request.method.clone(),
                request.url.clone(),
                result.outcome.status(),
                result.duration_ms,
            ));
            Ok(())
        }
        Err(e) => {
            // Rate-limit details are worth more than the one-line error.
            if let ApiError::RateLimited { status, .. } = &e {
                for window in &status.windows {
                    println!(
                        "  {}/{} ({:.0}%)  {}",
                        window.used,
                        window.limit,
                        window.percentage,
                        window.description.dimmed()
                    );
                }
            }
            Err(e.into())
        }
    }
}

pub fn print_result(result: &ExecutionResult) {
    match &result.outcome {
        ResponseOutcome::Http { status, body } => {
            let label = format!("HTTP {}", status);
            let label = if result.outcome.is_success() {
                label.bright_green().bold()
            } else {
                label.bright_red().bold()
            };
            println!(
                "{}  {}ms  {} attempt(s)",
                label,
                result.duration_ms,
                result.attempts
            );
            match body {
                ResponseBody::Json(value) => match serde_json::to_string_pretty(value) {
                    Ok(pretty) => println!("{}", pretty),
                    Err(_) => println!("{}", value),
                },
                ResponseBody::Text(text) if text.is_empty() => {}
                ResponseBody::Text(text) => println!("{}", text),
            }
        }
        ResponseOutcome::Transport { message } => {
            println!(
                "{}  after {} attempt(s): {}",
                "Request failed".bright_red().bold(),
                result.attempts,
                message
            );
        }
    }
}

pub fn print_pipeline_error(error: &ApiError) {
    match error {
        ApiError::RateLimited { status, .. } => {
            println!(
                "{}",
                format!("⚠ Rate limit exceeded for {}", status.name)
                    .bright_red()
                    .bold()
            );
            for window in &status.windows {
                println!(
                    "  {}/{} ({:.0}%)  {}",
                    window.used,
                    window.limit,
                    window.percentage,
                    window.description.dimmed()
                );
            }
        }
        ApiError::MissingCredentials => {
            println!(
                "{}",
                "⚠ No credentials configured; run `msrest-cli auth set` first"
                    .bright_yellow()
                    .bold()
            );
        }
        other => {
            println!("{} {}", "✗".bright_red().bold(), other);
        }
    }
}
