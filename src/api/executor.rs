//! Request execution pipeline: admission, authentication, template
//! resolution, the HTTP call itself, and the bounded retry loop.

use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::time::sleep;

use crate::api::auth::TokenCache;
use crate::api::credentials::CredentialStore;
use crate::api::resilience::{RateLimitTracker, RetryConfig};
use crate::api::variables;
use crate::api::ApiError;
use crate::services::{Environment, Service};

/// One request as configured by the operator, before variable resolution.
/// Lives only for the duration of a single `execute` call (including its
/// retry chain); queued batch items are stored in this shape too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub service_id: String,
    pub auth_scope: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub retry_enabled: bool,
}

impl PendingRequest {
    /// Build a request against a cataloged service, applying the selected
    /// environment's hostname convention to the base URL.
    pub fn for_service(
        service: &Service,
        environment: Environment,
        method: &str,
        path: &str,
    ) -> Self {
        Self {
            service_id: service.id.to_string(),
            auth_scope: service.auth_scope.to_string(),
            method: method.to_uppercase(),
            url: format!("{}{}", environment.apply(service.base_url), path),
            headers: Vec::new(),
            body: None,
            retry_enabled: false,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.retry_enabled = enabled;
        self
    }

    fn sends_body(&self) -> bool {
        matches!(self.method.as_str(), "POST" | "PUT" | "PATCH")
    }
}

/// Response body, parsed as JSON when the server declared it as such.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// What the last attempt produced.
#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    /// The request reached the server. Anything outside 2xx-3xx is a
    /// failure, but still carries the status and body back to the caller.
    Http { status: u16, body: ResponseBody },
    /// The request never got an HTTP response.
    Transport { message: String },
}

impl ResponseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Http { status, .. } if (200..400).contains(status))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub outcome: ResponseOutcome,
    /// Total attempts made, including the initial one.
    pub attempts: u32,
    /// Elapsed time of the final attempt.
    pub duration_ms: u64,
}

/// Drives one request through admission, auth, send and retry. Borrows all
/// of its collaborators; holds no state of its own between calls.
pub struct RequestExecutor<'a> {
    pub(crate) http: &'a reqwest::Client,
    pub(crate) tokens: &'a TokenCache,
    pub(crate) limits: &'a RateLimitTracker,
    pub(crate) credentials: &'a CredentialStore,
    pub(crate) retry: &'a RetryConfig,
}

impl RequestExecutor<'_> {
    /// Execute a request end to end.
    ///
    /// HTTP failures and transport errors come back as an `Ok` result so
    /// the caller always sees the last status/body; the `Err` side is
    /// reserved for conditions that prevented the request from being sent
    /// at all (admission, auth, validation).
    pub async fn execute(
        &self,
        request: &PendingRequest,
        vars: &BTreeMap<String, String>,
    ) -> Result<ExecutionResult, ApiError> {
        // Admission first: no network traffic, no retry, when a window is
        // exhausted.
        if let Some(status) = self.limits.status(&request.service_id) {
            if status.exhausted() {
                warn!("Admission denied for {}: rate limit exhausted", request.service_id);
                return Err(ApiError::RateLimited {
                    service: request.service_id.clone(),
                    status,
                });
            }
        }

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ApiError::Validation(format!("unsupported HTTP method '{}'", request.method)))?;

        let url = variables::resolve(&request.url, vars);
        let body = self.resolve_body(request, vars)?;

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;

            // Re-fetched each cycle; a still-valid cached token comes back
            // without a network call. Auth errors propagate, never retried
            // here.
            let token = self
                .tokens
                .get_token(self.credentials, &request.auth_scope)
                .await?;

            debug!("{} {} (attempt {})", method, url, attempts);
            let started = Instant::now();
            let outcome = self
                .send_once(&method, &url, request, &token, body.as_ref())
                .await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            let result = ExecutionResult {
                outcome,
                attempts,
                duration_ms,
            };

            if result.outcome.is_success() {
                info!(
                    "{} {} -> {} in {}ms",
                    method,
                    url,
                    result.outcome.status().unwrap_or(0),
                    duration_ms
                );
                return Ok(result);
            }

            let retries_done = attempts - 1;
            if !request.retry_enabled || retries_done >= self.retry.max_retries {
                return Ok(result);
            }

            let delay = self.retry.delay_after(retries_done);
            match &result.outcome {
                ResponseOutcome::Http { status, .. } => {
                    warn!("Request failed with status {}, retrying in {:?}", status, delay)
                }
                ResponseOutcome::Transport { message } => {
                    warn!("Request error: {}, retrying in {:?}", message, delay)
                }
            }
            sleep(delay).await;
        }
    }

    fn resolve_body(
        &self,
        request: &PendingRequest,
        vars: &BTreeMap<String, String>,
    ) -> Result<Option<Value>, ApiError> {
        let Some(template) = request.body.as_deref().filter(|b| !b.trim().is_empty()) else {
            return Ok(None);
        };
        if !request.sends_body() {
            return Ok(None);
        }
        let resolved = variables::resolve(template, vars);
        let value =
            serde_json::from_str(&resolved).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
        Ok(Some(value))
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        request: &PendingRequest,
        token: &str,
        body: Option<&Value>,
    ) -> Result<ResponseOutcome, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &request.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Skipping invalid custom header '{}'", name),
            }
        }
        // Applied last so a custom header cannot clobber it.
        let bearer = HeaderValue::try_from(format!("Bearer {}", token))
            .map_err(|_| ApiError::AuthRejected {
                reason: "access token contains invalid characters".to_string(),
            })?;
        headers.insert(AUTHORIZATION, bearer);

        let mut builder = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }

        match builder.send().await {
            Ok(response) => {
                // The request consumed API quota whatever the status was.
                self.limits.record(&request.service_id);

                let status = response.status().as_u16();
                let declares_json = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|ct| ct.contains("application/json"))
                    .unwrap_or(false);

                match response.text().await {
                    Ok(text) => {
                        let body = if declares_json {
                            serde_json::from_str(&text)
                                .map(ResponseBody::Json)
                                .unwrap_or(ResponseBody::Text(text))
                        } else {
                            ResponseBody::Text(text)
                        };
                        Ok(ResponseOutcome::Http { status, body })
                    }
                    Err(e) => Ok(ResponseOutcome::Transport {
                        message: format!("failed to read response body: {}", e),
                    }),
                }
            }
            Err(e) => Ok(ResponseOutcome::Transport {
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services;

    #[test]
    fn for_service_applies_environment_and_path() {
        let service = services::find("powerbi").unwrap();
        let request =
            PendingRequest::for_service(service, Environment::Dev, "get", "/dashboards");

        assert_eq!(request.method, "GET");
        assert_eq!(
            request.url,
            "https://api.powerbi-dev.com/v1.0/myorg/dashboards"
        );
        assert_eq!(request.auth_scope, service.auth_scope);
        assert!(!request.retry_enabled);
    }

    #[test]
    fn body_only_sent_for_mutating_methods() {
        let service = services::find("graph").unwrap();
        let get = PendingRequest::for_service(service, Environment::Prod, "GET", "/users");
        assert!(!get.sends_body());
        for method in ["POST", "PUT", "PATCH"] {
            let req = PendingRequest::for_service(service, Environment::Prod, method, "/users");
            assert!(req.sends_body());
        }
    }

    #[test]
    fn success_covers_2xx_and_3xx() {
        for status in [200u16, 201, 204, 302, 304] {
            let outcome = ResponseOutcome::Http {
                status,
                body: ResponseBody::Text(String::new()),
            };
            assert!(outcome.is_success(), "{} should be success", status);
        }
        for status in [199u16, 400, 404, 500, 503] {
            let outcome = ResponseOutcome::Http {
                status,
                body: ResponseBody::Text(String::new()),
            };
            assert!(!outcome.is_success(), "{} should be failure", status);
        }
        assert!(!ResponseOutcome::Transport {
            message: "refused".into()
        }
        .is_success());
    }
}
