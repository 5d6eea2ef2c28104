//! Facade wiring the request pipeline together over shared stores.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::api::auth::TokenCache;
use crate::api::credentials::{Credential, CredentialStore};
use crate::api::executor::{ExecutionResult, PendingRequest, RequestExecutor};
use crate::api::resilience::{RateLimitStatus, RateLimitTracker, RetryConfig};
use crate::api::ApiError;
use crate::storage::{BlobStore, FileStore};

/// REST client over the service catalog with connection pooling.
///
/// Owns the credential store, token cache and rate-limit tracker; the CLI
/// builds exactly one of these per invocation.
pub struct ApiClient {
    http: reqwest::Client,
    credentials: CredentialStore,
    tokens: TokenCache,
    limits: RateLimitTracker,
    retry: RetryConfig,
}

impl ApiClient {
    /// Client backed by the default file stores.
    pub fn new() -> anyhow::Result<Self> {
        let session: Arc<dyn BlobStore> = Arc::new(FileStore::session());
        let permanent: Arc<dyn BlobStore> = Arc::new(FileStore::permanent()?);
        Ok(Self::with_stores(session, permanent))
    }

    pub fn with_stores(session: Arc<dyn BlobStore>, permanent: Arc<dyn BlobStore>) -> Self {
        let http = build_http_client();
        Self {
            credentials: CredentialStore::new(session, permanent.clone()),
            tokens: TokenCache::new(http.clone()),
            limits: RateLimitTracker::new(permanent),
            retry: RetryConfig::default(),
            http,
        }
    }

    /// Override the token authority and retry policy. Integration tests
    /// point both at loopback stubs.
    pub fn with_config(
        session: Arc<dyn BlobStore>,
        permanent: Arc<dyn BlobStore>,
        authority: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        let http = build_http_client();
        Self {
            credentials: CredentialStore::new(session, permanent.clone()),
            tokens: TokenCache::with_authority(http.clone(), authority),
            limits: RateLimitTracker::new(permanent),
            retry,
            http,
        }
    }

    /// Persist a credential. A successful save invalidates every cached
    /// token; a rejected one leaves both credential and tokens untouched.
    pub fn save_credentials(&self, credential: &Credential, remember: bool) -> Result<(), ApiError> {
        self.credentials.save(credential, remember)?;
        self.tokens.invalidate(None);
        Ok(())
    }

    pub fn clear_credentials(&self) {
        self.credentials.clear();
        self.tokens.invalidate(None);
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn limits(&self) -> &RateLimitTracker {
        &self.limits
    }

    pub fn rate_limit_status(&self, service_id: &str) -> Option<RateLimitStatus> {
        self.limits.status(service_id)
    }

    /// Execute a single request through the full pipeline.
    pub async fn execute(
        &self,
        request: &PendingRequest,
        vars: &BTreeMap<String, String>,
    ) -> Result<ExecutionResult, ApiError> {
        self.executor().execute(request, vars).await
    }

    /// Execute queued requests strictly one at a time, so admission checks
    /// stay accurate across the batch. Each item's error is captured, not
    /// propagated; one exhausted rate limit must not abort the rest.
    pub async fn execute_batch(
        &self,
        requests: &[PendingRequest],
        vars: &BTreeMap<String, String>,
    ) -> Vec<Result<ExecutionResult, ApiError>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.execute(request, vars).await);
        }
        results
    }

    fn executor(&self) -> RequestExecutor<'_> {
        RequestExecutor {
            http: &self.http,
            tokens: &self.tokens,
            limits: &self.limits,
            credentials: &self.credentials,
            retry: &self.retry,
        }
    }
}

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent("msrest-cli/0.1")
        .build()
        .expect("Failed to build HTTP client")
}
