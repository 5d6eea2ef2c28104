//! OAuth2 client-credentials token acquisition and per-scope caching.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::credentials::CredentialStore;
use crate::api::ApiError;

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Tokens are treated as expired this long before the server-declared
/// lifetime runs out, absorbing clock skew and in-flight latency.
const EXPIRY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// At most one cached access token per scope string.
///
/// Entries are only ever replaced wholesale, never mutated. A race between
/// two callers on the same scope can acquire twice; the loser's insert just
/// overwrites with an equally fresh token.
pub struct TokenCache {
    http: reqwest::Client,
    authority: String,
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_authority(http, DEFAULT_AUTHORITY)
    }

    pub fn with_authority(http: reqwest::Client, authority: impl Into<String>) -> Self {
        Self {
            http,
            authority: authority.into(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached token for `scope` if still valid, otherwise acquire
    /// a fresh one.
    pub async fn get_token(
        &self,
        credentials: &CredentialStore,
        scope: &str,
    ) -> Result<String, ApiError> {
        if let Some(token) = self.cached_valid_at(scope, Utc::now()) {
            debug!("Using cached token for scope {}", scope);
            return Ok(token);
        }
        self.acquire(credentials, scope).await
    }

    /// Perform the client-credentials grant and cache the result.
    pub async fn acquire(
        &self,
        credentials: &CredentialStore,
        scope: &str,
    ) -> Result<String, ApiError> {
        let credential = credentials
            .load()
            .filter(|c| c.validate().is_ok())
            .ok_or(ApiError::MissingCredentials)?;

        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority, credential.tenant_id
        );
        debug!("Requesting token for scope {} from {}", scope, token_url);

        let response = self
            .http
            .post(&token_url)
            .form(&[
                ("client_id", credential.client_id.as_str()),
                ("client_secret", credential.client_secret.as_str()),
                ("scope", scope),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| ApiError::AuthNetwork(e.to_string()))?;

        let status = response.status();
        debug!("Token request status: {}", status);

        if !status.is_success() {
            let reason = match response.json::<Value>().await {
                Ok(body) => body
                    .get("error_description")
                    .and_then(|d| d.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(ApiError::AuthRejected { reason });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::AuthNetwork(e.to_string()))?;

        let access_token = body
            .get("access_token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ApiError::AuthRejected {
                reason: "no access token in response".to_string(),
            })?
            .to_string();

        let expires_in = body
            .get("expires_in")
            .and_then(|e| e.as_i64())
            .unwrap_or(3600);

        let token = CachedToken {
            value: access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(expires_in - EXPIRY_MARGIN_SECS),
        };
        self.tokens
            .lock()
            .unwrap()
            .insert(scope.to_string(), token);

        info!("Acquired token for scope {} (expires_in {}s)", scope, expires_in);
        Ok(access_token)
    }

    /// Drop one scope's entry, or every entry when `scope` is `None`.
    pub fn invalidate(&self, scope: Option<&str>) {
        let mut tokens = self.tokens.lock().unwrap();
        match scope {
            Some(scope) => {
                tokens.remove(scope);
            }
            None => tokens.clear(),
        }
    }

    fn cached_valid_at(&self, scope: &str, now: DateTime<Utc>) -> Option<String> {
        let tokens = self.tokens.lock().unwrap();
        tokens
            .get(scope)
            .filter(|t| now < t.expires_at)
            .map(|t| t.value.clone())
    }

    #[cfg(test)]
    fn insert(&self, scope: &str, token: CachedToken) {
        self.tokens
            .lock()
            .unwrap()
            .insert(scope.to_string(), token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::credentials::Credential;
    use crate::storage::{keys, BlobStore, MemoryStore};
    use std::sync::Arc;

    fn cache() -> TokenCache {
        TokenCache::new(reqwest::Client::new())
    }

    fn empty_store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn acquire_without_credentials_fails() {
        let cache = cache();
        let err = cache.get_token(&empty_store(), "scope").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingCredentials));
    }

    #[tokio::test]
    async fn acquire_with_invalid_stored_credential_fails() {
        // Bypass save() validation by writing the blob directly.
        let bad = Credential {
            tenant_id: "not-a-guid".into(),
            client_id: "also-not-a-guid".into(),
            client_secret: "long-enough-secret".into(),
            subscription_id: None,
        };
        let session = Arc::new(MemoryStore::new());
        session.set_blob(keys::CREDENTIALS, &serde_json::to_string(&bad).unwrap());
        let store = CredentialStore::new(session, Arc::new(MemoryStore::new()));

        let err = cache().get_token(&store, "scope").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingCredentials));
    }

    #[test]
    fn token_expiry_honors_safety_margin() {
        let cache = cache();
        let grant_time = Utc::now();
        // A 3600s grant is usable for 3300s only.
        cache.insert(
            "scope",
            CachedToken {
                value: "tok".into(),
                expires_at: grant_time + Duration::seconds(3600 - 300),
            },
        );

        let just_before = grant_time + Duration::seconds(3299);
        let just_after = grant_time + Duration::seconds(3301);
        assert_eq!(
            cache.cached_valid_at("scope", just_before).as_deref(),
            Some("tok")
        );
        assert_eq!(cache.cached_valid_at("scope", just_after), None);
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let cache = cache();
        let expires_at = Utc::now() + Duration::seconds(100);
        cache.insert(
            "scope",
            CachedToken {
                value: "tok".into(),
                expires_at,
            },
        );
        // Validity requires now strictly before expires_at.
        assert_eq!(cache.cached_valid_at("scope", expires_at), None);
    }

    #[test]
    fn scopes_do_not_collide() {
        let cache = cache();
        let later = Utc::now() + Duration::seconds(1000);
        cache.insert(
            "https://graph.microsoft.com/.default",
            CachedToken {
                value: "graph-tok".into(),
                expires_at: later,
            },
        );
        cache.insert(
            "https://management.azure.com/.default",
            CachedToken {
                value: "arm-tok".into(),
                expires_at: later,
            },
        );

        let now = Utc::now();
        assert_eq!(
            cache
                .cached_valid_at("https://graph.microsoft.com/.default", now)
                .as_deref(),
            Some("graph-tok")
        );
        assert_eq!(
            cache
                .cached_valid_at("https://management.azure.com/.default", now)
                .as_deref(),
            Some("arm-tok")
        );
    }

    #[test]
    fn invalidate_single_scope_and_all() {
        let cache = cache();
        let later = Utc::now() + Duration::seconds(1000);
        for scope in ["a", "b"] {
            cache.insert(
                scope,
                CachedToken {
                    value: format!("{}-tok", scope),
                    expires_at: later,
                },
            );
        }

        cache.invalidate(Some("a"));
        let now = Utc::now();
        assert_eq!(cache.cached_valid_at("a", now), None);
        assert!(cache.cached_valid_at("b", now).is_some());

        cache.invalidate(None);
        assert_eq!(cache.cached_valid_at("b", now), None);
    }
}
