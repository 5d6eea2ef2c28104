//! Service-principal credential storage and validation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::ApiError;
use crate::storage::{keys, BlobStore};

static GUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}$")
        .unwrap()
});

const MIN_SECRET_LEN: usize = 10;

/// A single service-principal credential tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl Credential {
    /// Format validation: tenant and client ids must be dashed GUIDs, the
    /// secret must carry at least 10 characters.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !GUID_RE.is_match(&self.tenant_id) {
            return Err(ApiError::Validation(format!(
                "tenant id '{}' is not a valid GUID",
                self.tenant_id
            )));
        }
        if !GUID_RE.is_match(&self.client_id) {
            return Err(ApiError::Validation(format!(
                "client id '{}' is not a valid GUID",
                self.client_id
            )));
        }
        if self.client_secret.len() < MIN_SECRET_LEN {
            return Err(ApiError::Validation(format!(
                "client secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(())
    }

    /// Read credential fields from `MSREST_*` environment variables.
    pub fn from_env() -> anyhow::Result<Credential> {
        info!("Importing credentials from environment variables");

        let tenant_id = std::env::var("MSREST_TENANT_ID")
            .map_err(|_| anyhow::anyhow!("MSREST_TENANT_ID environment variable not set"))?;
        let client_id = std::env::var("MSREST_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("MSREST_CLIENT_ID environment variable not set"))?;
        let client_secret = std::env::var("MSREST_CLIENT_SECRET")
            .map_err(|_| anyhow::anyhow!("MSREST_CLIENT_SECRET environment variable not set"))?;
        let subscription_id = std::env::var("MSREST_SUBSCRIPTION_ID").ok();

        Ok(Credential {
            tenant_id,
            client_id,
            client_secret,
            subscription_id,
        })
    }
}

/// Owns the one credential tuple the tool knows about.
///
/// A "remember" flag picks the backing store: session-scoped by default,
/// permanent when the operator opts in. Stored blobs are base64-obfuscated,
/// which keeps secrets out of casual `cat` output and nothing more.
pub struct CredentialStore {
    session: Arc<dyn BlobStore>,
    permanent: Arc<dyn BlobStore>,
}

impl CredentialStore {
    pub fn new(session: Arc<dyn BlobStore>, permanent: Arc<dyn BlobStore>) -> Self {
        Self { session, permanent }
    }

    /// Validate and persist. Nothing previously stored is touched unless
    /// validation passes.
    pub fn save(&self, credential: &Credential, remember: bool) -> Result<(), ApiError> {
        credential.validate()?;

        let blob = obfuscate(credential);
        if remember {
            self.permanent.set_blob(keys::REMEMBER, "true");
            self.permanent.set_blob(keys::CREDENTIALS, &blob);
            self.session.remove_blob(keys::CREDENTIALS);
        } else {
            self.permanent.remove_blob(keys::REMEMBER);
            self.session.set_blob(keys::CREDENTIALS, &blob);
            self.permanent.remove_blob(keys::CREDENTIALS);
        }
        info!("Credentials saved ({})", if remember { "permanent" } else { "session" });
        Ok(())
    }

    /// Session store wins over the permanent one, matching save semantics.
    pub fn load(&self) -> Option<Credential> {
        let raw = self
            .session
            .get_blob(keys::CREDENTIALS)
            .or_else(|| self.permanent.get_blob(keys::CREDENTIALS))?;
        deobfuscate(&raw)
    }

    /// True iff a stored credential exists and passes format validation.
    pub fn is_complete(&self) -> bool {
        self.load().map(|c| c.validate().is_ok()).unwrap_or(false)
    }

    pub fn remembered(&self) -> bool {
        self.permanent.get_blob(keys::REMEMBER).as_deref() == Some("true")
    }

    pub fn clear(&self) {
        self.session.remove_blob(keys::CREDENTIALS);
        self.permanent.remove_blob(keys::CREDENTIALS);
        self.permanent.remove_blob(keys::REMEMBER);
        info!("Credentials cleared");
    }
}

fn obfuscate(credential: &Credential) -> String {
    // Serialization of this struct cannot fail.
    let json = serde_json::to_string(credential).unwrap_or_default();
    BASE64.encode(json)
}

fn deobfuscate(raw: &str) -> Option<Credential> {
    if let Ok(bytes) = BASE64.decode(raw) {
        if let Ok(credential) = serde_json::from_slice(&bytes) {
            return Some(credential);
        }
    }
    // Plain-JSON fallback for blobs written before obfuscation existed.
    match serde_json::from_str(raw) {
        Ok(credential) => Some(credential),
        Err(_) => {
            warn!("Stored credential blob is unreadable; treating as absent");
            None
        }
    }
}
