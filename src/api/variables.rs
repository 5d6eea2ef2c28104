//! `{{name}}` placeholder substitution for URLs and request bodies.

use log::warn;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::ApiError;
use crate::storage::{keys, BlobStore};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_-]+)\}\}").unwrap());

const MAX_NAME_LEN: usize = 100;
const MAX_VALUE_LEN: usize = 5000;

/// Substitute every `{{name}}` occurrence in `text` from `variables`.
///
/// Unresolved names stay verbatim so partially-filled templates survive.
/// The scan runs once over the input; substituted values are never
/// re-scanned, so a value containing `{{...}}` cannot loop.
pub fn resolve(text: &str, variables: &BTreeMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| {
            variables
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// User-defined variables, validated on write and persisted.
///
/// Validation lives here, at the creation boundary; [`resolve`] itself
/// accepts any mapping.
pub struct VariableSet {
    store: Arc<dyn BlobStore>,
    variables: BTreeMap<String, String>,
}

impl VariableSet {
    pub fn load(store: Arc<dyn BlobStore>) -> Self {
        let variables = store
            .get_blob(keys::VARIABLES)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!("Discarding unreadable variables blob: {}", e);
                    None
                }
            })
            .unwrap_or_default();
        Self { store, variables }
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ApiError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(ApiError::Validation(format!(
                "variable name '{}' may only contain letters, numbers, underscore and hyphen",
                name
            )));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ApiError::Validation(format!(
                "variable name too long (max {} characters)",
                MAX_NAME_LEN
            )));
        }
        if value.len() > MAX_VALUE_LEN {
            return Err(ApiError::Validation(format!(
                "variable value too long (max {} characters)",
                MAX_VALUE_LEN
            )));
        }

        self.variables.insert(name.to_string(), value.to_string());
        self.persist();
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.variables.remove(name).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    pub fn map(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn persist(&self) {
        match serde_json::to_string(&self.variables) {
            Ok(json) => self.store.set_blob(keys::VARIABLES, &json),
            Err(e) => warn!("Failed to serialize variables: {}", e),
        }
    }
}
