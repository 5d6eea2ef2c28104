//! Sliding-window rate-limit tracking per service.
//!
//! Keeps an append-only log of request timestamps per service and evaluates
//! it against the documented limit windows. The log is persisted on every
//! record so usage survives restarts; entries older than 24 hours (the
//! longest window any service declares) are pruned as they age out.

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::services::ratelimits;
use crate::storage::{keys, BlobStore};

/// Longest window any service declares (24 hours), in milliseconds.
const RETENTION_MS: i64 = 86_400_000;

/// Derived usage snapshot for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub service: String,
    pub name: String,
    pub windows: Vec<WindowStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowStatus {
    pub used: u32,
    pub limit: u32,
    pub window_seconds: u64,
    /// Capped at 100 for display; admission checks compare against 100.
    pub percentage: f64,
    pub description: String,
    pub warning: bool,
    pub danger: bool,
}

impl RateLimitStatus {
    /// True when any window has no headroom left.
    pub fn exhausted(&self) -> bool {
        self.windows.iter().any(|w| w.percentage >= 100.0)
    }
}

/// Per-service request timestamp log with sliding-window admission checks.
#[derive(Clone)]
pub struct RateLimitTracker {
    requests: Arc<Mutex<HashMap<String, Vec<i64>>>>,
    store: Arc<dyn BlobStore>,
}

impl RateLimitTracker {
    /// Load the persisted log, dropping entries past the retention horizon.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        let mut requests: HashMap<String, Vec<i64>> = store
            .get_blob(keys::RATE_LIMITS)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!("Discarding unreadable rate-limit log: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        let horizon = Utc::now().timestamp_millis() - RETENTION_MS;
        for log in requests.values_mut() {
            log.retain(|&ts| ts > horizon);
        }

        Self {
            requests: Arc::new(Mutex::new(requests)),
            store,
        }
    }

    /// Append the current instant to the service's log and persist.
    pub fn record(&self, service_id: &str) {
        self.record_at(service_id, Utc::now().timestamp_millis());
    }

    pub(crate) fn record_at(&self, service_id: &str, timestamp_ms: i64) {
        let mut requests = self.requests.lock().unwrap();
        let log = requests.entry(service_id.to_string()).or_default();
        log.push(timestamp_ms);

        let horizon = timestamp_ms - RETENTION_MS;
        log.retain(|&ts| ts > horizon);

        debug!(
            "Recorded request for {} ({} entries in log)",
            service_id,
            log.len()
        );
        self.persist(&requests);
    }

    /// Count of requests within the trailing window. Pure read.
    pub fn usage(&self, service_id: &str, window_seconds: u64) -> u32 {
        self.usage_at(service_id, window_seconds, Utc::now().timestamp_millis())
    }

    fn usage_at(&self, service_id: &str, window_seconds: u64, now_ms: i64) -> u32 {
        let requests = self.requests.lock().unwrap();
        let Some(log) = requests.get(service_id) else {
            return 0;
        };
        let window_ms = window_seconds as i64 * 1000;
        log.iter().filter(|&&ts| now_ms - ts < window_ms).count() as u32
    }

    /// Usage across every declared window, or `None` for unlimited services.
    pub fn status(&self, service_id: &str) -> Option<RateLimitStatus> {
        self.status_at(service_id, Utc::now().timestamp_millis())
    }

    fn status_at(&self, service_id: &str, now_ms: i64) -> Option<RateLimitStatus> {
        let limits = ratelimits::limits_for(service_id)?;

        let windows = limits
            .limits
            .iter()
            .map(|limit| {
                let used = self.usage_at(service_id, limit.window_seconds, now_ms);
                let raw = used as f64 / limit.requests as f64 * 100.0;
                WindowStatus {
                    used,
                    limit: limit.requests,
                    window_seconds: limit.window_seconds,
                    percentage: raw.min(100.0),
                    description: limit.description.to_string(),
                    warning: raw > 80.0,
                    danger: raw > 95.0,
                }
            })
            .collect();

        Some(RateLimitStatus {
            service: service_id.to_string(),
            name: limits.name.to_string(),
            windows,
        })
    }

    /// Admission check. Every window must have headroom; services without
    /// declared limits always admit.
    pub fn can_admit(&self, service_id: &str) -> bool {
        self.can_admit_at(service_id, Utc::now().timestamp_millis())
    }

    fn can_admit_at(&self, service_id: &str, now_ms: i64) -> bool {
        match self.status_at(service_id, now_ms) {
            Some(status) => !status.exhausted(),
            None => true,
        }
    }

    /// Earliest instant at which the oldest logged request leaves the given
    /// window. `None` when nothing is logged.
    pub fn reset_time(&self, service_id: &str, window_seconds: u64) -> Option<DateTime<Utc>> {
        let requests = self.requests.lock().unwrap();
        let oldest = *requests.get(service_id)?.iter().min()?;
        Utc.timestamp_millis_opt(oldest + window_seconds as i64 * 1000)
            .single()
    }

    fn persist(&self, requests: &HashMap<String, Vec<i64>>) {
        match serde_json::to_string(requests) {
            Ok(json) => self.store.set_blob(keys::RATE_LIMITS, &json),
            Err(e) => warn!("Failed to serialize rate-limit log: {}", e),
        }
    }
}
