//! Documented API rate limits per service.
//!
//! Sourced from each service's published throttling guidance. A service with
//! no entry here is treated as unlimited.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub requests: u32,
    pub window_seconds: u64,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub struct ServiceLimits {
    pub name: &'static str,
    pub docs: &'static str,
    pub limits: Vec<RateLimit>,
}

pub fn limits_for(service_id: &str) -> Option<&'static ServiceLimits> {
    LIMITS.get(service_id)
}

const fn limit(requests: u32, window_seconds: u64, description: &'static str) -> RateLimit {
    RateLimit {
        requests,
        window_seconds,
        description,
    }
}

static LIMITS: Lazy<HashMap<&'static str, ServiceLimits>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "powerbi",
        ServiceLimits {
            name: "Power BI",
            docs: "https://learn.microsoft.com/en-us/power-bi/developer/automation/api-automatic-retry-service-limits",
            limits: vec![
                limit(200, 3600, "200 requests per hour per user"),
                limit(1000, 86400, "1,000 requests per day per user"),
            ],
        },
    );
    m.insert(
        "purview",
        ServiceLimits {
            name: "Microsoft Purview",
            docs: "https://learn.microsoft.com/en-us/purview/catalog-api-rate-limits",
            limits: vec![
                limit(100, 60, "100 requests per minute"),
                limit(10000, 3600, "10,000 requests per hour"),
            ],
        },
    );
    m.insert(
        "azure",
        ServiceLimits {
            name: "Azure Resource Manager",
            docs: "https://learn.microsoft.com/en-us/azure/azure-resource-manager/management/request-limits-and-throttling",
            limits: vec![
                limit(12000, 3600, "12,000 read requests per hour"),
                limit(1200, 3600, "1,200 write requests per hour"),
            ],
        },
    );
    m.insert(
        "fabric",
        ServiceLimits {
            name: "Microsoft Fabric",
            docs: "https://learn.microsoft.com/en-us/fabric/admin/service-admin-portal",
            limits: vec![
                limit(200, 3600, "200 requests per hour per user"),
                limit(1000, 86400, "1,000 requests per day per user"),
            ],
        },
    );
    m.insert(
        "graph",
        ServiceLimits {
            name: "Microsoft Graph",
            docs: "https://learn.microsoft.com/en-us/graph/throttling",
            limits: vec![
                limit(10000, 600, "10,000 requests per 10 minutes per app"),
                limit(2000, 1, "Burst: 2,000 requests per second"),
            ],
        },
    );
    m.insert(
        "onedrive",
        ServiceLimits {
            name: "OneDrive (Graph)",
            docs: "https://learn.microsoft.com/en-us/graph/throttling",
            limits: vec![
                limit(10000, 600, "10,000 requests per 10 minutes per app"),
                limit(2000, 1, "Burst: 2,000 requests per second"),
            ],
        },
    );
    m.insert(
        "sharepoint",
        ServiceLimits {
            name: "SharePoint (Graph)",
            docs: "https://learn.microsoft.com/en-us/graph/throttling",
            limits: vec![
                limit(10000, 600, "10,000 requests per 10 minutes per app"),
                limit(2000, 1, "Burst: 2,000 requests per second"),
            ],
        },
    );
    m.insert(
        "synapse",
        ServiceLimits {
            name: "Azure Synapse",
            docs: "https://learn.microsoft.com/en-us/azure/synapse-analytics/sql-data-warehouse/what-is-a-data-warehouse-unit-dwu-cdwu",
            limits: vec![
                limit(12000, 3600, "12,000 read requests per hour"),
                limit(1200, 3600, "1,200 write requests per hour"),
            ],
        },
    );
    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_service_has_limits() {
        let limits = limits_for("purview").unwrap();
        assert_eq!(limits.limits.len(), 2);
        assert_eq!(limits.limits[0].requests, 100);
        assert_eq!(limits.limits[0].window_seconds, 60);
    }

    #[test]
    fn unknown_service_is_unlimited() {
        assert!(limits_for("contoso").is_none());
    }

    #[test]
    fn every_cataloged_service_has_a_limit_entry() {
        for service in crate::services::catalog() {
            assert!(
                limits_for(service.id).is_some(),
                "{} missing from rate-limit table",
                service.id
            );
        }
    }
}
