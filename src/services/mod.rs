//! Static catalog of the supported Microsoft service APIs.
//!
//! Read-only reference data: each service carries its base URL, the OAuth2
//! scope requested for it, and a tree of documented endpoints. The request
//! pipeline treats `base_url` and `auth_scope` as opaque strings.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub mod ratelimits;

pub use ratelimits::{RateLimit, ServiceLimits};

#[derive(Debug, Clone)]
pub struct Service {
    pub id: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub auth_scope: &'static str,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub name: &'static str,
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// Target environment. Dev and QA rewrite the service hostname by naming
/// convention; this happens before the URL reaches the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Dev,
    Qa,
}

impl Environment {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prod" => Some(Self::Prod),
            "dev" => Some(Self::Dev),
            "qa" => Some(Self::Qa),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Dev => "dev",
            Self::Qa => "qa",
        }
    }

    /// Apply the `.com -> -dev.com` / `-qa.com` hostname convention.
    pub fn apply(&self, base_url: &str) -> String {
        match self {
            Self::Prod => base_url.to_string(),
            Self::Dev => base_url.replacen(".com", "-dev.com", 1),
            Self::Qa => base_url.replacen(".com", "-qa.com", 1),
        }
    }
}

pub fn catalog() -> &'static [Service] {
    &CATALOG
}

pub fn find(id: &str) -> Option<&'static Service> {
    CATALOG.iter().find(|s| s.id == id)
}

fn endpoint(method: &'static str, path: &'static str, description: &'static str) -> Endpoint {
    Endpoint {
        method,
        path,
        description,
    }
}

static CATALOG: Lazy<Vec<Service>> = Lazy::new(|| {
    vec![
        Service {
            id: "powerbi",
            name: "Power BI",
            base_url: "https://api.powerbi.com/v1.0/myorg",
            auth_scope: "https://analysis.windows.net/powerbi/api/.default",
            categories: vec![
                Category {
                    name: "Dashboards",
                    endpoints: vec![
                        endpoint("GET", "/dashboards", "Returns a list of dashboards from \"My Workspace\""),
                        endpoint("GET", "/groups/{groupId}/dashboards", "Returns a list of dashboards from the specified workspace"),
                        endpoint("GET", "/dashboards/{dashboardId}", "Returns the specified dashboard from \"My Workspace\""),
                        endpoint("GET", "/dashboards/{dashboardId}/tiles", "Returns a list of tiles within the specified dashboard"),
                        endpoint("POST", "/dashboards/{dashboardId}/Clone", "Clones the specified dashboard"),
                    ],
                },
                Category {
                    name: "Reports",
                    endpoints: vec![
                        endpoint("GET", "/reports", "Returns a list of reports from \"My Workspace\""),
                        endpoint("GET", "/groups/{groupId}/reports", "Returns a list of reports from the specified workspace"),
                        endpoint("GET", "/reports/{reportId}", "Returns the specified report from \"My Workspace\""),
                    ],
                },
                Category {
                    name: "Datasets",
                    endpoints: vec![
                        endpoint("GET", "/datasets", "Returns a list of datasets from \"My Workspace\""),
                        endpoint("GET", "/datasets/{datasetId}", "Returns the specified dataset"),
                        endpoint("POST", "/datasets/{datasetId}/refreshes", "Triggers a refresh for the specified dataset"),
                    ],
                },
            ],
        },
        Service {
            id: "purview",
            name: "Microsoft Purview",
            base_url: "https://{accountName}.purview.azure.com",
            auth_scope: "https://purview.azure.net/.default",
            categories: vec![
                Category {
                    name: "Catalog",
                    endpoints: vec![
                        endpoint("POST", "/catalog/api/search/query", "Gets data using search"),
                        endpoint("GET", "/catalog/api/atlas/v2/entity/guid/{guid}", "Gets entity by GUID"),
                        endpoint("POST", "/catalog/api/atlas/v2/entity", "Creates or updates an entity"),
                        endpoint("DELETE", "/catalog/api/atlas/v2/entity/guid/{guid}", "Deletes an entity by GUID"),
                    ],
                },
                Category {
                    name: "Glossary",
                    endpoints: vec![
                        endpoint("GET", "/catalog/api/atlas/v2/glossary", "Gets all glossaries"),
                        endpoint("POST", "/catalog/api/atlas/v2/glossary", "Creates a glossary"),
                        endpoint("GET", "/catalog/api/atlas/v2/glossary/{glossaryGuid}/terms", "Gets all terms from a glossary"),
                    ],
                },
            ],
        },
        Service {
            id: "azure",
            name: "Azure Resource Manager",
            base_url: "https://management.azure.com",
            auth_scope: "https://management.azure.com/.default",
            categories: vec![
                Category {
                    name: "Resource Groups",
                    endpoints: vec![
                        endpoint("GET", "/subscriptions/{subscriptionId}/resourcegroups", "Lists all resource groups in a subscription"),
                        endpoint("GET", "/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}", "Gets the specified resource group"),
                        endpoint("PUT", "/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}", "Creates or updates a resource group"),
                        endpoint("DELETE", "/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}", "Deletes a resource group"),
                    ],
                },
                Category {
                    name: "Virtual Machines",
                    endpoints: vec![
                        endpoint("GET", "/subscriptions/{subscriptionId}/providers/Microsoft.Compute/virtualMachines", "Lists VMs in a subscription"),
                        endpoint("POST", "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Compute/virtualMachines/{vmName}/start", "Starts the specified VM"),
                        endpoint("POST", "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Compute/virtualMachines/{vmName}/powerOff", "Powers off the specified VM"),
                    ],
                },
                Category {
                    name: "Subscriptions",
                    endpoints: vec![
                        endpoint("GET", "/subscriptions", "Lists subscriptions available to the caller"),
                        endpoint("GET", "/subscriptions/{subscriptionId}", "Gets the specified subscription"),
                    ],
                },
            ],
        },
        Service {
            id: "fabric",
            name: "Microsoft Fabric",
            base_url: "https://api.fabric.microsoft.com",
            auth_scope: "https://api.fabric.microsoft.com/.default",
            categories: vec![
                Category {
                    name: "Workspaces",
                    endpoints: vec![
                        endpoint("GET", "/v1/workspaces", "Lists workspaces the principal can access"),
                        endpoint("GET", "/v1/workspaces/{workspaceId}", "Gets the specified workspace"),
                        endpoint("POST", "/v1/workspaces", "Creates a workspace"),
                        endpoint("DELETE", "/v1/workspaces/{workspaceId}", "Deletes the specified workspace"),
                    ],
                },
                Category {
                    name: "Items",
                    endpoints: vec![
                        endpoint("GET", "/v1/workspaces/{workspaceId}/items", "Lists items in a workspace"),
                        endpoint("POST", "/v1/workspaces/{workspaceId}/items", "Creates an item in a workspace"),
                        endpoint("GET", "/v1/workspaces/{workspaceId}/lakehouses", "Lists lakehouses in a workspace"),
                    ],
                },
            ],
        },
        Service {
            id: "graph",
            name: "Microsoft Graph API",
            base_url: "https://graph.microsoft.com/v1.0",
            auth_scope: "https://graph.microsoft.com/.default",
            categories: vec![
                Category {
                    name: "Users",
                    endpoints: vec![
                        endpoint("GET", "/users", "Lists users in the organization"),
                        endpoint("GET", "/users/{userId}", "Gets the specified user"),
                        endpoint("POST", "/users", "Creates a user"),
                        endpoint("PATCH", "/users/{userId}", "Updates the specified user"),
                        endpoint("DELETE", "/users/{userId}", "Deletes the specified user"),
                    ],
                },
                Category {
                    name: "Groups",
                    endpoints: vec![
                        endpoint("GET", "/groups", "Lists groups in the organization"),
                        endpoint("GET", "/groups/{groupId}/members", "Lists members of a group"),
                        endpoint("POST", "/groups", "Creates a group"),
                    ],
                },
                Category {
                    name: "Mail",
                    endpoints: vec![
                        endpoint("GET", "/users/{userId}/messages", "Lists messages in a user's mailbox"),
                        endpoint("POST", "/users/{userId}/sendMail", "Sends a message"),
                    ],
                },
            ],
        },
        Service {
            id: "onedrive",
            name: "OneDrive",
            base_url: "https://graph.microsoft.com/v1.0",
            auth_scope: "https://graph.microsoft.com/.default",
            categories: vec![
                Category {
                    name: "Drive",
                    endpoints: vec![
                        endpoint("GET", "/me/drive", "Gets the signed-in principal's drive"),
                        endpoint("GET", "/drives/{driveId}", "Gets the specified drive"),
                        endpoint("GET", "/me/drive/root/children", "Lists children of the drive root"),
                    ],
                },
                Category {
                    name: "Items",
                    endpoints: vec![
                        endpoint("GET", "/drives/{driveId}/items/{itemId}", "Gets the specified item"),
                        endpoint("GET", "/drives/{driveId}/items/{itemId}/children", "Lists children of an item"),
                        endpoint("PUT", "/drives/{driveId}/items/{itemId}/content", "Uploads item content"),
                        endpoint("DELETE", "/drives/{driveId}/items/{itemId}", "Deletes the specified item"),
                    ],
                },
            ],
        },
        Service {
            id: "sharepoint",
            name: "SharePoint",
            base_url: "https://graph.microsoft.com/v1.0",
            auth_scope: "https://graph.microsoft.com/.default",
            categories: vec![
                Category {
                    name: "Sites",
                    endpoints: vec![
                        endpoint("GET", "/sites/{siteId}", "Gets the specified site"),
                        endpoint("GET", "/sites/{siteId}/sites", "Lists subsites of a site"),
                    ],
                },
                Category {
                    name: "Lists",
                    endpoints: vec![
                        endpoint("GET", "/sites/{siteId}/lists", "Lists the lists in a site"),
                        endpoint("POST", "/sites/{siteId}/lists", "Creates a list"),
                        endpoint("GET", "/sites/{siteId}/lists/{listId}/items", "Lists items in a list"),
                        endpoint("PATCH", "/sites/{siteId}/lists/{listId}/items/{itemId}", "Updates a list item"),
                    ],
                },
            ],
        },
        Service {
            id: "synapse",
            name: "Azure Synapse",
            base_url: "https://{workspaceName}.dev.azuresynapse.net",
            auth_scope: "https://dev.azuresynapse.net/.default",
            categories: vec![
                Category {
                    name: "Workspaces",
                    endpoints: vec![
                        endpoint("GET", "/subscriptions/{subscriptionId}/providers/Microsoft.Synapse/workspaces", "Lists Synapse workspaces in a subscription"),
                        endpoint("GET", "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Synapse/workspaces/{workspaceName}", "Gets the specified workspace"),
                    ],
                },
                Category {
                    name: "SQL Pools",
                    endpoints: vec![
                        endpoint("GET", "/sqlPools", "Lists SQL pools in the workspace"),
                        endpoint("GET", "/sqlPools/{poolName}", "Gets the specified SQL pool"),
                    ],
                },
            ],
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_by_id() {
        assert_eq!(find("graph").map(|s| s.name), Some("Microsoft Graph API"));
        assert!(find("intune").is_none());
    }

    #[test]
    fn every_service_has_endpoints() {
        for service in catalog() {
            assert!(!service.categories.is_empty(), "{} has no categories", service.id);
            for category in &service.categories {
                assert!(!category.endpoints.is_empty());
            }
        }
    }

    #[test]
    fn environment_rewrites_first_com_only() {
        let env = Environment::Dev;
        assert_eq!(
            env.apply("https://api.powerbi.com/v1.0/myorg"),
            "https://api.powerbi-dev.com/v1.0/myorg"
        );
        assert_eq!(
            Environment::Qa.apply("https://management.azure.com"),
            "https://management.azure-qa.com"
        );
        assert_eq!(
            Environment::Prod.apply("https://graph.microsoft.com/v1.0"),
            "https://graph.microsoft.com/v1.0"
        );
    }

    #[test]
    fn environment_round_trips_through_str() {
        for env in [Environment::Prod, Environment::Dev, Environment::Qa] {
            assert_eq!(Environment::parse(env.as_str()), Some(env));
        }
        assert_eq!(Environment::parse("staging"), None);
    }
}
