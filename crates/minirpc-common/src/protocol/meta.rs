//! Service endpoint records.

use serde::{Deserialize, Serialize};

/// Advertised service version when the provider does not specify one.
pub const DEFAULT_SERVICE_VERSION: &str = "1.0";

/// Service group placeholder until grouping is implemented.
pub const DEFAULT_SERVICE_GROUP: &str = "default";

/// Endpoint record stored in the registry, one per running service instance.
///
/// Serialized as JSON with camelCase field names when persisted as a registry
/// node payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceMetaInfo {
    pub service_name: String,
    pub service_version: String,
    pub service_host: String,
    pub service_port: u16,
    pub service_group: String,
}

impl Default for ServiceMetaInfo {
    fn default() -> Self {
        ServiceMetaInfo {
            service_name: String::new(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            service_host: String::new(),
            service_port: 0,
            service_group: DEFAULT_SERVICE_GROUP.to_string(),
        }
    }
}

impl ServiceMetaInfo {
    pub fn new(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        service_host: impl Into<String>,
        service_port: u16,
    ) -> Self {
        ServiceMetaInfo {
            service_name: service_name.into(),
            service_version: service_version.into(),
            service_host: service_host.into(),
            service_port,
            service_group: DEFAULT_SERVICE_GROUP.to_string(),
        }
    }

    /// Discovery lookup key: `{name}:{version}`.
    pub fn service_key(&self) -> String {
        format!("{}:{}", self.service_name, self.service_version)
    }

    /// Unique registry node identity: `{serviceKey}/{host}:{port}`.
    pub fn service_node_key(&self) -> String {
        format!(
            "{}/{}:{}",
            self.service_key(),
            self.service_host,
            self.service_port
        )
    }

    /// Dialable address: `{host}:{port}`.
    pub fn service_address(&self) -> String {
        format!("{}:{}", self.service_host, self.service_port)
    }
}
