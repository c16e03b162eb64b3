//! Framework configuration.
//!
//! All knobs live under an `[rpc]` table in a TOML file, using the same
//! camelCase key names as the original flat `rpc.`-prefixed properties:
//!
//! ```toml
//! [rpc]
//! serializer = "json"
//! serverPort = 8121
//!
//! [rpc.registryConfig]
//! registry = "etcd"
//! address = "http://localhost:2379"
//! ```
//!
//! A missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{RpcError, RpcResult};

/// Default configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "minirpc.toml";

/// Backing-store connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    /// Backing store kind, resolved through the registry plugin registry.
    pub registry: String,
    /// Coordination endpoint, e.g. `http://localhost:2379`.
    pub address: String,
    /// Connect timeout in milliseconds.
    pub timeout: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            registry: "etcd".to_string(),
            address: "http://localhost:2379".to_string(),
            timeout: 10_000,
        }
    }
}

impl RegistryConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Global framework configuration shared by providers and consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcConfig {
    pub name: String,
    /// Advertised service version when a provider does not specify one.
    pub version: String,
    /// Server bind / advertised host.
    pub server_host: String,
    /// Server listen port; 0 binds an ephemeral port.
    pub server_port: u16,
    /// Wire serializer name: `jdk` | `json` | `kryo` | `hessian`.
    pub serializer: String,
    /// `roundRobin` | `random` | `consistentHash`.
    pub load_balancer: String,
    /// `no` | `fixedInterval`.
    pub retry_strategy: String,
    /// `failFast` | `failSafe` | `failOver` | `failBack`.
    pub tolerant_strategy: String,
    /// Reserved.
    pub mock: bool,
    /// Per-call transport timeout in milliseconds.
    pub request_timeout: u64,
    pub registry_config: RegistryConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        RpcConfig {
            name: "mini-rpc".to_string(),
            version: "1.0".to_string(),
            server_host: "localhost".to_string(),
            server_port: 8121,
            serializer: "jdk".to_string(),
            load_balancer: "roundRobin".to_string(),
            retry_strategy: "no".to_string(),
            tolerant_strategy: "failFast".to_string(),
            mock: false,
            request_timeout: 5_000,
            registry_config: RegistryConfig::default(),
        }
    }
}

/// Top-level file shape: everything sits under `[rpc]`.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    rpc: RpcConfig,
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> RpcResult<RpcConfig> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RpcError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: ConfigFile = toml::from_str(&text)
            .map_err(|e| RpcError::Config(format!("cannot parse {}: {e}", path.display())))?;
        Ok(file.rpc)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file is absent.
    pub fn load_or_default(path: &Path) -> RpcConfig {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                info!(path = %path.display(), %err, "using default configuration");
                RpcConfig::default()
            }
        }
    }
}
