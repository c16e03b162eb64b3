//! Demo provider: exposes `demo.UserService` and serves until interrupted.
//!
//! ```bash
//! # with an etcd at http://localhost:2379
//! cargo run -p provider-demo
//!
//! # or with an explicit configuration file
//! cargo run -p provider-demo -- --config provider.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use argh::FromArgs;
use serde::{Deserialize, Serialize};
use tracing::info;

use minirpc_common::config::{RpcConfig, DEFAULT_CONFIG_FILE};
use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::{from_value, to_value, RpcRequest};
use minirpc_server::service::{RpcService, ServiceReply};
use minirpc_server::RpcServer;

/// mini-rpc demo provider
#[derive(FromArgs)]
struct Args {
    /// path to the configuration file (default: minirpc.toml)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    name: String,
}

struct UserService;

impl RpcService for UserService {
    fn invoke(&self, request: &RpcRequest) -> RpcResult<ServiceReply> {
        match request.method_name.as_str() {
            "getUser" => {
                let user: User = from_value(request.args.first().ok_or_else(|| {
                    RpcError::Dispatch("getUser takes one argument".to_string())
                })?)?;
                info!(name = %user.name, "getUser invoked");
                Ok(ServiceReply::new(to_value(&user)?, "demo.User"))
            }
            other => Err(RpcError::Dispatch(format!("no such method: {other}"))),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Args = argh::from_env();
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = RpcConfig::load_or_default(&config_path);

    let server = RpcServer::new(config).await?;
    server
        .expose_default("demo.UserService", Arc::new(UserService))
        .await?;
    info!(port = server.local_port(), "provider ready");

    tokio::select! {
        result = server.serve() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }
    server.shutdown().await?;
    Ok(())
}
