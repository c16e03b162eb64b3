//! Demo consumer: calls `demo.UserService.getUser` through the proxy.
//!
//! ```bash
//! # with an etcd at http://localhost:2379 and a running provider-demo
//! cargo run -p consumer-demo -- --name mini-rpc
//! ```

use std::path::PathBuf;

use argh::FromArgs;
use serde::{Deserialize, Serialize};

use minirpc_client::RpcClient;
use minirpc_common::config::{RpcConfig, DEFAULT_CONFIG_FILE};
use minirpc_common::protocol::to_value;

/// mini-rpc demo consumer
#[derive(FromArgs)]
struct Args {
    /// path to the configuration file (default: minirpc.toml)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// user name to send (default: mini-rpc)
    #[argh(option, short = 'n', default = "String::from(\"mini-rpc\")")]
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Args = argh::from_env();
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = RpcConfig::load_or_default(&config_path);

    let client = RpcClient::new(config).await?;
    let proxy = client.proxy("demo.UserService");

    let user = User { name: args.name };
    let echoed: User = proxy
        .call(
            "getUser",
            vec!["demo.User".to_string()],
            vec![to_value(&user)?],
        )
        .await?;
    println!("getUser returned: {echoed:?}");

    client.shutdown().await?;
    Ok(())
}
