use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use mmchat::{
    config::GatewayConfig,
    logging::{self, LoggingConfig},
    metrics, server, version,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mmchat", version = version::VERSION, about = "Multimodal chat gateway")]
struct Cli {
    /// YAML configuration file; every section is optional.
    #[arg(long, env = "MMCHAT_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "MMCHAT_HOST")]
    host: Option<String>,

    #[arg(long, env = "MMCHAT_PORT")]
    port: Option<u16>,

    /// Base URL of the OpenAI-compatible model provider.
    #[arg(long, env = "MMCHAT_MODEL_BASE_URL")]
    model_base_url: Option<String>,

    #[arg(long, env = "MMCHAT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "MMCHAT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,

    /// Also write daily-rolling JSON logs into this directory.
    #[arg(long, env = "MMCHAT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, env = "MMCHAT_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// Externally visible base URL used in upload and access URLs.
    #[arg(long, env = "MMCHAT_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    #[arg(long, env = "MMCHAT_STORAGE_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "MMCHAT_METRICS_ADDR")]
    metrics_addr: Option<String>,
}

impl Cli {
    fn load_config(self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_yaml_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => GatewayConfig::default(),
        };

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(base_url) = self.model_base_url {
            config.models.base_url = base_url;
        }
        if self.api_key.is_some() {
            config.models.api_key = self.api_key;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if self.log_json {
            config.log.json = true;
        }
        if self.log_dir.is_some() {
            config.log.dir = self.log_dir;
        }
        if let Some(root) = self.storage_root {
            config.storage.root = root;
        }
        if let Some(url) = self.public_base_url {
            config.storage.public_base_url = url;
        }
        if self.signing_key.is_some() {
            config.storage.signing_key = self.signing_key;
        }
        if self.metrics_addr.is_some() {
            config.metrics.listen_addr = self.metrics_addr;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().load_config()?;

    let _log_guard = logging::init_logging(&LoggingConfig::from(&config.log))?;
    info!(version = %version::get_version_string(), "Starting multimodal chat gateway");

    if let Some(addr) = &config.metrics.listen_addr {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid metrics address '{addr}'"))?;
        metrics::start_prometheus(addr)?;
    }

    server::startup(config).await
}
