use crate::chains::KnownChains;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Steepshot - Steem/Golos blockchain client
///
/// Configuration priority: CLI args > Environment variables > nodes.toml > Defaults
#[derive(Parser, Debug)]
#[command(name = "steepshot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Steem/Golos blockchain client", long_about = None)]
pub struct CliArgs {
    /// Target chain: steem or golos
    #[arg(short, long, env = "STEEPSHOT_CHAIN", value_parser = clap::value_parser!(KnownChains))]
    pub chain: Option<KnownChains>,

    /// Use the dev/QA environment (test nodes and backend)
    #[arg(long, env = "STEEPSHOT_DEV")]
    pub dev: Option<bool>,

    /// Single node URL override (skips the configured node list)
    #[arg(long, env = "STEEPSHOT_NODE_URL")]
    pub node_url: Option<String>,

    /// RPC request timeout in milliseconds (1000-60000)
    #[arg(long, env = "RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: Option<u64>,

    /// Delay between reconnect attempts in milliseconds (100-60000)
    #[arg(long, env = "RECONNECT_DELAY_MS")]
    pub reconnect_delay_ms: Option<u64>,

    /// Path to a TOML file with per-chain node lists
    #[arg(long, env = "STEEPSHOT_NODES_FILE")]
    pub nodes_file: Option<PathBuf>,

    /// Path to the persisted session file
    #[arg(long, env = "STEEPSHOT_SESSION_FILE")]
    pub session_file: Option<PathBuf>,
}

/// One candidate node endpoint. Lists are tried in ascending `order` with
/// disabled entries skipped.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NodeConfig {
    pub url: String,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub order: u32,
}

fn default_true() -> bool {
    true
}

impl NodeConfig {
    pub fn new(url: &str, order: u32) -> Self {
        Self {
            url: url.to_string(),
            is_enabled: true,
            order,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct NodesFile {
    #[serde(default)]
    steem: Vec<NodeConfig>,
    #[serde(default)]
    golos: Vec<NodeConfig>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub chain: KnownChains,
    pub is_dev: bool,
    pub rpc_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
    pub session_file: PathBuf,
    node_override: Option<String>,
    nodes_file: Option<NodesFile>,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

impl Config {
    /// Defaults for a chain/environment pair; the library entry point.
    pub fn new(chain: KnownChains, is_dev: bool) -> Self {
        Self {
            chain,
            is_dev,
            rpc_timeout_ms: 8000,
            reconnect_delay_ms: 5000,
            session_file: default_session_file(),
            node_override: None,
            nodes_file: None,
        }
    }

    /// Build from parsed CLI arguments, applying env fallbacks and validation.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let chain = args.chain.unwrap_or_else(|| {
            env::var("STEEPSHOT_CHAIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(KnownChains::Steem)
        });

        let is_dev = args.dev.unwrap_or_else(|| {
            env::var("STEEPSHOT_DEV")
                .ok()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false)
        });

        let rpc_timeout_ms = args
            .rpc_timeout_ms
            .or_else(|| env::var("RPC_TIMEOUT_MS").ok().and_then(|s| s.parse().ok()))
            .unwrap_or(8000);
        let rpc_timeout_ms = validate_in_range(rpc_timeout_ms, 1000, 60000, "RPC_TIMEOUT_MS")?;

        let reconnect_delay_ms = args
            .reconnect_delay_ms
            .or_else(|| {
                env::var("RECONNECT_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(5000);
        let reconnect_delay_ms =
            validate_in_range(reconnect_delay_ms, 100, 60000, "RECONNECT_DELAY_MS")?;

        if let Some(ref url) = args.node_url {
            validate_url(url, "STEEPSHOT_NODE_URL")?;
        }

        let nodes_file = match &args.nodes_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read nodes file {}", path.display()))?;
                Some(parse_nodes_file(&raw)?)
            }
            None => None,
        };

        Ok(Self {
            chain,
            is_dev,
            rpc_timeout_ms,
            reconnect_delay_ms,
            session_file: args
                .session_file
                .clone()
                .unwrap_or_else(default_session_file),
            node_override: args.node_url.clone(),
            nodes_file,
        })
    }

    /// The candidate node list for a chain, unfiltered; the connection layer
    /// applies the enabled flag and priority order.
    pub fn node_configs(&self, chain: KnownChains) -> Vec<NodeConfig> {
        if let Some(ref url) = self.node_override {
            return vec![NodeConfig::new(url, 0)];
        }
        if let Some(ref file) = self.nodes_file {
            let from_file = match chain {
                KnownChains::Steem => &file.steem,
                KnownChains::Golos => &file.golos,
            };
            if !from_file.is_empty() {
                return from_file.clone();
            }
        }
        default_nodes(chain, self.is_dev)
    }
}

fn parse_nodes_file(raw: &str) -> Result<NodesFile> {
    let file: NodesFile = toml::from_str(raw).context("Malformed nodes file")?;
    for node in file.steem.iter().chain(file.golos.iter()) {
        validate_url(&node.url, "node url")?;
    }
    Ok(file)
}

fn default_session_file() -> PathBuf {
    env::var("HOME")
        .map(|h| PathBuf::from(h).join(".steepshot").join("session.json"))
        .unwrap_or_else(|_| PathBuf::from(".steepshot-session.json"))
}

fn default_nodes(chain: KnownChains, is_dev: bool) -> Vec<NodeConfig> {
    match (chain, is_dev) {
        (KnownChains::Steem, false) => vec![
            NodeConfig::new("https://api.steemit.com", 0),
            NodeConfig::new("https://api.steem.house", 1),
        ],
        (KnownChains::Steem, true) => vec![NodeConfig::new("https://testnet.steem.vc", 0)],
        (KnownChains::Golos, false) => vec![
            NodeConfig::new("https://api.golos.cf", 0),
            NodeConfig::new("https://golos.lexa.host", 1),
        ],
        (KnownChains::Golos, true) => vec![NodeConfig::new("https://api-dev.golos.cf", 0)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_validation() {
        assert!(validate_in_range(8000u64, 1000, 60000, "X").is_ok());
        assert!(validate_in_range(100u64, 1000, 60000, "X").is_err());
        assert!(validate_in_range(90000u64, 1000, 60000, "X").is_err());
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://api.steemit.com", "X").is_ok());
        assert!(validate_url("wss://node", "X").is_err());
        assert!(validate_url("", "X").is_err());
    }

    #[test]
    fn nodes_file_parses_with_defaults() {
        let file = parse_nodes_file(
            r#"
            [[steem]]
            url = "https://node-a.example.com"
            order = 1

            [[steem]]
            url = "https://node-b.example.com"
            is_enabled = false

            [[golos]]
            url = "https://golos.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(file.steem.len(), 2);
        assert!(file.steem[0].is_enabled);
        assert_eq!(file.steem[0].order, 1);
        assert!(!file.steem[1].is_enabled);
        assert_eq!(file.golos.len(), 1);
    }

    #[test]
    fn node_override_wins_over_everything() {
        let mut cfg = Config::new(KnownChains::Steem, false);
        cfg.node_override = Some("https://my-node.example.com".into());
        let nodes = cfg.node_configs(KnownChains::Steem);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].url, "https://my-node.example.com");
    }

    #[test]
    fn default_nodes_differ_per_environment() {
        let prod = Config::new(KnownChains::Steem, false).node_configs(KnownChains::Steem);
        let dev = Config::new(KnownChains::Steem, true).node_configs(KnownChains::Steem);
        assert_ne!(prod, dev);
    }
}
