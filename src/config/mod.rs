use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use crate::reconcile::ReconcileOptions;

/// Command line. Every flag overrides the matching environment variable.
#[derive(Debug, Parser)]
#[command(name = "evpn-forge", version, about = "Compute and reconcile EVPN fabric configuration")]
pub struct Cli {
    /// Topology file (defaults to TOPOLOGY_FILE)
    pub topology: Option<PathBuf>,

    /// Only handle these switches; repeat for more
    #[arg(short, long = "switch")]
    pub switches: Vec<String>,

    /// Print the computed configuration of each switch before diffing
    #[arg(long)]
    pub print_config: bool,

    /// Skip the diff stage
    #[arg(long)]
    pub no_diff: bool,

    /// Do not fetch the running configuration; the target replaces the device root
    #[arg(long)]
    pub no_collect: bool,

    /// Commit when every switch validated
    #[arg(long)]
    pub commit: bool,

    /// Print computed documents as JSON and exit without contacting devices
    #[arg(long)]
    pub compute_only: bool,

    /// Switches reconciled concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub topology_file: PathBuf,
    pub rpc_scheme: String,
    pub rpc_timeout: Duration,
    pub workers: usize,
    pub interface_count: usize,
    pub with_collect: bool,
    pub with_diff: bool,
    pub with_config_print: bool,
    pub with_commit: bool,
    pub compute_only: bool,
    pub switches: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            topology_file: PathBuf::from(get_env("TOPOLOGY_FILE", "topology.yaml")),
            rpc_scheme: get_env("RPC_SCHEME", "http"),
            rpc_timeout: Duration::from_secs(parse_env("RPC_TIMEOUT_SECS", "30")?),
            workers: parse_env("RECONCILE_WORKERS", "1")?,
            interface_count: parse_env("INTERFACE_COUNT", "20")?,
            with_collect: parse_bool("WITH_COLLECT", "true")?,
            with_diff: parse_bool("WITH_DIFF", "true")?,
            with_config_print: parse_bool("WITH_CONFIG_PRINT", "false")?,
            with_commit: parse_bool("WITH_COMMIT", "false")?,
            compute_only: false,
            switches: Vec::new(),
        })
    }

    /// Apply command line overrides
    pub fn with_cli(mut self, cli: Cli) -> Self {
        if let Some(path) = cli.topology {
            self.topology_file = path;
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(secs) = cli.timeout {
            self.rpc_timeout = Duration::from_secs(secs);
        }
        self.with_config_print |= cli.print_config;
        self.with_commit |= cli.commit;
        self.with_diff &= !cli.no_diff;
        self.with_collect &= !cli.no_collect;
        self.compute_only = cli.compute_only;
        self.switches = cli.switches;
        self
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            collect: self.with_collect,
            print_config: self.with_config_print,
            diff: self.with_diff,
            commit: self.with_commit,
            workers: self.workers.max(1),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = get_env(key, default);
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {}: '{}'", key, value))
}

fn parse_bool(key: &str, default: &str) -> anyhow::Result<bool> {
    let value = get_env(key, default);
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("invalid value for {}: '{}'", key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Config {
        Config {
            topology_file: PathBuf::from("topology.yaml"),
            rpc_scheme: "http".to_string(),
            rpc_timeout: Duration::from_secs(30),
            workers: 1,
            interface_count: 20,
            with_collect: true,
            with_diff: true,
            with_config_print: false,
            with_commit: false,
            compute_only: false,
            switches: Vec::new(),
        }
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "evpn-forge",
            "fabric.yaml",
            "--switch",
            "leaf1",
            "-s",
            "leaf2",
            "--no-diff",
            "--commit",
            "--workers",
            "4",
            "--timeout",
            "5",
        ]);
        let config = defaults().with_cli(cli);
        assert_eq!(config.topology_file, PathBuf::from("fabric.yaml"));
        assert_eq!(config.switches, vec!["leaf1", "leaf2"]);
        assert!(!config.with_diff);
        assert!(config.with_collect);
        assert!(config.with_commit);
        assert_eq!(config.rpc_timeout, Duration::from_secs(5));

        let options = config.reconcile_options();
        assert_eq!(options.workers, 4);
        assert!(options.commit);
        assert!(!options.diff);
    }

    #[test]
    fn test_no_flags_keep_environment() {
        let mut env_config = defaults();
        env_config.with_commit = true;
        env_config.workers = 0;
        let config = env_config.with_cli(Cli::parse_from(["evpn-forge"]));
        assert!(config.with_commit);
        assert_eq!(config.topology_file, PathBuf::from("topology.yaml"));
        // zero workers still makes progress
        assert_eq!(config.reconcile_options().workers, 1);
    }

    #[test]
    fn test_env_parsing() {
        env::set_var("EVPN_FORGE_TEST_BOOL", "Yes");
        assert!(parse_bool("EVPN_FORGE_TEST_BOOL", "false").unwrap());
        env::set_var("EVPN_FORGE_TEST_BOOL", "maybe");
        assert!(parse_bool("EVPN_FORGE_TEST_BOOL", "false").is_err());
        assert_eq!(parse_env::<usize>("EVPN_FORGE_TEST_UNSET", "20").unwrap(), 20);
        env::set_var("EVPN_FORGE_TEST_NUM", "many");
        assert!(parse_env::<u64>("EVPN_FORGE_TEST_NUM", "30").is_err());
    }
}
