//! Configuration management for the dispatcher
//!
//! Loads configuration from TOML files with environment variable substitution.
//! Static chain and token facts live in the registry; this file only adds
//! RPC endpoints, gas policy and the settlement contract address.

use crate::chain::registry::{registry, VmKind, DEFAULT_SETTLEMENT_CHAIN};
use crate::error::{DispatchError, DispatchResult};
use crate::gateway::RevertPolicy;
use crate::identity::parse_evm_address;
use crate::router::{DIRECT_CONFIRMATIONS, RELAYED_CONFIRMATIONS};

use alloy_primitives::{Address, Bytes, U256};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "OMNILEND_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub chains: HashMap<String, ChainConfig>,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_settlement_chain")]
    pub settlement_chain: String,
    pub lending_pool: String,
    #[serde(default = "default_direct_confirmations")]
    pub direct_confirmations: u64,
    #[serde(default = "default_relayed_confirmations")]
    pub relayed_confirmations: u64,
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    #[serde(default = "default_on_revert_gas_limit")]
    pub on_revert_gas_limit: u64,
    #[serde(default = "default_revert_message")]
    pub revert_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub gas_price_strategy: GasPriceStrategy,
    #[serde(default = "default_max_gas_price_gwei")]
    pub max_gas_price_gwei: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceStrategy {
    #[default]
    Legacy,
    Eip1559,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

fn default_settlement_chain() -> String {
    DEFAULT_SETTLEMENT_CHAIN.to_string()
}

fn default_direct_confirmations() -> u64 {
    DIRECT_CONFIRMATIONS
}

fn default_relayed_confirmations() -> u64 {
    RELAYED_CONFIRMATIONS
}

fn default_confirmation_poll_ms() -> u64 {
    2_000
}

fn default_on_revert_gas_limit() -> u64 {
    100_000_000
}

fn default_revert_message() -> String {
    "Revert".to_string()
}

fn default_max_gas_price_gwei() -> u64 {
    100
}

fn default_enabled() -> bool {
    true
}

fn default_private_key_env() -> String {
    "OMNILEND_PRIVATE_KEY".to_string()
}

impl Settings {
    /// Load settings from `$OMNILEND_CONFIG`, falling back to `config/default.toml`
    pub fn load() -> DispatchResult<Self> {
        let config_path = env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::from_path(&config_path)
    }

    pub fn from_path(path: &Path) -> DispatchResult<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(input: &str) -> DispatchResult<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings = toml::from_str(&config_str)
            .map_err(|e| DispatchError::Config(format!("Failed to parse configuration: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration against the static registry
    fn validate(&self) -> DispatchResult<()> {
        let settlement = registry().get(&self.dispatcher.settlement_chain)?;
        if settlement.vm_kind != VmKind::Evm {
            return Err(DispatchError::Config(format!(
                "Settlement chain {} must be an EVM chain",
                settlement.key
            )));
        }
        self.lending_pool()?;

        for (name, chain) in &self.chains {
            registry().get(name)?;
            if chain.enabled && chain.rpc_urls.is_empty() {
                return Err(DispatchError::Config(format!(
                    "Chain {} has no RPC URLs configured",
                    name
                )));
            }
        }

        if self.enabled_chains().is_empty() {
            tracing::warn!("No chain endpoints enabled; only offline commands will work");
        }

        Ok(())
    }

    pub fn lending_pool(&self) -> DispatchResult<Address> {
        parse_evm_address(&self.dispatcher.lending_pool)
            .map_err(|e| DispatchError::Config(format!("lending_pool: {}", e)))
    }

    pub fn settlement_chain_id(&self) -> DispatchResult<u64> {
        Ok(registry().get(&self.dispatcher.settlement_chain)?.chain_id)
    }

    pub fn revert_policy(&self) -> RevertPolicy {
        RevertPolicy {
            revert_message: Bytes::copy_from_slice(self.dispatcher.revert_message.as_bytes()),
            on_revert_gas_limit: U256::from(self.dispatcher.on_revert_gas_limit),
            ..RevertPolicy::default()
        }
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled).collect()
    }

    /// Endpoint configuration for a registry key
    pub fn chain(&self, key: &str) -> DispatchResult<&ChainConfig> {
        self.chains
            .get(key)
            .filter(|c| c.enabled)
            .ok_or_else(|| DispatchError::Config(format!("No enabled endpoint for chain {}", key)))
    }

    /// Signing key read from the environment variable named in `[wallet]`
    pub fn private_key(&self) -> DispatchResult<String> {
        env::var(&self.wallet.private_key_env).map_err(|_| {
            DispatchError::Config(format!(
                "Environment variable {} is not set",
                self.wallet.private_key_env
            ))
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[dispatcher]
lending_pool = "0x00000000000000000000000000000000000000aa"

[chains.sepolia]
rpc_urls = ["https://rpc.example/${OMNILEND_TEST_KEY}"]
gas_price_strategy = "eip1559"
max_gas_price_gwei = 50

[chains.zeta_athens]
rpc_urls = []
enabled = false
"#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("OMNILEND_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${OMNILEND_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        env::set_var("OMNILEND_TEST_KEY", "abc");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = Settings::from_path(file.path()).unwrap();
        assert_eq!(settings.dispatcher.settlement_chain, "zeta_athens");
        assert_eq!(settings.dispatcher.direct_confirmations, 1);
        assert_eq!(settings.dispatcher.relayed_confirmations, 3);
        assert_eq!(settings.settlement_chain_id().unwrap(), 7001);

        let sepolia = settings.chain("sepolia").unwrap();
        assert_eq!(sepolia.rpc_urls, vec!["https://rpc.example/abc"]);
        assert_eq!(sepolia.gas_price_strategy, GasPriceStrategy::Eip1559);
        assert!(settings.chain("zeta_athens").is_err());
        assert_eq!(settings.enabled_chains().len(), 1);

        let policy = settings.revert_policy();
        assert_eq!(policy.revert_message.as_ref(), b"Revert");
    }

    #[test]
    fn test_unknown_chain_key_rejected() {
        let input = r#"
[dispatcher]
lending_pool = "0x00000000000000000000000000000000000000aa"

[chains.mainnet]
rpc_urls = ["https://rpc.example"]
"#;
        let err = Settings::from_toml(input).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownChain { .. }));
    }

    #[test]
    fn test_solana_settlement_chain_rejected() {
        let input = r#"
[dispatcher]
settlement_chain = "solana_devnet"
lending_pool = "0x00000000000000000000000000000000000000aa"
"#;
        assert!(matches!(
            Settings::from_toml(input),
            Err(DispatchError::Config(_))
        ));
    }
}
