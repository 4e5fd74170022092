//! Static registry of supported chains and their lending-pool tokens
//!
//! Loaded once per process and never mutated. Every token maps a
//! chain-local asset to its wrapped representation on the settlement chain.

use crate::error::{DispatchError, DispatchResult};

use alloy_primitives::utils::parse_units;
use alloy_primitives::{address, Address, U256};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Registry key of the chain hosting the lending pool
pub const DEFAULT_SETTLEMENT_CHAIN: &str = "zeta_athens";

lazy_static! {
    static ref TESTNET: ChainRegistry = ChainRegistry::from_chains(testnet_chains())
        .expect("testnet chain table has duplicate keys or ids");
}

/// Process-wide registry
pub fn registry() -> &'static ChainRegistry {
    &TESTNET
}

/// Virtual machine family of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VmKind {
    Evm,
    Svm,
}

impl fmt::Display for VmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmKind::Evm => write!(f, "EVM"),
            VmKind::Svm => write!(f, "SVM"),
        }
    }
}

/// Gateway contract (EVM) or program (SVM) accepting cross-chain messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GatewayAddress {
    Evm(Address),
    Svm(&'static str),
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenDescriptor {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    /// Wrapped asset on the settlement chain
    pub settlement_asset: Address,
    /// Token contract on the origin chain, `None` for the chain's native coin
    pub origin_address: Option<&'static str>,
}

impl TokenDescriptor {
    pub fn is_native(&self) -> bool {
        self.origin_address.is_none()
    }

    /// Convert a human decimal string ("0.1") into base units of this token
    pub fn parse_amount(&self, input: &str) -> DispatchResult<U256> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.starts_with('-') {
            return Err(DispatchError::InvalidAmount {
                input: input.to_string(),
                reason: "expected a non-negative decimal".to_string(),
            });
        }
        let parsed = parse_units(trimmed, self.decimals).map_err(|e| DispatchError::InvalidAmount {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Ok(parsed.into())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainDescriptor {
    pub key: &'static str,
    pub chain_id: u64,
    pub vm_kind: VmKind,
    pub label: &'static str,
    pub gateway: GatewayAddress,
    pub tokens: Vec<TokenDescriptor>,
}

impl ChainDescriptor {
    /// Find a token by symbol (case-insensitive)
    pub fn token(&self, symbol: &str) -> Option<&TokenDescriptor> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn token_by_settlement_asset(&self, asset: Address) -> Option<&TokenDescriptor> {
        self.tokens.iter().find(|t| t.settlement_asset == asset)
    }

    /// The coin paid as transaction value on this chain
    pub fn native_token(&self) -> Option<&TokenDescriptor> {
        self.tokens.iter().find(|t| t.is_native())
    }

    pub fn evm_gateway(&self) -> DispatchResult<Address> {
        match self.gateway {
            GatewayAddress::Evm(address) => Ok(address),
            GatewayAddress::Svm(_) => Err(DispatchError::NotImplemented {
                operation: format!("gateway call on {} ({})", self.label, self.vm_kind),
            }),
        }
    }
}

/// Chain lookup by key and by numeric id
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
    by_key: HashMap<&'static str, usize>,
    by_id: HashMap<u64, usize>,
}

impl ChainRegistry {
    /// Build a registry from descriptors, rejecting duplicate keys or ids
    pub fn from_chains(chains: Vec<ChainDescriptor>) -> DispatchResult<Self> {
        let mut by_key = HashMap::new();
        let mut by_id = HashMap::new();

        for (idx, chain) in chains.iter().enumerate() {
            if by_key.insert(chain.key, idx).is_some() {
                return Err(DispatchError::Config(format!(
                    "Duplicate chain key {}",
                    chain.key
                )));
            }
            if by_id.insert(chain.chain_id, idx).is_some() {
                return Err(DispatchError::Config(format!(
                    "Duplicate chain id {}",
                    chain.chain_id
                )));
            }
        }

        Ok(Self {
            chains,
            by_key,
            by_id,
        })
    }

    pub fn get(&self, key: &str) -> DispatchResult<&ChainDescriptor> {
        self.by_key
            .get(key)
            .map(|&idx| &self.chains[idx])
            .ok_or_else(|| DispatchError::unknown_chain_key(key))
    }

    /// Resolve a wallet's live chain id back to its descriptor
    pub fn by_id(&self, chain_id: u64) -> DispatchResult<&ChainDescriptor> {
        self.by_id
            .get(&chain_id)
            .map(|&idx| &self.chains[idx])
            .ok_or_else(|| DispatchError::unknown_chain_id(chain_id))
    }

    /// Chain hosting the lending pool
    pub fn settlement_chain(&self) -> DispatchResult<&ChainDescriptor> {
        self.get(DEFAULT_SETTLEMENT_CHAIN)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }

    /// Human label for display only; never used to pick a route
    pub fn label_for(&self, chain_id: u64) -> String {
        match self.by_id(chain_id) {
            Ok(chain) => chain.label.to_string(),
            Err(_) => format!("Chain {}", chain_id),
        }
    }
}

/// Chains reachable on the public testnets
fn testnet_chains() -> Vec<ChainDescriptor> {
    let eth_zrc20 = address!("05BA149A7bd6dC1F937fA9046A9e05C05f3b18b0");
    let usdc_sepolia_zrc20 = address!("cC683A782f4B30c138787CB5576a86AF66fdc31d");
    let sol_zrc20 = address!("ADF73ebA3Ebaa7254E859549A44c74eF7cff7501");

    vec![
        ChainDescriptor {
            key: "zeta_athens",
            chain_id: 7001,
            vm_kind: VmKind::Evm,
            label: "ZetaChain Athens",
            gateway: GatewayAddress::Evm(address!("6c533f7fe93fae114d0954697069df33c9b74fd7")),
            tokens: vec![
                TokenDescriptor {
                    symbol: "ETH",
                    name: "Ethereum",
                    decimals: 18,
                    settlement_asset: eth_zrc20,
                    origin_address: None,
                },
                TokenDescriptor {
                    symbol: "SOL",
                    name: "Solana",
                    decimals: 9,
                    settlement_asset: sol_zrc20,
                    origin_address: None,
                },
                TokenDescriptor {
                    symbol: "USDC",
                    name: "USD Coin",
                    decimals: 6,
                    settlement_asset: usdc_sepolia_zrc20,
                    origin_address: None,
                },
            ],
        },
        ChainDescriptor {
            key: "sepolia",
            chain_id: 11155111,
            vm_kind: VmKind::Evm,
            label: "Sepolia",
            gateway: GatewayAddress::Evm(address!("0c487a766110c85d301d96e33579c5b317fa4995")),
            tokens: vec![
                TokenDescriptor {
                    symbol: "ETH",
                    name: "Ethereum",
                    decimals: 18,
                    settlement_asset: eth_zrc20,
                    origin_address: None,
                },
                TokenDescriptor {
                    symbol: "USDC",
                    name: "USD Coin",
                    decimals: 6,
                    settlement_asset: usdc_sepolia_zrc20,
                    origin_address: Some("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
                },
            ],
        },
        ChainDescriptor {
            key: "base_sepolia",
            chain_id: 84532,
            vm_kind: VmKind::Evm,
            label: "Base Sepolia",
            gateway: GatewayAddress::Evm(address!("0c487a766110c85d301d96e33579c5b317fa4995")),
            tokens: vec![
                TokenDescriptor {
                    symbol: "ETH",
                    name: "Ethereum",
                    decimals: 18,
                    settlement_asset: address!("236b0DE675cC8F46AE186897fCCeFe3370C9eDeD"),
                    origin_address: None,
                },
                TokenDescriptor {
                    symbol: "USDC",
                    name: "USD Coin",
                    decimals: 6,
                    settlement_asset: address!("d0eFed75622e7AA4555EE44F296dA3744E3ceE19"),
                    origin_address: Some("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
                },
            ],
        },
        ChainDescriptor {
            key: "solana_devnet",
            chain_id: 901,
            vm_kind: VmKind::Svm,
            label: "Solana Devnet",
            gateway: GatewayAddress::Svm("94U5AHQMKkV5txNJ17QPXWoh474PheGou6cNP2FEuL1d"),
            tokens: vec![
                TokenDescriptor {
                    symbol: "SOL",
                    name: "Solana",
                    decimals: 9,
                    settlement_asset: sol_zrc20,
                    origin_address: None,
                },
                TokenDescriptor {
                    symbol: "USDC",
                    name: "USD Coin",
                    decimals: 6,
                    settlement_asset: address!("D10932EB3616a937bd4a2652c87E9FeBbAce53e5"),
                    origin_address: Some("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
                },
            ],
        },
    ]
}
