//! Chain provider with multi-RPC support and automatic failover
//!
//! Reads rotate through the configured URLs at most once. Raw transaction
//! broadcast is never repeated against another endpoint.

use crate::config::{ChainConfig, GasPriceStrategy};
use crate::error::{DispatchError, DispatchResult};

use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Default priority fee for EIP-1559 chains (2 gwei)
const DEFAULT_PRIORITY_FEE: u64 = 2_000_000_000;

/// Multi-provider wrapper with automatic failover
pub struct ChainProvider {
    chain_id: u64,
    config: ChainConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a provider for a registered chain
    pub fn new(chain_id: u64, config: ChainConfig) -> DispatchResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(DispatchError::Config(format!(
                "Chain {} has no valid RPC providers",
                chain_id
            )));
        }

        Ok(Self {
            chain_id,
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.chain_id, next);
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn gas_price_strategy(&self) -> GasPriceStrategy {
        self.config.gas_price_strategy
    }

    fn node_error(&self, e: impl std::fmt::Display) -> DispatchError {
        DispatchError::SubmissionFailure {
            chain_id: self.chain_id,
            reason: e.to_string(),
        }
    }

    fn all_failed(&self, what: &str) -> DispatchError {
        DispatchError::SubmissionFailure {
            chain_id: self.chain_id,
            reason: format!("All providers failed to {}", what),
        }
    }

    /// Chain id reported by the node
    pub async fn get_chain_id(&self) -> DispatchResult<u64> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_chainid().await {
                Ok(id) => return Ok(id.as_u64()),
                Err(e) => {
                    warn!("Failed to get chain id from chain {}: {}", self.chain_id, e);
                    self.failover();
                }
            }
        }
        Err(self.all_failed("get chain id"))
    }

    /// Get current block number with failover
    pub async fn get_block_number(&self) -> DispatchResult<u64> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_block_number().await {
                Ok(block) => return Ok(block.as_u64()),
                Err(e) => {
                    warn!(
                        "Failed to get block number from chain {}: {}",
                        self.chain_id, e
                    );
                    self.failover();
                }
            }
        }
        Err(self.all_failed("get block number"))
    }

    /// Get transaction receipt with failover
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> DispatchResult<Option<TransactionReceipt>> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_transaction_receipt(tx_hash).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) => {
                    warn!(
                        "Failed to get receipt {:?} from chain {}: {}",
                        tx_hash, self.chain_id, e
                    );
                    self.failover();
                }
            }
        }
        Err(self.all_failed("get transaction receipt"))
    }

    /// Read-only call against the latest block
    pub async fn call(&self, tx: &TypedTransaction) -> DispatchResult<Bytes> {
        for _ in 0..self.http_providers.len() {
            match self.http().call(tx, None).await {
                Ok(data) => return Ok(data),
                Err(e) if is_execution_revert(&e.to_string()) => {
                    return Err(DispatchError::RevertedOnChain {
                        chain_id: self.chain_id,
                        tx_hash: None,
                        reason: e.to_string(),
                    })
                }
                Err(e) => {
                    warn!("eth_call failed on chain {}: {}", self.chain_id, e);
                    self.failover();
                }
            }
        }
        Err(self.all_failed("execute eth_call"))
    }

    /// Pending nonce of an account
    pub async fn get_transaction_count(&self, address: Address) -> DispatchResult<U256> {
        for _ in 0..self.http_providers.len() {
            match self
                .http()
                .get_transaction_count(address, Some(BlockNumber::Pending.into()))
                .await
            {
                Ok(nonce) => return Ok(nonce),
                Err(e) => {
                    warn!("Failed to get nonce from chain {}: {}", self.chain_id, e);
                    self.failover();
                }
            }
        }
        Err(self.all_failed("get transaction count"))
    }

    /// Estimate gas for a transaction.
    ///
    /// A revert during estimation means the transaction would revert if
    /// mined, so it is reported as [`DispatchError::RevertedOnChain`].
    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> DispatchResult<U256> {
        for _ in 0..self.http_providers.len() {
            match self.http().estimate_gas(tx, None).await {
                Ok(gas) => return Ok(gas),
                Err(e) if is_execution_revert(&e.to_string()) => {
                    return Err(DispatchError::RevertedOnChain {
                        chain_id: self.chain_id,
                        tx_hash: None,
                        reason: e.to_string(),
                    })
                }
                Err(e) => {
                    warn!("Gas estimation failed on chain {}: {}", self.chain_id, e);
                    self.failover();
                }
            }
        }
        Err(self.all_failed("estimate gas"))
    }

    /// Get current gas price based on chain strategy
    pub async fn get_gas_price(&self) -> DispatchResult<GasPrice> {
        match self.config.gas_price_strategy {
            GasPriceStrategy::Legacy => {
                let price = self.legacy_gas_price().await?;
                Ok(GasPrice::Legacy(std::cmp::min(price, self.max_gas_price())))
            }
            GasPriceStrategy::Eip1559 => {
                let (max_fee, priority_fee) = self.estimate_eip1559_fees().await?;
                Ok(GasPrice::Eip1559 {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority_fee,
                })
            }
        }
    }

    async fn legacy_gas_price(&self) -> DispatchResult<U256> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_gas_price().await {
                Ok(price) => return Ok(price),
                Err(e) => {
                    warn!("Failed to get gas price from chain {}: {}", self.chain_id, e);
                    self.failover();
                }
            }
        }
        Err(self.all_failed("get gas price"))
    }

    /// Estimate EIP-1559 fees
    async fn estimate_eip1559_fees(&self) -> DispatchResult<(U256, U256)> {
        let mut latest = None;
        for _ in 0..self.http_providers.len() {
            match self.http().get_block(BlockNumber::Latest).await {
                Ok(block) => {
                    latest = Some(block.ok_or_else(|| self.node_error("No latest block"))?);
                    break;
                }
                Err(e) => {
                    warn!("Failed to get latest block from chain {}: {}", self.chain_id, e);
                    self.failover();
                }
            }
        }
        let block = latest.ok_or_else(|| self.all_failed("get latest block"))?;

        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| self.node_error("No base fee in block"))?;

        Ok(eip1559_fees(
            base_fee,
            U256::from(DEFAULT_PRIORITY_FEE),
            self.max_gas_price(),
        ))
    }

    /// Configured price ceiling in wei
    pub fn max_gas_price(&self) -> U256 {
        U256::from(self.config.max_gas_price_gwei) * U256::from(1_000_000_000u64)
    }

    /// Broadcast a signed transaction. Not retried on other endpoints.
    pub async fn send_raw_transaction(&self, raw: Bytes) -> DispatchResult<H256> {
        let pending = self
            .http()
            .send_raw_transaction(raw)
            .await
            .map_err(|e| self.node_error(e))?;
        Ok(pending.tx_hash())
    }
}

/// Max fee = 2 * base fee + priority fee, capped; priority never exceeds max fee
fn eip1559_fees(base_fee: U256, priority_fee: U256, cap: U256) -> (U256, U256) {
    let max_fee = std::cmp::min(base_fee * 2 + priority_fee, cap);
    (max_fee, std::cmp::min(priority_fee, max_fee))
}

fn is_execution_revert(message: &str) -> bool {
    message.to_ascii_lowercase().contains("execution reverted")
}

/// Gas price types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasPrice {
    Legacy(U256),
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}
