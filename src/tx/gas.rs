//! Gas limit and price selection for signed submissions

use crate::chain::{ChainProvider, GasPrice};
use crate::error::DispatchResult;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::U256;
use tracing::debug;

/// Gas estimator for transactions
pub struct GasEstimator {
    /// Buffer percentage for gas limit (e.g., 20 = 20% buffer)
    gas_limit_buffer_percent: u64,
    /// Buffer percentage for gas price
    gas_price_buffer_percent: u64,
}

impl GasEstimator {
    pub fn new() -> Self {
        Self {
            gas_limit_buffer_percent: 20,
            gas_price_buffer_percent: 10,
        }
    }

    /// Node estimate plus the limit buffer.
    ///
    /// An estimate that reverts surfaces as `RevertedOnChain` and nothing is sent.
    pub async fn estimate_gas_limit(
        &self,
        provider: &ChainProvider,
        tx: &TypedTransaction,
    ) -> DispatchResult<U256> {
        let estimate = provider.estimate_gas(tx).await?;
        let limit = self.buffer_limit(estimate);
        debug!(
            "Gas limit for chain {}: {} (estimate {})",
            provider.chain_id(),
            limit,
            estimate
        );
        Ok(limit)
    }

    fn buffer_limit(&self, estimate: U256) -> U256 {
        estimate + estimate * self.gas_limit_buffer_percent / 100
    }

    /// Buffered price for the chain's strategy, never above the configured ceiling
    pub async fn get_gas_price(&self, provider: &ChainProvider) -> DispatchResult<GasPrice> {
        let gas_price = provider.get_gas_price().await?;
        let buffered = self.buffer_price(gas_price, provider.max_gas_price());
        debug!("Gas price for chain {}: {:?}", provider.chain_id(), buffered);
        Ok(buffered)
    }

    fn buffer_price(&self, gas_price: GasPrice, cap: U256) -> GasPrice {
        let bump = |v: U256| std::cmp::min(v + v * self.gas_price_buffer_percent / 100, cap);
        match gas_price {
            GasPrice::Legacy(price) => GasPrice::Legacy(bump(price)),
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let max_fee_per_gas = bump(max_fee_per_gas);
                GasPrice::Eip1559 {
                    max_fee_per_gas,
                    max_priority_fee_per_gas: std::cmp::min(
                        bump(max_priority_fee_per_gas),
                        max_fee_per_gas,
                    ),
                }
            }
        }
    }

    /// Calculate worst-case cost in wei
    pub fn calculate_cost(gas_limit: U256, gas_price: &GasPrice) -> U256 {
        match gas_price {
            GasPrice::Legacy(price) => gas_limit * *price,
            GasPrice::Eip1559 { max_fee_per_gas, .. } => gas_limit * *max_fee_per_gas,
        }
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new()
    }
}
