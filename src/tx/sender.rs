//! Local-key EVM wallet backed by a [`ChainProvider`]
//!
//! Signs with an ethers `LocalWallet`, prices with the chain's gas strategy
//! and broadcasts once. Nothing is retried here; a rejected or failed
//! broadcast is returned to the router as `SubmissionFailure`.

use super::gas::GasEstimator;
use super::wallet::{ContractCall, TxHandle, WalletProvider};
use crate::chain::{ChainProvider, ConfirmationTracker, GasPrice};
use crate::error::{DispatchError, DispatchResult};

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Eip1559TransactionRequest, TransactionRequest, H160, U256 as EthU256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// EVM signer connected to one chain
pub struct EvmWallet {
    provider: Arc<ChainProvider>,
    signer: LocalWallet,
    gas_estimator: GasEstimator,
    tracker: ConfirmationTracker,
}

impl EvmWallet {
    pub fn new(
        provider: Arc<ChainProvider>,
        private_key: &str,
        poll_interval: Duration,
    ) -> DispatchResult<Self> {
        let signer = private_key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| DispatchError::Config(format!("Invalid private key: {}", e)))?
            .with_chain_id(provider.chain_id());

        info!(
            "Wallet {:?} connected to chain {}",
            signer.address(),
            provider.chain_id()
        );

        Ok(Self {
            tracker: ConfirmationTracker::new(provider.clone(), poll_interval),
            provider,
            signer,
            gas_estimator: GasEstimator::new(),
        })
    }

    fn submission_failed(&self, e: impl std::fmt::Display) -> DispatchError {
        DispatchError::SubmissionFailure {
            chain_id: self.provider.chain_id(),
            reason: e.to_string(),
        }
    }

    /// Unsigned transaction for `call`; the gas limit is filled in after estimation
    fn build_tx(&self, call: &ContractCall, nonce: EthU256, gas_price: &GasPrice) -> TypedTransaction {
        let from = self.signer.address();
        let to = to_ethers_address(call.to);
        let data = ethers::types::Bytes::from(call.data.to_vec());
        let value = to_ethers_u256(call.value);
        let chain_id = self.provider.chain_id();

        match gas_price {
            GasPrice::Legacy(price) => TypedTransaction::Legacy(
                TransactionRequest::new()
                    .from(from)
                    .to(to)
                    .data(data)
                    .value(value)
                    .nonce(nonce)
                    .gas_price(*price)
                    .chain_id(chain_id),
            ),
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => TypedTransaction::Eip1559(
                Eip1559TransactionRequest::new()
                    .from(from)
                    .to(to)
                    .data(data)
                    .value(value)
                    .nonce(nonce)
                    .max_fee_per_gas(*max_fee_per_gas)
                    .max_priority_fee_per_gas(*max_priority_fee_per_gas)
                    .chain_id(chain_id),
            ),
        }
    }
}

#[async_trait]
impl WalletProvider for EvmWallet {
    fn address(&self) -> Address {
        Address::from(self.signer.address().0)
    }

    async fn chain_id(&self) -> DispatchResult<u64> {
        self.provider.get_chain_id().await
    }

    async fn call(&self, call: ContractCall) -> DispatchResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(self.signer.address())
            .to(to_ethers_address(call.to))
            .data(call.data.to_vec())
            .value(to_ethers_u256(call.value))
            .into();
        debug!("eth_call {} on {}", call.signature, call.to);
        let data = self.provider.call(&tx).await?;
        Ok(Bytes::from(data.to_vec()))
    }

    async fn submit(&self, call: ContractCall) -> DispatchResult<B256> {
        let nonce = self
            .provider
            .get_transaction_count(self.signer.address())
            .await?;
        let gas_price = self.gas_estimator.get_gas_price(&self.provider).await?;

        let mut tx = self.build_tx(&call, nonce, &gas_price);
        let gas_limit = self
            .gas_estimator
            .estimate_gas_limit(&self.provider, &tx)
            .await?;
        tx.set_gas(gas_limit);

        debug!(
            "Signing {} to {} (nonce {}, gas {}, max cost {})",
            call.signature,
            call.to,
            nonce,
            gas_limit,
            GasEstimator::calculate_cost(gas_limit, &gas_price)
        );

        let signature = self
            .signer
            .sign_transaction(&tx)
            .await
            .map_err(|e| self.submission_failed(format!("signing failed: {}", e)))?;
        let raw = tx.rlp_signed(&signature);

        let tx_hash = self.provider.send_raw_transaction(raw).await?;
        info!(
            "Transaction sent: {:?} ({} on chain {})",
            tx_hash,
            call.signature,
            self.provider.chain_id()
        );
        Ok(B256::from(tx_hash.0))
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> DispatchResult<TxHandle> {
        self.tracker.wait(tx_hash, confirmations).await
    }
}

fn to_ethers_address(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn to_ethers_u256(value: alloy_primitives::U256) -> EthU256 {
    EthU256::from_big_endian(&value.to_be_bytes::<32>())
}
