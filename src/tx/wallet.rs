//! Wallet/provider boundary
//!
//! Everything that touches a node or a signer goes through [`WalletProvider`]:
//! the live chain id, read-only calls, submission and confirmation waiting.

use crate::error::{DispatchError, DispatchResult};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::Serialize;

/// A contract invocation ready to be read or submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Solidity signature, for logs
    pub signature: &'static str,
}

impl ContractCall {
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            to,
            data: Bytes::from(call.abi_encode()),
            value: U256::ZERO,
            signature: C::SIGNATURE,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Decode the return data of a read of `C`
pub fn decode_returns<C: SolCall>(data: &[u8]) -> DispatchResult<C::Return> {
    C::abi_decode_returns(data, true).map_err(|e| {
        DispatchError::AbiDecoding(format!("{} returned malformed data: {}", C::SIGNATURE, e))
    })
}

/// A mined transaction surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxHandle {
    pub chain_id: u64,
    pub tx_hash: B256,
    pub block_number: u64,
    pub confirmations: u64,
}

/// Signer plus node connection for the chain the wallet is currently on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Account that signs and pays for submissions
    fn address(&self) -> Address;

    /// Chain the wallet is connected to right now
    async fn chain_id(&self) -> DispatchResult<u64>;

    /// Execute a read-only call against the latest block
    async fn call(&self, call: ContractCall) -> DispatchResult<Bytes>;

    /// Sign and broadcast; resolves once the node has accepted the transaction
    async fn submit(&self, call: ContractCall) -> DispatchResult<B256>;

    /// Block until the transaction is mined and `confirmations` deep.
    ///
    /// No timeout is applied; callers bound the wait themselves. Dropping the
    /// future abandons the wait but not the transaction.
    async fn wait_for_confirmations(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> DispatchResult<TxHandle>;
}
