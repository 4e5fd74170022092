//! Gateway client for relayed actions
//!
//! Two primitives against an origin chain's gateway contract:
//! - `depositAndCall`: forwards native value plus an opaque message
//! - `call`: forwards the message only
//!
//! `deposit_with_message` and `call_with_message` are one-shot: submit, then
//! block until the relayed-path confirmation depth. Callers that track
//! progress between the two steps (the router) use `submit_*` and
//! `await_confirmation` separately.

use crate::contracts::{IGatewayEVM, RevertOptions};
use crate::error::DispatchResult;
use crate::tx::{ContractCall, TxHandle, WalletProvider};

use alloy_primitives::{Address, Bytes, B256, U256};
use tracing::{debug, info};

/// How a failed relayed call is unwound on the destination side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertPolicy {
    pub abort_address: Address,
    pub revert_message: Bytes,
    pub on_revert_gas_limit: U256,
}

impl Default for RevertPolicy {
    fn default() -> Self {
        Self {
            abort_address: Address::ZERO,
            revert_message: Bytes::from_static(b"Revert"),
            on_revert_gas_limit: U256::from(100_000_000u64),
        }
    }
}

impl RevertPolicy {
    /// Revert options returning funds and control to `initiator`
    pub fn options_for(&self, initiator: Address) -> RevertOptions {
        RevertOptions {
            revertAddress: initiator,
            callOnRevert: true,
            abortAddress: self.abort_address,
            revertMessage: self.revert_message.clone(),
            onRevertGasLimit: self.on_revert_gas_limit,
        }
    }
}

/// Client for one chain's gateway contract
pub struct GatewayClient {
    chain_id: u64,
    gateway: Address,
    confirmations: u64,
}

impl GatewayClient {
    pub fn new(chain_id: u64, gateway: Address, confirmations: u64) -> Self {
        Self {
            chain_id,
            gateway,
            confirmations,
        }
    }

    pub fn gateway(&self) -> Address {
        self.gateway
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }

    pub fn deposit_call(
        &self,
        destination: Address,
        payload: Bytes,
        native_value: U256,
        revert_options: RevertOptions,
    ) -> ContractCall {
        ContractCall::new(
            self.gateway,
            &IGatewayEVM::depositAndCallCall {
                receiver: destination,
                payload,
                revertOptions: revert_options,
            },
        )
        .with_value(native_value)
    }

    pub fn message_call(
        &self,
        destination: Address,
        payload: Bytes,
        revert_options: RevertOptions,
    ) -> ContractCall {
        ContractCall::new(
            self.gateway,
            &IGatewayEVM::callCall {
                receiver: destination,
                payload,
                revertOptions: revert_options,
            },
        )
    }

    /// Submit a value-bearing message; returns as soon as the node accepts it
    pub async fn submit_deposit_with_message(
        &self,
        wallet: &dyn WalletProvider,
        destination: Address,
        payload: Bytes,
        native_value: U256,
        revert_options: RevertOptions,
    ) -> DispatchResult<B256> {
        let call = self.deposit_call(destination, payload, native_value, revert_options);
        let tx_hash = wallet.submit(call).await?;
        info!(
            "depositAndCall {} submitted via gateway {} on chain {} (value {})",
            tx_hash, self.gateway, self.chain_id, native_value
        );
        Ok(tx_hash)
    }

    /// Submit a message-only call; returns as soon as the node accepts it
    pub async fn submit_call_with_message(
        &self,
        wallet: &dyn WalletProvider,
        destination: Address,
        payload: Bytes,
        revert_options: RevertOptions,
    ) -> DispatchResult<B256> {
        let call = self.message_call(destination, payload, revert_options);
        let tx_hash = wallet.submit(call).await?;
        info!(
            "call {} submitted via gateway {} on chain {}",
            tx_hash, self.gateway, self.chain_id
        );
        Ok(tx_hash)
    }

    /// Wait until a submitted gateway transaction is deep enough to report
    pub async fn await_confirmation(
        &self,
        wallet: &dyn WalletProvider,
        tx_hash: B256,
    ) -> DispatchResult<TxHandle> {
        debug!(
            "Waiting for {} confirmations of {} on chain {}",
            self.confirmations, tx_hash, self.chain_id
        );
        wallet
            .wait_for_confirmations(tx_hash, self.confirmations)
            .await
    }

    /// Submit `depositAndCall` and wait for the configured depth
    pub async fn deposit_with_message(
        &self,
        wallet: &dyn WalletProvider,
        destination: Address,
        payload: Bytes,
        native_value: U256,
        revert_options: RevertOptions,
    ) -> DispatchResult<TxHandle> {
        let tx_hash = self
            .submit_deposit_with_message(wallet, destination, payload, native_value, revert_options)
            .await?;
        self.await_confirmation(wallet, tx_hash).await
    }

    /// Submit `call` and wait for the configured depth
    pub async fn call_with_message(
        &self,
        wallet: &dyn WalletProvider,
        destination: Address,
        payload: Bytes,
        revert_options: RevertOptions,
    ) -> DispatchResult<TxHandle> {
        let tx_hash = self
            .submit_call_with_message(wallet, destination, payload, revert_options)
            .await?;
        self.await_confirmation(wallet, tx_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::wallet::MockWalletProvider;
    use alloy_primitives::address;
    use alloy_sol_types::SolCall;

    const GATEWAY: Address = address!("0c487a766110c85d301d96e33579c5b317fa4995");
    const POOL: Address = address!("00000000000000000000000000000000000000aa");
    const USER: Address = address!("00000000000000000000000000000000000000bb");

    #[test]
    fn test_revert_options_point_back_to_initiator() {
        let options = RevertPolicy::default().options_for(USER);
        assert_eq!(options.revertAddress, USER);
        assert!(options.callOnRevert);
        assert_eq!(options.abortAddress, Address::ZERO);
        assert_eq!(options.revertMessage.as_ref(), b"Revert");
        assert_eq!(options.onRevertGasLimit, U256::from(100_000_000u64));
    }

    #[tokio::test]
    async fn test_deposit_with_message_waits_for_depth() {
        let client = GatewayClient::new(11155111, GATEWAY, 3);
        let payload = Bytes::from_static(b"\x01\x02");
        let expected_payload = payload.clone();
        let tx_hash = B256::repeat_byte(0xab);

        let mut wallet = MockWalletProvider::new();
        wallet.expect_submit().times(1).returning(move |call| {
            assert_eq!(call.to, GATEWAY);
            assert_eq!(call.value, U256::from(7));
            let decoded = IGatewayEVM::depositAndCallCall::abi_decode(&call.data, true).unwrap();
            assert_eq!(decoded.receiver, POOL);
            assert_eq!(decoded.payload, expected_payload);
            assert_eq!(decoded.revertOptions.revertAddress, USER);
            Ok(tx_hash)
        });
        wallet
            .expect_wait_for_confirmations()
            .withf(move |hash, depth| *hash == tx_hash && *depth == 3)
            .times(1)
            .returning(|hash, depth| {
                Ok(TxHandle {
                    chain_id: 11155111,
                    tx_hash: hash,
                    block_number: 100,
                    confirmations: depth,
                })
            });

        let handle = client
            .deposit_with_message(
                &wallet,
                POOL,
                payload,
                U256::from(7),
                RevertPolicy::default().options_for(USER),
            )
            .await
            .unwrap();
        assert_eq!(handle.confirmations, 3);
    }

    #[tokio::test]
    async fn test_call_with_message_waits_for_depth() {
        let client = GatewayClient::new(84532, GATEWAY, 3);
        let tx_hash = B256::repeat_byte(0xcd);

        let mut wallet = MockWalletProvider::new();
        wallet.expect_submit().times(1).returning(move |call| {
            assert_eq!(call.value, U256::ZERO);
            assert_eq!(call.data[..4], IGatewayEVM::callCall::SELECTOR);
            Ok(tx_hash)
        });
        wallet
            .expect_wait_for_confirmations()
            .withf(move |hash, depth| *hash == tx_hash && *depth == 3)
            .times(1)
            .returning(|hash, depth| {
                Ok(TxHandle {
                    chain_id: 84532,
                    tx_hash: hash,
                    block_number: 200,
                    confirmations: depth,
                })
            });

        let handle = client
            .call_with_message(
                &wallet,
                POOL,
                Bytes::from_static(b"msg"),
                RevertPolicy::default().options_for(USER),
            )
            .await
            .unwrap();
        assert_eq!(handle.tx_hash, tx_hash);
    }

    #[test]
    fn test_message_call_carries_no_value() {
        let client = GatewayClient::new(84532, GATEWAY, 3);
        let call = client.message_call(
            POOL,
            Bytes::from_static(b"msg"),
            RevertPolicy::default().options_for(USER),
        );
        assert_eq!(call.value, U256::ZERO);
        assert_eq!(call.data[..4], IGatewayEVM::callCall::SELECTOR);
    }
}
