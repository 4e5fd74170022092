//! Execution router
//!
//! Takes one [`ActionRequest`] plus the connected wallet and drives it
//! through `Idle → RoutingDecision → {AwaitingApproval →} Submitting →
//! AwaitingConfirmation → Settled`, with `Failed` reachable from every
//! non-terminal state.
//!
//! The path is chosen by comparing the wallet's live chain id with the
//! settlement chain:
//! - Direct: typed lending-pool call, preceded by an approval for
//!   supply/repay, settled after a single confirmation
//! - Relayed: gateway message (with native value for supply/repay),
//!   settled after the relayed confirmation depth. The vault named in the
//!   payload is independent of the coin carried as value.
//!
//! Nothing here retries. A failed request is terminal and the caller starts
//! a fresh dispatch.

use crate::chain::registry::{ChainDescriptor, ChainRegistry};
use crate::error::{DispatchError, DispatchResult};
use crate::gateway::{GatewayClient, RevertPolicy};
use crate::payload::{encode_payload, ActionKind, ActionRequest};
use crate::settlement::SettlementClient;
use crate::tx::allowance::AllowanceSequencer;
use crate::tx::{TxHandle, WalletProvider};

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument, Span};
use uuid::Uuid;

/// Confirmation depth accepted on the direct path
pub const DIRECT_CONFIRMATIONS: u64 = 1;

/// Confirmation depth required before a relayed message counts as settled
pub const RELAYED_CONFIRMATIONS: u64 = 3;

/// Wallet capability, resolved once at the router boundary
#[derive(Clone)]
pub enum ConnectedWallet {
    /// Signs EVM transactions; the chain id is read live on every dispatch
    Evm(Arc<dyn WalletProvider>),
    /// Solana wallet: identifies the user but cannot sign through this layer
    Svm { chain_id: u64, address: String },
}

impl ConnectedWallet {
    pub async fn chain_id(&self) -> DispatchResult<u64> {
        match self {
            ConnectedWallet::Evm(signer) => signer.chain_id().await,
            ConnectedWallet::Svm { chain_id, .. } => Ok(*chain_id),
        }
    }
}

impl fmt::Debug for ConnectedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectedWallet::Evm(signer) => write!(f, "Evm({})", signer.address()),
            ConnectedWallet::Svm { chain_id, address } => {
                write!(f, "Svm({} on {})", address, chain_id)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    Direct,
    Relayed,
}

impl ExecutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPath::Direct => "direct",
            ExecutionPath::Relayed => "relayed",
        }
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure routing decision
pub fn decide_path(connected_chain_id: u64, settlement_chain_id: u64) -> ExecutionPath {
    if connected_chain_id == settlement_chain_id {
        ExecutionPath::Direct
    } else {
        ExecutionPath::Relayed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouterState {
    Idle,
    RoutingDecision,
    AwaitingApproval,
    Submitting,
    AwaitingConfirmation,
    Settled,
    Failed,
}

impl RouterState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RouterState::Settled | RouterState::Failed)
    }

    pub fn can_transition_to(&self, next: RouterState) -> bool {
        use RouterState::*;
        match (self, next) {
            (Settled, _) | (Failed, _) => false,
            (_, Failed) => true,
            (Idle, RoutingDecision) => true,
            (RoutingDecision, AwaitingApproval) | (RoutingDecision, Submitting) => true,
            (AwaitingApproval, Submitting) => true,
            (Submitting, AwaitingConfirmation) => true,
            (AwaitingConfirmation, Settled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RouterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// States visited by one dispatch, in order
#[derive(Debug)]
struct StateTrail {
    states: Vec<RouterState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            states: vec![RouterState::Idle],
        }
    }

    fn current(&self) -> RouterState {
        self.states
            .last()
            .copied()
            .unwrap_or(RouterState::Idle)
    }

    fn advance(&mut self, next: RouterState) -> DispatchResult<()> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(DispatchError::InvalidStateTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        debug!("Router state {} -> {}", current, next);
        self.states.push(next);
        Ok(())
    }

    fn fail(&mut self) {
        if !self.current().is_terminal() {
            self.states.push(RouterState::Failed);
        }
    }
}

/// Report of a settled dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub dispatch_id: Uuid,
    pub path: ExecutionPath,
    pub action: ActionKind,
    /// Approval mined before a direct supply/repay, if one was needed
    pub approval: Option<TxHandle>,
    pub settlement: TxHandle,
    pub states: Vec<RouterState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

struct Settled {
    path: ExecutionPath,
    approval: Option<TxHandle>,
    settlement: TxHandle,
}

pub struct ExecutionRouter {
    registry: &'static ChainRegistry,
    settlement: SettlementClient,
    revert_policy: RevertPolicy,
    direct_confirmations: u64,
    relayed_confirmations: u64,
}

impl ExecutionRouter {
    pub fn new(
        registry: &'static ChainRegistry,
        settlement: SettlementClient,
        revert_policy: RevertPolicy,
    ) -> Self {
        Self {
            registry,
            settlement,
            revert_policy,
            direct_confirmations: DIRECT_CONFIRMATIONS,
            relayed_confirmations: RELAYED_CONFIRMATIONS,
        }
    }

    pub fn with_confirmations(mut self, direct: u64, relayed: u64) -> Self {
        self.direct_confirmations = direct.max(1);
        self.relayed_confirmations = relayed.max(1);
        self
    }

    pub fn settlement(&self) -> &SettlementClient {
        &self.settlement
    }

    /// Run one request to a terminal state
    pub async fn dispatch(
        &self,
        wallet: &ConnectedWallet,
        request: ActionRequest,
    ) -> DispatchResult<DispatchOutcome> {
        let dispatch_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            %dispatch_id,
            action = %request.kind,
            chain_id = tracing::field::Empty
        );

        async move {
            let started_at = Utc::now();
            let mut trail = StateTrail::new();

            match self.execute(wallet, &request, &mut trail).await {
                Ok(settled) => {
                    crate::metrics::record_settled(request.kind.as_str(), settled.path.as_str());
                    info!(
                        "Settled {} via {} path in tx {}",
                        request.kind, settled.path, settled.settlement.tx_hash
                    );
                    Ok(DispatchOutcome {
                        dispatch_id,
                        path: settled.path,
                        action: request.kind,
                        approval: settled.approval,
                        settlement: settled.settlement,
                        states: trail.states,
                        started_at,
                        finished_at: Utc::now(),
                    })
                }
                Err(e) => {
                    trail.fail();
                    crate::metrics::record_failure(e.kind());
                    error!(
                        "Dispatch failed in state {:?}: {} (remedy: {:?})",
                        trail.states.iter().rev().nth(1),
                        e,
                        e.remedy()
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        wallet: &ConnectedWallet,
        request: &ActionRequest,
        trail: &mut StateTrail,
    ) -> DispatchResult<Settled> {
        trail.advance(RouterState::RoutingDecision)?;

        let connected_chain_id = wallet.chain_id().await?;
        Span::current().record("chain_id", connected_chain_id);
        let origin = self.registry.by_id(connected_chain_id)?;
        let path = decide_path(connected_chain_id, self.settlement.chain_id());
        info!(
            "Routing {} from {} ({}) via {} path",
            request.kind, origin.label, connected_chain_id, path
        );

        let signer = match wallet {
            ConnectedWallet::Evm(signer) => signer.as_ref(),
            ConnectedWallet::Svm { .. } => {
                return Err(DispatchError::NotImplemented {
                    operation: format!("{} {} from {}", path, request.kind, origin.label),
                })
            }
        };

        crate::metrics::record_dispatch(request.kind.as_str(), path.as_str());

        match path {
            ExecutionPath::Direct => self.execute_direct(signer, request, trail).await,
            ExecutionPath::Relayed => self.execute_relayed(signer, origin, request, trail).await,
        }
    }

    async fn execute_direct(
        &self,
        signer: &dyn WalletProvider,
        request: &ActionRequest,
        trail: &mut StateTrail,
    ) -> DispatchResult<Settled> {
        let chain_id = self.settlement.chain_id();

        let approval = if request.kind.pulls_value() {
            trail.advance(RouterState::AwaitingApproval)?;
            AllowanceSequencer::new(chain_id, self.direct_confirmations)
                .ensure(
                    signer,
                    request.settlement_asset,
                    self.settlement.lending_pool(),
                    request.amount,
                )
                .await?
                .approval()
                .cloned()
        } else {
            None
        };

        trail.advance(RouterState::Submitting)?;
        let tx_hash = self.settlement.submit_action(signer, request).await?;

        trail.advance(RouterState::AwaitingConfirmation)?;
        let settlement = self
            .confirm(signer, ExecutionPath::Direct, tx_hash, self.direct_confirmations)
            .await?;

        trail.advance(RouterState::Settled)?;
        Ok(Settled {
            path: ExecutionPath::Direct,
            approval,
            settlement,
        })
    }

    async fn execute_relayed(
        &self,
        signer: &dyn WalletProvider,
        origin: &ChainDescriptor,
        request: &ActionRequest,
        trail: &mut StateTrail,
    ) -> DispatchResult<Settled> {
        let gateway = GatewayClient::new(
            origin.chain_id,
            origin.evm_gateway()?,
            self.relayed_confirmations,
        );

        if request.kind.pulls_value() {
            let coin = origin.native_token().map(|t| t.symbol).unwrap_or("native coin");
            debug!(
                "Carrying {} {} as value into vault {}",
                request.amount, coin, request.settlement_asset
            );
        }

        let payload = encode_payload(&request.relay_payload());
        let revert_options = self.revert_policy.options_for(signer.address());
        let destination = self.settlement.lending_pool();

        trail.advance(RouterState::Submitting)?;
        let tx_hash = if request.kind.pulls_value() {
            gateway
                .submit_deposit_with_message(
                    signer,
                    destination,
                    payload,
                    request.amount,
                    revert_options,
                )
                .await?
        } else {
            gateway
                .submit_call_with_message(signer, destination, payload, revert_options)
                .await?
        };

        trail.advance(RouterState::AwaitingConfirmation)?;
        let started = Instant::now();
        let settlement = gateway.await_confirmation(signer, tx_hash).await?;
        self.record_confirmed(ExecutionPath::Relayed, &settlement, started);

        trail.advance(RouterState::Settled)?;
        Ok(Settled {
            path: ExecutionPath::Relayed,
            approval: None,
            settlement,
        })
    }

    async fn confirm(
        &self,
        signer: &dyn WalletProvider,
        path: ExecutionPath,
        tx_hash: B256,
        confirmations: u64,
    ) -> DispatchResult<TxHandle> {
        let started = Instant::now();
        let handle = signer.wait_for_confirmations(tx_hash, confirmations).await?;
        self.record_confirmed(path, &handle, started);
        Ok(handle)
    }

    fn record_confirmed(&self, path: ExecutionPath, handle: &TxHandle, started: Instant) {
        crate::metrics::record_tx_confirmed(handle.chain_id);
        crate::metrics::record_confirmation_latency(path.as_str(), started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::registry::registry;
    use crate::contracts::{IGatewayEVM, ILendingPool};
    use crate::identity::UniversalIdentity;
    use crate::payload::decode_payload;
    use crate::tx::wallet::MockWalletProvider;
    use alloy_primitives::{address, Address, U256};
    use alloy_sol_types::SolCall;

    const POOL: Address = address!("00000000000000000000000000000000000000aa");
    const USER: Address = address!("00000000000000000000000000000000000000bb");
    const GATEWAY: Address = address!("0c487a766110c85d301d96e33579c5b317fa4995");
    const ETH_ZRC20: Address = address!("05BA149A7bd6dC1F937fA9046A9e05C05f3b18b0");

    fn router() -> ExecutionRouter {
        ExecutionRouter::new(
            registry(),
            SettlementClient::new(7001, POOL),
            RevertPolicy::default(),
        )
    }

    fn handle(chain_id: u64, hash: B256, depth: u64) -> TxHandle {
        TxHandle {
            chain_id,
            tx_hash: hash,
            block_number: 1_000,
            confirmations: depth,
        }
    }

    fn wallet_on(chain_id: u64) -> MockWalletProvider {
        let mut wallet = MockWalletProvider::new();
        wallet.expect_address().return_const(USER);
        wallet.expect_chain_id().returning(move || Ok(chain_id));
        wallet
    }

    #[test]
    fn test_decide_path_is_pure() {
        for (connected, settlement) in [(7001, 7001), (11155111, 7001), (901, 7001)] {
            let first = decide_path(connected, settlement);
            assert_eq!(first, decide_path(connected, settlement));
        }
        assert_eq!(decide_path(7001, 7001), ExecutionPath::Direct);
        assert_eq!(decide_path(84532, 7001), ExecutionPath::Relayed);
    }

    #[test]
    fn test_state_transitions() {
        use RouterState::*;
        assert!(Idle.can_transition_to(RoutingDecision));
        assert!(RoutingDecision.can_transition_to(Submitting));
        assert!(AwaitingApproval.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Submitting));
        assert!(!Settled.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Idle));

        let mut trail = StateTrail::new();
        let err = trail.advance(Settled).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_relayed_supply_sends_value_with_zero_payload_amount() {
        let tx_hash = B256::repeat_byte(0x01);
        let mut wallet = wallet_on(11155111);
        wallet.expect_call().never();
        wallet.expect_submit().times(1).returning(move |call| {
            assert_eq!(call.to, GATEWAY);
            assert_eq!(call.value, U256::from(100_000_000_000_000_000u64));
            let decoded = IGatewayEVM::depositAndCallCall::abi_decode(&call.data, true).unwrap();
            assert_eq!(decoded.receiver, POOL);
            assert_eq!(decoded.revertOptions.revertAddress, USER);
            assert!(decoded.revertOptions.callOnRevert);

            let payload = decode_payload(&decoded.payload).unwrap();
            assert_eq!(payload.kind, ActionKind::Supply);
            assert_eq!(payload.amount, U256::ZERO);
            assert_eq!(payload.settlement_asset, ETH_ZRC20);
            Ok(tx_hash)
        });
        wallet
            .expect_wait_for_confirmations()
            .withf(move |hash, depth| *hash == tx_hash && *depth == 3)
            .times(1)
            .returning(|hash, depth| Ok(handle(11155111, hash, depth)));

        let eth = registry().get("sepolia").unwrap().token("ETH").unwrap();
        let request = ActionRequest {
            kind: ActionKind::Supply,
            beneficiary: UniversalIdentity::from_evm(11155111, USER),
            settlement_asset: eth.settlement_asset,
            counter_asset: Address::ZERO,
            amount: eth.parse_amount("0.1").unwrap(),
        };

        let outcome = router()
            .dispatch(&ConnectedWallet::Evm(Arc::new(wallet)), request)
            .await
            .unwrap();
        assert_eq!(outcome.path, ExecutionPath::Relayed);
        assert!(outcome.approval.is_none());
        assert_eq!(outcome.settlement.confirmations, 3);
        assert_eq!(
            outcome.states,
            vec![
                RouterState::Idle,
                RouterState::RoutingDecision,
                RouterState::Submitting,
                RouterState::AwaitingConfirmation,
                RouterState::Settled,
            ]
        );
    }

    #[tokio::test]
    async fn test_direct_borrow_to_solana_address_skips_approval() {
        let solana_user = "11111111111111111111111111111111";
        let tx_hash = B256::repeat_byte(0x02);
        let mut wallet = wallet_on(7001);
        wallet.expect_call().never();
        wallet.expect_submit().times(1).returning(move |call| {
            assert_eq!(call.to, POOL);
            assert_eq!(call.value, U256::ZERO);
            let decoded = ILendingPool::borrowCall::abi_decode(&call.data, true).unwrap();
            assert_eq!(decoded.amount, U256::from(10_000_000u64));
            assert_eq!(decoded.onBehalfOf.chainId, U256::from(901u64));
            assert_eq!(decoded.onBehalfOf.identity.as_ref(), &[0u8; 32]);
            Ok(tx_hash)
        });
        wallet
            .expect_wait_for_confirmations()
            .withf(move |hash, depth| *hash == tx_hash && *depth == 1)
            .times(1)
            .returning(|hash, depth| Ok(handle(7001, hash, depth)));

        let usdc = registry().get("solana_devnet").unwrap().token("USDC").unwrap();
        let request = ActionRequest {
            kind: ActionKind::Borrow,
            beneficiary: UniversalIdentity::parse(901, solana_user).unwrap(),
            settlement_asset: usdc.settlement_asset,
            counter_asset: usdc.settlement_asset,
            amount: usdc.parse_amount("10").unwrap(),
        };

        let outcome = tokio_test::assert_ok!(
            router()
                .dispatch(&ConnectedWallet::Evm(Arc::new(wallet)), request)
                .await
        );
        assert_eq!(outcome.path, ExecutionPath::Direct);
        assert!(outcome.approval.is_none());
        assert!(!outcome.states.contains(&RouterState::AwaitingApproval));
    }

    #[tokio::test]
    async fn test_direct_supply_approves_before_submitting() {
        let approve_hash = B256::repeat_byte(0x0a);
        let supply_hash = B256::repeat_byte(0x0b);
        let mut wallet = wallet_on(7001);
        wallet
            .expect_call()
            .times(1)
            .returning(|_| Ok(U256::ZERO.to_be_bytes::<32>().to_vec().into()));
        let mut seq = mockall::Sequence::new();
        wallet
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |call| {
                assert_eq!(call.to, ETH_ZRC20);
                Ok(approve_hash)
            });
        wallet
            .expect_wait_for_confirmations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|hash, depth| Ok(handle(7001, hash, depth)));
        wallet
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |call| {
                assert_eq!(call.to, POOL);
                assert_eq!(call.data[..4], ILendingPool::supplyCall::SELECTOR);
                Ok(supply_hash)
            });
        wallet
            .expect_wait_for_confirmations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|hash, depth| Ok(handle(7001, hash, depth)));

        let request = ActionRequest {
            kind: ActionKind::Supply,
            beneficiary: UniversalIdentity::from_evm(7001, USER),
            settlement_asset: ETH_ZRC20,
            counter_asset: Address::ZERO,
            amount: U256::from(5),
        };
        let outcome = router()
            .dispatch(&ConnectedWallet::Evm(Arc::new(wallet)), request)
            .await
            .unwrap();
        assert_eq!(outcome.approval.unwrap().tx_hash, approve_hash);
        assert_eq!(outcome.settlement.tx_hash, supply_hash);
        assert!(outcome.states.contains(&RouterState::AwaitingApproval));
    }

    #[tokio::test]
    async fn test_unknown_chain_attempts_no_transaction() {
        let mut wallet = wallet_on(999999);
        wallet.expect_call().never();
        wallet.expect_submit().never();
        wallet.expect_wait_for_confirmations().never();

        let request = ActionRequest {
            kind: ActionKind::Withdraw,
            beneficiary: UniversalIdentity::from_evm(999999, USER),
            settlement_asset: ETH_ZRC20,
            counter_asset: Address::ZERO,
            amount: U256::from(1),
        };
        let err = router()
            .dispatch(&ConnectedWallet::Evm(Arc::new(wallet)), request)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownChain { ref chain } if chain == "999999"));
    }

    #[tokio::test]
    async fn test_solana_wallet_relayed_is_not_implemented() {
        let wallet = ConnectedWallet::Svm {
            chain_id: 901,
            address: "11111111111111111111111111111111".to_string(),
        };
        let request = ActionRequest {
            kind: ActionKind::Supply,
            beneficiary: UniversalIdentity::parse(901, "11111111111111111111111111111111")
                .unwrap(),
            settlement_asset: address!("ADF73ebA3Ebaa7254E859549A44c74eF7cff7501"),
            counter_asset: Address::ZERO,
            amount: U256::from(1),
        };
        let err = router().dispatch(&wallet, request).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotImplemented { .. }));
    }

    #[tokio::test]
    async fn test_relayed_supply_from_base_into_eth_vault() {
        let tx_hash = B256::repeat_byte(0x03);
        let mut wallet = wallet_on(84532);
        wallet.expect_call().never();
        wallet.expect_submit().times(1).returning(move |call| {
            assert_eq!(call.to, GATEWAY);
            assert_eq!(call.value, U256::from(2_000_000_000_000_000u64));
            let decoded = IGatewayEVM::depositAndCallCall::abi_decode(&call.data, true).unwrap();
            let payload = decode_payload(&decoded.payload).unwrap();
            assert_eq!(payload.kind, ActionKind::Supply);
            assert_eq!(payload.settlement_asset, ETH_ZRC20);
            assert_eq!(payload.amount, U256::ZERO);
            Ok(tx_hash)
        });
        wallet
            .expect_wait_for_confirmations()
            .withf(move |hash, depth| *hash == tx_hash && *depth == 3)
            .times(1)
            .returning(|hash, depth| Ok(handle(84532, hash, depth)));

        let request = ActionRequest {
            kind: ActionKind::Supply,
            beneficiary: UniversalIdentity::from_evm(84532, USER),
            settlement_asset: ETH_ZRC20,
            counter_asset: Address::ZERO,
            amount: U256::from(2_000_000_000_000_000u64),
        };
        let outcome = router()
            .dispatch(&ConnectedWallet::Evm(Arc::new(wallet)), request)
            .await
            .unwrap();
        assert_eq!(outcome.path, ExecutionPath::Relayed);
        assert_eq!(outcome.settlement.tx_hash, tx_hash);
    }

    #[tokio::test]
    async fn test_relayed_borrow_sends_message_only() {
        let tx_hash = B256::repeat_byte(0x04);
        let amount = U256::from(10_000_000u64);
        let mut wallet = wallet_on(11155111);
        wallet.expect_call().never();
        wallet.expect_submit().times(1).returning(move |call| {
            assert_eq!(call.to, GATEWAY);
            assert_eq!(call.value, U256::ZERO);
            assert_eq!(call.data[..4], IGatewayEVM::callCall::SELECTOR);
            let decoded = IGatewayEVM::callCall::abi_decode(&call.data, true).unwrap();
            assert_eq!(decoded.receiver, POOL);
            let payload = decode_payload(&decoded.payload).unwrap();
            assert_eq!(payload.kind, ActionKind::Borrow);
            assert_eq!(payload.amount, amount);
            Ok(tx_hash)
        });
        wallet
            .expect_wait_for_confirmations()
            .withf(move |hash, depth| *hash == tx_hash && *depth == 3)
            .times(1)
            .returning(|hash, depth| Ok(handle(11155111, hash, depth)));

        let usdc = registry().get("sepolia").unwrap().token("USDC").unwrap();
        let request = ActionRequest {
            kind: ActionKind::Borrow,
            beneficiary: UniversalIdentity::from_evm(11155111, USER),
            settlement_asset: usdc.settlement_asset,
            counter_asset: usdc.settlement_asset,
            amount,
        };
        let outcome = router()
            .dispatch(&ConnectedWallet::Evm(Arc::new(wallet)), request)
            .await
            .unwrap();
        assert_eq!(outcome.path, ExecutionPath::Relayed);
        assert!(outcome.approval.is_none());
        assert_eq!(outcome.settlement.confirmations, 3);
    }

    #[tokio::test]
    async fn test_submission_failure_is_not_retried() {
        let mut wallet = wallet_on(84532);
        wallet.expect_submit().times(1).returning(|_| {
            Err(DispatchError::SubmissionFailure {
                chain_id: 84532,
                reason: "user rejected".to_string(),
            })
        });
        wallet.expect_wait_for_confirmations().never();

        let request = ActionRequest {
            kind: ActionKind::Withdraw,
            beneficiary: UniversalIdentity::from_evm(84532, USER),
            settlement_asset: ETH_ZRC20,
            counter_asset: Address::ZERO,
            amount: U256::from(1),
        };
        let err = router()
            .dispatch(&ConnectedWallet::Evm(Arc::new(wallet)), request)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
