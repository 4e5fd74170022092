//! Typed access to the lending pool on the settlement chain
//!
//! Writes are the direct-path action methods; reads are the account and
//! market accessors keyed by the universal user id.

use crate::contracts::{self, ILendingPool};
use crate::error::DispatchResult;
use crate::identity::UniversalIdentity;
use crate::payload::{ActionKind, ActionRequest};
use crate::tx::wallet::decode_returns;
use crate::tx::{ContractCall, WalletProvider};

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use serde::Serialize;
use tracing::{debug, info};

/// Account state of one identity for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSnapshot {
    pub user_id: B256,
    pub asset: Address,
    pub health_factor: U256,
    pub total_collateral_usd: U256,
    pub total_debt_usd: U256,
    pub shares: U256,
    pub underlying_balance: U256,
}

/// Pool-wide totals for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSnapshot {
    pub asset: Address,
    pub total_supplied: U256,
    pub total_borrowed: U256,
}

pub struct SettlementClient {
    chain_id: u64,
    lending_pool: Address,
}

impl SettlementClient {
    pub fn new(chain_id: u64, lending_pool: Address) -> Self {
        Self {
            chain_id,
            lending_pool,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn lending_pool(&self) -> Address {
        self.lending_pool
    }

    /// Typed method call for a direct action; the amount travels once, as an argument
    pub fn action_call(&self, request: &ActionRequest) -> ContractCall {
        let asset = request.settlement_asset;
        let amount = request.amount;
        let identity: contracts::UniversalIdentity = (&request.beneficiary).into();

        match request.kind {
            ActionKind::Supply => ContractCall::new(
                self.lending_pool,
                &ILendingPool::supplyCall {
                    asset,
                    amount,
                    onBehalfOf: identity,
                },
            ),
            ActionKind::Borrow => ContractCall::new(
                self.lending_pool,
                &ILendingPool::borrowCall {
                    asset,
                    amount,
                    onBehalfOf: identity,
                },
            ),
            ActionKind::Withdraw => ContractCall::new(
                self.lending_pool,
                &ILendingPool::withdrawCall {
                    asset,
                    amount,
                    to: identity,
                },
            ),
            ActionKind::Repay => ContractCall::new(
                self.lending_pool,
                &ILendingPool::repayCall {
                    asset,
                    amount,
                    onBehalfOf: identity,
                },
            ),
        }
    }

    pub async fn submit_action(
        &self,
        wallet: &dyn WalletProvider,
        request: &ActionRequest,
    ) -> DispatchResult<B256> {
        let call = self.action_call(request);
        let tx_hash = wallet.submit(call).await?;
        info!(
            "{} {} submitted to lending pool {} on chain {}",
            request.kind, tx_hash, self.lending_pool, self.chain_id
        );
        Ok(tx_hash)
    }

    async fn read<C: SolCall>(&self, wallet: &dyn WalletProvider, call: C) -> DispatchResult<C::Return> {
        let data = wallet.call(ContractCall::new(self.lending_pool, &call)).await?;
        decode_returns::<C>(&data)
    }

    pub async fn position(
        &self,
        wallet: &dyn WalletProvider,
        identity: &UniversalIdentity,
        asset: Address,
    ) -> DispatchResult<PositionSnapshot> {
        let user = identity.user_id();
        debug!("Reading position of user {} for asset {}", user, asset);

        let health_factor = self
            .read(wallet, ILendingPool::getHealthFactorCall { user })
            .await?
            ._0;
        let total_collateral_usd = self
            .read(wallet, ILendingPool::getUserTotalCollateralCall { user })
            .await?
            .totalCollateralUsd;
        let total_debt_usd = self
            .read(wallet, ILendingPool::getUserTotalDebtCall { user })
            .await?
            .totalDebtUsd;
        let shares = self
            .read(wallet, ILendingPool::getUserSharesCall { user, asset })
            .await?
            ._0;
        let underlying_balance = self
            .read(
                wallet,
                ILendingPool::getUserUnderlyingBalanceCall {
                    user: identity.into(),
                    asset,
                },
            )
            .await?
            ._0;

        Ok(PositionSnapshot {
            user_id: user,
            asset,
            health_factor,
            total_collateral_usd,
            total_debt_usd,
            shares,
            underlying_balance,
        })
    }

    pub async fn market(
        &self,
        wallet: &dyn WalletProvider,
        asset: Address,
    ) -> DispatchResult<MarketSnapshot> {
        let total_supplied = self
            .read(wallet, ILendingPool::getTotalSuppliedCall { asset })
            .await?
            ._0;
        let total_borrowed = self
            .read(wallet, ILendingPool::getTotalBorrowedCall { asset })
            .await?
            ._0;

        Ok(MarketSnapshot {
            asset,
            total_supplied,
            total_borrowed,
        })
    }
}
