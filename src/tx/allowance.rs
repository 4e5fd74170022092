//! Approve-then-act sequencing for value-pulling direct calls

use super::wallet::{decode_returns, ContractCall, TxHandle, WalletProvider};
use crate::contracts::IERC20;
use crate::error::{DispatchError, DispatchResult};

use alloy_primitives::{Address, U256};
use tracing::{debug, info};

/// Result of an allowance check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// Existing allowance already covers the amount; nothing submitted
    Sufficient { current: U256 },
    /// An exact-amount approval was mined
    Approved { previous: U256, handle: TxHandle },
}

impl AllowanceOutcome {
    pub fn approval(&self) -> Option<&TxHandle> {
        match self {
            AllowanceOutcome::Sufficient { .. } => None,
            AllowanceOutcome::Approved { handle, .. } => Some(handle),
        }
    }
}

/// Ensures the spender may pull `amount` before the action is submitted.
///
/// The read-then-approve pair is not atomic: two concurrent sequencers for
/// the same owner and token may both approve. That race only costs a
/// redundant approval and is accepted.
pub struct AllowanceSequencer {
    chain_id: u64,
    confirmations: u64,
}

impl AllowanceSequencer {
    pub fn new(chain_id: u64, confirmations: u64) -> Self {
        Self {
            chain_id,
            confirmations: confirmations.max(1),
        }
    }

    /// Current allowance granted by the wallet to `spender`
    pub async fn allowance(
        &self,
        wallet: &dyn WalletProvider,
        token: Address,
        spender: Address,
    ) -> DispatchResult<U256> {
        let call = ContractCall::new(
            token,
            &IERC20::allowanceCall {
                owner: wallet.address(),
                spender,
            },
        );
        let data = wallet.call(call).await?;
        Ok(decode_returns::<IERC20::allowanceCall>(&data)?._0)
    }

    /// Approve exactly `amount` if the current allowance is below it, and
    /// wait for the approval to be mined before returning.
    pub async fn ensure(
        &self,
        wallet: &dyn WalletProvider,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> DispatchResult<AllowanceOutcome> {
        let current = self.allowance(wallet, token, spender).await?;
        debug!(
            "Allowance of {} for spender {} on token {}: {} (need {})",
            wallet.address(),
            spender,
            token,
            current,
            amount
        );

        if current >= amount {
            return Ok(AllowanceOutcome::Sufficient { current });
        }

        let approve = ContractCall::new(token, &IERC20::approveCall { spender, amount });
        let tx_hash = wallet
            .submit(approve)
            .await
            .map_err(|e| self.approval_failed(token, e))?;
        info!(
            "Approval {} submitted on chain {} for {} of token {}",
            tx_hash, self.chain_id, amount, token
        );
        crate::metrics::record_approval_submitted(self.chain_id);

        let handle = wallet
            .wait_for_confirmations(tx_hash, self.confirmations)
            .await
            .map_err(|e| self.approval_failed(token, e))?;

        Ok(AllowanceOutcome::Approved {
            previous: current,
            handle,
        })
    }

    fn approval_failed(&self, token: Address, cause: DispatchError) -> DispatchError {
        DispatchError::AllowanceFailure {
            chain_id: self.chain_id,
            token: token.to_string(),
            reason: cause.to_string(),
        }
    }
}
