//! Confirmation tracking for submitted transactions
//!
//! Direct actions accept a single mined receipt; relayed gateway messages
//! wait for a deeper confirmation count before they are reported.

use super::ChainProvider;
use crate::error::{DispatchError, DispatchResult};
use crate::tx::TxHandle;

use alloy_primitives::B256;
use ethers::types::{TransactionReceipt, H256, U64};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a transaction stands relative to the required depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    NotMined,
    Pending { block_number: u64, confirmations: u64 },
    Confirmed { block_number: u64, confirmations: u64 },
    Reverted { block_number: u64 },
}

/// Classify a receipt against the current head.
///
/// The inclusion block counts as the first confirmation.
pub fn confirmation_status(
    receipt: Option<&TransactionReceipt>,
    head: u64,
    required: u64,
) -> ConfirmationStatus {
    let Some(receipt) = receipt else {
        return ConfirmationStatus::NotMined;
    };
    let Some(block_number) = receipt.block_number.map(|b| b.as_u64()) else {
        return ConfirmationStatus::NotMined;
    };

    if receipt.status == Some(U64::zero()) {
        return ConfirmationStatus::Reverted { block_number };
    }

    let confirmations = head.saturating_sub(block_number) + 1;
    if head >= block_number && confirmations >= required {
        ConfirmationStatus::Confirmed {
            block_number,
            confirmations,
        }
    } else {
        ConfirmationStatus::Pending {
            block_number,
            confirmations: if head >= block_number { confirmations } else { 0 },
        }
    }
}

/// Polls a chain until a transaction reaches a confirmation depth
pub struct ConfirmationTracker {
    provider: Arc<ChainProvider>,
    poll_interval: Duration,
}

impl ConfirmationTracker {
    pub fn new(provider: Arc<ChainProvider>, poll_interval: Duration) -> Self {
        Self {
            provider,
            poll_interval,
        }
    }

    /// Block until `tx_hash` is mined and `depth` blocks deep.
    ///
    /// There is no timeout. Once the depth is reached the receipt is read
    /// again; if the transaction moved to another block the wait continues
    /// from the new inclusion.
    pub async fn wait(&self, tx_hash: B256, depth: u64) -> DispatchResult<TxHandle> {
        let chain_id = self.provider.chain_id();
        let hash = H256::from(tx_hash.0);
        let depth = depth.max(1);

        loop {
            let receipt = self.provider.get_transaction_receipt(hash).await?;
            let head = self.provider.get_block_number().await?;

            match confirmation_status(receipt.as_ref(), head, depth) {
                ConfirmationStatus::NotMined => {
                    debug!("Transaction {} not mined yet on chain {}", tx_hash, chain_id);
                }
                ConfirmationStatus::Pending {
                    block_number,
                    confirmations,
                } => {
                    debug!(
                        "Transaction {} has {} / {} confirmations on chain {} (block {})",
                        tx_hash, confirmations, depth, chain_id, block_number
                    );
                }
                ConfirmationStatus::Reverted { block_number } => {
                    return Err(DispatchError::RevertedOnChain {
                        chain_id,
                        tx_hash: Some(tx_hash.to_string()),
                        reason: format!("receipt status 0 in block {}", block_number),
                    });
                }
                ConfirmationStatus::Confirmed {
                    block_number,
                    confirmations,
                } => {
                    // Verify the transaction is still included (reorg protection)
                    let recheck = self.provider.get_transaction_receipt(hash).await?;
                    let still_included = recheck
                        .as_ref()
                        .and_then(|r| r.block_number)
                        .map(|b| b.as_u64())
                        == Some(block_number);

                    if still_included {
                        info!(
                            "Transaction {} confirmed on chain {} ({} confirmations)",
                            tx_hash, chain_id, confirmations
                        );
                        return Ok(TxHandle {
                            chain_id,
                            tx_hash,
                            block_number,
                            confirmations,
                        });
                    }
                    warn!(
                        "Reorg detected: tx {} left block {} on chain {}",
                        tx_hash, block_number, chain_id
                    );
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
