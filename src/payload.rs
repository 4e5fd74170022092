//! Action payload wire format shared with the settlement contract
//!
//! Layout is `abi.encode(string action, bytes identity, uint256 chainId,
//! address asset, address counterAsset, uint256 amount)`. Field order and
//! types are fixed and unversioned.

use crate::error::{DispatchError, DispatchResult};
use crate::identity::UniversalIdentity;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol_data, SolType};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

type PayloadSchema = (
    sol_data::String,
    sol_data::Bytes,
    sol_data::Uint<256>,
    sol_data::Address,
    sol_data::Address,
    sol_data::Uint<256>,
);

/// Logical lending action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Supply,
    Borrow,
    Withdraw,
    Repay,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Supply,
        ActionKind::Borrow,
        ActionKind::Withdraw,
        ActionKind::Repay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Supply => "supply",
            ActionKind::Borrow => "borrow",
            ActionKind::Withdraw => "withdraw",
            ActionKind::Repay => "repay",
        }
    }

    /// Supply and repay move funds from the caller into the pool
    pub fn pulls_value(&self) -> bool {
        matches!(self, ActionKind::Supply | ActionKind::Repay)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DispatchError::AbiDecoding(format!("Unknown action {:?}", s)))
    }
}

/// One submitted user action; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub beneficiary: UniversalIdentity,
    pub settlement_asset: Address,
    pub counter_asset: Address,
    pub amount: U256,
}

impl ActionRequest {
    /// The request as carried by a gateway message.
    ///
    /// Value-bearing actions travel with the real amount as transferred
    /// native value, so the payload's amount field is zero for them.
    pub fn relay_payload(&self) -> ActionRequest {
        let mut wire = self.clone();
        if self.kind.pulls_value() {
            wire.amount = U256::ZERO;
        }
        wire
    }
}

/// Serialize a request into the settlement contract's payload
pub fn encode_payload(request: &ActionRequest) -> Bytes {
    let encoded = PayloadSchema::abi_encode_params(&(
        request.kind.as_str().to_string(),
        request.beneficiary.identity.clone(),
        U256::from(request.beneficiary.origin_chain_id),
        request.settlement_asset,
        request.counter_asset,
        request.amount,
    ));
    Bytes::from(encoded)
}

/// Parse a payload produced by [`encode_payload`]
pub fn decode_payload(data: &[u8]) -> DispatchResult<ActionRequest> {
    let (kind, identity, chain_id, settlement_asset, counter_asset, amount) =
        PayloadSchema::abi_decode_params(data, true)
            .map_err(|e| DispatchError::AbiDecoding(e.to_string()))?;

    let origin_chain_id = u64::try_from(chain_id).map_err(|_| {
        DispatchError::AbiDecoding(format!("Chain id {} does not fit in u64", chain_id))
    })?;

    Ok(ActionRequest {
        kind: kind.parse()?,
        beneficiary: UniversalIdentity {
            origin_chain_id,
            identity,
        },
        settlement_asset,
        counter_asset,
        amount,
    })
}
