//! Error types for action dispatch

use thiserror::Error;

/// Main error type for the dispatch layer
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("Chain {chain} is not registered")]
    UnknownChain { chain: String },

    #[error("Token approval failed for {token} on chain {chain_id}: {reason}")]
    AllowanceFailure {
        chain_id: u64,
        token: String,
        reason: String,
    },

    #[error("Submission failed on chain {chain_id}: {reason}")]
    SubmissionFailure { chain_id: u64, reason: String },

    #[error("Reverted on chain {chain_id} (tx {}): {reason}", .tx_hash.as_deref().unwrap_or("not mined"))]
    RevertedOnChain {
        chain_id: u64,
        tx_hash: Option<String>,
        reason: String,
    },

    #[error("{operation} is not implemented")]
    NotImplemented { operation: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ABI decoding error: {0}")]
    AbiDecoding(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

/// What the caller should offer the user after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    CorrectInput,
    SwitchNetwork,
    Reapprove,
    Resubmit,
    InspectRevert,
    Unsupported,
    FixConfiguration,
}

impl DispatchError {
    pub fn unknown_chain_id(chain_id: u64) -> Self {
        DispatchError::UnknownChain {
            chain: chain_id.to_string(),
        }
    }

    pub fn unknown_chain_key(key: &str) -> Self {
        DispatchError::UnknownChain {
            chain: key.to_string(),
        }
    }

    pub fn invalid_address(input: &str, reason: impl Into<String>) -> Self {
        DispatchError::InvalidAddress {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if the same request may succeed when submitted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::AllowanceFailure { .. } | DispatchError::SubmissionFailure { .. }
        )
    }

    pub fn remedy(&self) -> Remedy {
        match self {
            DispatchError::InvalidAddress { .. } | DispatchError::InvalidAmount { .. } => {
                Remedy::CorrectInput
            }
            DispatchError::UnknownChain { .. } => Remedy::SwitchNetwork,
            DispatchError::AllowanceFailure { .. } => Remedy::Reapprove,
            DispatchError::SubmissionFailure { .. } => Remedy::Resubmit,
            DispatchError::RevertedOnChain { .. } => Remedy::InspectRevert,
            DispatchError::NotImplemented { .. } => Remedy::Unsupported,
            DispatchError::Config(_)
            | DispatchError::AbiDecoding(_)
            | DispatchError::InvalidStateTransition { .. } => Remedy::FixConfiguration,
        }
    }

    /// Stable label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidAddress { .. } => "invalid_address",
            DispatchError::InvalidAmount { .. } => "invalid_amount",
            DispatchError::UnknownChain { .. } => "unknown_chain",
            DispatchError::AllowanceFailure { .. } => "allowance_failure",
            DispatchError::SubmissionFailure { .. } => "submission_failure",
            DispatchError::RevertedOnChain { .. } => "reverted_on_chain",
            DispatchError::NotImplemented { .. } => "not_implemented",
            DispatchError::Config(_) => "config",
            DispatchError::AbiDecoding(_) => "abi_decoding",
            DispatchError::InvalidStateTransition { .. } => "invalid_state_transition",
        }
    }
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;
