//! Cross-chain action dispatch for an omnichain lending pool
//!
//! Turns a user's lending action (supply, borrow, withdraw, repay) into
//! either a typed call on the settlement chain or a gateway message from the
//! chain the wallet is connected to.

pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod metrics;
pub mod payload;
pub mod router;
pub mod settlement;
pub mod tx;

pub use error::{DispatchError, DispatchResult, Remedy};
pub use identity::{canonicalize_address, compute_user_id, UniversalIdentity};
pub use payload::{decode_payload, encode_payload, ActionKind, ActionRequest};
pub use router::{decide_path, ConnectedWallet, DispatchOutcome, ExecutionPath, ExecutionRouter};
