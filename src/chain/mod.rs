//! Chain module - static chain registry and live node access
//!
//! This module provides:
//! - The process-wide registry of supported chains and tokens
//! - Multi-RPC provider management with automatic failover
//! - Confirmation tracking with reorg re-checks

pub mod finality;
pub mod provider;
pub mod registry;

pub use finality::{ConfirmationStatus, ConfirmationTracker};
pub use provider::{ChainProvider, GasPrice};
pub use registry::{registry, ChainDescriptor, ChainRegistry, TokenDescriptor, VmKind};
