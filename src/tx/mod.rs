//! Transaction module: the wallet seam, approval sequencing and the local EVM signer

pub mod allowance;
mod gas;
mod sender;
pub mod wallet;

pub use allowance::{AllowanceOutcome, AllowanceSequencer};
pub use gas::GasEstimator;
pub use sender::EvmWallet;
pub use wallet::{ContractCall, TxHandle, WalletProvider};
