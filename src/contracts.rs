//! Contract interfaces consumed by the dispatch layer
//!
//! Only the selectors this crate calls are declared: the lending pool on the
//! settlement chain, the origin-chain gateway, and ERC-20 allowances.

use crate::identity;

use alloy_primitives::U256;
use alloy_sol_types::sol;

sol! {
    #![sol(all_derives)]

    /// Account key tuple as declared by the lending pool
    struct UniversalIdentity {
        uint256 chainId;
        bytes identity;
    }

    /// Where and how a failed relayed call is unwound
    struct RevertOptions {
        address revertAddress;
        bool callOnRevert;
        address abortAddress;
        bytes revertMessage;
        uint256 onRevertGasLimit;
    }

    interface ILendingPool {
        function supply(address asset, uint256 amount, UniversalIdentity onBehalfOf) external;
        function borrow(address asset, uint256 amount, UniversalIdentity onBehalfOf) external;
        function withdraw(address asset, uint256 amount, UniversalIdentity to) external returns (uint256);
        function repay(address asset, uint256 amount, UniversalIdentity onBehalfOf) external returns (uint256);

        function getHealthFactor(bytes32 user) external view returns (uint256);
        function getUserTotalCollateral(bytes32 user) external view returns (uint256 totalCollateralUsd);
        function getUserTotalDebt(bytes32 user) external view returns (uint256 totalDebtUsd);
        function getUserShares(bytes32 user, address asset) external view returns (uint256);
        function getUserUnderlyingBalance(UniversalIdentity user, address asset) external view returns (uint256);
        function getTotalSupplied(address asset) external view returns (uint256);
        function getTotalBorrowed(address asset) external view returns (uint256);
    }

    interface IGatewayEVM {
        function depositAndCall(address receiver, bytes payload, RevertOptions revertOptions) external payable;
        function call(address receiver, bytes payload, RevertOptions revertOptions) external;
    }

    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }
}

impl From<&identity::UniversalIdentity> for UniversalIdentity {
    fn from(value: &identity::UniversalIdentity) -> Self {
        Self {
            chainId: U256::from(value.origin_chain_id),
            identity: value.identity.clone(),
        }
    }
}
