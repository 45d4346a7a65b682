//! Names and call encodings of the RealFi contracts.
//!
//! Only the entry points this tool calls are declared; the Solidity sources
//! are compiled from the contracts directory at deploy time.

use crate::error::{RealfiError, Result};
use alloy::primitives::Address;
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};

pub const USDT0: &str = "USDT0";
pub const KYC_REGISTRY: &str = "KYCRegistry";
pub const VTOKEN: &str = "VToken";
pub const DONG_VAULT: &str = "DongVault";
pub const DONG_VAULT_FACTORY: &str = "DongVaultFactory";

// Single-vault deployments predating the factory.
pub const REALFI_TOKEN: &str = "RealFiToken";
pub const REALFI_VAULT: &str = "RealFiVault";

/// Compiled up front by a full factory deployment.
pub const FACTORY_CONTRACTS: [&str; 5] = [USDT0, KYC_REGISTRY, VTOKEN, DONG_VAULT, DONG_VAULT_FACTORY];

/// Compiled by an incremental neighborhood addition.
pub const NEIGHBORHOOD_CONTRACTS: [&str; 2] = [VTOKEN, DONG_VAULT_FACTORY];

/// `createVault` target amount meaning "use the factory default".
pub const DEFAULT_TARGET_AMOUNT: u64 = 0;

/// USDT0 uses 6 decimals.
pub const STABLE_DECIMALS: u8 = 6;

sol! {
    interface IDongVaultFactory {
        function createVault(string dongName, string gu, address vToken, uint256 targetAmount) external;
        function getVault(string dongName) external view returns (address);
    }

    interface IVToken {
        function setVault(address vault) external;
    }

    interface IKYCRegistry {
        function isVerified(address user) external view returns (bool);
        function verifyKYC(address user) external;
        function revokeKYC(address user) external;
    }

    interface IStableToken {
        function mint(address to, uint256 amount) external;
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }

    interface IPausable {
        function paused() external view returns (bool);
        function pause() external;
        function unpause() external;
    }

    interface IDongVault {
        function dongName() external view returns (string);
        function totalDeposited() external view returns (uint256);
        function participantCount() external view returns (uint256);
    }

    interface IRealFiVault {
        function projectCount() external view returns (uint256);
        function activeProjectId() external view returns (uint256);
    }
}

/// `DongVaultFactory(address usdt0, address kycRegistry)`
pub fn factory_constructor_args(stable_token: Address, kyc_registry: Address) -> Vec<u8> {
    (stable_token, kyc_registry).abi_encode_params()
}

/// `VToken(string dongName)`
pub fn vtoken_constructor_args(neighborhood: &str) -> Vec<u8> {
    (neighborhood.to_string(),).abi_encode_params()
}

pub fn decode_return<C: SolCall>(data: &[u8]) -> Result<C::Return> {
    C::abi_decode_returns(data, true)
        .map_err(|e| RealfiError::Abi(format!("{}: {e}", C::SIGNATURE)))
}
