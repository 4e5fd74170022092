//! Address canonicalization and universal identity derivation
//!
//! A universal identity is the pair (origin chain id, canonical address
//! bytes). The settlement contract keys every account by
//! `keccak256(abi.encode(uint256 chainId, bytes identity))`; the hash
//! computed here must match it bit-for-bit, so addresses are always reduced
//! to canonical bytes before hashing.

use crate::error::{DispatchError, DispatchResult};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{sol_data, SolType};
use serde::Serialize;
use std::fmt;

/// Text encoding an address was supplied in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressEncoding {
    Hex,
    Base58,
}

/// Normalized binary form of an address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalAddress {
    encoding: AddressEncoding,
    bytes: Bytes,
}

impl CanonicalAddress {
    pub fn encoding(&self) -> AddressEncoding {
        self.encoding
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// The 20-byte EVM address, if this came from hex
    pub fn as_evm(&self) -> Option<Address> {
        match self.encoding {
            AddressEncoding::Hex => Some(Address::from_slice(&self.bytes)),
            AddressEncoding::Base58 => None,
        }
    }
}

impl fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encoding {
            AddressEncoding::Hex => write!(f, "0x{}", hex::encode(&self.bytes)),
            AddressEncoding::Base58 => write!(f, "{}", bs58::encode(&self.bytes).into_string()),
        }
    }
}

/// Normalize a 0x-prefixed hex or base58 address into canonical bytes
pub fn canonicalize_address(input: &str) -> DispatchResult<CanonicalAddress> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DispatchError::invalid_address(input, "empty address"));
    }

    if let Some(digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if digits.len() != 40 {
            return Err(DispatchError::invalid_address(
                input,
                format!("expected 40 hex digits, got {}", digits.len()),
            ));
        }
        // Checksum casing is ignored: the same account must hash identically
        // whatever case it was typed in.
        let bytes = hex::decode(digits.to_ascii_lowercase())
            .map_err(|e| DispatchError::invalid_address(input, e.to_string()))?;
        return Ok(CanonicalAddress {
            encoding: AddressEncoding::Hex,
            bytes: Bytes::from(bytes),
        });
    }

    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| DispatchError::invalid_address(input, format!("neither hex nor base58: {}", e)))?;
    if bytes.is_empty() {
        return Err(DispatchError::invalid_address(input, "decodes to no bytes"));
    }

    Ok(CanonicalAddress {
        encoding: AddressEncoding::Base58,
        bytes: Bytes::from(bytes),
    })
}

/// Parse an address that must be an EVM account or contract
pub fn parse_evm_address(input: &str) -> DispatchResult<Address> {
    canonicalize_address(input)?
        .as_evm()
        .ok_or_else(|| DispatchError::invalid_address(input, "not a 0x-prefixed EVM address"))
}

/// Chain-agnostic account key input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UniversalIdentity {
    pub origin_chain_id: u64,
    pub identity: Bytes,
}

impl UniversalIdentity {
    pub fn new(origin_chain_id: u64, address: CanonicalAddress) -> Self {
        Self {
            origin_chain_id,
            identity: address.into_bytes(),
        }
    }

    /// Canonicalize `address` then bind it to `origin_chain_id`
    pub fn parse(origin_chain_id: u64, address: &str) -> DispatchResult<Self> {
        Ok(Self::new(origin_chain_id, canonicalize_address(address)?))
    }

    pub fn from_evm(origin_chain_id: u64, address: Address) -> Self {
        Self {
            origin_chain_id,
            identity: Bytes::copy_from_slice(address.as_slice()),
        }
    }

    /// The settlement contract's account key for this identity
    pub fn user_id(&self) -> B256 {
        compute_user_id(self.origin_chain_id, &self.identity)
    }
}

/// `keccak256(abi.encode(uint256 chainId, bytes identity))`
pub fn compute_user_id(chain_id: u64, identity: &[u8]) -> B256 {
    type UserIdSchema = (sol_data::Uint<256>, sol_data::Bytes);

    let encoded = UserIdSchema::abi_encode_params(&(
        U256::from(chain_id),
        Bytes::copy_from_slice(identity),
    ));
    keccak256(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn test_user_id_golden_evm_vector() {
        let identity =
            UniversalIdentity::parse(11155111, "0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(identity.identity.len(), 20);
        assert_eq!(
            identity.user_id(),
            b256!("65df3dbe2d6fde07ff0ab2b59782579fb6b877523ac6af601ee0c845461076c8")
        );
    }

    #[test]
    fn test_user_id_golden_solana_vector() {
        let identity = UniversalIdentity::parse(901, "11111111111111111111111111111111").unwrap();
        assert_eq!(identity.identity.as_ref(), &[0u8; 32]);
        assert_eq!(
            identity.user_id(),
            b256!("63963bec4aa7d1bed00c8ea831eaac6d2f9dc5ed68347effac23709541d01a77")
        );
    }

    #[test]
    fn test_casing_does_not_change_user_id() {
        let lower = UniversalIdentity::parse(84532, "0xd8da6bf26964af9d7eed9e03e53415d37aa96045").unwrap();
        let mixed = UniversalIdentity::parse(84532, "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap();
        let upper = UniversalIdentity::parse(84532, "0XD8DA6BF26964AF9D7EED9E03E53415D37AA96045").unwrap();
        assert_eq!(lower.identity, mixed.identity);
        assert_eq!(lower.user_id(), mixed.user_id());
        assert_eq!(lower.user_id(), upper.user_id());
    }

    #[test]
    fn test_canonicalization_is_deterministic() {
        for input in [
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
            "So11111111111111111111111111111111111111112",
            "94U5AHQMKkV5txNJ17QPXWoh474PheGou6cNP2FEuL1d",
        ] {
            let first = canonicalize_address(input).unwrap();
            let second = canonicalize_address(input).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_casing_variants_collapse_in_a_set() {
        use std::collections::HashSet;
        let set: HashSet<CanonicalAddress> = [
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
            "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
            "0XD8DA6BF26964AF9D7EED9E03E53415D37AA96045",
            "94U5AHQMKkV5txNJ17QPXWoh474PheGou6cNP2FEuL1d",
        ]
        .iter()
        .map(|input| canonicalize_address(input).unwrap())
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_base58_round_trips_through_display() {
        let input = "So11111111111111111111111111111111111111112";
        let canonical = canonicalize_address(input).unwrap();
        assert_eq!(canonical.encoding(), AddressEncoding::Base58);
        assert_eq!(canonical.as_bytes().len(), 32);
        assert_eq!(canonical.to_string(), input);
        assert!(canonical.as_evm().is_none());
    }

    #[test]
    fn test_invalid_addresses() {
        for input in ["", "   ", "0x1234", "0xzz00000000000000000000000000000000000001", "not-an-address!", "0OIl"] {
            let err = canonicalize_address(input).unwrap_err();
            assert!(
                matches!(err, DispatchError::InvalidAddress { .. }),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_evm_address_rejects_base58() {
        assert!(parse_evm_address("So11111111111111111111111111111111111111112").is_err());
        assert_eq!(
            parse_evm_address("0x0000000000000000000000000000000000000001").unwrap(),
            Address::with_last_byte(1)
        );
    }
}
