//! 20-byte account addresses and contract address derivation.

use crate::error::{ChainError, ChainResult};
use alloy_primitives::Address as EthAddress;
use popsig_config::ADDRESS_SIZE;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An account address.
///
/// Displays with the EIP-55 mixed-case checksum; [`Address::to_hex`] gives the
/// plain lowercase form used when linking libraries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(EthAddress);

impl Address {
    pub const ZERO: Address = Address(EthAddress::ZERO);

    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(EthAddress::new(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> ChainResult<Self> {
        let array: [u8; ADDRESS_SIZE] = bytes.try_into().map_err(|_| {
            ChainError::InvalidAddress(format!(
                "expected {ADDRESS_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(array))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Lowercase hex without `0x`, exactly 40 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// EIP-55 checksummed form with `0x`
    pub fn to_checksum(&self) -> String {
        self.0.to_checksum(None)
    }

    /// Address of the contract created by `sender` at `nonce`:
    /// `keccak256(rlp([sender, nonce]))[12..]`
    pub fn create(sender: &Address, nonce: u64) -> Self {
        Self(sender.0.create(nonce))
    }
}

impl FromStr for Address {
    type Err = ChainError;

    /// Accepts 40 hex digits with or without `0x`, in any letter case.
    fn from_str(s: &str) -> ChainResult<Self> {
        EthAddress::from_str(s.trim())
            .map(Self)
            .map_err(|err| ChainError::InvalidAddress(format!("{s}: {err}")))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl From<[u8; ADDRESS_SIZE]> for Address {
    fn from(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self::new(bytes)
    }
}

impl From<EthAddress> for Address {
    fn from(address: EthAddress) -> Self {
        Self(address)
    }
}

impl From<Address> for EthAddress {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;
    use alloy_rlp::Encodable;
    use hex_literal::hex;

    #[test]
    fn test_checksum_display() {
        let address: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(address.to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(address.to_hex(), "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert_eq!(address.to_string().parse::<Address>().unwrap(), address);

        let unprefixed: Address = " 5aaeb6053f3e94c9b9a09f33669435e7ef1beaed\n".parse().unwrap();
        assert_eq!(unprefixed, address);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["0x1234", "zz5aaeb6053f3e94c9b9a09f33669435e7ef1bea", ""] {
            assert!(matches!(
                input.parse::<Address>(),
                Err(ChainError::InvalidAddress(_))
            ));
        }
        assert!(Address::from_slice(&[0u8; 19]).is_err());
        assert_eq!(Address::from_slice(&[7u8; 20]).unwrap(), Address::new([7u8; 20]));
    }

    #[test]
    fn test_create_address() {
        let sender = Address::new(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            Address::create(&sender, 0),
            Address::new(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );

        let deployer: Address = popsig_config::DEFAULT_DEPLOYER.parse().unwrap();
        assert_eq!(
            Address::create(&deployer, 0),
            Address::new(hex!("f2e246bb76df876cef8b38ae84130f4f55de395b"))
        );
        assert_eq!(
            Address::create(&deployer, 1),
            Address::new(hex!("2946259e0334f33a064106302415ad3391bed384"))
        );
    }

    #[test]
    fn test_create_matches_rlp_list_hash() {
        let deployer: Address = popsig_config::DEFAULT_DEPLOYER.parse().unwrap();
        for nonce in [0u64, 1, 0x7f, 0x80, 0x0400, u64::MAX] {
            let sender = EthAddress::from(deployer);
            let fields: [&dyn Encodable; 2] = [&sender, &nonce];
            let mut encoded = Vec::new();
            alloy_rlp::encode_list::<_, dyn Encodable>(&fields, &mut encoded);
            let hash = keccak256(&encoded);
            assert_eq!(
                Address::create(&deployer, nonce).as_bytes(),
                &hash[12..],
                "nonce {nonce}"
            );
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let address = Address::new([0xab; 20]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address.to_checksum()));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }
}
