use std::fmt::{Debug, Display};
use std::str::FromStr;

use ethers_core::types::Address;
use ethers_core::utils::to_checksum;
use thiserror::Error;

/// Number of hex digits in an address, excluding the `0x` prefix.
const ADDRESS_HEX_LEN: usize = 40;

/// Why a string was rejected as a [`LedgerAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Missing `0x` prefix.
    #[error("address must start with 0x")]
    MissingPrefix,
    /// Wrong number of hex digits.
    #[error("address must have 40 hex digits, found {0}")]
    InvalidLength(usize),
    /// A character outside `[0-9a-fA-F]`.
    #[error("address contains non-hex characters")]
    InvalidHex,
    /// Mixed-case address whose casing does not match EIP-55.
    #[error("address checksum mismatch, expected {0}")]
    BadChecksum(String),
}

/// Address of a deployed contract, validated before it is ever handed to a
/// [`crate::LedgerClient`].
///
/// Only `0x`-prefixed, 40 hex digit strings are accepted. All-lowercase and
/// all-uppercase digits are taken as is. Mixed case must be a valid EIP-55
/// checksum. Displayed in checksummed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerAddress(Address);

impl LedgerAddress {
    /// The underlying 20-byte address.
    pub fn as_address(&self) -> Address {
        self.0
    }
}

impl FromStr for LedgerAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_HEX_LEN {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex)?;
        let address = Address::from(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            let expected = to_checksum(&address, None);
            if expected != s {
                return Err(AddressError::BadChecksum(expected));
            }
        }

        Ok(Self(address))
    }
}

impl From<LedgerAddress> for Address {
    fn from(address: LedgerAddress) -> Self {
        address.0
    }
}

impl Display for LedgerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&to_checksum(&self.0, None))
    }
}

impl Debug for LedgerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerAddress({})", self)
    }
}

impl serde::Serialize for LedgerAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for LedgerAddress {
    fn deserialize<D>(deserializer: D) -> Result<LedgerAddress, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}
