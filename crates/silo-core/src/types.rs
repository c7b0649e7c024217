//! Core ledger types: addresses and deposit slots.
//!
//! All monetary values are in subunits (1 token = 10^8 subunits).
//! All numeric fields use u64 per ledger convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::ADDRESS_BYTES;
use crate::error::AddressError;

/// A 20-byte account address.
///
/// Caller identity is always an explicit `Address` parameter; the farm never
/// reads it from ambient context.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    /// The zero address (20 zero bytes).
    pub const ZERO: Self = Self([0u8; ADDRESS_BYTES]);

    /// Create an Address from a byte array.
    pub const fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_BYTES]
    }

    /// Parse from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ADDRESS_BYTES] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| AddressError::InvalidLength(v.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// One deposit record.
///
/// Identified per address by a sequential id assigned at deposit time. Slots
/// are never deleted: a slot whose principal reaches zero is closed for good
/// and stays addressable.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct DepositSlot {
    /// Remaining staked principal in subunits. Zero means the slot is closed.
    pub principal: u64,
    /// Unix timestamp of the original deposit; accrual elapses from here.
    pub deposited_at: u64,
    /// When the most recent partial withdrawal executed. `Some` only while
    /// the slot is open; closing the slot clears it.
    pub withdrawal_requested_at: Option<u64>,
}

impl DepositSlot {
    /// A freshly opened slot with no withdrawal history.
    pub fn open(principal: u64, deposited_at: u64) -> Self {
        Self {
            principal,
            deposited_at,
            withdrawal_requested_at: None,
        }
    }

    /// Whether the slot has been fully withdrawn.
    pub fn is_closed(&self) -> bool {
        self.principal == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn address_display_roundtrip() {
        let addr = Address::from_bytes([0xAB; 20]);
        let s = addr.to_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 2 + 40);
        assert_eq!(Address::from_hex(&s).unwrap(), addr);
    }

    #[test]
    fn address_parse_without_prefix() {
        let addr = Address::from_bytes([0x01; 20]);
        let bare = addr.to_string().trim_start_matches("0x").to_string();
        assert_eq!(bare.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_parse_rejects_wrong_length() {
        let err = Address::from_hex("0xdeadbeef").unwrap_err();
        assert_eq!(err, AddressError::InvalidLength(4));
    }

    #[test]
    fn address_parse_rejects_bad_digits() {
        let err = Address::from_hex("0xzz").unwrap_err();
        assert!(matches!(err, AddressError::InvalidHex(_)));
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_bytes([1; 20]).is_zero());
    }

    #[test]
    fn slot_open_and_close() {
        let slot = DepositSlot::open(500, 1_700_000_000);
        assert!(!slot.is_closed());
        assert_eq!(slot.withdrawal_requested_at, None);

        let closed = DepositSlot {
            principal: 0,
            ..slot
        };
        assert!(closed.is_closed());
    }

    #[test]
    fn address_serde_json_roundtrip() {
        let addr = Address::from_bytes([0x42; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn slot_bincode_roundtrip() {
        let slot = DepositSlot {
            principal: 1_000,
            deposited_at: 1_700_000_000,
            withdrawal_requested_at: Some(1_700_086_400),
        };
        let bytes = bincode::encode_to_vec(slot, bincode::config::standard()).unwrap();
        let (back, _): (DepositSlot, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(back, slot);
    }

    proptest! {
        #[test]
        fn address_hex_roundtrip_prop(bytes in any::<[u8; 20]>()) {
            let addr = Address::from_bytes(bytes);
            prop_assert_eq!(Address::from_hex(&addr.to_string()).unwrap(), addr);
        }
    }
}
