//! Farm configuration.
//!
//! Provides [`FarmConfig`] with the launch APY defaulted. A farm is
//! constructed once from an explicit config; there are no process-wide
//! globals and no ambient owner identity.

use serde::{Deserialize, Serialize};

use silo_core::constants::DEFAULT_APY;
use silo_core::types::Address;

/// Configuration for a farm instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Address allowed to call the owner-gated operations.
    pub owner: Address,
    /// The farm's own token account: deposits land here, payouts and the
    /// reward reserve leave from here.
    pub farm_address: Address,
    /// Annual percentage yield at launch, in whole percent.
    pub initial_apy: u64,
}

impl FarmConfig {
    /// Config with the default launch APY.
    pub fn new(owner: Address, farm_address: Address) -> Self {
        Self {
            owner,
            farm_address,
            initial_apy: DEFAULT_APY,
        }
    }

    /// Override the launch APY.
    pub fn with_apy(mut self, apy: u64) -> Self {
        self.initial_apy = apy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::from_bytes([0xA1; 20])
    }

    fn farm() -> Address {
        Address::from_bytes([0xFA; 20])
    }

    #[test]
    fn default_apy_applied() {
        let cfg = FarmConfig::new(owner(), farm());
        assert_eq!(cfg.initial_apy, DEFAULT_APY);
    }

    #[test]
    fn with_apy_overrides() {
        let cfg = FarmConfig::new(owner(), farm()).with_apy(25);
        assert_eq!(cfg.initial_apy, 25);
        assert_eq!(cfg.owner, owner());
    }

    #[test]
    fn json_roundtrip() {
        let cfg = FarmConfig::new(owner(), farm()).with_apy(7);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: FarmConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
