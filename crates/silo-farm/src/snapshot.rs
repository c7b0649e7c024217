//! Byte-level snapshot and restore of the farm state.
//!
//! The whole mutable state (deposit book, APY, owner, pause gates, and the
//! reward-reserve bookkeeping) round-trips through one bincode blob. Maps
//! are `BTreeMap`s, so the encoding of a given state is canonical.

use bincode::config;

use silo_core::error::FarmError;

use crate::farm::TokenFarm;

impl TokenFarm {
    /// Serialize the current farm state.
    ///
    /// Takes a read lock, so the snapshot is a consistent cut, never a
    /// state mid-mutation.
    pub fn snapshot(&self) -> Result<Vec<u8>, FarmError> {
        let state = self.state().read();
        bincode::encode_to_vec(&*state, config::standard())
            .map_err(|e| FarmError::Snapshot(e.to_string()))
    }

    /// Replace the farm state with a previously taken snapshot.
    ///
    /// The token, interest, and clock collaborators are unaffected; only the
    /// ledger-side state is swapped.
    pub fn restore(&self, bytes: &[u8]) -> Result<(), FarmError> {
        let (decoded, consumed) = bincode::decode_from_slice(bytes, config::standard())
            .map_err(|e| FarmError::Snapshot(e.to_string()))?;
        if consumed != bytes.len() {
            return Err(FarmError::Snapshot(format!(
                "trailing bytes: {} of {} consumed",
                consumed,
                bytes.len()
            )));
        }
        *self.state().write() = decoded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use silo_core::traits::ManualClock;
    use silo_core::types::Address;
    use silo_interest::engine::InterestEngine;

    use crate::config::FarmConfig;
    use crate::farm::TokenFarm;
    use crate::token::MemoryToken;

    const T0: u64 = 1_700_000_000;

    fn owner() -> Address {
        Address::from_bytes([0xA1; 20])
    }

    fn farm_addr() -> Address {
        Address::from_bytes([0xFA; 20])
    }

    fn alice() -> Address {
        Address::from_bytes([0x01; 20])
    }

    fn build_farm(token: &MemoryToken, clock: Arc<ManualClock>) -> TokenFarm {
        TokenFarm::new(
            Arc::new(token.handle(farm_addr())),
            Arc::new(InterestEngine::new()),
            clock,
            FarmConfig::new(owner(), farm_addr()).with_apy(12),
        )
        .unwrap()
    }

    fn populated_farm() -> (TokenFarm, MemoryToken, Arc<ManualClock>) {
        let token = MemoryToken::new("Silo Staking Token", "SILO");
        let clock = Arc::new(ManualClock::new(T0));
        let farm = build_farm(&token, clock.clone());

        token.mint(&alice(), 10_000).unwrap();
        token.approve_from(&alice(), &farm_addr(), 10_000);
        farm.deposit(&alice(), 4_000).unwrap();
        farm.deposit(&alice(), 6_000).unwrap();
        farm.request_withdrawal(&alice(), 1, 1_500).unwrap();
        farm.set_apy(&owner(), 30).unwrap();
        farm.pause_deposits(&owner()).unwrap();
        (farm, token, clock)
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let (farm, token, clock) = populated_farm();
        let bytes = farm.snapshot().unwrap();

        let fresh = build_farm(&token, clock);
        assert_eq!(fresh.total_staked(), 0);
        fresh.restore(&bytes).unwrap();

        assert_eq!(fresh.total_staked(), farm.total_staked());
        assert_eq!(fresh.apy(), 30);
        assert!(fresh.deposits_paused());
        assert_eq!(fresh.last_deposit_id(&alice()), 2);
        assert_eq!(
            fresh.balance(&alice(), 1).unwrap(),
            farm.balance(&alice(), 1).unwrap()
        );
        assert_eq!(
            fresh.withdrawal_request_date(&alice(), 1).unwrap(),
            Some(T0)
        );
    }

    #[test]
    fn snapshot_is_stable_for_identical_state() {
        let (farm, _token, _clock) = populated_farm();
        assert_eq!(farm.snapshot().unwrap(), farm.snapshot().unwrap());
    }

    #[test]
    fn snapshot_survives_disk_roundtrip() {
        let (farm, token, clock) = populated_farm();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farm.snapshot");

        fs::write(&path, farm.snapshot().unwrap()).unwrap();
        let bytes = fs::read(&path).unwrap();

        let fresh = build_farm(&token, clock);
        fresh.restore(&bytes).unwrap();
        assert_eq!(fresh.total_balance_of(&alice()), farm.total_balance_of(&alice()));
    }

    #[test]
    fn restore_rejects_garbage() {
        let (farm, _token, _clock) = populated_farm();
        let err = farm.restore(&[0xFF, 0x00, 0x13, 0x37]).unwrap_err();
        assert!(matches!(err, silo_core::error::FarmError::Snapshot(_)));
        // Failed restore leaves the state alone.
        assert_eq!(farm.apy(), 30);
    }

    #[test]
    fn restore_rejects_trailing_bytes() {
        let (farm, _token, _clock) = populated_farm();
        let mut bytes = farm.snapshot().unwrap();
        bytes.push(0xAB);
        let err = farm.restore(&bytes).unwrap_err();
        assert!(matches!(err, silo_core::error::FarmError::Snapshot(_)));
    }
}
