//! Per-address deposit bookkeeping.
//!
//! [`DepositBook`] owns every deposit slot and the global total-staked
//! accumulator. It performs no token transfers and no interest math: the
//! farm service validates, calls the token gateway, then commits here.
//!
//! Slot ids per address are assigned 1, 2, 3, … and never reused; a slot
//! whose principal reaches zero stays addressable but is permanently closed.
//!
//! Not thread-safe — the farm wraps the book in a `RwLock`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use silo_core::error::{FarmError, MathError};
use silo_core::types::{Address, DepositSlot};

/// Per-address slot arena and deposit-id counter.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AddressState {
    /// Highest deposit id assigned to this address so far. Starts at 0;
    /// the first deposit gets id 1.
    pub last_deposit_id: u64,
    /// Slots by deposit id. Closed slots remain present with zero principal.
    pub slots: BTreeMap<u64, DepositSlot>,
}

/// The deposit ledger: every slot of every address plus the global
/// total-staked counter.
///
/// Invariant: the sum of all slot principals equals `total_staked` at every
/// point between operations.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct DepositBook {
    accounts: BTreeMap<Address, AddressState>,
    total_staked: u64,
}

impl DepositBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all open-slot principals.
    pub fn total_staked(&self) -> u64 {
        self.total_staked
    }

    /// Highest deposit id assigned to `owner`. Zero for unknown addresses.
    pub fn last_deposit_id(&self, owner: &Address) -> u64 {
        self.accounts
            .get(owner)
            .map(|a| a.last_deposit_id)
            .unwrap_or(0)
    }

    /// Look up a slot. `None` for ids never assigned.
    pub fn slot(&self, owner: &Address, deposit_id: u64) -> Option<&DepositSlot> {
        self.accounts.get(owner)?.slots.get(&deposit_id)
    }

    /// Stored principal of a slot. Zero for unknown or closed slots.
    pub fn principal(&self, owner: &Address, deposit_id: u64) -> u64 {
        self.slot(owner, deposit_id).map(|s| s.principal).unwrap_or(0)
    }

    /// Sum of stored principals across all of `owner`'s slots.
    pub fn total_balance_of(&self, owner: &Address) -> u64 {
        self.accounts
            .get(owner)
            .map(|a| {
                a.slots
                    .values()
                    .fold(0u64, |acc, slot| acc.saturating_add(slot.principal))
            })
            .unwrap_or(0)
    }

    /// Check that a deposit of `amount` can be booked for `owner` without
    /// overflowing the total-staked counter or the id sequence.
    ///
    /// The farm calls this before the external transfer so that
    /// [`open_slot`](Self::open_slot) cannot fail afterwards.
    pub fn preflight_deposit(&self, owner: &Address, amount: u64) -> Result<(), MathError> {
        self.total_staked
            .checked_add(amount)
            .ok_or(MathError::ArithmeticOverflow)?;
        self.last_deposit_id(owner)
            .checked_add(1)
            .ok_or(MathError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Open a new slot for `owner` and return its deposit id.
    ///
    /// Deposits are never merged: each call opens a fresh slot so that every
    /// deposit accrues interest independently from its own timestamp.
    pub fn open_slot(&mut self, owner: &Address, amount: u64, now: u64) -> Result<u64, MathError> {
        let total = self
            .total_staked
            .checked_add(amount)
            .ok_or(MathError::ArithmeticOverflow)?;
        let account = self.accounts.entry(*owner).or_default();
        let id = account
            .last_deposit_id
            .checked_add(1)
            .ok_or(MathError::ArithmeticOverflow)?;

        account.last_deposit_id = id;
        account.slots.insert(id, DepositSlot::open(amount, now));
        self.total_staked = total;
        Ok(id)
    }

    /// Consume `principal_consumed` from an open slot.
    ///
    /// A partial reduction stamps the slot's withdrawal-request date with
    /// `now`; reaching zero closes the slot and clears the date.
    pub fn reduce_slot(
        &mut self,
        owner: &Address,
        deposit_id: u64,
        principal_consumed: u64,
        now: u64,
    ) -> Result<(), FarmError> {
        let last = self.last_deposit_id(owner);
        let slot = self
            .accounts
            .get_mut(owner)
            .and_then(|a| a.slots.get_mut(&deposit_id))
            .ok_or(FarmError::InvalidDepositId { id: deposit_id, last })?;
        if slot.is_closed() {
            return Err(FarmError::SlotClosed(deposit_id));
        }
        slot.principal = slot
            .principal
            .checked_sub(principal_consumed)
            .ok_or(MathError::ArithmeticOverflow)?;
        self.total_staked = self
            .total_staked
            .checked_sub(principal_consumed)
            .ok_or(MathError::ArithmeticOverflow)?;

        if slot.principal == 0 {
            slot.withdrawal_requested_at = None;
        } else {
            slot.withdrawal_requested_at = Some(now);
        }
        Ok(())
    }

    /// Recompute the principal sum from scratch. Used by tests to check the
    /// total-staked invariant.
    pub fn aggregate_principal(&self) -> u64 {
        self.accounts
            .values()
            .flat_map(|a| a.slots.values())
            .fold(0u64, |acc, slot| acc.saturating_add(slot.principal))
    }
}
