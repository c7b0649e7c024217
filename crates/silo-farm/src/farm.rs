//! The staking farm service.
//!
//! [`TokenFarm`] composes the deposit ledger, the interest engine, the token
//! gateway, and a clock into the single entry point for deposits,
//! withdrawals, and owner controls. All state lives behind one `RwLock`:
//! every mutating operation holds the write lock across its external token
//! call, so each operation commits indivisibly or not at all. Read queries
//! take read locks and observe consistent snapshots.
//!
//! Operation ordering is validate → external transfer → commit. The ledger
//! is only touched after the transfer succeeded, so a failed transfer (or
//! any earlier validation failure) leaves every ledger field untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use silo_core::error::{FarmError, TokenError};
use silo_core::traits::{Clock, InterestModel, SystemClock, TokenGateway};
use silo_core::types::Address;
use silo_interest::engine::InterestEngine;

use crate::config::FarmConfig;
use crate::ledger::DepositBook;

/// Everything that changes after construction, guarded by one lock.
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub(crate) struct FarmState {
    pub(crate) book: DepositBook,
    pub(crate) apy: u64,
    pub(crate) owner: Address,
    pub(crate) deposits_paused: bool,
    pub(crate) withdrawals_paused: bool,
    /// Reward-reserve contributions by contributor. Informational
    /// bookkeeping; payouts are funded by the farm's token balance, never
    /// checked against this map.
    pub(crate) farm_rewards: BTreeMap<Address, u64>,
}

/// The staking farm.
pub struct TokenFarm {
    state: RwLock<FarmState>,
    token: Arc<dyn TokenGateway>,
    interest: Arc<dyn InterestModel>,
    clock: Arc<dyn Clock>,
    /// The farm's own token account: deposits land here, payouts leave here.
    address: Address,
}

impl TokenFarm {
    /// Create a farm over the given collaborators.
    ///
    /// Probes the token with `total_supply` and fails with
    /// [`FarmError::InvalidToken`] if the probe does not succeed.
    pub fn new(
        token: Arc<dyn TokenGateway>,
        interest: Arc<dyn InterestModel>,
        clock: Arc<dyn Clock>,
        config: FarmConfig,
    ) -> Result<Self, FarmError> {
        token
            .total_supply()
            .map_err(|e| FarmError::InvalidToken(e.to_string()))?;
        info!(owner = %config.owner, apy = config.initial_apy, "farm initialized");
        Ok(Self {
            state: RwLock::new(FarmState {
                book: DepositBook::new(),
                apy: config.initial_apy,
                owner: config.owner,
                deposits_paused: false,
                withdrawals_paused: false,
                farm_rewards: BTreeMap::new(),
            }),
            token,
            interest,
            clock,
            address: config.farm_address,
        })
    }

    /// Create a farm with the production interest engine and wall clock.
    pub fn with_defaults(
        token: Arc<dyn TokenGateway>,
        config: FarmConfig,
    ) -> Result<Self, FarmError> {
        Self::new(
            token,
            Arc::new(InterestEngine::new()),
            Arc::new(SystemClock),
            config,
        )
    }

    // ------------------------------------------------------------------
    // Mutating entry points
    // ------------------------------------------------------------------

    /// Stake `amount`, opening a new deposit slot. Returns the deposit id.
    ///
    /// Pulls `amount` from `caller` via the token gateway; the caller must
    /// have granted the farm a sufficient allowance beforehand.
    pub fn deposit(&self, caller: &Address, amount: u64) -> Result<u64, FarmError> {
        let mut state = self.state.write();
        if state.deposits_paused {
            return Err(FarmError::DepositsPaused);
        }
        if amount == 0 {
            return Err(FarmError::ZeroAmount);
        }
        // Reserve capacity before the external call so the commit below
        // cannot fail with the transfer already executed.
        state.book.preflight_deposit(caller, amount)?;
        self.token
            .transfer_from(caller, &self.address, amount)
            .map_err(|e| FarmError::TransferFailed(e.to_string()))?;

        let now = self.clock.unix_now();
        let deposit_id = state.book.open_slot(caller, amount, now)?;
        info!(%caller, deposit_id, amount, "deposit accepted");
        Ok(deposit_id)
    }

    /// Withdraw `amount` of the accrued value of one deposit slot; `0` means
    /// everything. Returns the payout.
    ///
    /// The payout is taken from the accrued (interest-inflated) value; the
    /// slot's stored principal is reduced proportionally so that future
    /// accrual on the remainder stays consistent. Withdrawing everything
    /// closes the slot for good.
    pub fn request_withdrawal(
        &self,
        caller: &Address,
        deposit_id: u64,
        amount: u64,
    ) -> Result<u64, FarmError> {
        let mut state = self.state.write();
        if state.withdrawals_paused {
            return Err(FarmError::WithdrawalsPaused);
        }
        let last = state.book.last_deposit_id(caller);
        if deposit_id == 0 || deposit_id > last {
            return Err(FarmError::InvalidDepositId { id: deposit_id, last });
        }
        let slot = *state
            .book
            .slot(caller, deposit_id)
            .ok_or(FarmError::InvalidDepositId { id: deposit_id, last })?;
        if slot.is_closed() {
            return Err(FarmError::SlotClosed(deposit_id));
        }

        let now = self.clock.unix_now();
        let elapsed = now.saturating_sub(slot.deposited_at);
        let accrued = self
            .interest
            .accrued_amount(slot.principal, state.apy, elapsed)?;

        let (payout, principal_consumed) = if amount == 0 {
            (accrued, slot.principal)
        } else {
            if amount > accrued {
                return Err(FarmError::InsufficientFunds { requested: amount, accrued });
            }
            // Proportional share of the stored principal, floored. The floor
            // under-consumes, never over-consumes, keeping total_staked
            // conservative.
            let consumed =
                ((slot.principal as u128) * (amount as u128) / (accrued as u128)) as u64;
            (amount, consumed)
        };

        self.token
            .transfer(caller, payout)
            .map_err(|e| FarmError::TransferFailed(e.to_string()))?;
        state
            .book
            .reduce_slot(caller, deposit_id, principal_consumed, now)?;
        info!(%caller, deposit_id, payout, principal_consumed, "withdrawal executed");
        Ok(payout)
    }

    /// Withdraw the full accrued value of one deposit slot, closing it.
    pub fn request_withdrawal_all(
        &self,
        caller: &Address,
        deposit_id: u64,
    ) -> Result<u64, FarmError> {
        self.request_withdrawal(caller, deposit_id, 0)
    }

    // ------------------------------------------------------------------
    // Owner controls
    // ------------------------------------------------------------------

    /// Set the APY (whole percent). Owner only.
    ///
    /// Takes effect immediately for every subsequent accrual computation on
    /// every open slot, i.e. retroactively over each slot's full held
    /// duration, since accrual always uses the current rate with the
    /// original deposit timestamp.
    pub fn set_apy(&self, caller: &Address, new_apy: u64) -> Result<(), FarmError> {
        let mut state = self.state.write();
        Self::require_owner(&state, caller)?;
        let old = state.apy;
        state.apy = new_apy;
        info!(old, new = new_apy, "apy updated");
        Ok(())
    }

    /// Block new deposits. Owner only; independent of the withdrawal gate.
    pub fn pause_deposits(&self, caller: &Address) -> Result<(), FarmError> {
        self.set_deposit_gate(caller, true)
    }

    /// Re-enable deposits. Owner only.
    pub fn unpause_deposits(&self, caller: &Address) -> Result<(), FarmError> {
        self.set_deposit_gate(caller, false)
    }

    /// Block withdrawals. Owner only; independent of the deposit gate.
    pub fn pause_withdrawals(&self, caller: &Address) -> Result<(), FarmError> {
        self.set_withdrawal_gate(caller, true)
    }

    /// Re-enable withdrawals. Owner only.
    pub fn unpause_withdrawals(&self, caller: &Address) -> Result<(), FarmError> {
        self.set_withdrawal_gate(caller, false)
    }

    /// Fund the reward reserve from the caller's token balance. Owner only.
    ///
    /// The reserve is what interest payouts are actually paid from at the
    /// token level, but the ledger tracks contributions informationally
    /// only; nothing gates on this map.
    pub fn store_farming_rewards(&self, caller: &Address, amount: u64) -> Result<(), FarmError> {
        let mut state = self.state.write();
        Self::require_owner(&state, caller)?;
        if amount == 0 {
            return Err(FarmError::ZeroAmount);
        }
        let current = state.farm_rewards.get(caller).copied().unwrap_or(0);
        let updated = current
            .checked_add(amount)
            .ok_or(silo_core::error::MathError::ArithmeticOverflow)?;
        self.token
            .transfer_from(caller, &self.address, amount)
            .map_err(|e| FarmError::TransferFailed(e.to_string()))?;
        state.farm_rewards.insert(*caller, updated);
        info!(%caller, amount, "farming rewards stored");
        Ok(())
    }

    fn set_deposit_gate(&self, caller: &Address, paused: bool) -> Result<(), FarmError> {
        let mut state = self.state.write();
        Self::require_owner(&state, caller)?;
        state.deposits_paused = paused;
        debug!(paused, "deposit gate updated");
        Ok(())
    }

    fn set_withdrawal_gate(&self, caller: &Address, paused: bool) -> Result<(), FarmError> {
        let mut state = self.state.write();
        Self::require_owner(&state, caller)?;
        state.withdrawals_paused = paused;
        debug!(paused, "withdrawal gate updated");
        Ok(())
    }

    fn require_owner(state: &FarmState, caller: &Address) -> Result<(), FarmError> {
        if *caller != state.owner {
            return Err(FarmError::Unauthorized(*caller));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read queries
    // ------------------------------------------------------------------

    pub fn apy(&self) -> u64 {
        self.state.read().apy
    }

    pub fn owner(&self) -> Address {
        self.state.read().owner
    }

    /// The farm's own token account.
    pub fn farm_address(&self) -> Address {
        self.address
    }

    pub fn total_staked(&self) -> u64 {
        self.state.read().book.total_staked()
    }

    pub fn deposits_paused(&self) -> bool {
        self.state.read().deposits_paused
    }

    pub fn withdrawals_paused(&self) -> bool {
        self.state.read().withdrawals_paused
    }

    pub fn last_deposit_id(&self, address: &Address) -> u64 {
        self.state.read().book.last_deposit_id(address)
    }

    /// Stored (pre-interest) principal of one slot. Interest is computed
    /// lazily at withdrawal time and never persisted between calls.
    pub fn balance(&self, address: &Address, deposit_id: u64) -> Result<u64, FarmError> {
        let state = self.state.read();
        let last = state.book.last_deposit_id(address);
        if deposit_id == 0 || deposit_id > last {
            return Err(FarmError::InvalidDepositId { id: deposit_id, last });
        }
        Ok(state.book.principal(address, deposit_id))
    }

    /// Sum of stored principals across all of `address`'s slots.
    pub fn total_balance_of(&self, address: &Address) -> u64 {
        self.state.read().book.total_balance_of(address)
    }

    pub fn deposit_timestamp(&self, address: &Address, deposit_id: u64) -> Result<u64, FarmError> {
        let state = self.state.read();
        let last = state.book.last_deposit_id(address);
        state
            .book
            .slot(address, deposit_id)
            .map(|s| s.deposited_at)
            .ok_or(FarmError::InvalidDepositId { id: deposit_id, last })
    }

    pub fn withdrawal_request_date(
        &self,
        address: &Address,
        deposit_id: u64,
    ) -> Result<Option<u64>, FarmError> {
        let state = self.state.read();
        let last = state.book.last_deposit_id(address);
        state
            .book
            .slot(address, deposit_id)
            .map(|s| s.withdrawal_requested_at)
            .ok_or(FarmError::InvalidDepositId { id: deposit_id, last })
    }

    /// Reward-reserve contributions recorded for `address`.
    pub fn farm_rewards(&self, address: &Address) -> u64 {
        self.state
            .read()
            .farm_rewards
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Token passthrough queries
    // ------------------------------------------------------------------

    pub fn token_name(&self) -> Result<String, TokenError> {
        self.token.name()
    }

    pub fn token_symbol(&self) -> Result<String, TokenError> {
        self.token.symbol()
    }

    pub fn token_total_supply(&self) -> Result<u64, TokenError> {
        self.token.total_supply()
    }

    pub fn token_balance_of(&self, address: &Address) -> Result<u64, TokenError> {
        self.token.balance_of(address)
    }

    // ------------------------------------------------------------------
    // Snapshot plumbing (see snapshot.rs)
    // ------------------------------------------------------------------

    pub(crate) fn state(&self) -> &RwLock<FarmState> {
        &self.state
    }
}
