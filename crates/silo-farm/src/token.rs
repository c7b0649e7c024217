//! In-memory fungible token for tests and local runs.
//!
//! [`MemoryToken`] keeps balances and allowances in maps with no persistence
//! and no real authentication. [`MemoryToken::handle`] returns a
//! [`TokenGateway`] authenticated as one account, the same shape in which
//! the farm holds a gateway bound to its own address. Not suitable for
//! production use.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use silo_core::error::TokenError;
use silo_core::traits::TokenGateway;
use silo_core::types::Address;

#[derive(Debug, Default)]
struct TokenBook {
    balances: BTreeMap<Address, u64>,
    /// Allowances keyed by (owner, spender).
    allowances: BTreeMap<(Address, Address), u64>,
    total_supply: u64,
}

impl TokenBook {
    fn move_funds(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), TokenError> {
        let have = self.balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        self.balances.insert(*from, have - amount);
        let dest = self.balances.entry(*to).or_insert(0);
        // Conservation keeps every balance within total_supply, which fits u64.
        *dest = dest
            .checked_add(amount)
            .ok_or_else(|| TokenError::Unavailable("balance overflow".to_string()))?;
        Ok(())
    }
}

/// An in-memory token ledger shared by all of its gateway handles.
pub struct MemoryToken {
    book: Arc<RwLock<TokenBook>>,
    name: String,
    symbol: String,
}

impl MemoryToken {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            book: Arc::new(RwLock::new(TokenBook::default())),
            name: name.into(),
            symbol: symbol.into(),
        }
    }

    /// Create `amount` new tokens in `to`'s balance.
    pub fn mint(&self, to: &Address, amount: u64) -> Result<(), TokenError> {
        let mut book = self.book.write();
        let supply = book
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TokenError::Unavailable("total supply overflow".to_string()))?;
        let balance = book.balances.get(to).copied().unwrap_or(0) + amount;
        book.balances.insert(*to, balance);
        book.total_supply = supply;
        Ok(())
    }

    /// Set `spender`'s allowance from `owner`, acting as `owner`.
    ///
    /// Test convenience equivalent of `handle(owner).approve(spender, ..)`.
    pub fn approve_from(&self, owner: &Address, spender: &Address, amount: u64) {
        self.book.write().allowances.insert((*owner, *spender), amount);
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.book.read().balances.get(address).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.book
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.book.read().total_supply
    }

    /// A [`TokenGateway`] authenticated as `account`.
    pub fn handle(&self, account: Address) -> MemoryTokenHandle {
        MemoryTokenHandle {
            book: Arc::clone(&self.book),
            account,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
        }
    }
}

/// A gateway into a [`MemoryToken`], acting as one account.
pub struct MemoryTokenHandle {
    book: Arc<RwLock<TokenBook>>,
    account: Address,
    name: String,
    symbol: String,
}

impl TokenGateway for MemoryTokenHandle {
    fn balance_of(&self, address: &Address) -> Result<u64, TokenError> {
        Ok(self.book.read().balances.get(address).copied().unwrap_or(0))
    }

    fn transfer(&self, to: &Address, amount: u64) -> Result<(), TokenError> {
        self.book.write().move_funds(&self.account, to, amount)
    }

    fn transfer_from(&self, from: &Address, to: &Address, amount: u64) -> Result<(), TokenError> {
        let mut book = self.book.write();
        let key = (*from, self.account);
        let allowed = book.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance { have: allowed, need: amount });
        }
        book.move_funds(from, to, amount)?;
        book.allowances.insert(key, allowed - amount);
        Ok(())
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Result<u64, TokenError> {
        Ok(self
            .book
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0))
    }

    fn approve(&self, spender: &Address, amount: u64) -> Result<(), TokenError> {
        self.book
            .write()
            .allowances
            .insert((self.account, *spender), amount);
        Ok(())
    }

    fn total_supply(&self) -> Result<u64, TokenError> {
        Ok(self.book.read().total_supply)
    }

    fn name(&self) -> Result<String, TokenError> {
        Ok(self.name.clone())
    }

    fn symbol(&self) -> Result<String, TokenError> {
        Ok(self.symbol.clone())
    }
}
