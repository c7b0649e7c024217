//! Error types for the Silo farm.
use thiserror::Error;

use crate::types::Address;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("division by zero")] DivisionByZero,
    #[error("logarithm of non-positive value")] NonPositiveLogarithm,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid length: expected 20 bytes, got {0}")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: u64, need: u64 },
    #[error("token unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    #[error("zero amount")] ZeroAmount,
    #[error("invalid deposit id {id}: last assigned is {last}")] InvalidDepositId { id: u64, last: u64 },
    #[error("deposit {0} is closed")] SlotClosed(u64),
    #[error("insufficient funds: requested {requested}, accrued {accrued}")] InsufficientFunds { requested: u64, accrued: u64 },
    #[error("unauthorized: {0} is not the farm owner")] Unauthorized(Address),
    #[error("deposits are paused")] DepositsPaused,
    #[error("withdrawals are paused")] WithdrawalsPaused,
    #[error("token transfer failed: {0}")] TransferFailed(String),
    #[error("invalid token: {0}")] InvalidToken(String),
    #[error("snapshot: {0}")] Snapshot(String),
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug)]
pub enum SiloError {
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Token(#[from] TokenError),
    #[error(transparent)] Farm(#[from] FarmError),
}
