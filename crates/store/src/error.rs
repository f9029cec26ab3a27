//! Store-related errors

use launcher_gate_core::AccountId;
use thiserror::Error;

/// Store-related errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
