//! The account-store contract

use crate::error::Result;
use async_trait::async_trait;
use launcher_gate_core::AccountId;

/// Launcher-status sentinel meaning "authenticated through the official
/// launcher". Any other value, including 0 and 1, means "not verified".
pub const LAUNCHER_VERIFIED: u32 = 2;

/// Status written back once a launcher-verified account is admitted
pub const ONLINE_VERIFIED: u32 = 1;

/// Persisted account store
///
/// # Purpose
/// The gate's only view of the host's account database. Implementations
/// wrap whatever backend the host uses (SQL, key-value, test fixture).
///
/// # Contract
/// `launcher_status` returns the raw status field; the gate compares it
/// against [`LAUNCHER_VERIFIED`] itself. `mark_verified` sets the status
/// to [`ONLINE_VERIFIED`] after a successful launcher check.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Read the launcher-status field for an account
    async fn launcher_status(&self, account: AccountId) -> Result<u32>;

    /// Mark an account as online and launcher-verified
    async fn mark_verified(&self, account: AccountId) -> Result<()>;
}
