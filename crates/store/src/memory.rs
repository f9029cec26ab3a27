//! In-memory account store

use crate::contract::{AccountStore, ONLINE_VERIFIED};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use launcher_gate_core::AccountId;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// In-memory account store
///
/// # Purpose
/// Backs the gate in tests and in embedders that keep account state in
/// process. Records how often each contract method was called and can be
/// switched into a failing mode to exercise the fail-closed path.
///
/// # Thread Safety
/// Internally synchronized with `Mutex`; safe to share behind an `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    statuses: HashMap<AccountId, u32>,
    unavailable: bool,
    status_queries: usize,
    verify_updates: usize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the launcher-status field for an account
    pub fn set_status(&self, account: AccountId, status: u32) {
        self.inner.lock().statuses.insert(account, status);
    }

    /// Read back an account's status without going through the contract
    pub fn status(&self, account: AccountId) -> Option<u32> {
        self.inner.lock().statuses.get(&account).copied()
    }

    /// Make every contract call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Number of `launcher_status` calls observed
    pub fn status_query_count(&self) -> usize {
        self.inner.lock().status_queries
    }

    /// Number of `mark_verified` calls observed
    pub fn verify_update_count(&self) -> usize {
        self.inner.lock().verify_updates
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn launcher_status(&self, account: AccountId) -> Result<u32> {
        let mut inner = self.inner.lock();
        inner.status_queries += 1;

        if inner.unavailable {
            return Err(StoreError::Unavailable("store offline".into()));
        }

        inner
            .statuses
            .get(&account)
            .copied()
            .ok_or(StoreError::NotFound(account))
    }

    async fn mark_verified(&self, account: AccountId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.verify_updates += 1;

        if inner.unavailable {
            return Err(StoreError::Unavailable("store offline".into()));
        }

        debug!("Marking account {} as verified", account);
        inner.statuses.insert(account, ONLINE_VERIFIED);
        Ok(())
    }
}
