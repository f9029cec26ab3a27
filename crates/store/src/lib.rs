//! # Launcher Gate Account Store
//!
//! This crate defines the narrow contract the gate has with the host's
//! persisted account store: reading the launcher-status field and marking
//! an account as verified.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use launcher_gate_store::{AccountStore, MemoryStore, LAUNCHER_VERIFIED};
//! use launcher_gate_core::AccountId;
//!
//! # async fn example() {
//! let store = MemoryStore::new();
//! store.set_status(AccountId::new(7), LAUNCHER_VERIFIED);
//!
//! let status = store.launcher_status(AccountId::new(7)).await.unwrap();
//! assert_eq!(status, LAUNCHER_VERIFIED);
//! # }
//! ```

mod contract;
mod error;
mod memory;

pub use contract::{AccountStore, LAUNCHER_VERIFIED, ONLINE_VERIFIED};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
