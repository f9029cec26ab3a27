//! # Launcher Gate - Login verification service
//!
//! This crate gates account logins behind a "used the official launcher"
//! check. The host server runtime owns the account, session, and player
//! lifecycle; it constructs one [`LauncherGate`] at startup and forwards its
//! lifecycle events to the gate's plain methods through whatever callback
//! registration it exposes.
//!
//! # Architecture
//!
//! The gate is a pipeline of three roles driven entirely by host events:
//!
//! 1. **Configuration** - a [`GateConfig`](launcher_gate_config::GateConfig)
//!    snapshot, swapped wholesale on reload.
//! 2. **Verification Resolver** - runs once per account authentication,
//!    decides allow-or-kick, and parks the verdict for the session attach.
//! 3. **Kick Scheduler** - consumes the verdict when the player's session
//!    attaches, warns non-compliant players, and enforces the grace-period
//!    deadline from the host's per-session tick.
//!
//! # Thread Safety
//!
//! - Config snapshot: `RwLock<Arc<GateConfig>>` (readers clone the `Arc`)
//! - Pending verdicts and pending kicks: `DashMap` (per-key atomic ops)
//! - All public methods are safe to call from any host worker thread
//!
//! # Example
//!
//! ```rust,no_run
//! use launcher_gate::LauncherGate;
//! use launcher_gate_config::GateConfig;
//! use launcher_gate_core::AccountId;
//! use launcher_gate_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let store = Arc::new(MemoryStore::new());
//! let gate = LauncherGate::new(store, GateConfig::default());
//!
//! // Host authentication callback:
//! let verdict = gate.resolve(AccountId::new(7), 0).await;
//! assert!(verdict.is_some());
//! # }
//! ```

mod service;
mod session;
mod verdict;

pub use service::LauncherGate;
pub use session::SessionHandle;
pub use verdict::Verdict;
