//! # Launcher Gate Service
//!
//! The service object the host constructs once at startup and forwards its
//! lifecycle callbacks to.

use crate::session::SessionHandle;
use crate::verdict::Verdict;
use dashmap::DashMap;
use launcher_gate_config::GateConfig;
use launcher_gate_core::{AccountId, SecurityLevel, SessionId};
use launcher_gate_store::{AccountStore, LAUNCHER_VERIFIED};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Welcome line shown to players that passed the store check
const WELCOME_MESSAGE: &str =
    "[System] Welcome! Your connection through the official launcher has been confirmed.";

/// Warning line shown to players scheduled for a kick
fn kick_warning(grace_period: Duration) -> String {
    format!(
        "[System] Warning: you must log in through the official launcher. \
         You will be disconnected in {} seconds.",
        grace_period.as_secs()
    )
}

/// Verdict parked between account authentication and session attach
struct PendingVerdict {
    needs_kick: bool,
    exempt: bool,
    recorded_at: Instant,
}

/// Launcher verification gate
///
/// # Purpose
/// Decides per authentication whether an account used the official
/// launcher, and disconnects non-compliant sessions after a grace period.
///
/// # Thread Safety
/// All methods are safe to call concurrently from host worker threads.
/// The config snapshot is swapped wholesale under a `RwLock`; the two
/// pending maps are `DashMap`s, and every lookup+erase runs as one per-key
/// atomic operation.
pub struct LauncherGate {
    /// The host's persisted account store
    store: Arc<dyn AccountStore>,

    /// Current configuration snapshot
    config: RwLock<Arc<GateConfig>>,

    /// Verdicts awaiting session attach
    /// Key: AccountId, Value: parked verdict
    pending_verdicts: DashMap<AccountId, PendingVerdict>,

    /// Armed kick deadlines
    /// Key: SessionId, Value: deadline
    pending_kicks: DashMap<SessionId, Instant>,
}

impl LauncherGate {
    /// Create the gate service
    ///
    /// # Arguments
    /// * `store` - the host's account store
    /// * `config` - initial configuration snapshot
    pub fn new(store: Arc<dyn AccountStore>, config: GateConfig) -> Self {
        debug!("Creating LauncherGate");

        Self {
            store,
            config: RwLock::new(Arc::new(config)),
            pending_verdicts: DashMap::new(),
            pending_kicks: DashMap::new(),
        }
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<GateConfig> {
        self.config.read().clone()
    }

    /// Replace the configuration snapshot
    ///
    /// In-flight resolutions keep the snapshot they started with; later
    /// calls observe the new one in full.
    pub fn set_config(&self, config: GateConfig) {
        *self.config.write() = Arc::new(config);
    }

    /// Host callback: configuration load or reload
    pub fn reload_config<P: AsRef<Path>>(&self, path: P) {
        self.set_config(GateConfig::load_from_file(path));
    }

    /// Host callback: process startup
    pub fn on_startup(&self) {
        let config = self.config();
        info!(
            "Launcher check is {}",
            if config.enabled { "enabled" } else { "disabled" }
        );
    }

    /// Host callback: account authenticated
    ///
    /// # Behavior
    /// Decides the verdict (whitelist, then GM bypass, then store lookup)
    /// and parks it for the session attach, overwriting any stale verdict
    /// for the same account. Returns `None` when the module is disabled.
    ///
    /// The store query is bounded by the configured timeout; a slow or
    /// unreachable store resolves to a kick (fail closed) rather than
    /// stalling the authentication pipeline.
    pub async fn resolve(
        &self,
        account: AccountId,
        security_level: SecurityLevel,
    ) -> Option<Verdict> {
        let config = self.config();
        if !config.enabled {
            return None;
        }

        let verdict = if config.whitelist.contains(&account) {
            info!("Whitelisted account {} passed the launcher check", account);
            Verdict::Allow { exempt: true }
        } else if config.bypass_for_gms && security_level >= config.gm_bypass_level {
            info!(
                "GM account {} (security level {}) passed the launcher check",
                account, security_level
            );
            Verdict::Allow { exempt: true }
        } else {
            self.check_store(account, config.query_timeout).await
        };

        let now = Instant::now();
        self.evict_expired_verdicts(now, config.verdict_ttl);
        self.pending_verdicts.insert(
            account,
            PendingVerdict {
                needs_kick: verdict.needs_kick(),
                exempt: verdict.is_exempt(),
                recorded_at: now,
            },
        );

        Some(verdict)
    }

    /// Query the store for the account's launcher status
    ///
    /// Fail closed: a missing record, an unreachable store, or a timed-out
    /// query all resolve to a kick. An unverifiable account is not trusted.
    async fn check_store(&self, account: AccountId, query_timeout: Duration) -> Verdict {
        let status =
            tokio::time::timeout(query_timeout, self.store.launcher_status(account)).await;

        match status {
            Ok(Ok(LAUNCHER_VERIFIED)) => {
                info!("Account {} verified as using the launcher", account);
                let update =
                    tokio::time::timeout(query_timeout, self.store.mark_verified(account)).await;
                match update {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!("Could not mark account {} as verified: {}", account, e)
                    }
                    Err(_) => warn!("Marking account {} as verified timed out", account),
                }
                Verdict::Allow { exempt: false }
            }
            Ok(Ok(status)) => {
                info!(
                    "Account {} did not use the launcher (status: {})",
                    account, status
                );
                Verdict::Kick
            }
            Ok(Err(e)) => {
                warn!(
                    "Launcher status query for account {} failed: {}. Scheduling kick.",
                    account, e
                );
                Verdict::Kick
            }
            Err(_) => {
                warn!(
                    "Launcher status query for account {} timed out. Scheduling kick.",
                    account
                );
                Verdict::Kick
            }
        }
    }

    /// Host callback: player session attached (login)
    pub fn on_session_attach(&self, session: &dyn SessionHandle) {
        self.attach_at(session, Instant::now());
    }

    /// Session attach with an explicit notion of "now"
    ///
    /// # Behavior
    /// Consumes the account's parked verdict. No verdict, or an expired
    /// one, clears the session (the resolver already ran, or the module
    /// was disabled). A kick verdict warns the player and arms the
    /// grace-period deadline; a non-exempt allow sends the welcome line;
    /// exempt accounts stay silent.
    pub fn attach_at(&self, session: &dyn SessionHandle, now: Instant) {
        let config = self.config();
        if !config.enabled {
            return;
        }

        let account = session.account_id();
        let Some((_, verdict)) = self.pending_verdicts.remove(&account) else {
            return;
        };

        if now.saturating_duration_since(verdict.recorded_at) > config.verdict_ttl {
            debug!(
                "Discarding expired launcher verdict for account {}",
                account
            );
            return;
        }

        if verdict.needs_kick {
            info!(
                "Session {} (account {}) scheduled for kick in {}s: did not use the launcher",
                session.id(),
                account,
                config.grace_period.as_secs()
            );
            session.send_system_message(&kick_warning(config.grace_period));
            self.pending_kicks
                .insert(session.id(), now + config.grace_period);
        } else if !verdict.exempt {
            session.send_system_message(WELCOME_MESSAGE);
        }
    }

    /// Host callback: periodic per-session tick
    pub fn on_session_tick(&self, session: &dyn SessionHandle) {
        self.tick_at(session, Instant::now());
    }

    /// Session tick with an explicit notion of "now"
    ///
    /// Cheap map lookup per call; only an armed deadline at or past `now`
    /// does any work. The deadline entry is removed and the session kicked
    /// in one per-key atomic step, so a concurrent detach can never race an
    /// enforcement into a double removal.
    pub fn tick_at(&self, session: &dyn SessionHandle, now: Instant) {
        if !self.config().enabled {
            return;
        }

        let expired = self
            .pending_kicks
            .remove_if(&session.id(), |_, deadline| now >= *deadline)
            .is_some();

        if expired {
            info!(
                "Kicking session {} (account {}): grace period elapsed",
                session.id(),
                session.account_id()
            );
            session.kick();
        }
    }

    /// Host callback: player session detached (logout)
    ///
    /// Cancels any armed kick and discards any residual verdict for the
    /// account. Runs even when the module is disabled, so a disable-reload
    /// cannot strand entries.
    pub fn on_session_detach(&self, session_id: SessionId, account: AccountId) {
        if self.pending_kicks.remove(&session_id).is_some() {
            debug!("Cancelled pending kick for session {}", session_id);
        }
        self.pending_verdicts.remove(&account);
    }

    /// Number of verdicts awaiting a session attach
    pub fn pending_verdict_count(&self) -> usize {
        self.pending_verdicts.len()
    }

    /// Number of armed kick deadlines
    pub fn pending_kick_count(&self) -> usize {
        self.pending_kicks.len()
    }

    /// Drop parked verdicts older than the configured TTL
    ///
    /// Runs opportunistically on every resolve; accounts that authenticate
    /// but never attach a session cannot grow the map without bound.
    fn evict_expired_verdicts(&self, now: Instant, ttl: Duration) {
        self.pending_verdicts
            .retain(|_, v| now.saturating_duration_since(v.recorded_at) <= ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launcher_gate_store::{MemoryStore, StoreError, ONLINE_VERIFIED};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Recording stand-in for a host session
    struct StubSession {
        id: SessionId,
        account: AccountId,
        messages: Mutex<Vec<String>>,
        kicks: AtomicUsize,
    }

    impl StubSession {
        fn new(id: u64, account: u32) -> Self {
            Self {
                id: SessionId::new(id),
                account: AccountId::new(account),
                messages: Mutex::new(Vec::new()),
                kicks: AtomicUsize::new(0),
            }
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().clone()
        }

        fn kick_count(&self) -> usize {
            self.kicks.load(Ordering::SeqCst)
        }
    }

    impl SessionHandle for StubSession {
        fn id(&self) -> SessionId {
            self.id
        }

        fn account_id(&self) -> AccountId {
            self.account
        }

        fn send_system_message(&self, text: &str) {
            self.messages.lock().push(text.to_string());
        }

        fn kick(&self) {
            self.kicks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gate_with(store: Arc<MemoryStore>, config: GateConfig) -> LauncherGate {
        LauncherGate::new(store, config)
    }

    fn whitelist_config(ids: &[u32]) -> GateConfig {
        GateConfig {
            whitelist: ids.iter().copied().map(AccountId::new).collect(),
            ..GateConfig::default()
        }
    }

    #[tokio::test]
    async fn test_whitelist_allows_regardless_of_store() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let gate = gate_with(store.clone(), whitelist_config(&[42]));

        let verdict = gate.resolve(AccountId::new(42), 0).await;
        assert_eq!(verdict, Some(Verdict::Allow { exempt: true }));
        assert_eq!(store.status_query_count(), 0);
    }

    #[tokio::test]
    async fn test_gm_bypass_honors_level_and_flag() {
        let store = Arc::new(MemoryStore::new());
        let config = GateConfig {
            bypass_for_gms: true,
            gm_bypass_level: 3,
            ..GateConfig::default()
        };
        let gate = gate_with(store.clone(), config);

        let verdict = gate.resolve(AccountId::new(8), 3).await;
        assert_eq!(verdict, Some(Verdict::Allow { exempt: true }));
        assert_eq!(store.status_query_count(), 0);

        // Below the bypass level the store is consulted and fails closed
        let verdict = gate.resolve(AccountId::new(8), 2).await;
        assert_eq!(verdict, Some(Verdict::Kick));
        assert_eq!(store.status_query_count(), 1);
    }

    #[tokio::test]
    async fn test_gm_level_ignored_when_bypass_disabled() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store.clone(), GateConfig::default());

        let verdict = gate.resolve(AccountId::new(8), 5).await;
        assert_eq!(verdict, Some(Verdict::Kick));
        assert_eq!(store.status_query_count(), 1);
    }

    #[tokio::test]
    async fn test_verified_status_allows_and_marks_once() {
        let store = Arc::new(MemoryStore::new());
        store.set_status(AccountId::new(7), LAUNCHER_VERIFIED);
        let gate = gate_with(store.clone(), GateConfig::default());

        let verdict = gate.resolve(AccountId::new(7), 0).await;
        assert_eq!(verdict, Some(Verdict::Allow { exempt: false }));
        assert_eq!(store.verify_update_count(), 1);
        assert_eq!(store.status(AccountId::new(7)), Some(ONLINE_VERIFIED));
    }

    #[tokio::test]
    async fn test_unverified_status_kicks_without_update() {
        let store = Arc::new(MemoryStore::new());
        // Status 1 is "online", not "verified via launcher"; only 2 passes
        store.set_status(AccountId::new(7), 1);
        let gate = gate_with(store.clone(), GateConfig::default());

        let verdict = gate.resolve(AccountId::new(7), 0).await;
        assert_eq!(verdict, Some(Verdict::Kick));
        assert_eq!(store.verify_update_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_account_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store.clone(), GateConfig::default());

        let verdict = gate.resolve(AccountId::new(404), 0).await;
        assert_eq!(verdict, Some(Verdict::Kick));
        assert_eq!(store.verify_update_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.set_status(AccountId::new(7), LAUNCHER_VERIFIED);
        store.set_unavailable(true);
        let gate = gate_with(store.clone(), GateConfig::default());

        let verdict = gate.resolve(AccountId::new(7), 0).await;
        assert_eq!(verdict, Some(Verdict::Kick));
        assert_eq!(store.verify_update_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_query_times_out_to_kick() {
        struct HangingStore;

        #[async_trait::async_trait]
        impl AccountStore for HangingStore {
            async fn launcher_status(
                &self,
                _account: AccountId,
            ) -> Result<u32, StoreError> {
                std::future::pending().await
            }

            async fn mark_verified(&self, _account: AccountId) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let gate = LauncherGate::new(Arc::new(HangingStore), GateConfig::default());
        let verdict = gate.resolve(AccountId::new(7), 0).await;
        assert_eq!(verdict, Some(Verdict::Kick));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store, GateConfig::default());

        let first = gate.resolve(AccountId::new(7), 0).await;
        let second = gate.resolve(AccountId::new(7), 0).await;
        assert_eq!(first, second);
        assert_eq!(gate.pending_verdict_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_whitelisted_account_is_never_kicked() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store, whitelist_config(&[42]));
        let session = StubSession::new(1, 42);

        let _ = gate.resolve(AccountId::new(42), 0).await;

        let t0 = Instant::now();
        gate.attach_at(&session, t0);
        assert!(session.messages().is_empty());
        assert_eq!(gate.pending_kick_count(), 0);

        gate.tick_at(&session, t0 + Duration::from_secs(120));
        assert_eq!(session.kick_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_noncompliant_account_kicked_after_grace() {
        let store = Arc::new(MemoryStore::new());
        store.set_status(AccountId::new(7), 0);
        let gate = gate_with(store, GateConfig::default());
        let session = StubSession::new(1, 7);

        let _ = gate.resolve(AccountId::new(7), 0).await;

        let t0 = Instant::now();
        gate.attach_at(&session, t0);
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("official launcher"));
        assert!(messages[0].contains("30 seconds"));
        assert_eq!(gate.pending_kick_count(), 1);

        gate.tick_at(&session, t0 + Duration::from_secs(29));
        assert_eq!(session.kick_count(), 0);

        gate.tick_at(&session, t0 + Duration::from_secs(31));
        assert_eq!(session.kick_count(), 1);
        assert_eq!(gate.pending_kick_count(), 0);

        // Deadline was consumed; later ticks cannot double-kick
        gate.tick_at(&session, t0 + Duration::from_secs(60));
        assert_eq!(session.kick_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_logout_cancels_pending_kick() {
        let store = Arc::new(MemoryStore::new());
        store.set_status(AccountId::new(7), 0);
        let gate = gate_with(store, GateConfig::default());
        let session = StubSession::new(1, 7);

        let _ = gate.resolve(AccountId::new(7), 0).await;

        let t0 = Instant::now();
        gate.attach_at(&session, t0);
        assert_eq!(gate.pending_kick_count(), 1);

        // Logout at t=15, before the deadline
        gate.on_session_detach(session.id(), session.account_id());
        assert_eq!(gate.pending_kick_count(), 0);

        gate.tick_at(&session, t0 + Duration::from_secs(31));
        assert_eq!(session.kick_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_disabled_module_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        store.set_status(AccountId::new(7), 0);
        let config = GateConfig {
            enabled: false,
            ..GateConfig::default()
        };
        let gate = gate_with(store.clone(), config);
        let session = StubSession::new(1, 7);

        assert_eq!(gate.resolve(AccountId::new(7), 0).await, None);
        assert_eq!(store.status_query_count(), 0);

        gate.on_session_attach(&session);
        assert!(session.messages().is_empty());
        assert_eq!(gate.pending_verdict_count(), 0);
        assert_eq!(gate.pending_kick_count(), 0);
    }

    #[tokio::test]
    async fn test_welcome_message_only_for_store_verified() {
        let store = Arc::new(MemoryStore::new());
        store.set_status(AccountId::new(7), LAUNCHER_VERIFIED);
        let gate = gate_with(store, GateConfig::default());
        let session = StubSession::new(1, 7);

        let _ = gate.resolve(AccountId::new(7), 0).await;
        gate.on_session_attach(&session);

        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Welcome"));
        assert_eq!(gate.pending_kick_count(), 0);
    }

    #[tokio::test]
    async fn test_attach_without_verdict_is_cleared() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store, GateConfig::default());
        let session = StubSession::new(1, 7);

        gate.on_session_attach(&session);
        assert!(session.messages().is_empty());
        assert_eq!(gate.pending_kick_count(), 0);
    }

    #[tokio::test]
    async fn test_detach_discards_residual_verdict() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store, GateConfig::default());

        let _ = gate.resolve(AccountId::new(7), 0).await;
        assert_eq!(gate.pending_verdict_count(), 1);

        gate.on_session_detach(SessionId::new(1), AccountId::new(7));
        assert_eq!(gate.pending_verdict_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_verdict_is_discarded_at_attach() {
        let store = Arc::new(MemoryStore::new());
        store.set_status(AccountId::new(7), 0);
        let gate = gate_with(store, GateConfig::default());
        let session = StubSession::new(1, 7);

        let _ = gate.resolve(AccountId::new(7), 0).await;

        let ttl = gate.config().verdict_ttl;
        gate.attach_at(&session, Instant::now() + ttl + Duration::from_secs(1));
        assert!(session.messages().is_empty());
        assert_eq!(gate.pending_kick_count(), 0);
        // Consumed on the way out even though it was stale
        assert_eq!(gate.pending_verdict_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_verdicts_are_evicted_on_resolve() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store, GateConfig::default());

        let _ = gate.resolve(AccountId::new(1), 0).await;
        assert_eq!(gate.pending_verdict_count(), 1);

        gate.set_config(GateConfig {
            verdict_ttl: Duration::ZERO,
            ..GateConfig::default()
        });
        std::thread::sleep(Duration::from_millis(2));

        let _ = gate.resolve(AccountId::new(2), 0).await;
        assert_eq!(gate.pending_verdict_count(), 1);
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot_wholesale() {
        use std::io::Write;

        let store = Arc::new(MemoryStore::new());
        let gate = gate_with(store, whitelist_config(&[1]));

        let before = gate.config();

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mod-launcher-check.conf");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "mod-launcher-check.Whitelist = \"1,2,3\"").unwrap();
        gate.reload_config(&path);

        // The snapshot taken before the reload is untouched
        assert_eq!(
            before.whitelist,
            [1].into_iter().map(AccountId::new).collect()
        );

        let verdict = gate.resolve(AccountId::new(2), 0).await;
        assert_eq!(verdict, Some(Verdict::Allow { exempt: true }));
    }
}
