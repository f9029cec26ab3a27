//! Launcher Gate Configuration Management
//!
//! Loads the `mod-launcher-check.conf` settings file. The format is the
//! line-oriented `key = value` style used by the host server's module
//! configs, with `#` comments.
//!
//! Loading never fails hard: a missing or unreadable file falls back to the
//! built-in defaults, and malformed lines or values are logged and skipped.
//! Every load fully resets to defaults before reparsing, so a reload with a
//! trimmed-down file drops the removed settings instead of merging.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use launcher_gate_core::AccountId;
use tracing::{info, warn};

/// Config key prefix shared by every recognized option
const KEY_PREFIX: &str = "mod-launcher-check.";

/// Launcher gate configuration
///
/// Immutable snapshot between reloads; the gate service swaps the whole
/// snapshot atomically on reload rather than mutating it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Whether the launcher check is active at all
    /// (from "mod-launcher-check.Enabled", "1" = true)
    pub enabled: bool,
    /// Whether GM accounts above the bypass level skip the check
    /// (from "mod-launcher-check.BypassForGMsEnabled")
    pub bypass_for_gms: bool,
    /// Minimum security level that qualifies for the GM bypass
    /// (from "mod-launcher-check.GMLevelBypass")
    pub gm_bypass_level: u8,
    /// Accounts exempt from the check
    /// (from "mod-launcher-check.Whitelist", quoted comma-separated IDs)
    pub whitelist: HashSet<AccountId>,
    /// Delay between the warning message and the forced disconnect
    /// (from "mod-launcher-check.GracePeriodSeconds")
    pub grace_period: Duration,
    /// Upper bound on the account-store query during resolution
    /// (from "mod-launcher-check.QueryTimeoutMillis")
    pub query_timeout: Duration,
    /// How long an unconsumed verdict survives before eviction
    /// (from "mod-launcher-check.VerdictTTLSeconds")
    pub verdict_ttl: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bypass_for_gms: false,
            gm_bypass_level: 3,
            whitelist: HashSet::new(),
            grace_period: Duration::from_secs(30),
            query_timeout: Duration::from_secs(5),
            verdict_ttl: Duration::from_secs(300),
        }
    }
}

impl GateConfig {
    /// Load configuration from a conf file
    ///
    /// # Behavior
    /// Starts from the built-in defaults and applies every recognized
    /// `key = value` line. A missing or unreadable file is logged and
    /// yields the defaults; this never returns an error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                info!("Loading launcher check settings from {}", path.display());
                let config = Self::parse(&content);
                info!(
                    "Loaded {} whitelisted account(s)",
                    config.whitelist.len()
                );
                config
            }
            Err(e) => {
                warn!(
                    "Could not read config file {}: {}. Using default settings.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Parse conf file content
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse key=value
            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim();

                config.parse_option(key, value);
            }
        }

        config
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        let Some(option) = key.strip_prefix(KEY_PREFIX) else {
            return;
        };

        match option {
            "Enabled" => self.enabled = value == "1",
            "BypassForGMsEnabled" => self.bypass_for_gms = value == "1",
            "GMLevelBypass" => match value.parse() {
                Ok(level) => self.gm_bypass_level = level,
                Err(e) => warn!(
                    "Invalid GMLevelBypass value '{}': {}. Keeping {}.",
                    value, e, self.gm_bypass_level
                ),
            },
            "Whitelist" => self.parse_whitelist(value),
            "GracePeriodSeconds" => match value.parse() {
                Ok(secs) => self.grace_period = Duration::from_secs(secs),
                Err(e) => warn!(
                    "Invalid GracePeriodSeconds value '{}': {}. Keeping {}s.",
                    value,
                    e,
                    self.grace_period.as_secs()
                ),
            },
            "QueryTimeoutMillis" => match value.parse() {
                Ok(millis) => self.query_timeout = Duration::from_millis(millis),
                Err(e) => warn!(
                    "Invalid QueryTimeoutMillis value '{}': {}. Keeping {}ms.",
                    value,
                    e,
                    self.query_timeout.as_millis()
                ),
            },
            "VerdictTTLSeconds" => match value.parse() {
                Ok(secs) => self.verdict_ttl = Duration::from_secs(secs),
                Err(e) => warn!(
                    "Invalid VerdictTTLSeconds value '{}': {}. Keeping {}s.",
                    value,
                    e,
                    self.verdict_ttl.as_secs()
                ),
            },
            _ => {}
        }
    }

    /// Parse the whitelist value: comma-separated account IDs, optionally
    /// wrapped in quotes. Bad items are logged and skipped.
    fn parse_whitelist(&mut self, value: &str) {
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        self.whitelist = value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .filter_map(|item| match item.parse::<u32>() {
                Ok(id) => Some(AccountId::new(id)),
                Err(e) => {
                    warn!("Invalid account ID '{}' in whitelist: {}. Skipping.", item, e);
                    None
                }
            })
            .collect();
    }
}
