//! Verification verdicts

/// Outcome of resolving one account authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The account may stay connected
    ///
    /// `exempt` is true when the allow came from the whitelist or the GM
    /// bypass rather than a store lookup; exempt accounts get no welcome
    /// message at attach time.
    Allow {
        /// Allowed without consulting the store
        exempt: bool,
    },

    /// The session must be disconnected after the grace period
    Kick,
}

impl Verdict {
    /// Whether this verdict arms a kick deadline at session attach
    pub fn needs_kick(&self) -> bool {
        matches!(self, Verdict::Kick)
    }

    /// Whether this verdict skipped the store lookup entirely
    pub fn is_exempt(&self) -> bool {
        matches!(self, Verdict::Allow { exempt: true })
    }
}
