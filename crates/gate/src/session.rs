//! Host session interface

use launcher_gate_core::{AccountId, SessionId};

/// Handle to one live player session owned by the host runtime
///
/// # Purpose
/// The gate's only outbound surface: it can address the player with a
/// system message and terminate the session. Hosts implement this as a
/// thin adapter over their own session object.
pub trait SessionHandle {
    /// Unique identifier of this session
    fn id(&self) -> SessionId;

    /// Account this session authenticated as
    fn account_id(&self) -> AccountId;

    /// Show the player a system chat message
    fn send_system_message(&self, text: &str);

    /// Forcibly terminate the session
    fn kick(&self);
}
