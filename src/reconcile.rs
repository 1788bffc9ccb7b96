//! Arming decision for one cycle.
//!
//! The rule: when the system is armed and a controlling device is on the
//! network, disarm; when it is disarmed and no controlling device is on the
//! network, arm; otherwise leave it alone.

use std::collections::HashSet;

use crate::camera::ArmStateGateway;

/// What the reconciler did this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Arm state left unchanged
    None,
    /// The system was armed
    Arm,
    /// The system was disarmed
    Disarm,
}

impl Action {
    /// Wire representation used in status reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::None => "",
            Action::Arm => "arm",
            Action::Disarm => "disarm",
        }
    }
}

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Armed state as fetched this cycle, if it could be determined
    pub armed: Option<bool>,
    /// Connected addresses observed this cycle, sorted
    pub connected_addresses: Vec<String>,
    /// Action taken, if any
    pub action: Action,
    /// Failure description when a fetch failed
    pub error: Option<String>,
}

/// Controlling addresses currently present in the connected set, in
/// controlling-list order.
pub fn connected_controlling(controlling: &[String], connected: &[String]) -> Vec<String> {
    let connected: HashSet<&str> = connected.iter().map(String::as_str).collect();
    controlling
        .iter()
        .filter(|ip| connected.contains(ip.as_str()))
        .cloned()
        .collect()
}

/// Decide and apply the arming action for one cycle.
///
/// The caller guarantees `currently_armed` was successfully fetched. When an
/// action is warranted the gateway write is issued before the action is
/// returned, so a reported action always corresponds to an issued write. A
/// write failure is logged but does not retract the action.
pub async fn reconcile<G: ArmStateGateway>(
    gateway: &G,
    currently_armed: bool,
    connected: &[String],
    controlling: &[String],
) -> Action {
    let present = connected_controlling(controlling, connected);
    tracing::info!("Connected controlling IPs: {present:?}");

    let action = if currently_armed {
        if present.is_empty() {
            tracing::info!("No controlling devices connected, not disarming");
            Action::None
        } else {
            Action::Disarm
        }
    } else if present.is_empty() {
        Action::Arm
    } else {
        tracing::info!("Some controlling devices connected, not arming");
        Action::None
    };

    if action != Action::None {
        if let Err(e) = gateway.set_armed(!currently_armed).await {
            tracing::warn!("Arm state write failed after issuing {}: {e}", action.as_str());
        }
    }

    action
}
