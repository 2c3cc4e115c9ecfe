//! Suspension bookkeeping.
//!
//! The facility only ever removes a suspension condition it added itself.
//! An actor that walks in already suspended (for whatever other reason)
//! keeps its condition on the way out - `suspension_applied` tracks whose
//! condition it is.

use tracing::warn;

use crate::components::{ConditionKind, Conditions, Facility};
use crate::config::ConditionTable;

/// Apply the suspension condition on entry, unless it is already present
/// for some other reason - in that case it is not ours to remove later.
pub fn apply_if_needed(facility: &mut Facility, conditions: &mut Conditions, table: &ConditionTable) {
    if conditions.has(ConditionKind::Suspension) {
        facility.suspension_applied = false;
        return;
    }
    let Some(params) = table.get(ConditionKind::Suspension) else {
        warn!("suspension condition not configured; occupant stays unsuspended");
        facility.suspension_applied = false;
        return;
    };
    conditions.add(ConditionKind::Suspension, params.initial_severity);
    facility.suspension_applied = true;
}

/// Remove the suspension condition iff this facility added it. Runs on
/// every occupant-exit path. Safe to call twice: the second call is a
/// no-op.
pub fn remove_if_we_added(facility: &mut Facility, conditions: &mut Conditions) {
    if !facility.suspension_applied {
        return;
    }
    conditions.remove(ConditionKind::Suspension);
    facility.suspension_applied = false;
}
