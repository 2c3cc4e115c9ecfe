//! Behavior parameter tables.
//!
//! The suspension controller and the stasis override take these by
//! injection instead of consulting any global registry, so tests can
//! substitute their own tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::components::ConditionKind;

/// Per-condition behavior parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionParams {
    /// Severity a freshly applied condition starts at.
    pub initial_severity: f32,
    /// Severity at which the condition kills, if it does.
    pub lethal_at: Option<f32>,
}

impl ConditionParams {
    /// Whether `severity` has reached the lethal threshold. Severities
    /// accumulate in f32 steps, so a sum that lands a rounding error under
    /// the threshold still counts as lethal.
    pub fn is_lethal(&self, severity: f32) -> bool {
        self.lethal_at.is_some_and(|at| severity >= at - 1e-6)
    }
}

/// Condition-kind lookup table. `get` on a missing kind returns `None`
/// rather than panicking - callers skip the behavior and keep running.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionTable {
    entries: HashMap<ConditionKind, ConditionParams>,
}

impl ConditionTable {
    /// The standard table: suspension is inert bookkeeping, deprivation
    /// kills at full severity.
    pub fn standard() -> Self {
        let mut table = Self::default();
        table.insert(
            ConditionKind::Suspension,
            ConditionParams { initial_severity: 1.0, lethal_at: None },
        );
        table.insert(
            ConditionKind::Deprivation,
            ConditionParams { initial_severity: 0.0, lethal_at: Some(1.0) },
        );
        table
    }

    pub fn insert(&mut self, kind: ConditionKind, params: ConditionParams) {
        self.entries.insert(kind, params);
    }

    pub fn get(&self, kind: ConditionKind) -> Option<&ConditionParams> {
        self.entries.get(&kind)
    }
}

/// Tuning constants for containment biology and task pacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StasisConfig {
    /// Ticks between need-interval firings, inside and outside a facility.
    pub need_interval_ticks: u64,
    /// Deprivation severity gained per interval once food runs out.
    pub deprivation_per_interval: f32,
    /// Food level at or below which an actor counts as starving.
    pub starvation_threshold: f32,
    /// Fixed wait before an actor is inserted by a carry task.
    pub insert_delay_ticks: u32,
}

impl Default for StasisConfig {
    fn default() -> Self {
        Self {
            need_interval_ticks: 150,
            deprivation_per_interval: 0.0125,
            starvation_threshold: 1e-4,
            insert_delay_ticks: 60,
        }
    }
}
