//! Actor components: identity, needs, conditions and carry state.

use serde::{Deserialize, Serialize};

use super::items::ItemStack;

/// Marker component identifying an entity as an actor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Actor;

/// Stable actor identity. Entity ids are not preserved across save/load,
/// so anything that must reference an actor durably (occupant slots, tasks,
/// reservations) uses this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// Biological needs. Levels run 0.0 (depleted) to 1.0 (satisfied).
///
/// Only food is modeled at the individual level; everything else an actor
/// might need is below the resolution of this simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    /// Current food level.
    pub food: f32,
    /// How much food drains per need interval.
    pub food_fall_per_interval: f32,
}

impl Default for Needs {
    fn default() -> Self {
        Self {
            food: 1.0,
            food_fall_per_interval: 0.005,
        }
    }
}

impl Needs {
    pub fn new(food: f32, food_fall_per_interval: f32) -> Self {
        Self { food, food_fall_per_interval }
    }

    /// Advance one need interval.
    pub fn interval_tick(&mut self) {
        self.food = (self.food - self.food_fall_per_interval).clamp(0.0, 1.0);
    }

    pub fn is_starving(&self, threshold: f32) -> bool {
        self.food <= threshold
    }
}

/// Kinds of conditions an actor can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    /// Pauses most of an actor's simulation while contained.
    Suspension,
    /// Accumulating starvation damage; lethal at full severity.
    Deprivation,
}

/// Active conditions on an actor, each with a severity in [0, 1].
/// Kept as an ordered list - actors carry very few conditions at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    entries: Vec<(ConditionKind, f32)>,
}

impl Conditions {
    pub fn has(&self, kind: ConditionKind) -> bool {
        self.entries.iter().any(|(k, _)| *k == kind)
    }

    pub fn severity(&self, kind: ConditionKind) -> Option<f32> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, s)| *s)
    }

    /// Add a condition at the given severity. No-op if already present.
    pub fn add(&mut self, kind: ConditionKind, severity: f32) {
        if !self.has(kind) {
            self.entries.push((kind, severity.clamp(0.0, 1.0)));
        }
    }

    /// Remove a condition. Returns whether it was present.
    pub fn remove(&mut self, kind: ConditionKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != kind);
        self.entries.len() != before
    }

    /// Raise (or add) a condition's severity, clamped to [0, 1].
    /// Returns the new severity.
    pub fn adjust(&mut self, kind: ConditionKind, delta: f32) -> f32 {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = (entry.1 + delta).clamp(0.0, 1.0);
            entry.1
        } else {
            let severity = delta.clamp(0.0, 1.0);
            self.entries.push((kind, severity));
            severity
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConditionKind, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Marker set when an actor dies. Dead actors stay in the world as bodies;
/// they are never ticked and never admitted to a facility.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Dead;

/// Marker for incapacitated actors - the ones haulers may carry to a
/// facility on someone else's behalf.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Downed;

/// What an actor is holding while hauling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CarriedPayload {
    Stack(ItemStack),
    Actor(ActorId),
}

/// Present while an actor carries something. A carried actor is withdrawn
/// from the map (no `Position`) for the duration, same as a contained one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrying(pub CarriedPayload);

impl Carrying {
    pub fn is_actor(&self) -> bool {
        matches!(self.0, CarriedPayload::Actor(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_interval_tick() {
        let mut needs = Needs::new(0.02, 0.005);
        needs.interval_tick();
        assert!((needs.food - 0.015).abs() < 1e-6);
        for _ in 0..10 {
            needs.interval_tick();
        }
        assert_eq!(needs.food, 0.0);
        assert!(needs.is_starving(1e-4));
    }

    #[test]
    fn test_conditions_add_is_idempotent() {
        let mut c = Conditions::default();
        c.add(ConditionKind::Suspension, 1.0);
        c.add(ConditionKind::Suspension, 0.2);
        assert_eq!(c.len(), 1);
        assert_eq!(c.severity(ConditionKind::Suspension), Some(1.0));
    }

    #[test]
    fn test_conditions_adjust_clamps() {
        let mut c = Conditions::default();
        assert_eq!(c.adjust(ConditionKind::Deprivation, 0.6), 0.6);
        assert_eq!(c.adjust(ConditionKind::Deprivation, 0.6), 1.0);
        assert_eq!(c.adjust(ConditionKind::Deprivation, -2.0), 0.0);
    }

    #[test]
    fn test_conditions_remove() {
        let mut c = Conditions::default();
        c.add(ConditionKind::Deprivation, 0.5);
        assert!(c.remove(ConditionKind::Deprivation));
        assert!(!c.remove(ConditionKind::Deprivation));
        assert!(c.is_empty());
    }
}
