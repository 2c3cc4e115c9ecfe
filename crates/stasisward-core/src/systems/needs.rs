//! Interval biology for spawned actors.
//!
//! These systems query `Position`, so a contained or carried actor is
//! simply never visited - withdrawal from the map is what freezes its
//! biology. The stasis override is the only thing that ticks an occupant.

use hecs::{Without, World};
use tracing::debug;

use crate::components::{Actor, ConditionKind, Conditions, Dead, Name, Needs, Position};
use crate::config::{ConditionTable, StasisConfig};
use crate::notices::NoticeLog;

/// Advance one need interval for every live, spawned actor.
pub fn needs_system(world: &mut World) {
    for (_, (_actor, _position, needs)) in
        world.query_mut::<Without<(&Actor, &Position, &mut Needs), &Dead>>()
    {
        needs.interval_tick();
    }
}

/// Deprivation accrual for starving spawned actors; lethal at the
/// configured severity. The in-facility counterpart lives in the stasis
/// override.
pub fn starvation_system(
    world: &mut World,
    config: &StasisConfig,
    table: &ConditionTable,
    notices: &mut NoticeLog,
) {
    let Some(params) = table.get(ConditionKind::Deprivation) else {
        return;
    };

    let mut died = Vec::new();
    for (entity, (_actor, _position, needs, conditions)) in
        world.query_mut::<Without<(&Actor, &Position, &Needs, &mut Conditions), &Dead>>()
    {
        if !needs.is_starving(config.starvation_threshold) {
            continue;
        }
        let severity = conditions.adjust(ConditionKind::Deprivation, config.deprivation_per_interval);
        if params.is_lethal(severity) {
            died.push(entity);
        }
    }

    for entity in died {
        let _ = world.insert_one(entity, Dead);
        let name = world
            .get::<&Name>(entity)
            .map(|n| n.0.clone())
            .unwrap_or_else(|_| "An actor".to_string());
        debug!(%name, "actor starved to death");
        notices.push(format!("{} starved to death.", name));
    }
}
