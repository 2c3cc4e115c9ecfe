//! The stasis override.
//!
//! A contained occupant is outside the normal tick stream, so nothing about
//! it advances - except its food need, which this system drives on the same
//! interval cadence the outside world uses. It runs whether or not the
//! facility has power: containment persists through an outage.

use hecs::{Entity, World};
use rand::Rng;

use crate::components::{ConditionKind, Conditions, Dead, Facility, Name, Needs};
use crate::config::{ConditionTable, StasisConfig};
use crate::notices::NoticeLog;
use crate::systems::containment::{find_actor, release_occupant};
use crate::terrain::Terrain;

/// One stasis interval for every occupied facility:
/// food drains; at empty, deprivation accrues; at full severity the
/// occupant is placed back into the world, released, and only then dies -
/// a body must land on a spawned actor, never inside the container.
pub fn stasis_system(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    config: &StasisConfig,
    table: &ConditionTable,
    notices: &mut NoticeLog,
) {
    let occupied: Vec<(Entity, u32)> = world
        .query::<&Facility>()
        .iter()
        .filter_map(|(entity, facility)| facility.occupant_id.map(|id| (entity, id)))
        .collect();

    for (facility_e, occupant_id) in occupied {
        let Some(actor_e) = find_actor(world, occupant_id) else {
            continue;
        };
        if world.get::<&Dead>(actor_e).is_ok() {
            continue;
        }

        let starving = match world.get::<&mut Needs>(actor_e) {
            Ok(mut needs) => {
                needs.interval_tick();
                needs.is_starving(config.starvation_threshold)
            }
            Err(_) => false,
        };
        if !starving {
            continue;
        }

        let Some(params) = table.get(ConditionKind::Deprivation) else {
            continue;
        };
        let severity = match world.get::<&mut Conditions>(actor_e) {
            Ok(mut conditions) => {
                conditions.adjust(ConditionKind::Deprivation, config.deprivation_per_interval)
            }
            Err(_) => continue,
        };
        if !params.is_lethal(severity) {
            continue;
        }

        // Place out, clear the slot, then kill
        release_occupant(world, terrain, rng, facility_e);
        let _ = world.insert_one(actor_e, Dead);
        let name = world
            .get::<&Name>(actor_e)
            .map(|n| n.0.clone())
            .unwrap_or_else(|_| "The occupant".to_string());
        notices.push(format!("{} starved to death in stasis.", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Actor, ActorId, Cell, FacilityId, Position};
    use crate::systems::containment::try_accept_actor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn contained_fixture(needs: Needs) -> (World, Terrain, StdRng, Entity, Entity) {
        let mut world = World::new();
        let terrain = Terrain::new(20, 20);
        let mut rng = StdRng::seed_from_u64(3);
        let facility_e = world.spawn((
            FacilityId(0),
            Facility::new(Cell::new(5, 6)),
            Position::new(5, 5),
        ));
        let actor_e = world.spawn((
            Actor,
            ActorId(1),
            Name::new("Orin"),
            Position::new(2, 2),
            needs,
            Conditions::default(),
        ));
        let table = ConditionTable::standard();
        assert!(try_accept_actor(&mut world, &terrain, &mut rng, facility_e, actor_e, &table));
        (world, terrain, rng, facility_e, actor_e)
    }

    #[test]
    fn test_food_drains_in_stasis() {
        let (mut world, terrain, mut rng, _facility_e, actor_e) =
            contained_fixture(Needs::new(1.0, 0.01));
        let config = StasisConfig::default();
        let table = ConditionTable::standard();
        let mut notices = NoticeLog::default();

        stasis_system(&mut world, &terrain, &mut rng, &config, &table, &mut notices);
        let food = world.get::<&Needs>(actor_e).unwrap().food;
        assert!((food - 0.99).abs() < 1e-6);
    }

    #[test]
    fn test_runs_without_power() {
        let (mut world, terrain, mut rng, facility_e, actor_e) =
            contained_fixture(Needs::new(1.0, 0.01));
        world.get::<&mut Facility>(facility_e).unwrap().powered = false;
        let config = StasisConfig::default();
        let table = ConditionTable::standard();
        let mut notices = NoticeLog::default();

        stasis_system(&mut world, &terrain, &mut rng, &config, &table, &mut notices);
        assert!(world.get::<&Needs>(actor_e).unwrap().food < 1.0);
    }

    #[test]
    fn test_deprivation_then_death_outside() {
        let (mut world, terrain, mut rng, facility_e, actor_e) =
            contained_fixture(Needs::new(0.0, 0.01));
        let config = StasisConfig::default();
        let table = ConditionTable::standard();
        let mut notices = NoticeLog::default();

        // 80 intervals at 0.0125 reach severity 1.0
        for _ in 0..80 {
            stasis_system(&mut world, &terrain, &mut rng, &config, &table, &mut notices);
        }

        assert!(world.get::<&Dead>(actor_e).is_ok());
        // Died outside: spawned, slot empty, flag reconciled
        assert!(world.get::<&Position>(actor_e).is_ok());
        {
            let facility = world.get::<&Facility>(facility_e).unwrap();
            assert_eq!(facility.occupant_id, None);
            assert!(!facility.suspension_applied);
        }
        assert!(notices.contains("starved to death in stasis"));

        // And exactly once: further intervals change nothing
        let notice_count = notices.len();
        stasis_system(&mut world, &terrain, &mut rng, &config, &table, &mut notices);
        assert_eq!(notices.len(), notice_count);
    }
}
