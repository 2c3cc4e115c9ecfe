//! Containment facility operations: admission, ejection, teardown, and
//! inventory drops.
//!
//! Every path that takes an actor or a stack out of a facility goes through
//! the same placement service, and every occupant-exit path goes through
//! `suspension::remove_if_we_added`.

use hecs::{Entity, World};
use rand::Rng;
use tracing::warn;

use crate::components::{
    Actor, ActorId, Cell, Conditions, Dead, Facility, FacilityId, ItemStack, Position,
    RefusalReason,
};
use crate::config::ConditionTable;
use crate::systems::suspension;
use crate::terrain::Terrain;

/// Resolve a stable actor id to its entity.
pub fn find_actor(world: &World, id: u32) -> Option<Entity> {
    world
        .query::<&ActorId>()
        .iter()
        .find(|(_, actor_id)| actor_id.0 == id)
        .map(|(entity, _)| entity)
}

/// Resolve a stable facility id to its entity.
pub fn find_facility(world: &World, id: u32) -> Option<Entity> {
    world
        .query::<&FacilityId>()
        .iter()
        .find(|(_, facility_id)| facility_id.0 == id)
        .map(|(entity, _)| entity)
}

/// Re-place an actor into the world near `near`. The actor always ends up
/// spawned somewhere - if no standable cell exists it lands on `near`
/// itself rather than being lost.
pub fn place_actor(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    actor: Entity,
    near: Cell,
) -> Cell {
    let cell = terrain.place_near(near, rng).unwrap_or(near);
    let _ = world.insert_one(actor, Position { cell });
    cell
}

/// Spawn a stack on the ground near `near`. On failure the stack comes
/// back to the caller - a stack is never dropped into the void.
pub fn place_stack_on_ground(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    stack: ItemStack,
    near: Cell,
) -> Result<Entity, ItemStack> {
    match terrain.place_near(near, rng) {
        Some(cell) => Ok(world.spawn((stack, Position { cell }))),
        None => Err(stack),
    }
}

/// Admission gate, checked before any entry attempt. Availability gates
/// entry only; nothing here applies to eject or item insertion.
pub fn can_accept_actor_now(
    world: &World,
    facility_e: Entity,
    actor_e: Entity,
) -> Result<(), RefusalReason> {
    let facility = world
        .get::<&Facility>(facility_e)
        .map_err(|_| RefusalReason::Unavailable)?;
    if !facility.is_available() {
        return Err(RefusalReason::Unavailable);
    }
    if facility.is_occupied() {
        return Err(RefusalReason::Occupied);
    }
    if world.get::<&Actor>(actor_e).is_err() || world.get::<&Position>(actor_e).is_err() {
        return Err(RefusalReason::InvalidActor);
    }
    if world.get::<&Dead>(actor_e).is_ok() {
        return Err(RefusalReason::ActorDead);
    }
    Ok(())
}

/// Withdraw an actor from the map and store it as the occupant.
///
/// Sequence: withdraw, apply suspension, store. A storage failure rolls the
/// suspension back and re-places the actor where it stood; an actor that
/// was already withdrawn (carried) is left for the caller to place.
pub fn try_accept_actor(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    facility_e: Entity,
    actor_e: Entity,
    table: &ConditionTable,
) -> bool {
    let actor_id = match world.get::<&ActorId>(actor_e) {
        Ok(id) => *id,
        Err(_) => return false,
    };
    match world.get::<&Facility>(facility_e) {
        Ok(facility) if !facility.is_occupied() => {}
        _ => return false,
    }

    let prior = world.remove_one::<Position>(actor_e).ok();

    let stored = match (
        world.get::<&mut Facility>(facility_e),
        world.get::<&mut Conditions>(actor_e),
    ) {
        (Ok(mut facility), Ok(mut conditions)) => {
            suspension::apply_if_needed(&mut facility, &mut conditions, table);
            let dead = world.get::<&Dead>(actor_e).is_ok();
            let stored = !dead && facility.store_occupant(actor_id.0);
            if !stored {
                // Store failed after apply: undo before anyone sees it
                suspension::remove_if_we_added(&mut facility, &mut conditions);
            }
            stored
        }
        _ => false,
    };

    if !stored {
        if let Some(position) = prior {
            place_actor(world, terrain, rng, actor_e, position.cell);
        }
        return false;
    }
    true
}

/// Clear the occupant slot and place the occupant back into the world at
/// the facility's drop spot. Shared by eject, teardown and the death path.
/// Returns the released actor entity.
pub fn release_occupant(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    facility_e: Entity,
) -> Option<Entity> {
    let (occupant_id, spot) = {
        let facility = world.get::<&Facility>(facility_e).ok()?;
        let own_cell = world
            .get::<&Position>(facility_e)
            .map(|p| p.cell)
            .unwrap_or(facility.interaction_cell);
        (
            facility.occupant_id?,
            terrain.drop_spot(facility.interaction_cell, own_cell),
        )
    };

    let actor_e = match find_actor(world, occupant_id) {
        Some(entity) => entity,
        None => {
            warn!(occupant_id, "occupant id resolves to no actor; clearing slot");
            if let Ok(mut facility) = world.get::<&mut Facility>(facility_e) {
                facility.occupant_id = None;
                facility.suspension_applied = false;
            }
            return None;
        }
    };

    if let (Ok(mut facility), Ok(mut conditions)) = (
        world.get::<&mut Facility>(facility_e),
        world.get::<&mut Conditions>(actor_e),
    ) {
        suspension::remove_if_we_added(&mut facility, &mut conditions);
        facility.occupant_id = None;
    }
    place_actor(world, terrain, rng, actor_e, spot);
    Some(actor_e)
}

/// Eject the occupant. Always permitted - never gated by availability.
pub fn eject_occupant(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    facility_e: Entity,
) -> bool {
    release_occupant(world, terrain, rng, facility_e).is_some()
}

/// How a facility is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyMode {
    /// Silent removal; contents are not recovered.
    Vanish,
    /// Physical teardown; the occupant is released first.
    Demolish,
}

/// Tear a facility down. Non-silent modes release the occupant the same
/// way eject does and spill the stored stacks, so nothing is silently
/// discarded with the building.
pub fn destroy_facility(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    facility_e: Entity,
    mode: DestroyMode,
) {
    if mode != DestroyMode::Vanish {
        release_occupant(world, terrain, rng, facility_e);
        drop_all_from_inventory(world, terrain, rng, facility_e);
    }
    let _ = world.despawn(facility_e);
}

/// Drop `count` units from the stack at `index` near the facility's drop
/// spot. Whole-stack drops remove the stack; partial drops split it, and a
/// failed placement re-merges the split portion so nothing is lost.
pub fn drop_from_inventory(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    facility_e: Entity,
    index: usize,
    count: u32,
) -> bool {
    enum Taken {
        Whole(ItemStack),
        Split(ItemStack),
    }

    if count == 0 {
        return false;
    }
    let own_cell = match world.get::<&Position>(facility_e) {
        Ok(position) => position.cell,
        Err(_) => return false,
    };

    let (spot, taken) = {
        let Ok(mut facility) = world.get::<&mut Facility>(facility_e) else {
            return false;
        };
        let spot = terrain.drop_spot(facility.interaction_cell, own_cell);
        let Some(stack) = facility.inventory.stack_mut(index) else {
            return false;
        };
        let taken = if count >= stack.count {
            match facility.inventory.take(index) {
                Some(whole) => Taken::Whole(whole),
                None => return false,
            }
        } else {
            Taken::Split(stack.split_off(count))
        };
        (spot, taken)
    };

    let (stack, was_whole) = match taken {
        Taken::Whole(stack) => (stack, true),
        Taken::Split(stack) => (stack, false),
    };

    match place_stack_on_ground(world, terrain, rng, stack, spot) {
        Ok(_) => true,
        Err(stack) => {
            if let Ok(mut facility) = world.get::<&mut Facility>(facility_e) {
                if was_whole {
                    facility.inventory.put_back(index, stack);
                } else if let Some(source) = facility.inventory.stack_mut(index) {
                    if let Some(leftover) = source.absorb(stack) {
                        facility.inventory.put_back(index + 1, leftover);
                    }
                } else {
                    facility.inventory.put_back(index, stack);
                }
            }
            false
        }
    }
}

/// Empty the inventory onto the ground, best-effort. Stacks that cannot be
/// placed stay stored.
pub fn drop_all_from_inventory(
    world: &mut World,
    terrain: &Terrain,
    rng: &mut impl Rng,
    facility_e: Entity,
) {
    let own_cell = match world.get::<&Position>(facility_e) {
        Ok(position) => position.cell,
        Err(_) => return,
    };
    let (spot, stacks) = {
        let Ok(mut facility) = world.get::<&mut Facility>(facility_e) else {
            return;
        };
        (
            terrain.drop_spot(facility.interaction_cell, own_cell),
            facility.inventory.drain_all(),
        )
    };

    let mut unplaced = Vec::new();
    for stack in stacks {
        if let Err(stack) = place_stack_on_ground(world, terrain, rng, stack, spot) {
            unplaced.push(stack);
        }
    }
    if !unplaced.is_empty() {
        if let Ok(mut facility) = world.get::<&mut Facility>(facility_e) {
            for stack in unplaced {
                let end = facility.inventory.len();
                facility.inventory.put_back(end, stack);
            }
        }
    }
}
