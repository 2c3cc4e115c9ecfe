//! Per-tick task execution.
//!
//! Movement is straight-line, one grid step per tick; an actor "touches" a
//! facility from any of the eight neighbouring cells or its own cell.
//! Every failure path puts whatever the worker carried back into the world
//! before the task is marked failed.

use hecs::{Entity, World};
use rand::rngs::StdRng;
use tracing::debug;

use crate::components::{
    Carrying, CarriedPayload, Cell, Dead, Downed, Facility, FacilityId, Position,
};
use crate::config::{ConditionTable, StasisConfig};
use crate::notices::NoticeLog;
use crate::systems::{
    can_accept_actor_now, find_actor, find_facility, place_actor, place_stack_on_ground,
    try_accept_actor,
};
use crate::terrain::Terrain;

use super::{ReservationBook, Resource, Task, TaskId, TaskKind, TaskState};

/// Everything a task touches while it runs. Borrowed from the engine for
/// the duration of one tick.
pub struct TaskCtx<'a> {
    pub world: &'a mut World,
    pub terrain: &'a Terrain,
    pub rng: &'a mut StdRng,
    pub reservations: &'a mut ReservationBook,
    pub notices: &'a mut NoticeLog,
    pub table: &'a ConditionTable,
    pub config: &'a StasisConfig,
}

/// Advance every live task one step. Tasks that finish release their
/// claims immediately so the resources free up the same tick; the
/// finished entries stay in place for the owner to prune.
pub fn advance_tasks(ctx: &mut TaskCtx, tasks: &mut [Task]) {
    for i in 0..tasks.len() {
        if tasks[i].is_finished() {
            continue;
        }
        let mut task = tasks[i].clone();
        advance_one(ctx, &mut task);
        if task.is_finished() {
            ctx.reservations.release_all(task.id);
        }
        tasks[i] = task;
    }
}

/// Abort a task by id. The worker drops any carried actor where they
/// stand; a carried item stays in hand.
pub fn cancel_task(ctx: &mut TaskCtx, tasks: &mut [Task], id: TaskId) -> bool {
    let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
        return false;
    };
    if task.is_finished() {
        return false;
    }
    fail(ctx, task);
    ctx.reservations.release_all(id);
    true
}

/// Pick the facility a worker should haul `patient` to: the nearest one
/// that is available, empty, and not reserved by another task. The patient
/// must be a downed, living actor on the map, and not the worker themselves.
pub fn find_facility_for(
    world: &World,
    reservations: &ReservationBook,
    worker: u32,
    patient: u32,
) -> Option<u32> {
    if worker == patient {
        return None;
    }
    let patient_e = find_actor(world, patient)?;
    if world.get::<&Dead>(patient_e).is_ok() || world.get::<&Downed>(patient_e).is_err() {
        return None;
    }
    let patient_cell = world.get::<&Position>(patient_e).ok()?.cell;

    let mut best: Option<(i32, u32)> = None;
    for (entity, (facility_id, facility)) in world.query::<(&FacilityId, &Facility)>().iter() {
        if !facility.is_available() || facility.is_occupied() {
            continue;
        }
        if reservations.holder(Resource::Facility(facility_id.0)).is_some() {
            continue;
        }
        let cell = world
            .get::<&Position>(entity)
            .map(|p| p.cell)
            .unwrap_or(facility.interaction_cell);
        let distance = patient_cell.distance(&cell);
        if best.map_or(true, |(nearest, _)| distance < nearest) {
            best = Some((distance, facility_id.0));
        }
    }
    best.map(|(_, id)| id)
}

fn advance_one(ctx: &mut TaskCtx, task: &mut Task) {
    match task.kind {
        TaskKind::EnterFacility => advance_enter(ctx, task),
        TaskKind::CarryToFacility => advance_carry(ctx, task),
        TaskKind::InsertCarriedItem => advance_insert(ctx, task),
    }
}

fn advance_enter(ctx: &mut TaskCtx, task: &mut Task) {
    let Some((worker_e, facility_e)) = resolve_pair(ctx, task) else {
        fail(ctx, task);
        return;
    };

    match task.state {
        TaskState::Reserving => {
            if let Err(reason) = can_accept_actor_now(ctx.world, facility_e, worker_e) {
                ctx.notices.push(format!("Cannot enter facility: {}.", reason));
                fail(ctx, task);
                return;
            }
            if !claim_both(ctx, task, Resource::Actor(task.worker)) {
                fail(ctx, task);
                return;
            }
            task.state = TaskState::MovingToFacility;
        }
        TaskState::MovingToFacility => {
            if step_toward_facility(ctx, worker_e, facility_e) {
                task.state = TaskState::Committing;
            }
        }
        TaskState::Committing => {
            if let Err(reason) = can_accept_actor_now(ctx.world, facility_e, worker_e) {
                ctx.notices.push(format!("Cannot enter facility: {}.", reason));
                fail(ctx, task);
                return;
            }
            if try_accept_actor(ctx.world, ctx.terrain, ctx.rng, facility_e, worker_e, ctx.table) {
                debug!(task = task.id.0, worker = task.worker, "worker entered facility");
                task.state = TaskState::Done;
            } else {
                fail(ctx, task);
            }
        }
        _ => fail(ctx, task),
    }
}

fn advance_carry(ctx: &mut TaskCtx, task: &mut Task) {
    let Some((worker_e, facility_e)) = resolve_pair(ctx, task) else {
        fail(ctx, task);
        return;
    };
    let Some(target_id) = task.target_actor else {
        fail(ctx, task);
        return;
    };
    let Some(target_e) = find_actor(ctx.world, target_id) else {
        fail(ctx, task);
        return;
    };

    // Conditions that must hold for the whole haul
    let facility_ready = match ctx.world.get::<&Facility>(facility_e) {
        Ok(facility) => facility.is_available() && !facility.is_occupied(),
        Err(_) => false,
    };
    if !facility_ready || ctx.world.get::<&Dead>(target_e).is_ok() {
        fail(ctx, task);
        return;
    }

    match task.state {
        TaskState::Reserving => {
            let claimed = claim_both(ctx, task, Resource::Actor(task.worker))
                && ctx.reservations.try_claim(Resource::Actor(target_id), task.id);
            if !claimed {
                fail(ctx, task);
                return;
            }
            task.state = TaskState::MovingToTarget;
        }
        TaskState::MovingToTarget => {
            let Ok(target_cell) = ctx.world.get::<&Position>(target_e).map(|p| p.cell) else {
                fail(ctx, task);
                return;
            };
            if step_toward_cell(ctx, worker_e, target_cell) {
                task.state = TaskState::PickingUp;
            }
        }
        TaskState::PickingUp => {
            if ctx.world.remove_one::<Position>(target_e).is_err() {
                fail(ctx, task);
                return;
            }
            let carrying = Carrying(CarriedPayload::Actor(crate::components::ActorId(target_id)));
            if ctx.world.insert_one(worker_e, carrying).is_err() {
                // Worker vanished mid-task; put the target back down
                let near = task_anchor(ctx, facility_e);
                place_actor(ctx.world, ctx.terrain, ctx.rng, target_e, near);
                fail(ctx, task);
                return;
            }
            task.state = TaskState::MovingToFacility;
        }
        TaskState::MovingToFacility => {
            if step_toward_facility(ctx, worker_e, facility_e) {
                task.state = TaskState::Delaying { remaining: ctx.config.insert_delay_ticks };
            }
        }
        TaskState::Delaying { remaining } => {
            if remaining > 1 {
                task.state = TaskState::Delaying { remaining: remaining - 1 };
            } else {
                task.state = TaskState::Committing;
            }
        }
        TaskState::Committing => {
            let _ = ctx.world.remove_one::<Carrying>(worker_e);
            if try_accept_actor(ctx.world, ctx.terrain, ctx.rng, facility_e, target_e, ctx.table) {
                debug!(task = task.id.0, target = target_id, "carried actor inserted");
                task.state = TaskState::Done;
            } else {
                // The target was withdrawn while carried, so the admission
                // rollback cannot re-place it; set it down at the worker
                let near = worker_cell(ctx, worker_e).unwrap_or_else(|| task_anchor(ctx, facility_e));
                place_actor(ctx.world, ctx.terrain, ctx.rng, target_e, near);
                ctx.notices.push("Could not insert the carried actor.".to_string());
                task.state = TaskState::Failed;
            }
        }
        _ => fail(ctx, task),
    }
}

fn advance_insert(ctx: &mut TaskCtx, task: &mut Task) {
    let Some((worker_e, facility_e)) = resolve_pair(ctx, task) else {
        fail(ctx, task);
        return;
    };

    // The worker must be holding an item the whole way
    let holding_stack = match ctx.world.get::<&Carrying>(worker_e) {
        Ok(carrying) => !carrying.is_actor(),
        Err(_) => false,
    };
    if !holding_stack {
        fail(ctx, task);
        return;
    }

    match task.state {
        TaskState::Reserving => {
            // Item insertion is never availability-gated; only the claim matters
            if !claim_both(ctx, task, Resource::Actor(task.worker)) {
                fail(ctx, task);
                return;
            }
            task.state = TaskState::MovingToFacility;
        }
        TaskState::MovingToFacility => {
            if step_toward_facility(ctx, worker_e, facility_e) {
                task.state = TaskState::Committing;
            }
        }
        TaskState::Committing => {
            let stack = match ctx.world.remove_one::<Carrying>(worker_e) {
                Ok(Carrying(CarriedPayload::Stack(stack))) => stack,
                _ => {
                    fail(ctx, task);
                    return;
                }
            };
            let rejected = match ctx.world.get::<&mut Facility>(facility_e) {
                Ok(mut facility) => facility.inventory.add(stack).err(),
                Err(_) => Some(stack),
            };
            match rejected {
                None => task.state = TaskState::Done,
                Some(stack) => {
                    let near = worker_cell(ctx, worker_e).unwrap_or_else(|| task_anchor(ctx, facility_e));
                    match place_stack_on_ground(ctx.world, ctx.terrain, ctx.rng, stack, near) {
                        Ok(_) => {
                            ctx.notices.push("Facility storage is full.".to_string());
                            task.state = TaskState::Done;
                        }
                        Err(stack) => {
                            // Nowhere on the ground either; the worker keeps it
                            let _ = ctx
                                .world
                                .insert_one(worker_e, Carrying(CarriedPayload::Stack(stack)));
                            task.state = TaskState::Failed;
                        }
                    }
                }
            }
        }
        _ => fail(ctx, task),
    }
}

/// Mark a task failed, first setting down any actor the worker carries.
fn fail(ctx: &mut TaskCtx, task: &mut Task) {
    rollback_carried_actor(ctx, task);
    debug!(task = task.id.0, kind = ?task.kind, "task failed");
    task.state = TaskState::Failed;
}

fn rollback_carried_actor(ctx: &mut TaskCtx, task: &Task) {
    let Some(worker_e) = find_actor(ctx.world, task.worker) else {
        return;
    };
    let carried = match ctx.world.get::<&Carrying>(worker_e) {
        Ok(carrying) => match carrying.0 {
            CarriedPayload::Actor(id) => Some(id),
            CarriedPayload::Stack(_) => None,
        },
        Err(_) => None,
    };
    let Some(carried_id) = carried else {
        return;
    };
    let _ = ctx.world.remove_one::<Carrying>(worker_e);
    let near = worker_cell(ctx, worker_e).unwrap_or(Cell::new(0, 0));
    if let Some(target_e) = find_actor(ctx.world, carried_id.0) {
        place_actor(ctx.world, ctx.terrain, ctx.rng, target_e, near);
    }
}

fn resolve_pair(ctx: &TaskCtx, task: &Task) -> Option<(Entity, Entity)> {
    let worker_e = find_actor(ctx.world, task.worker)?;
    let facility_e = find_facility(ctx.world, task.facility)?;
    if ctx.world.get::<&Dead>(worker_e).is_ok() {
        return None;
    }
    Some((worker_e, facility_e))
}

fn claim_both(ctx: &mut TaskCtx, task: &Task, worker: Resource) -> bool {
    ctx.reservations.try_claim(worker, task.id)
        && ctx.reservations.try_claim(Resource::Facility(task.facility), task.id)
}

fn worker_cell(ctx: &TaskCtx, worker_e: Entity) -> Option<Cell> {
    ctx.world.get::<&Position>(worker_e).map(|p| p.cell).ok()
}

/// Fallback drop location when the worker has no position of their own.
fn task_anchor(ctx: &TaskCtx, facility_e: Entity) -> Cell {
    ctx.world
        .get::<&Facility>(facility_e)
        .map(|f| f.interaction_cell)
        .unwrap_or(Cell::new(0, 0))
}

/// Step the worker one cell toward the facility. Returns true once the
/// worker is in touch range.
fn step_toward_facility(ctx: &mut TaskCtx, worker_e: Entity, facility_e: Entity) -> bool {
    let destination = match ctx.world.get::<&Position>(facility_e) {
        Ok(position) => position.cell,
        Err(_) => task_anchor(ctx, facility_e),
    };
    step_toward_cell(ctx, worker_e, destination)
}

/// Step the worker one cell toward `destination`. Returns true once
/// adjacent (or already there).
fn step_toward_cell(ctx: &mut TaskCtx, worker_e: Entity, destination: Cell) -> bool {
    let Ok(mut position) = ctx.world.get::<&mut Position>(worker_e) else {
        return false;
    };
    if position.cell.is_adjacent_to(&destination) {
        return true;
    }
    position.cell = position.cell.step_toward(&destination);
    position.cell.is_adjacent_to(&destination)
}
