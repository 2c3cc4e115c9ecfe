//! The simulation engine: owns the world and drives everything per tick.

use std::io::{Read, Write};

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::components::{
    Actor, ActorId, CarriedPayload, Carrying, Cell, Conditions, Facility, FacilityId, ItemStack,
    Name, Needs, Position, RefusalReason,
};
use crate::config::{ConditionTable, StasisConfig};
use crate::notices::NoticeLog;
use crate::persistence::{
    self, IdCounters, SaveData, SaveError, SAVE_VERSION,
};
use crate::systems::{
    self, needs_system, starvation_system, stasis_system, DestroyMode,
};
use crate::tasks::{
    advance_tasks, cancel_task, find_facility_for, RegistryError, ReservationBook, Task,
    TaskBuildError, TaskCtx, TaskId, TaskKind, TaskRegistry, TaskRequest,
};
use crate::terrain::Terrain;

/// Anything advanced by the engine's fixed-step clock.
pub trait Tickable {
    fn tick(&mut self);
}

/// Anything that can round-trip through a byte stream.
pub trait Persistable {
    fn save<W: Write>(&self, writer: W) -> Result<(), SaveError>;
    fn load<R: Read>(reader: R) -> Result<Self, SaveError>
    where
        Self: Sized;
}

/// The whole simulation. Tasks run every tick; biology runs on the
/// need-interval cadence.
pub struct Simulation {
    world: World,
    terrain: Terrain,
    tick: u64,
    tasks: Vec<Task>,
    reservations: ReservationBook,
    registry: TaskRegistry,
    conditions: ConditionTable,
    config: StasisConfig,
    notices: NoticeLog,
    rng: StdRng,
    next_actor_id: u32,
    next_facility_id: u32,
    next_task_id: u64,
}

impl Simulation {
    /// Standard config and condition table. The task registry is validated
    /// here so a missing constructor fails at startup, not mid-run.
    pub fn new(terrain: Terrain) -> Result<Self, RegistryError> {
        Self::with_config(terrain, StasisConfig::default(), ConditionTable::standard())
    }

    pub fn with_config(
        terrain: Terrain,
        config: StasisConfig,
        conditions: ConditionTable,
    ) -> Result<Self, RegistryError> {
        let registry = TaskRegistry::standard();
        registry.validate()?;
        info!(width = terrain.width, height = terrain.height, "simulation created");
        Ok(Self {
            world: World::new(),
            terrain,
            tick: 0,
            tasks: Vec::new(),
            reservations: ReservationBook::default(),
            registry,
            conditions,
            config,
            notices: NoticeLog::default(),
            rng: StdRng::seed_from_u64(0),
            next_actor_id: 0,
            next_facility_id: 0,
            next_task_id: 0,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn terrain_mut(&mut self) -> &mut Terrain {
        &mut self.terrain
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &StasisConfig {
        &self.config
    }

    pub fn notices(&self) -> &NoticeLog {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<String> {
        self.notices.drain()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    // ---- spawning ----

    pub fn spawn_actor(&mut self, name: impl Into<String>, cell: Cell, needs: Needs) -> Entity {
        let id = self.next_actor_id;
        self.next_actor_id += 1;
        self.world.spawn((
            Actor,
            ActorId(id),
            Name::new(name),
            Position { cell },
            needs,
            Conditions::default(),
        ))
    }

    pub fn spawn_facility(&mut self, cell: Cell, interaction_cell: Cell) -> Entity {
        let id = self.next_facility_id;
        self.next_facility_id += 1;
        self.world.spawn((
            FacilityId(id),
            Facility::new(interaction_cell),
            Position { cell },
        ))
    }

    pub fn spawn_ground_stack(&mut self, stack: ItemStack, cell: Cell) -> Entity {
        self.world.spawn((stack, Position { cell }))
    }

    /// Stable id of an actor entity.
    pub fn actor_id(&self, entity: Entity) -> Option<u32> {
        self.world.get::<&ActorId>(entity).map(|id| id.0).ok()
    }

    /// Stable id of a facility entity.
    pub fn facility_id(&self, entity: Entity) -> Option<u32> {
        self.world.get::<&FacilityId>(entity).map(|id| id.0).ok()
    }

    // ---- facility controls ----

    pub fn set_power(&mut self, facility: Entity, on: bool) -> bool {
        match self.world.get::<&mut Facility>(facility) {
            Ok(mut f) => {
                f.powered = on;
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_switch(&mut self, facility: Entity, on: bool) -> bool {
        match self.world.get::<&mut Facility>(facility) {
            Ok(mut f) => {
                f.switch_on = on;
                true
            }
            Err(_) => false,
        }
    }

    pub fn can_accept(&self, facility: Entity, actor: Entity) -> Result<(), RefusalReason> {
        systems::can_accept_actor_now(&self.world, facility, actor)
    }

    /// Direct admission, outside any task.
    pub fn try_accept(&mut self, facility: Entity, actor: Entity) -> bool {
        systems::try_accept_actor(
            &mut self.world,
            &self.terrain,
            &mut self.rng,
            facility,
            actor,
            &self.conditions,
        )
    }

    pub fn eject_occupant(&mut self, facility: Entity) -> bool {
        systems::eject_occupant(&mut self.world, &self.terrain, &mut self.rng, facility)
    }

    pub fn destroy_facility(&mut self, facility: Entity, mode: DestroyMode) {
        systems::destroy_facility(&mut self.world, &self.terrain, &mut self.rng, facility, mode);
    }

    pub fn drop_stack(&mut self, facility: Entity, index: usize, count: u32) -> bool {
        systems::drop_from_inventory(
            &mut self.world,
            &self.terrain,
            &mut self.rng,
            facility,
            index,
            count,
        )
    }

    pub fn drop_all(&mut self, facility: Entity) {
        systems::drop_all_from_inventory(&mut self.world, &self.terrain, &mut self.rng, facility);
    }

    /// Put a stack straight into an actor's hands, typically to stage an
    /// insert task. Refused when the actor already carries something.
    pub fn give_item(&mut self, actor: Entity, stack: ItemStack) -> bool {
        if self.world.get::<&Carrying>(actor).is_ok() {
            return false;
        }
        self.world
            .insert_one(actor, Carrying(CarriedPayload::Stack(stack)))
            .is_ok()
    }

    /// Snapshot of a facility's stored stacks, in slot order.
    pub fn list_inventory(&self, facility: Entity) -> Option<Vec<ItemStack>> {
        self.world
            .get::<&Facility>(facility)
            .map(|f| f.inventory.stacks().to_vec())
            .ok()
    }

    /// Inspect-pane text for a facility.
    pub fn facility_summary(&self, facility: Entity) -> Option<String> {
        let f = self.world.get::<&Facility>(facility).ok()?;
        let occupant_name = f
            .occupant_id
            .and_then(|id| systems::find_actor(&self.world, id))
            .and_then(|e| self.world.get::<&Name>(e).map(|n| n.0.clone()).ok());
        Some(f.summary(occupant_name.as_deref()))
    }

    // ---- tasks ----

    pub fn submit_task(
        &mut self,
        kind: TaskKind,
        request: TaskRequest,
    ) -> Result<TaskId, TaskBuildError> {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        let task = self.registry.build(id, kind, request)?;
        info!(task = id.0, ?kind, worker = task.worker, "task submitted");
        self.tasks.push(task);
        Ok(id)
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let mut ctx = TaskCtx {
            world: &mut self.world,
            terrain: &self.terrain,
            rng: &mut self.rng,
            reservations: &mut self.reservations,
            notices: &mut self.notices,
            table: &self.conditions,
            config: &self.config,
        };
        cancel_task(&mut ctx, &mut self.tasks, id)
    }

    /// Nearest usable facility for hauling `patient`, by stable id.
    pub fn find_facility_for(&self, worker: u32, patient: u32) -> Option<u32> {
        find_facility_for(&self.world, &self.reservations, worker, patient)
    }
}

impl Tickable for Simulation {
    fn tick(&mut self) {
        self.tick += 1;

        let mut ctx = TaskCtx {
            world: &mut self.world,
            terrain: &self.terrain,
            rng: &mut self.rng,
            reservations: &mut self.reservations,
            notices: &mut self.notices,
            table: &self.conditions,
            config: &self.config,
        };
        advance_tasks(&mut ctx, &mut self.tasks);
        self.tasks.retain(|task| !task.is_finished());

        if self.tick % self.config.need_interval_ticks == 0 {
            needs_system(&mut self.world);
            starvation_system(&mut self.world, &self.config, &self.conditions, &mut self.notices);
            stasis_system(
                &mut self.world,
                &self.terrain,
                &mut self.rng,
                &self.config,
                &self.conditions,
                &mut self.notices,
            );
        }
    }
}

impl Persistable for Simulation {
    fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        let save = SaveData {
            version: SAVE_VERSION,
            tick: self.tick,
            counters: IdCounters {
                next_actor_id: self.next_actor_id,
                next_facility_id: self.next_facility_id,
                next_task_id: self.next_task_id,
            },
            terrain: self.terrain.clone(),
            config: self.config,
            conditions: self.conditions.clone(),
            tasks: self.tasks.clone(),
            reservations: self.reservations.clone(),
            notices: self.notices.clone(),
            entities: persistence::serialize_entities(&self.world),
        };
        persistence::write_save(writer, &save)
    }

    fn load<R: Read>(reader: R) -> Result<Self, SaveError> {
        let save = persistence::read_save(reader)?;
        let mut sim = Simulation::with_config(save.terrain, save.config, save.conditions)?;
        for saved in save.entities {
            persistence::spawn_entity(&mut sim.world, saved);
        }
        persistence::reconcile_facilities(&mut sim.world);
        sim.tick = save.tick;
        sim.tasks = save.tasks;
        sim.reservations = save.reservations;
        sim.notices = save.notices;
        sim.next_actor_id = save.counters.next_actor_id;
        sim.next_facility_id = save.counters.next_facility_id;
        sim.next_task_id = save.counters.next_task_id;
        info!(tick = sim.tick, "simulation loaded");
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulation {
        Simulation::new(Terrain::new(32, 32)).unwrap()
    }

    #[test]
    fn test_spawn_assigns_stable_ids() {
        let mut sim = sim();
        let a = sim.spawn_actor("A", Cell::new(0, 0), Needs::default());
        let b = sim.spawn_actor("B", Cell::new(1, 0), Needs::default());
        assert_eq!(sim.actor_id(a), Some(0));
        assert_eq!(sim.actor_id(b), Some(1));
        let f = sim.spawn_facility(Cell::new(5, 5), Cell::new(5, 6));
        assert_eq!(sim.facility_id(f), Some(0));
        assert_eq!(sim.actor_id(f), None);
    }

    #[test]
    fn test_needs_run_on_interval_only() {
        let mut sim = sim();
        let a = sim.spawn_actor("A", Cell::new(0, 0), Needs::default());
        let interval = sim.config().need_interval_ticks;

        for _ in 0..interval - 1 {
            sim.tick();
        }
        assert_eq!(sim.world().get::<&Needs>(a).unwrap().food, 1.0);
        sim.tick();
        assert!(sim.world().get::<&Needs>(a).unwrap().food < 1.0);
    }

    #[test]
    fn test_task_lifecycle_through_engine() {
        let mut sim = sim();
        let actor = sim.spawn_actor("A", Cell::new(2, 2), Needs::default());
        let facility = sim.spawn_facility(Cell::new(8, 8), Cell::new(8, 9));
        let worker = sim.actor_id(actor).unwrap();
        let pod = sim.facility_id(facility).unwrap();

        let id = sim
            .submit_task(TaskKind::EnterFacility, TaskRequest::enter(worker, pod))
            .unwrap();
        for _ in 0..20 {
            sim.tick();
        }
        // Finished tasks are pruned
        assert!(sim.tasks().iter().all(|t| t.id != id));
        let f = sim.world().get::<&Facility>(facility).unwrap();
        assert_eq!(f.occupant_id, Some(worker));
    }

    #[test]
    fn test_give_item_refuses_double_carry() {
        let mut sim = sim();
        let actor = sim.spawn_actor("A", Cell::new(2, 2), Needs::default());
        assert!(sim.give_item(actor, ItemStack::new("rice", 5, 75)));
        assert!(!sim.give_item(actor, ItemStack::new("steel", 5, 75)));
    }

    #[test]
    fn test_list_inventory_snapshot() {
        let mut sim = sim();
        let facility = sim.spawn_facility(Cell::new(8, 8), Cell::new(8, 9));
        sim.world_mut()
            .get::<&mut Facility>(facility)
            .unwrap()
            .inventory
            .add(ItemStack::new("rice", 9, 75))
            .unwrap();
        let stacks = sim.list_inventory(facility).unwrap();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].kind, "rice");
    }

    #[test]
    fn test_summary_resolves_occupant_name() {
        let mut sim = sim();
        let actor = sim.spawn_actor("Wren", Cell::new(7, 8), Needs::default());
        let facility = sim.spawn_facility(Cell::new(8, 8), Cell::new(8, 9));
        assert!(sim.try_accept(facility, actor));
        let summary = sim.facility_summary(facility).unwrap();
        assert!(summary.contains("Occupant: Wren"));
    }
}
