//! StasisWard Core - Containment Facility Simulation Engine
//!
//! A tick-driven simulation of stasis facilities: single-occupant containment
//! pods that withdraw an actor from the normal simulation, suspend most of
//! its biology, and keep a bounded store of item stacks. Multi-step hauling
//! tasks move actors and items into the facilities with reservations and
//! fail-safe rollback.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Actors, facilities, item stacks on the ground
//! - **Components**: Pure data attached to entities (Position, Needs, Facility, etc.)
//! - **Systems**: Logic that queries and updates components
//!
//! Containment works by withdrawal: a contained (or carried) actor has no
//! `Position` component, so the per-interval biology systems never see it.
//! Only the stasis override advances a contained actor, and it advances
//! nothing but the food need.
//!
//! # Example
//!
//! ```rust,no_run
//! use stasisward_core::prelude::*;
//!
//! let mut sim = Simulation::new(Terrain::new(32, 32)).unwrap();
//!
//! let facility = sim.spawn_facility(Cell::new(10, 10), Cell::new(10, 11));
//! let actor = sim.spawn_actor("Juniper", Cell::new(2, 2), Needs::default());
//!
//! let worker = sim.actor_id(actor).unwrap();
//! let pod = sim.facility_id(facility).unwrap();
//! sim.submit_task(TaskKind::EnterFacility, TaskRequest::enter(worker, pod)).unwrap();
//!
//! loop {
//!     sim.tick();
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod notices;
pub mod persistence;
pub mod systems;
pub mod tasks;
pub mod terrain;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{ConditionParams, ConditionTable, StasisConfig};
    pub use crate::engine::{Persistable, Simulation, Tickable};
    pub use crate::notices::NoticeLog;
    pub use crate::systems::DestroyMode;
    pub use crate::tasks::{TaskId, TaskKind, TaskRequest, TaskState};
    pub use crate::terrain::Terrain;
}
