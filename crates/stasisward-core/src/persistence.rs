//! Save and load.
//!
//! Entities are flattened into a vector of per-component `Option`s and the
//! whole save is written with bincode. Entity ids are NOT preserved across
//! a round trip - that is why occupant slots, tasks and reservations all
//! use the stable `ActorId`/`FacilityId` numbering instead.

use std::collections::HashSet;
use std::io::{Read, Write};

use hecs::{EntityBuilder, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::components::{
    Actor, ActorId, Carrying, Conditions, Dead, Downed, Facility, FacilityId, ItemStack, Name,
    Needs, Position,
};
use crate::config::{ConditionTable, StasisConfig};
use crate::notices::NoticeLog;
use crate::tasks::{RegistryError, ReservationBook, Task};
use crate::terrain::Terrain;

/// Bumped whenever the save layout changes.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Id allocation state, carried so freshly spawned entities never collide
/// with loaded ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdCounters {
    pub next_actor_id: u32,
    pub next_facility_id: u32,
    pub next_task_id: u64,
}

/// One entity, flattened. Exactly the components a loaded world needs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SerializableEntity {
    pub actor: Option<Actor>,
    pub actor_id: Option<ActorId>,
    pub name: Option<Name>,
    pub position: Option<Position>,
    pub needs: Option<Needs>,
    pub conditions: Option<Conditions>,
    pub dead: Option<Dead>,
    pub downed: Option<Downed>,
    pub carrying: Option<Carrying>,
    pub facility_id: Option<FacilityId>,
    pub facility: Option<Facility>,
    pub stack: Option<ItemStack>,
}

/// Everything a simulation needs to resume.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub tick: u64,
    pub counters: IdCounters,
    pub terrain: Terrain,
    pub config: StasisConfig,
    pub conditions: ConditionTable,
    pub tasks: Vec<Task>,
    pub reservations: ReservationBook,
    pub notices: NoticeLog,
    pub entities: Vec<SerializableEntity>,
}

pub fn write_save<W: Write>(writer: W, save: &SaveData) -> Result<(), SaveError> {
    bincode::serialize_into(writer, save)?;
    Ok(())
}

pub fn read_save<R: Read>(reader: R) -> Result<SaveData, SaveError> {
    let save: SaveData = bincode::deserialize_from(reader)?;
    if save.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save.version,
        });
    }
    Ok(save)
}

/// Flatten every entity in the world.
pub fn serialize_entities(world: &World) -> Vec<SerializableEntity> {
    world
        .iter()
        .map(|entity| SerializableEntity {
            actor: entity.get::<&Actor>().map(|c| *c),
            actor_id: entity.get::<&ActorId>().map(|c| *c),
            name: entity.get::<&Name>().map(|c| (*c).clone()),
            position: entity.get::<&Position>().map(|c| *c),
            needs: entity.get::<&Needs>().map(|c| *c),
            conditions: entity.get::<&Conditions>().map(|c| (*c).clone()),
            dead: entity.get::<&Dead>().map(|c| *c),
            downed: entity.get::<&Downed>().map(|c| *c),
            carrying: entity.get::<&Carrying>().map(|c| (*c).clone()),
            facility_id: entity.get::<&FacilityId>().map(|c| *c),
            facility: entity.get::<&Facility>().map(|c| (*c).clone()),
            stack: entity.get::<&ItemStack>().map(|c| (*c).clone()),
        })
        .collect()
}

/// Rebuild one entity from its flattened form.
pub fn spawn_entity(world: &mut World, saved: SerializableEntity) {
    let mut builder = EntityBuilder::new();
    if let Some(c) = saved.actor {
        builder.add(c);
    }
    if let Some(c) = saved.actor_id {
        builder.add(c);
    }
    if let Some(c) = saved.name {
        builder.add(c);
    }
    if let Some(c) = saved.position {
        builder.add(c);
    }
    if let Some(c) = saved.needs {
        builder.add(c);
    }
    if let Some(c) = saved.conditions {
        builder.add(c);
    }
    if let Some(c) = saved.dead {
        builder.add(c);
    }
    if let Some(c) = saved.downed {
        builder.add(c);
    }
    if let Some(c) = saved.carrying {
        builder.add(c);
    }
    if let Some(c) = saved.facility_id {
        builder.add(c);
    }
    if let Some(c) = saved.facility {
        builder.add(c);
    }
    if let Some(c) = saved.stack {
        builder.add(c);
    }
    world.spawn(builder.build());
}

/// Repair facility state that a stale or hand-edited save can carry:
/// occupant ids that resolve to no actor are cleared, and the suspension
/// flag is forced false wherever the slot is empty.
pub fn reconcile_facilities(world: &mut World) {
    let known: HashSet<u32> = world.query::<&ActorId>().iter().map(|(_, id)| id.0).collect();
    for (_, facility) in world.query_mut::<&mut Facility>() {
        if let Some(id) = facility.occupant_id {
            if !known.contains(&id) {
                warn!(occupant_id = id, "saved occupant resolves to no actor; clearing slot");
                facility.occupant_id = None;
            }
        }
        if facility.occupant_id.is_none() && facility.suspension_applied {
            warn!("suspension flag set on an empty facility; clearing");
            facility.suspension_applied = false;
        }
    }
}
