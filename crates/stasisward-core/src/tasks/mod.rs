//! Multi-step tasks that move actors and items into facilities.
//!
//! Each task is a small per-tick state machine owned by the engine. Tasks
//! reference actors and facilities by stable id so an in-flight task
//! survives save/load. Construction goes through [`TaskRegistry`], which is
//! validated once at engine startup so a missing constructor is a startup
//! error, not a mid-run surprise.

mod driver;
mod reservations;

pub use driver::*;
pub use reservations::*;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kinds of task the facility workflow uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// A worker walks to a facility and enters it as the occupant.
    EnterFacility,
    /// A worker carries a downed actor to a facility and inserts them.
    CarryToFacility,
    /// A worker carries a held item stack to a facility's storage.
    InsertCarriedItem,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [
        TaskKind::EnterFacility,
        TaskKind::CarryToFacility,
        TaskKind::InsertCarriedItem,
    ];
}

/// Stable task identifier, unique for the lifetime of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Where a task is in its lifecycle. Advanced one step per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Claiming the actors and facility the task needs.
    Reserving,
    /// Walking to the target actor.
    MovingToTarget,
    /// Withdrawing the target from the map into the worker's arms.
    PickingUp,
    /// Walking to the facility.
    MovingToFacility,
    /// Standing at the facility while the mechanism cycles.
    Delaying { remaining: u32 },
    /// The final hand-off into the facility.
    Committing,
    Done,
    Failed,
}

/// A live task instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    /// The actor doing the work.
    pub worker: u32,
    /// The actor being carried, for carry tasks.
    pub target_actor: Option<u32>,
    /// The destination facility.
    pub facility: u32,
    pub state: TaskState,
}

impl Task {
    pub fn is_finished(&self) -> bool {
        matches!(self.state, TaskState::Done | TaskState::Failed)
    }
}

/// The ingredients for a task, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRequest {
    pub worker: u32,
    pub target_actor: Option<u32>,
    pub facility: u32,
}

impl TaskRequest {
    /// A worker entering a facility themselves.
    pub fn enter(worker: u32, facility: u32) -> Self {
        Self { worker, target_actor: None, facility }
    }

    /// A worker hauling a downed actor into a facility.
    pub fn carry(worker: u32, target_actor: u32, facility: u32) -> Self {
        Self { worker, target_actor: Some(target_actor), facility }
    }

    /// A worker storing whatever stack they are holding.
    pub fn insert(worker: u32, facility: u32) -> Self {
        Self { worker, target_actor: None, facility }
    }
}

/// Constructor for one task kind.
pub type TaskCtor = fn(TaskId, TaskRequest) -> Result<Task, TaskBuildError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no task constructor registered for {0:?}")]
    MissingCtor(TaskKind),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskBuildError {
    #[error("task kind {0:?} is not registered")]
    UnknownKind(TaskKind),
    #[error("carry task requires a target actor")]
    MissingTarget,
}

/// Maps task kinds to constructors. Built once and validated eagerly.
pub struct TaskRegistry {
    ctors: HashMap<TaskKind, TaskCtor>,
}

impl TaskRegistry {
    /// The standard registry covering every kind in [`TaskKind::ALL`].
    pub fn standard() -> Self {
        let mut ctors: HashMap<TaskKind, TaskCtor> = HashMap::new();
        ctors.insert(TaskKind::EnterFacility, build_enter);
        ctors.insert(TaskKind::CarryToFacility, build_carry);
        ctors.insert(TaskKind::InsertCarriedItem, build_insert);
        Self { ctors }
    }

    /// Fail fast if any kind lacks a constructor.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for kind in TaskKind::ALL {
            if !self.ctors.contains_key(&kind) {
                return Err(RegistryError::MissingCtor(kind));
            }
        }
        Ok(())
    }

    pub fn build(&self, id: TaskId, kind: TaskKind, request: TaskRequest) -> Result<Task, TaskBuildError> {
        let ctor = self.ctors.get(&kind).ok_or(TaskBuildError::UnknownKind(kind))?;
        ctor(id, request)
    }
}

fn build_enter(id: TaskId, request: TaskRequest) -> Result<Task, TaskBuildError> {
    Ok(Task {
        id,
        kind: TaskKind::EnterFacility,
        worker: request.worker,
        target_actor: None,
        facility: request.facility,
        state: TaskState::Reserving,
    })
}

fn build_carry(id: TaskId, request: TaskRequest) -> Result<Task, TaskBuildError> {
    let target = request.target_actor.ok_or(TaskBuildError::MissingTarget)?;
    Ok(Task {
        id,
        kind: TaskKind::CarryToFacility,
        worker: request.worker,
        target_actor: Some(target),
        facility: request.facility,
        state: TaskState::Reserving,
    })
}

fn build_insert(id: TaskId, request: TaskRequest) -> Result<Task, TaskBuildError> {
    Ok(Task {
        id,
        kind: TaskKind::InsertCarriedItem,
        worker: request.worker,
        target_actor: None,
        facility: request.facility,
        state: TaskState::Reserving,
    })
}
