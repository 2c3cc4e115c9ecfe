//! Claims on actors and facilities, so two tasks never work the same
//! resource at once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::TaskId;

/// Something a task can hold an exclusive claim on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Actor(u32),
    Facility(u32),
}

/// All outstanding claims, keyed by resource. Claims use stable ids and
/// are persisted with the tasks that hold them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationBook {
    claims: HashMap<Resource, TaskId>,
}

impl ReservationBook {
    /// Claim a resource for a task. Re-claiming one's own resource
    /// succeeds, so a task may re-assert its claims every tick.
    pub fn try_claim(&mut self, resource: Resource, task: TaskId) -> bool {
        match self.claims.get(&resource) {
            Some(holder) => *holder == task,
            None => {
                self.claims.insert(resource, task);
                true
            }
        }
    }

    pub fn holder(&self, resource: Resource) -> Option<TaskId> {
        self.claims.get(&resource).copied()
    }

    pub fn is_held_by_other(&self, resource: Resource, task: TaskId) -> bool {
        self.holder(resource).is_some_and(|holder| holder != task)
    }

    /// Drop every claim a task holds. Called whenever a task finishes,
    /// whatever the outcome.
    pub fn release_all(&mut self, task: TaskId) {
        self.claims.retain(|_, holder| *holder != task);
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive() {
        let mut book = ReservationBook::default();
        assert!(book.try_claim(Resource::Facility(1), TaskId(10)));
        assert!(!book.try_claim(Resource::Facility(1), TaskId(11)));
        // Same holder may re-claim
        assert!(book.try_claim(Resource::Facility(1), TaskId(10)));
        assert!(book.is_held_by_other(Resource::Facility(1), TaskId(11)));
    }

    #[test]
    fn test_release_all_frees_every_claim() {
        let mut book = ReservationBook::default();
        book.try_claim(Resource::Actor(1), TaskId(10));
        book.try_claim(Resource::Facility(2), TaskId(10));
        book.try_claim(Resource::Actor(3), TaskId(11));

        book.release_all(TaskId(10));
        assert_eq!(book.len(), 1);
        assert!(book.try_claim(Resource::Actor(1), TaskId(11)));
    }
}
