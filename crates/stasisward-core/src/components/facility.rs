//! Containment facility component and its bounded item inventory.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::Cell;
use super::items::ItemStack;

/// Default number of item stacks a facility inventory holds.
pub const DEFAULT_INVENTORY_CAPACITY: usize = 30;

/// Stable facility identity, mirroring `ActorId`: occupant slots, tasks and
/// reservations reference facilities by this rather than by entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacilityId(pub u32);

/// Why a facility refused an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefusalReason {
    /// No power, or switched off.
    Unavailable,
    /// The occupant slot is taken.
    Occupied,
    /// The actor does not exist or is not present in the world.
    InvalidActor,
    ActorDead,
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RefusalReason::Unavailable => "no power / switched off",
            RefusalReason::Occupied => "facility is occupied",
            RefusalReason::InvalidActor => "actor is not present in the world",
            RefusalReason::ActorDead => "actor is dead",
        };
        f.write_str(text)
    }
}

/// Bounded, mergeable item store. Lives on the facility and has a lifecycle
/// independent of the occupant slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityInventory {
    stacks: Vec<ItemStack>,
    capacity: usize,
}

impl Default for FacilityInventory {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_CAPACITY)
    }
}

impl FacilityInventory {
    pub fn new(capacity: usize) -> Self {
        Self { stacks: Vec::new(), capacity }
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    /// Stack-count gate: full is full, even when an existing stack could
    /// still merge a few more units.
    pub fn can_accept(&self, _stack: &ItemStack) -> bool {
        self.stacks.len() < self.capacity
    }

    /// Merge into a compatible stack or append. On refusal the stack comes
    /// back unchanged and nothing is mutated.
    pub fn add(&mut self, stack: ItemStack) -> Result<(), ItemStack> {
        if !self.can_accept(&stack) {
            return Err(stack);
        }
        let mut rest = stack;
        for existing in &mut self.stacks {
            if existing.compatible_with(&rest) {
                match existing.absorb(rest) {
                    None => return Ok(()),
                    Some(leftover) => rest = leftover,
                }
            }
        }
        self.stacks.push(rest);
        Ok(())
    }

    /// Remove and return the whole stack at `index`.
    pub(crate) fn take(&mut self, index: usize) -> Option<ItemStack> {
        if index < self.stacks.len() {
            Some(self.stacks.remove(index))
        } else {
            None
        }
    }

    /// Reinsert a stack at (or near) its old slot after a failed drop.
    pub(crate) fn put_back(&mut self, index: usize, stack: ItemStack) {
        let index = index.min(self.stacks.len());
        self.stacks.insert(index, stack);
    }

    pub(crate) fn stack_mut(&mut self, index: usize) -> Option<&mut ItemStack> {
        self.stacks.get_mut(index)
    }

    /// Empty the inventory, returning every stack in order.
    pub(crate) fn drain_all(&mut self) -> Vec<ItemStack> {
        std::mem::take(&mut self.stacks)
    }
}

/// The containment facility: one occupant slot, an availability gate, a
/// bounded item inventory and the suspension bookkeeping flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    /// Stable id of the contained actor, if any. At most one.
    pub occupant_id: Option<u32>,
    /// True iff this facility added the suspension condition to the current
    /// occupant. Meaningless (and forced false) while the slot is empty.
    pub suspension_applied: bool,
    /// External power signal.
    pub powered: bool,
    /// Manual on/off switch.
    pub switch_on: bool,
    /// Preferred cell for exiting actors and dropped items.
    pub interaction_cell: Cell,
    pub inventory: FacilityInventory,
}

impl Facility {
    pub fn new(interaction_cell: Cell) -> Self {
        Self {
            occupant_id: None,
            suspension_applied: false,
            powered: true,
            switch_on: true,
            interaction_cell,
            inventory: FacilityInventory::default(),
        }
    }

    /// Gates occupant *entry* only. Eject and item insertion are always
    /// permitted, powered or not.
    pub fn is_available(&self) -> bool {
        self.powered && self.switch_on
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant_id.is_some()
    }

    /// Fallible storage step for the occupant slot.
    pub(crate) fn store_occupant(&mut self, actor: u32) -> bool {
        if self.occupant_id.is_some() {
            return false;
        }
        self.occupant_id = Some(actor);
        true
    }

    /// Inspect-pane style summary: occupant line plus stored-stacks line.
    pub fn summary(&self, occupant_name: Option<&str>) -> String {
        let occupant_line = match (self.occupant_id, occupant_name) {
            (Some(_), Some(name)) => format!("Occupant: {}", name),
            (Some(_), None) => "Occupant: unknown".to_string(),
            (None, _) => "Occupant: none".to_string(),
        };
        let item_line = match self.inventory.len() {
            0 => "Stored items: none".to_string(),
            1 => "Stored items: 1 stack".to_string(),
            n => format!("Stored items: {} stacks", n),
        };
        format!("{}\n{}", occupant_line, item_line)
    }
}
