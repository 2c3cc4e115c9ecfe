//! Item stacks - stored in facility inventories or lying on the ground.

use serde::{Deserialize, Serialize};

/// A homogeneous stack of items. Ground stacks are entities carrying this
/// component plus a `Position`; stored stacks live inside a facility
/// inventory without an entity of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: String,
    pub count: u32,
    pub max_stack: u32,
}

impl ItemStack {
    pub fn new(kind: impl Into<String>, count: u32, max_stack: u32) -> Self {
        Self {
            kind: kind.into(),
            count,
            max_stack,
        }
    }

    /// True when `other` could merge into this stack.
    pub fn compatible_with(&self, other: &Self) -> bool {
        self.kind == other.kind && self.max_stack == other.max_stack
    }

    pub fn space_left(&self) -> u32 {
        self.max_stack.saturating_sub(self.count)
    }

    /// Merge as much of `other` into this stack as fits.
    /// Returns the leftover portion, if any.
    pub fn absorb(&mut self, other: ItemStack) -> Option<ItemStack> {
        let taken = other.count.min(self.space_left());
        self.count += taken;
        let rest = other.count - taken;
        if rest == 0 {
            None
        } else {
            Some(ItemStack { count: rest, ..other })
        }
    }

    /// Split `count` units off into a new stack (capped at what is present).
    pub fn split_off(&mut self, count: u32) -> ItemStack {
        let taken = count.min(self.count);
        self.count -= taken;
        ItemStack {
            kind: self.kind.clone(),
            count: taken,
            max_stack: self.max_stack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_within_limit() {
        let mut a = ItemStack::new("herbal medicine", 60, 75);
        let leftover = a.absorb(ItemStack::new("herbal medicine", 10, 75));
        assert!(leftover.is_none());
        assert_eq!(a.count, 70);
    }

    #[test]
    fn test_absorb_overflow_returns_rest() {
        let mut a = ItemStack::new("steel", 70, 75);
        let leftover = a.absorb(ItemStack::new("steel", 20, 75)).unwrap();
        assert_eq!(a.count, 75);
        assert_eq!(leftover.count, 15);
    }

    #[test]
    fn test_split_then_reabsorb_is_lossless() {
        let mut a = ItemStack::new("rice", 50, 75);
        let split = a.split_off(20);
        assert_eq!(a.count, 30);
        assert_eq!(split.count, 20);
        assert!(a.absorb(split).is_none());
        assert_eq!(a.count, 50);
    }

    #[test]
    fn test_split_caps_at_count() {
        let mut a = ItemStack::new("rice", 5, 75);
        let split = a.split_off(100);
        assert_eq!(split.count, 5);
        assert_eq!(a.count, 0);
    }

    #[test]
    fn test_incompatible_kinds() {
        let a = ItemStack::new("rice", 5, 75);
        let b = ItemStack::new("steel", 5, 75);
        assert!(!a.compatible_with(&b));
    }
}
