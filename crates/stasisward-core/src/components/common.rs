//! Common components shared by actors, facilities and ground items.

use serde::{Deserialize, Serialize};

/// Integer grid coordinate on the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance - diagonal steps count as one.
    pub fn distance(&self, other: &Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Touch range: the same cell or any of the eight neighbours.
    pub fn is_adjacent_to(&self, other: &Self) -> bool {
        self.distance(other) <= 1
    }

    /// One grid step toward `target` (diagonals allowed).
    pub fn step_toward(&self, target: &Self) -> Self {
        Self {
            x: self.x + (target.x - self.x).signum(),
            y: self.y + (target.y - self.y).signum(),
        }
    }
}

/// Spawned position component. An entity without a Position is withdrawn
/// from the map - contained in a facility or carried by another actor - and
/// is skipped by every per-interval system that queries spawned entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub cell: Cell,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { cell: Cell::new(x, y) }
    }
}

/// Display name for actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
