//! Map bounds, blocked cells and scatter placement.
//!
//! Placement is the one collaborator every exit path depends on: ejected
//! occupants, dropped stacks and rolled-back hauls all need a standable
//! cell near a point.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::components::Cell;

/// How far `place_near` searches before giving up.
const MAX_SCATTER_RADIUS: i32 = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Terrain {
    pub width: i32,
    pub height: i32,
    blocked: HashSet<Cell>,
}

impl Terrain {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            blocked: HashSet::new(),
        }
    }

    pub fn block(&mut self, cell: Cell) {
        self.blocked.insert(cell);
    }

    pub fn unblock(&mut self, cell: Cell) {
        self.blocked.remove(&cell);
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    pub fn standable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.blocked.contains(&cell)
    }

    /// The designated interaction cell when it is usable, else the
    /// facility's own cell.
    pub fn drop_spot(&self, preferred: Cell, fallback: Cell) -> Cell {
        if self.standable(preferred) {
            preferred
        } else {
            fallback
        }
    }

    /// The cell itself when standable, else a standable cell picked from
    /// expanding rings around it. `None` when everything in range is
    /// blocked or out of bounds.
    pub fn place_near(&self, cell: Cell, rng: &mut impl Rng) -> Option<Cell> {
        if self.standable(cell) {
            return Some(cell);
        }
        for radius in 1..=MAX_SCATTER_RADIUS {
            let mut candidates = self.ring(cell, radius);
            candidates.shuffle(rng);
            if let Some(found) = candidates.into_iter().find(|c| self.standable(*c)) {
                return Some(found);
            }
        }
        warn!(x = cell.x, y = cell.y, "no standable cell near drop point");
        None
    }

    fn ring(&self, center: Cell, radius: i32) -> Vec<Cell> {
        let mut cells = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs().max(dy.abs()) == radius {
                    cells.push(Cell::new(center.x + dx, center.y + dy));
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bounds_and_blocking() {
        let mut t = Terrain::new(10, 10);
        assert!(t.standable(Cell::new(0, 0)));
        assert!(!t.standable(Cell::new(10, 0)));
        assert!(!t.standable(Cell::new(-1, 5)));
        t.block(Cell::new(3, 3));
        assert!(!t.standable(Cell::new(3, 3)));
        t.unblock(Cell::new(3, 3));
        assert!(t.standable(Cell::new(3, 3)));
    }

    #[test]
    fn test_drop_spot_falls_back() {
        let mut t = Terrain::new(10, 10);
        let preferred = Cell::new(5, 6);
        let fallback = Cell::new(5, 5);
        assert_eq!(t.drop_spot(preferred, fallback), preferred);
        t.block(preferred);
        assert_eq!(t.drop_spot(preferred, fallback), fallback);
    }

    #[test]
    fn test_place_near_prefers_exact_cell() {
        let t = Terrain::new(10, 10);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(t.place_near(Cell::new(4, 4), &mut rng), Some(Cell::new(4, 4)));
    }

    #[test]
    fn test_place_near_scatters_around_blocked() {
        let mut t = Terrain::new(10, 10);
        let target = Cell::new(4, 4);
        t.block(target);
        let mut rng = StdRng::seed_from_u64(1);
        let placed = t.place_near(target, &mut rng).unwrap();
        assert_ne!(placed, target);
        assert_eq!(placed.distance(&target), 1);
    }

    #[test]
    fn test_place_near_exhausted() {
        let mut t = Terrain::new(3, 3);
        for x in 0..3 {
            for y in 0..3 {
                t.block(Cell::new(x, y));
            }
        }
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(t.place_near(Cell::new(1, 1), &mut rng), None);
    }
}
