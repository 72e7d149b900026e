//! Walkability and cost grid shared by every search in the simulation.
//!
//! Cells are stored row-major (`index = y * width + x`). Movement is
//! 8-directional with the no-corner-cutting rule: a diagonal step is only
//! legal when both orthogonal cells it passes between are passable.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

fn next_stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

/// Cost of a diagonal step on a unit-cost tile.
pub const SQRT2: f32 = std::f32::consts::SQRT_2;

/// The four orthogonal directions, in the order every search expands them.
pub const DIRS4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// All eight directions: orthogonal first, then diagonals.
pub const DIRS8: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Integer tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Tile containing a continuous position in tile units.
    pub fn from_world(x: f32, y: f32) -> Self {
        Self::new(x.floor() as i32, y.floor() as i32)
    }

    /// World-space center of this tile.
    pub fn center(self) -> (f32, f32) {
        (self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Walkability + per-tile cost multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMap {
    width: i32,
    height: i32,
    walkable: Vec<bool>,
    cost: Vec<f32>,
    /// Number of walkable cells whose multiplier is not exactly 1.0.
    weighted_cells: usize,
    /// Process-unique tag, renewed on every walkability or cost change.
    #[serde(skip, default = "next_stamp")]
    stamp: u64,
}

impl GridMap {
    /// Create a fully walkable, unit-cost grid. Dimensions are clamped to 1x1.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let n = (width * height) as usize;
        Self {
            width,
            height,
            walkable: vec![true; n],
            cost: vec![1.0; n],
            weighted_cells: 0,
            stamp: next_stamp(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.walkable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walkable.is_empty()
    }

    /// Changes whenever a cell's walkability or cost changes. Two grids
    /// never share a stamp unless one is an unmodified clone of the other.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Row-major index. Caller must bounds-check.
    pub fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn coord_of(&self, index: usize) -> Coord {
        let i = index as i32;
        Coord::new(i % self.width, i / self.width)
    }

    pub fn passable(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.walkable[self.index(x, y)]
    }

    pub fn passable_at(&self, c: Coord) -> bool {
        self.passable(c.x, c.y)
    }

    pub fn set_walkable(&mut self, x: i32, y: i32, walkable: bool) {
        if !self.in_bounds(x, y) {
            return;
        }
        let i = self.index(x, y);
        if self.walkable[i] == walkable {
            return;
        }
        let was_weighted = self.is_weighted(i);
        self.walkable[i] = walkable;
        self.stamp = next_stamp();
        self.track_weight(was_weighted, self.is_weighted(i));
    }

    /// Set the cost multiplier of a tile. Values below 1.0 are raised to 1.0
    /// so the octile heuristic stays admissible.
    pub fn set_cost_multiplier(&mut self, x: i32, y: i32, multiplier: f32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let i = self.index(x, y);
        let cost = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        if self.cost[i] == cost {
            return;
        }
        let was_weighted = self.is_weighted(i);
        self.cost[i] = cost;
        self.stamp = next_stamp();
        self.track_weight(was_weighted, self.is_weighted(i));
    }

    pub fn cost_multiplier(&self, x: i32, y: i32) -> f32 {
        if self.in_bounds(x, y) {
            self.cost[self.index(x, y)]
        } else {
            1.0
        }
    }

    /// True when every walkable tile costs exactly 1.0.
    pub fn is_uniform_cost(&self) -> bool {
        self.weighted_cells == 0
    }

    /// Whether a step from `(x, y)` by `(dx, dy)` is legal.
    ///
    /// Diagonal steps additionally require both orthogonal neighbours
    /// `(x + dx, y)` and `(x, y + dy)` to be passable.
    pub fn can_step(&self, x: i32, y: i32, dx: i32, dy: i32) -> bool {
        let nx = x + dx;
        let ny = y + dy;
        if !self.passable(nx, ny) {
            return false;
        }
        if dx != 0 && dy != 0 {
            return self.passable(x + dx, y) && self.passable(x, y + dy);
        }
        true
    }

    /// Cost of stepping from `(x, y)` by `(dx, dy)`: 1 or sqrt(2), scaled by
    /// the destination tile's multiplier.
    pub fn step_cost(&self, x: i32, y: i32, dx: i32, dy: i32) -> f32 {
        let base = if dx != 0 && dy != 0 { SQRT2 } else { 1.0 };
        base * self.cost_multiplier(x + dx, y + dy)
    }

    fn is_weighted(&self, i: usize) -> bool {
        self.walkable[i] && self.cost[i] != 1.0
    }

    fn track_weight(&mut self, before: bool, after: bool) {
        match (before, after) {
            (false, true) => self.weighted_cells += 1,
            (true, false) => self.weighted_cells -= 1,
            _ => {}
        }
    }
}

/// Total cost of walking a dense path under `grid`'s step rules.
///
/// Returns `None` if any consecutive pair is not a legal single step.
pub fn path_cost(grid: &GridMap, path: &[Coord]) -> Option<f32> {
    let mut total = 0.0;
    for pair in path.windows(2) {
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        if dx.abs() > 1 || dy.abs() > 1 || (dx == 0 && dy == 0) {
            return None;
        }
        if !grid.can_step(pair[0].x, pair[0].y, dx, dy) {
            return None;
        }
        total += grid.step_cost(pair[0].x, pair[0].y, dx, dy);
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_dimensions() {
        let g = GridMap::new(0, -3);
        assert_eq!(g.width(), 1);
        assert_eq!(g.height(), 1);
        assert!(g.passable(0, 0));
    }

    #[test]
    fn test_out_of_bounds_is_impassable() {
        let g = GridMap::new(4, 4);
        assert!(!g.passable(-1, 0));
        assert!(!g.passable(4, 0));
        assert!(!g.passable(0, 4));
    }

    #[test]
    fn test_diagonal_blocked_by_single_corner() {
        let mut g = GridMap::new(3, 3);
        g.set_walkable(1, 0, false);
        assert!(!g.can_step(0, 0, 1, 1));
        assert!(g.can_step(0, 0, 0, 1));
        g.set_walkable(1, 0, true);
        assert!(g.can_step(0, 0, 1, 1));
    }

    #[test]
    fn test_step_cost_uses_destination_multiplier() {
        let mut g = GridMap::new(3, 3);
        g.set_cost_multiplier(1, 1, 2.0);
        assert!((g.step_cost(0, 1, 1, 0) - 2.0).abs() < 1e-6);
        assert!((g.step_cost(1, 1, 1, 0) - 1.0).abs() < 1e-6);
        assert!((g.step_cost(0, 0, 1, 1) - 2.0 * SQRT2).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_cost_tracking() {
        let mut g = GridMap::new(4, 4);
        assert!(g.is_uniform_cost());
        g.set_cost_multiplier(2, 2, 1.5);
        assert!(!g.is_uniform_cost());
        // A blocked weighted tile no longer counts.
        g.set_walkable(2, 2, false);
        assert!(g.is_uniform_cost());
        g.set_walkable(2, 2, true);
        g.set_cost_multiplier(2, 2, 1.0);
        assert!(g.is_uniform_cost());
    }

    #[test]
    fn test_multiplier_floor() {
        let mut g = GridMap::new(2, 2);
        g.set_cost_multiplier(1, 1, 0.25);
        assert_eq!(g.cost_multiplier(1, 1), 1.0);
    }

    #[test]
    fn test_path_cost_rejects_jumps() {
        let g = GridMap::new(5, 5);
        let ok = [Coord::new(0, 0), Coord::new(1, 1), Coord::new(2, 1)];
        assert!((path_cost(&g, &ok).unwrap() - (SQRT2 + 1.0)).abs() < 1e-5);
        let bad = [Coord::new(0, 0), Coord::new(2, 0)];
        assert!(path_cost(&g, &bad).is_none());
    }

    #[test]
    fn test_stamp_changes_only_on_real_edits() {
        let mut g = GridMap::new(4, 4);
        let s0 = g.stamp();
        g.set_walkable(1, 1, true);
        g.set_cost_multiplier(1, 1, 0.5);
        assert_eq!(g.stamp(), s0);
        g.set_walkable(1, 1, false);
        let s1 = g.stamp();
        assert_ne!(s1, s0);
        g.set_cost_multiplier(2, 2, 3.0);
        assert_ne!(g.stamp(), s1);
        assert_ne!(GridMap::new(4, 4).stamp(), GridMap::new(4, 4).stamp());
    }
}
