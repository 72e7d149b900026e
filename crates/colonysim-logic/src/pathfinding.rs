//! Single-path queries over a [`GridMap`]: A* and Jump Point Search.
//!
//! Both solvers share one arena of per-cell search records addressed by
//! cell index, with `NO_PARENT` as the "no parent" sentinel. Records carry a
//! generation stamp so a new search does not have to clear the arena.
//!
//! The open set is a binary heap ordered by ascending `f = g + h`, ties
//! broken by smaller `h` and then smaller cell index. Entries are never
//! removed on relaxation; stale entries are skipped when popped.
//!
//! JPS is only valid on uniform-cost grids. When any walkable tile carries a
//! cost multiplier other than 1.0 (or diagonals are disabled) it runs A*
//! instead, so both algorithms always report the same optimal cost. The two
//! solvers may still return different tile sequences of that same cost: a
//! jump segment commits to one straight run where A* breaks ties per node.
//!
//! [`Pathfinder::find_path`] can memoise results in a bounded FIFO cache
//! keyed by endpoints, solver and diagonal mode. The cache is dropped as a
//! whole whenever it sees a grid with a different [`GridMap::stamp`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, GridMap, DIRS4, DIRS8, SQRT2};

const NO_PARENT: u32 = u32::MAX;
const EPS: f32 = 1e-4;

/// Which solver the simulation uses for point-to-point queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PathAlgo {
    #[default]
    AStar,
    Jps,
}

impl PathAlgo {
    pub fn name(self) -> &'static str {
        match self {
            PathAlgo::AStar => "A*",
            PathAlgo::Jps => "JPS",
        }
    }
}

/// Octile distance for unit orthogonal and sqrt(2) diagonal steps.
pub fn octile(dx: i32, dy: i32) -> f32 {
    let ax = dx.abs();
    let ay = dy.abs();
    let lo = ax.min(ay) as f32;
    let hi = ax.max(ay) as f32;
    (hi - lo) + SQRT2 * lo
}

/// Counters accumulated across searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub astar_searches: u64,
    pub jps_searches: u64,
    pub nodes_expanded: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

type CacheKey = (Coord, Coord, PathAlgo, bool);

#[derive(Debug, Clone, Default)]
struct PathCache {
    capacity: usize,
    stamp: u64,
    entries: HashMap<CacheKey, Vec<Coord>>,
    order: VecDeque<CacheKey>,
}

impl PathCache {
    fn sync(&mut self, stamp: u64) {
        if self.stamp != stamp {
            self.clear();
            self.stamp = stamp;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn insert(&mut self, key: CacheKey, path: Vec<Coord>) {
        if self.capacity == 0 || self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(old) => {
                    self.entries.remove(&old);
                }
                None => break,
            }
        }
        self.order.push_back(key);
        self.entries.insert(key, path);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Unseen,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct NodeRecord {
    g: f32,
    parent: u32,
    state: NodeState,
    generation: u32,
}

impl Default for NodeRecord {
    fn default() -> Self {
        Self {
            g: f32::INFINITY,
            parent: NO_PARENT,
            state: NodeState::Unseen,
            generation: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f32,
    h: f32,
    g: f32,
    index: u32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // Reversed: BinaryHeap is a max-heap and we want the smallest f on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Reusable search state. One instance per caller; not thread-shared.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    records: Vec<NodeRecord>,
    generation: u32,
    open: BinaryHeap<OpenEntry>,
    allow_diagonal: bool,
    stats: SearchStats,
    cache: PathCache,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::new()
    }
}

impl Pathfinder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            generation: 0,
            open: BinaryHeap::new(),
            allow_diagonal: true,
            stats: SearchStats::default(),
            cache: PathCache::default(),
        }
    }

    pub fn with_diagonal(allow_diagonal: bool) -> Self {
        Self {
            allow_diagonal,
            ..Self::new()
        }
    }

    pub fn allow_diagonal(&self) -> bool {
        self.allow_diagonal
    }

    pub fn set_allow_diagonal(&mut self, allow: bool) {
        self.allow_diagonal = allow;
    }

    /// Maximum number of cached paths. Zero disables the cache.
    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity
    }

    pub fn set_cache_capacity(&mut self, capacity: usize) {
        self.cache.capacity = capacity;
        if capacity == 0 {
            self.cache.clear();
        }
        while self.cache.entries.len() > capacity {
            let Some(old) = self.cache.order.pop_front() else {
                break;
            };
            self.cache.entries.remove(&old);
        }
    }

    pub fn cached_paths(&self) -> usize {
        self.cache.entries.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    /// Restore counters, e.g. after loading a saved world.
    pub fn set_stats(&mut self, stats: SearchStats) {
        self.stats = stats;
    }

    /// Find a dense path (every consecutive pair is one legal step) from
    /// `start` to `goal`, both included. Empty when either endpoint is
    /// impassable or no route exists.
    ///
    /// Goes through the path cache when one is configured; [`Self::astar`]
    /// and [`Self::jps`] always search.
    pub fn find_path(&mut self, grid: &GridMap, algo: PathAlgo, start: Coord, goal: Coord) -> Vec<Coord> {
        if self.cache.capacity == 0 {
            return self.search(grid, algo, start, goal);
        }
        self.cache.sync(grid.stamp());
        let key = (start, goal, algo, self.allow_diagonal);
        if let Some(path) = self.cache.entries.get(&key) {
            self.stats.cache_hits += 1;
            return path.clone();
        }
        self.stats.cache_misses += 1;
        let path = self.search(grid, algo, start, goal);
        self.cache.insert(key, path.clone());
        path
    }

    fn search(&mut self, grid: &GridMap, algo: PathAlgo, start: Coord, goal: Coord) -> Vec<Coord> {
        match algo {
            PathAlgo::AStar => self.astar(grid, start, goal),
            PathAlgo::Jps => self.jps(grid, start, goal),
        }
    }

    pub fn astar(&mut self, grid: &GridMap, start: Coord, goal: Coord) -> Vec<Coord> {
        self.stats.astar_searches += 1;
        if !grid.passable_at(start) || !grid.passable_at(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        self.begin_search(grid);
        let goal_index = grid.index(goal.x, goal.y) as u32;
        self.push_start(grid, start, goal);

        let dirs: &[(i32, i32)] = if self.allow_diagonal { &DIRS8 } else { &DIRS4 };

        while let Some(entry) = self.open.pop() {
            let cur = entry.index;
            if !self.accept_pop(entry) {
                continue;
            }
            if cur == goal_index {
                return self.reconstruct(grid, cur, false);
            }

            let c = grid.coord_of(cur as usize);
            let g = entry.g;
            for &(dx, dy) in dirs {
                if !grid.can_step(c.x, c.y, dx, dy) {
                    continue;
                }
                let n = c.offset(dx, dy);
                let ng = g + grid.step_cost(c.x, c.y, dx, dy);
                self.relax(grid, n, cur, ng, goal);
            }
        }

        Vec::new()
    }

    pub fn jps(&mut self, grid: &GridMap, start: Coord, goal: Coord) -> Vec<Coord> {
        if !self.allow_diagonal || !grid.is_uniform_cost() {
            return self.astar(grid, start, goal);
        }
        self.stats.jps_searches += 1;
        if !grid.passable_at(start) || !grid.passable_at(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        self.begin_search(grid);
        let goal_index = grid.index(goal.x, goal.y) as u32;
        self.push_start(grid, start, goal);

        let mut successors: Vec<(i32, i32)> = Vec::with_capacity(8);

        while let Some(entry) = self.open.pop() {
            let cur = entry.index;
            if !self.accept_pop(entry) {
                continue;
            }
            if cur == goal_index {
                return self.reconstruct(grid, cur, true);
            }

            let c = grid.coord_of(cur as usize);
            let parent = self.records[cur as usize].parent;
            let parent_coord = (parent != NO_PARENT).then(|| grid.coord_of(parent as usize));
            pruned_directions(grid, c, parent_coord, &mut successors);

            for &(dx, dy) in &successors {
                let Some(jp) = jump(grid, c.offset(dx, dy), dx, dy, goal) else {
                    continue;
                };
                let ng = entry.g + octile(jp.x - c.x, jp.y - c.y);
                self.relax(grid, jp, cur, ng, goal);
            }
        }

        Vec::new()
    }

    fn begin_search(&mut self, grid: &GridMap) {
        if self.records.len() != grid.len() {
            self.records = vec![NodeRecord::default(); grid.len()];
            self.generation = 0;
        }
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            for r in &mut self.records {
                *r = NodeRecord::default();
            }
            self.generation = 1;
        }
        self.open.clear();
    }

    fn record_mut(&mut self, index: usize) -> &mut NodeRecord {
        let generation = self.generation;
        let r = &mut self.records[index];
        if r.generation != generation {
            *r = NodeRecord {
                generation,
                ..NodeRecord::default()
            };
        }
        r
    }

    fn push_start(&mut self, grid: &GridMap, start: Coord, goal: Coord) {
        let si = grid.index(start.x, start.y);
        let r = self.record_mut(si);
        r.g = 0.0;
        r.parent = NO_PARENT;
        r.state = NodeState::Open;
        let h = octile(goal.x - start.x, goal.y - start.y);
        self.open.push(OpenEntry {
            f: h,
            h,
            g: 0.0,
            index: si as u32,
        });
    }

    /// Close the popped node unless the entry is stale.
    fn accept_pop(&mut self, entry: OpenEntry) -> bool {
        let r = self.record_mut(entry.index as usize);
        if r.state == NodeState::Closed || entry.g > r.g + EPS {
            return false;
        }
        r.state = NodeState::Closed;
        self.stats.nodes_expanded += 1;
        true
    }

    fn relax(&mut self, grid: &GridMap, n: Coord, parent: u32, ng: f32, goal: Coord) {
        let ni = grid.index(n.x, n.y);
        let r = self.record_mut(ni);
        if r.state == NodeState::Closed {
            return;
        }
        if r.state == NodeState::Open && ng >= r.g - EPS {
            return;
        }
        r.g = ng;
        r.parent = parent;
        r.state = NodeState::Open;
        let h = octile(goal.x - n.x, goal.y - n.y);
        self.open.push(OpenEntry {
            f: ng + h,
            h,
            g: ng,
            index: ni as u32,
        });
    }

    fn reconstruct(&self, grid: &GridMap, goal_index: u32, expand_jumps: bool) -> Vec<Coord> {
        let mut points = Vec::new();
        let mut cur = goal_index;
        while cur != NO_PARENT {
            points.push(grid.coord_of(cur as usize));
            cur = self.records[cur as usize].parent;
        }
        points.reverse();

        if !expand_jumps {
            return points;
        }

        let mut dense = Vec::with_capacity(points.len() * 4);
        if let Some(&first) = points.first() {
            dense.push(first);
        }
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let sx = (b.x - a.x).signum();
            let sy = (b.y - a.y).signum();
            let mut p = a;
            while p != b {
                p = p.offset(sx, sy);
                dense.push(p);
            }
        }
        dense
    }
}

/// Directions to try from `c` given the jump point it was reached from.
fn pruned_directions(grid: &GridMap, c: Coord, parent: Option<Coord>, out: &mut Vec<(i32, i32)>) {
    out.clear();
    let Some(p) = parent else {
        for &(dx, dy) in &DIRS8 {
            if grid.can_step(c.x, c.y, dx, dy) {
                out.push((dx, dy));
            }
        }
        return;
    };

    let dx = (c.x - p.x).signum();
    let dy = (c.y - p.y).signum();
    let open = |x: i32, y: i32| grid.passable(x, y);

    if dx != 0 && dy != 0 {
        let vert = open(c.x, c.y + dy);
        let horiz = open(c.x + dx, c.y);
        if vert {
            out.push((0, dy));
        }
        if horiz {
            out.push((dx, 0));
        }
        if vert && horiz {
            out.push((dx, dy));
        }
    } else if dx != 0 {
        let next = open(c.x + dx, c.y);
        let up = open(c.x, c.y + 1);
        let down = open(c.x, c.y - 1);
        if next {
            out.push((dx, 0));
            if up {
                out.push((dx, 1));
            }
            if down {
                out.push((dx, -1));
            }
        }
        if up {
            out.push((0, 1));
        }
        if down {
            out.push((0, -1));
        }
    } else {
        let next = open(c.x, c.y + dy);
        let right = open(c.x + 1, c.y);
        let left = open(c.x - 1, c.y);
        if next {
            out.push((0, dy));
            if right {
                out.push((1, dy));
            }
            if left {
                out.push((-1, dy));
            }
        }
        if right {
            out.push((1, 0));
        }
        if left {
            out.push((-1, 0));
        }
    }
}

/// Walk from `at` in direction `(dx, dy)` until a jump point, the goal, or
/// an obstacle.
///
/// Straight movement stops on a forced neighbour: a side cell that is open
/// while the cell diagonally behind it is blocked, so the side cell cannot
/// be reached without passing through this tile. Diagonal movement stops
/// when either straight component would reach a jump point, and only
/// continues while both orthogonal cells are open.
fn jump(grid: &GridMap, at: Coord, dx: i32, dy: i32, goal: Coord) -> Option<Coord> {
    let open = |x: i32, y: i32| grid.passable(x, y);
    let mut x = at.x;
    let mut y = at.y;

    loop {
        if !open(x, y) {
            return None;
        }
        if x == goal.x && y == goal.y {
            return Some(Coord::new(x, y));
        }

        if dx != 0 && dy != 0 {
            if jump(grid, Coord::new(x + dx, y), dx, 0, goal).is_some()
                || jump(grid, Coord::new(x, y + dy), 0, dy, goal).is_some()
            {
                return Some(Coord::new(x, y));
            }
        } else if dx != 0 {
            if (open(x, y - 1) && !open(x - dx, y - 1)) || (open(x, y + 1) && !open(x - dx, y + 1)) {
                return Some(Coord::new(x, y));
            }
        } else if (open(x - 1, y) && !open(x - 1, y - dy)) || (open(x + 1, y) && !open(x + 1, y - dy)) {
            return Some(Coord::new(x, y));
        }

        if open(x + dx, y) && open(x, y + dy) {
            x += dx;
            y += dy;
        } else {
            return None;
        }
    }
}
