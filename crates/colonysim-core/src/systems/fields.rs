//! Multi-source distance fields and the single-source fallback search.
//!
//! A field is built by one Dijkstra expansion seeded from every work tile of
//! every eligible source. It stores, per cell, the walking cost to the
//! nearest work tile (plus that source's seed cost), which source it leads
//! to, and the next cell on the way there. Costs are measured in the
//! walker's direction, so a field distance equals the cost of the path a
//! colonist would actually walk under `GridMap::step_cost`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use colonysim_logic::grid::{Coord, GridMap, DIRS4, DIRS8};

const NONE: u32 = u32::MAX;
const EPS: f32 = 1e-4;

/// One seeded work tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    /// Where the colonist stands to work.
    pub work: Coord,
    /// The source the work tile serves.
    pub target: Coord,
    /// Starting distance (extra cost beyond reaching the work tile).
    pub cost: f32,
}

/// Field answer for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldHit {
    pub target: Coord,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    dist: f32,
    target: u32,
    index: u32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Min-heap on (dist, target, index).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.target.cmp(&self.target))
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Per-cell nearest-source table.
#[derive(Debug, Clone, Default)]
pub struct DistanceField {
    width: i32,
    height: i32,
    dist: Vec<f32>,
    target: Vec<u32>,
    next: Vec<u32>,
    /// Grid stamp this field was computed against; `None` if never built.
    stamp: Option<u64>,
    sources: usize,
}

impl DistanceField {
    pub fn stamp(&self) -> Option<u64> {
        self.stamp
    }

    pub(crate) fn set_stamp(&mut self, stamp: u64) {
        self.stamp = Some(stamp);
    }

    pub fn invalidate(&mut self) {
        self.stamp = None;
    }

    /// Distinct sources seeded in the last computation.
    pub fn source_count(&self) -> usize {
        self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources == 0
    }

    /// Rebuild the field from `seeds`. Seeds on impassable tiles are ignored.
    pub fn compute(&mut self, nav: &GridMap, seeds: &[Seed], allow_diagonal: bool) {
        let n = nav.len();
        self.width = nav.width();
        self.height = nav.height();
        self.dist.clear();
        self.dist.resize(n, f32::INFINITY);
        self.target.clear();
        self.target.resize(n, NONE);
        self.next.clear();
        self.next.resize(n, NONE);

        let mut heap = BinaryHeap::with_capacity(seeds.len());
        let mut distinct: Vec<u32> = Vec::with_capacity(seeds.len());

        for seed in seeds {
            if !nav.passable_at(seed.work) || !nav.in_bounds(seed.target.x, seed.target.y) {
                continue;
            }
            let wi = nav.index(seed.work.x, seed.work.y);
            let ti = nav.index(seed.target.x, seed.target.y) as u32;
            distinct.push(ti);
            if seed.cost < self.dist[wi] - EPS || (seed.cost <= self.dist[wi] + EPS && ti < self.target[wi]) {
                self.dist[wi] = seed.cost;
                self.target[wi] = ti;
                heap.push(HeapEntry {
                    dist: seed.cost,
                    target: ti,
                    index: wi as u32,
                });
            }
        }
        distinct.sort_unstable();
        distinct.dedup();
        self.sources = distinct.len();

        let dirs: &[(i32, i32)] = if allow_diagonal { &DIRS8 } else { &DIRS4 };
        let mut closed = vec![false; n];

        while let Some(e) = heap.pop() {
            let ci = e.index as usize;
            if closed[ci] || e.dist > self.dist[ci] + EPS || e.target != self.target[ci] {
                continue;
            }
            closed[ci] = true;
            let c = nav.coord_of(ci);

            for &(dx, dy) in dirs {
                let nb = c.offset(dx, dy);
                if !nav.passable_at(nb) || !nav.can_step(nb.x, nb.y, -dx, -dy) {
                    continue;
                }
                let ni = nav.index(nb.x, nb.y);
                if closed[ni] {
                    continue;
                }
                let nd = e.dist + nav.step_cost(nb.x, nb.y, -dx, -dy);
                let better = nd < self.dist[ni] - EPS || (nd <= self.dist[ni] + EPS && e.target < self.target[ni]);
                if better {
                    self.dist[ni] = nd;
                    self.target[ni] = e.target;
                    self.next[ni] = ci as u32;
                    heap.push(HeapEntry {
                        dist: nd,
                        target: e.target,
                        index: ni as u32,
                    });
                }
            }
        }
    }

    fn index(&self, at: Coord) -> Option<usize> {
        if at.x < 0 || at.y < 0 || at.x >= self.width || at.y >= self.height {
            return None;
        }
        Some((at.y * self.width + at.x) as usize)
    }

    fn coord(&self, i: usize) -> Coord {
        let i = i as i32;
        Coord::new(i % self.width, i / self.width)
    }

    pub fn lookup(&self, at: Coord) -> Option<FieldHit> {
        let i = self.index(at)?;
        let t = *self.target.get(i)?;
        if t == NONE || !self.dist[i].is_finite() {
            return None;
        }
        Some(FieldHit {
            target: self.coord(t as usize),
            distance: self.dist[i],
        })
    }

    pub fn distance(&self, at: Coord) -> Option<f32> {
        self.lookup(at).map(|h| h.distance)
    }

    /// Dense path from `at` to the work tile of its nearest source,
    /// `at` included. Empty when `at` has no source.
    pub fn path_from(&self, at: Coord) -> Vec<Coord> {
        let Some(mut i) = self.index(at) else {
            return Vec::new();
        };
        if self.target.get(i).map_or(true, |t| *t == NONE) {
            return Vec::new();
        }
        let mut path = vec![at];
        while self.next[i] != NONE {
            i = self.next[i] as usize;
            path.push(self.coord(i));
            if path.len() > self.dist.len() {
                // A cycle would mean a corrupt table; refuse to loop.
                return Vec::new();
            }
        }
        path
    }
}

/// Result of a single-source nearest-target search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub target: Coord,
    /// Start to work tile, both included.
    pub path: Vec<Coord>,
    /// Walking cost plus the goal's extra cost.
    pub cost: f32,
}

/// Dijkstra outward from `start` until the cheapest goal is settled.
///
/// `goal(tile)` returns the target served when standing on `tile` and an
/// extra cost added on top of the walk. The search keeps going while a
/// cheaper total could still be found, so goals with extra costs compete
/// fairly. Ties go to the smaller target index.
pub fn search_nearest<F>(nav: &GridMap, start: Coord, allow_diagonal: bool, mut goal: F) -> Option<SearchHit>
where
    F: FnMut(Coord) -> Option<(Coord, f32)>,
{
    if !nav.passable_at(start) {
        return None;
    }
    let n = nav.len();
    let mut dist = vec![f32::INFINITY; n];
    let mut parent = vec![NONE; n];
    let mut closed = vec![false; n];
    let mut heap = BinaryHeap::new();
    let dirs: &[(i32, i32)] = if allow_diagonal { &DIRS8 } else { &DIRS4 };

    let si = nav.index(start.x, start.y);
    dist[si] = 0.0;
    heap.push(HeapEntry {
        dist: 0.0,
        target: 0,
        index: si as u32,
    });

    // (total, target index, work index, target)
    let mut best: Option<(f32, usize, usize, Coord)> = None;

    while let Some(e) = heap.pop() {
        let ci = e.index as usize;
        if closed[ci] || e.dist > dist[ci] + EPS {
            continue;
        }
        if let Some((total, ..)) = best {
            if e.dist > total + EPS {
                break;
            }
        }
        closed[ci] = true;
        let c = nav.coord_of(ci);

        if let Some((target, extra)) = goal(c) {
            let total = e.dist + extra.max(0.0);
            let ti = nav.index(target.x, target.y);
            let replace = match best {
                None => true,
                Some((bt, bti, ..)) => total < bt - EPS || (total <= bt + EPS && ti < bti),
            };
            if replace {
                best = Some((total, ti, ci, target));
            }
        }

        for &(dx, dy) in dirs {
            if !nav.can_step(c.x, c.y, dx, dy) {
                continue;
            }
            let nb = c.offset(dx, dy);
            let ni = nav.index(nb.x, nb.y);
            if closed[ni] {
                continue;
            }
            let nd = e.dist + nav.step_cost(c.x, c.y, dx, dy);
            if nd < dist[ni] - EPS {
                dist[ni] = nd;
                parent[ni] = ci as u32;
                heap.push(HeapEntry {
                    dist: nd,
                    target: 0,
                    index: ni as u32,
                });
            }
        }
    }

    let (cost, _, work, target) = best?;
    let mut path = Vec::new();
    let mut i = work as u32;
    while i != NONE {
        path.push(nav.coord_of(i as usize));
        i = parent[i as usize];
    }
    path.reverse();
    Some(SearchHit { target, path, cost })
}
