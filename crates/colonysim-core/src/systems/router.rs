//! Distance-field job router.
//!
//! One field per [`FieldKind`], recomputed only when the grid stamp for
//! that kind has moved. Idle colonists read their nearest source straight
//! out of the field. When that source was claimed earlier in the same pass
//! (the field is not recomputed mid-pass) the colonist falls back to a
//! direct search over the sources that are still unclaimed.

use colonysim_logic::grid::{Coord, DIRS4};
use log::debug;
use serde::{Deserialize, Serialize};

use super::fields::{search_nearest, DistanceField, Seed};
use crate::components::{ColonistId, FieldKind, SourceMode};
use crate::world_grid::WorldGrid;

/// Retries when a fallback target is lost between search and claim.
const MAX_FALLBACK_ATTEMPTS: usize = 4;

/// Counters for one family of fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCounters {
    /// Field recomputations.
    pub computed: u64,
    /// Jobs assigned straight from the field.
    pub assigned: u64,
    /// Times the field answer was already claimed and a direct search ran.
    pub fallback: u64,
    /// Sources seeded in the most recent computation.
    pub sources: u64,
}

/// Router and pathfinder observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStats {
    /// All build priorities combined.
    pub build: FieldCounters,
    pub harvest: FieldCounters,
    pub eat: FieldCounters,
    pub haul: FieldCounters,
    pub stockpile: FieldCounters,
    pub astar_searches: u64,
    pub jps_searches: u64,
    pub path_cache_hits: u64,
    pub path_cache_misses: u64,
}

impl PathStats {
    pub fn counters(&self, kind: FieldKind) -> &FieldCounters {
        match kind {
            FieldKind::Build(_) => &self.build,
            FieldKind::Harvest => &self.harvest,
            FieldKind::Eat => &self.eat,
            FieldKind::HaulPickup => &self.haul,
            FieldKind::Stockpile => &self.stockpile,
        }
    }

    fn counters_mut(&mut self, kind: FieldKind) -> &mut FieldCounters {
        match kind {
            FieldKind::Build(_) => &mut self.build,
            FieldKind::Harvest => &mut self.harvest,
            FieldKind::Eat => &mut self.eat,
            FieldKind::HaulPickup => &mut self.haul,
            FieldKind::Stockpile => &mut self.stockpile,
        }
    }
}

/// A claimed job: where to go and how.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Coord,
    /// Dense path from the colonist's tile to the work tile.
    pub path: Vec<Coord>,
    pub via_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct JobRouter {
    fields: Vec<DistanceField>,
    stats: PathStats,
    allow_diagonal: bool,
}

impl Default for JobRouter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl JobRouter {
    pub fn new(allow_diagonal: bool) -> Self {
        Self {
            fields: vec![DistanceField::default(); FieldKind::COUNT],
            stats: PathStats::default(),
            allow_diagonal,
        }
    }

    pub fn stats(&self) -> &PathStats {
        &self.stats
    }

    pub fn set_stats(&mut self, stats: PathStats) {
        self.stats = stats;
    }

    pub fn set_allow_diagonal(&mut self, allow: bool) {
        if self.allow_diagonal != allow {
            self.allow_diagonal = allow;
            self.invalidate_all();
        }
    }

    pub fn invalidate_all(&mut self) {
        for f in &mut self.fields {
            f.invalidate();
        }
    }

    pub fn field(&self, kind: FieldKind) -> &DistanceField {
        &self.fields[kind.slot()]
    }

    pub fn is_stale(&self, grid: &WorldGrid, kind: FieldKind) -> bool {
        self.fields[kind.slot()].stamp() != Some(grid.field_stamp(kind))
    }

    /// Recompute `kind` if the grid moved since its last computation.
    /// Returns whether a recomputation happened.
    pub fn ensure(&mut self, grid: &WorldGrid, kind: FieldKind) -> bool {
        if kind == FieldKind::HaulPickup {
            self.ensure(grid, FieldKind::Stockpile);
        }
        if !self.is_stale(grid, kind) {
            return false;
        }

        let seeds = self.collect_seeds(grid, kind);
        let allow_diagonal = self.allow_diagonal;
        let field = &mut self.fields[kind.slot()];
        field.compute(grid.nav(), &seeds, allow_diagonal);
        field.set_stamp(grid.field_stamp(kind));
        let sources = field.source_count() as u64;

        let counters = self.stats.counters_mut(kind);
        counters.sources = sources;
        counters.computed += 1;
        debug!("{} field recomputed: {} sources", kind.name(), sources);
        true
    }

    /// Refresh every field in `kinds` that is stale.
    pub fn refresh(&mut self, grid: &WorldGrid, kinds: &[FieldKind]) {
        for &kind in kinds {
            self.ensure(grid, kind);
        }
    }

    fn collect_seeds(&self, grid: &WorldGrid, kind: FieldKind) -> Vec<Seed> {
        let stockpile = &self.fields[FieldKind::Stockpile.slot()];
        let mut seeds = Vec::new();
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let at = Coord::new(x, y);
                if !grid.offers(kind, at) {
                    continue;
                }
                match kind.mode() {
                    SourceMode::Adjacent => {
                        for &(dx, dy) in &DIRS4 {
                            let work = at.offset(dx, dy);
                            if grid.passable(work) {
                                seeds.push(Seed { work, target: at, cost: 0.0 });
                            }
                        }
                    }
                    SourceMode::OnTile => {
                        let cost = if kind == FieldKind::HaulPickup {
                            match stockpile.distance(at) {
                                Some(d) => d,
                                None => continue,
                            }
                        } else {
                            0.0
                        };
                        seeds.push(Seed { work: at, target: at, cost });
                    }
                }
            }
        }
        seeds
    }

    /// Assign `who`, standing on `at`, to the nearest source of `kind`.
    ///
    /// The field must have been refreshed for this pass. Claims made earlier
    /// in the pass are not reflected in the field; a stale answer is caught
    /// by the live eligibility check or the claim itself, and resolved by a
    /// direct search.
    pub fn assign(&mut self, grid: &mut WorldGrid, kind: FieldKind, who: ColonistId, at: Coord) -> Option<Assignment> {
        let field = &self.fields[kind.slot()];
        field.stamp()?;
        let hit = field.lookup(at)?;

        if grid.offers(kind, hit.target) {
            let path = field.path_from(at);
            if !path.is_empty() && claim(grid, kind, hit.target, who) {
                self.stats.counters_mut(kind).assigned += 1;
                debug!(
                    "{} assigned {} job at ({}, {}) from field",
                    who,
                    kind.name(),
                    hit.target.x,
                    hit.target.y
                );
                return Some(Assignment {
                    target: hit.target,
                    path,
                    via_fallback: false,
                });
            }
        }

        self.stats.counters_mut(kind).fallback += 1;
        self.assign_by_search(grid, kind, who, at)
    }

    /// Direct search over currently unclaimed sources of `kind`.
    pub fn assign_by_search(&mut self, grid: &mut WorldGrid, kind: FieldKind, who: ColonistId, at: Coord) -> Option<Assignment> {
        for _ in 0..MAX_FALLBACK_ATTEMPTS {
            let hit = self.search(grid, kind, at)?;
            if claim(grid, kind, hit.target, who) {
                debug!(
                    "{} assigned {} job at ({}, {}) by fallback search",
                    who,
                    kind.name(),
                    hit.target.x,
                    hit.target.y
                );
                return Some(Assignment {
                    target: hit.target,
                    path: hit.path,
                    via_fallback: true,
                });
            }
        }
        None
    }

    /// Route a loaded hauler to the nearest stockpile. Stockpiles are never
    /// claimed, so the field answer is always usable when there is one.
    pub fn route_to_stockpile(&mut self, grid: &WorldGrid, at: Coord) -> Option<Assignment> {
        self.ensure(grid, FieldKind::Stockpile);
        let field = &self.fields[FieldKind::Stockpile.slot()];
        if let Some(hit) = field.lookup(at) {
            let path = field.path_from(at);
            if !path.is_empty() {
                self.stats.stockpile.assigned += 1;
                return Some(Assignment {
                    target: hit.target,
                    path,
                    via_fallback: false,
                });
            }
        }
        self.stats.stockpile.fallback += 1;
        let hit = self.search(grid, FieldKind::Stockpile, at)?;
        Some(Assignment {
            target: hit.target,
            path: hit.path,
            via_fallback: true,
        })
    }

    /// Nearest source of `kind` from `at`, searched directly against the
    /// live grid. Haul pickups add the onward distance to a stockpile.
    pub fn search(&self, grid: &WorldGrid, kind: FieldKind, at: Coord) -> Option<super::fields::SearchHit> {
        let stockpile = &self.fields[FieldKind::Stockpile.slot()];
        let haul = kind == FieldKind::HaulPickup;
        search_nearest(grid.nav(), at, self.allow_diagonal, |tile| match kind.mode() {
            SourceMode::OnTile => {
                if !grid.offers(kind, tile) {
                    return None;
                }
                let extra = if haul { stockpile.distance(tile)? } else { 0.0 };
                Some((tile, extra))
            }
            SourceMode::Adjacent => DIRS4
                .iter()
                .map(|&(dx, dy)| tile.offset(dx, dy))
                .filter(|t| grid.offers(kind, *t))
                .min()
                .map(|t| (t, 0.0)),
        })
    }
}

fn claim(grid: &mut WorldGrid, kind: FieldKind, target: Coord, who: ColonistId) -> bool {
    match WorldGrid::claim_for(kind) {
        Some(c) => match grid.reserve(c, target, who) {
            Ok(()) => true,
            Err(conflict) => {
                debug!("reservation conflict: {}", conflict);
                false
            }
        },
        None => grid.offers(kind, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Claim, Inventory, PlanCost};
    use colonysim_logic::tiles::TileType;

    fn grid_with_plans(plans: &[Coord]) -> WorldGrid {
        let mut g = WorldGrid::new(10, 10, true);
        let mut inv = Inventory::default();
        for &p in plans {
            g.place_plan(p, TileType::Floor, 0, &mut inv, PlanCost::Charge);
        }
        g
    }

    #[test]
    fn test_field_recomputed_only_when_stale() {
        let g = grid_with_plans(&[Coord::new(5, 5)]);
        let mut r = JobRouter::new(true);
        assert!(r.ensure(&g, FieldKind::Build(0)));
        assert!(!r.ensure(&g, FieldKind::Build(0)));
        assert_eq!(r.stats().build.computed, 1);
        assert_eq!(r.stats().build.sources, 1);
    }

    #[test]
    fn test_empty_field_still_counted() {
        let g = grid_with_plans(&[]);
        let mut r = JobRouter::new(true);
        assert!(r.ensure(&g, FieldKind::Build(0)));
        assert_eq!(r.stats().build.computed, 1);
        assert_eq!(r.stats().build.sources, 0);
        assert!(r.field(FieldKind::Build(0)).is_empty());
        assert!(!r.ensure(&g, FieldKind::Build(0)));
        assert_eq!(r.stats().build.computed, 1);
    }

    #[test]
    fn test_assign_from_field_reserves() {
        let mut g = grid_with_plans(&[Coord::new(5, 5)]);
        let mut r = JobRouter::new(true);
        r.refresh(&g, &[FieldKind::Build(0)]);
        let a = r.assign(&mut g, FieldKind::Build(0), ColonistId(1), Coord::new(0, 5)).unwrap();
        assert_eq!(a.target, Coord::new(5, 5));
        assert!(!a.via_fallback);
        assert_eq!(a.path.last(), Some(&Coord::new(4, 5)));
        assert_eq!(g.holder(Claim::Plan, Coord::new(5, 5)), Some(ColonistId(1)));
        assert_eq!(r.stats().build.assigned, 1);
    }

    #[test]
    fn test_second_colonist_falls_back() {
        let mut g = grid_with_plans(&[Coord::new(5, 5), Coord::new(1, 1)]);
        let mut r = JobRouter::new(true);
        r.refresh(&g, &[FieldKind::Build(0)]);
        let start = Coord::new(6, 6);
        let a = r.assign(&mut g, FieldKind::Build(0), ColonistId(1), start).unwrap();
        let b = r.assign(&mut g, FieldKind::Build(0), ColonistId(2), start).unwrap();
        assert_ne!(a.target, b.target);
        assert!(b.via_fallback);
        assert_eq!(r.stats().build.fallback, 1);
        assert_eq!(b.path.first(), Some(&start));
    }

    #[test]
    fn test_no_sources_no_assignment() {
        let mut g = grid_with_plans(&[Coord::new(5, 5)]);
        let mut r = JobRouter::new(true);
        r.refresh(&g, &[FieldKind::Build(0)]);
        r.assign(&mut g, FieldKind::Build(0), ColonistId(1), Coord::new(0, 0)).unwrap();
        assert!(r.assign(&mut g, FieldKind::Build(0), ColonistId(2), Coord::new(0, 0)).is_none());
        assert_eq!(r.stats().build.fallback, 1);
    }

    #[test]
    fn test_unrefreshed_field_assigns_nothing() {
        let mut g = grid_with_plans(&[Coord::new(5, 5)]);
        let mut r = JobRouter::new(true);
        assert!(r.assign(&mut g, FieldKind::Build(0), ColonistId(1), Coord::new(0, 0)).is_none());
    }

    #[test]
    fn test_haul_seed_includes_stockpile_distance() {
        let mut g = WorldGrid::new(12, 1, false);
        let mut inv = Inventory::default();
        g.debug_set_built(Coord::new(11, 0), TileType::Stockpile, &mut inv);
        g.adjust_loose_wood(Coord::new(3, 0), 5);
        g.adjust_loose_wood(Coord::new(8, 0), 5);
        let mut r = JobRouter::new(true);
        r.refresh(&g, &[FieldKind::HaulPickup]);
        // From x=5 the pile at 3 is closer, but the pile at 8 is on the way.
        let hit = r.field(FieldKind::HaulPickup).lookup(Coord::new(5, 0)).unwrap();
        assert_eq!(hit.target, Coord::new(8, 0));
        assert!((hit.distance - 6.0).abs() < 1e-4);
        assert_eq!(r.stats().stockpile.computed, 1);
    }
}
