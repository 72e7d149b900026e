//! Save/Load functionality for persisting world state
//!
//! Uses bincode for a compact binary snapshot. Derived state (nav grid,
//! counts, rooms, distance fields) is not stored; it is rebuilt on load.
//! Colonist tasks and cell reservations are stored as they are, so a loaded
//! world continues exactly where the saved one stopped.

use std::io::{Read, Write};

use colonysim_logic::pathfinding::SearchStats;
use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::config::{validate_config, WorldConfig};
use crate::systems::{JobRouter, PathStats};
use crate::world::{pathfinder_for, World};
use crate::world_grid::WorldGrid;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 2;

/// One colonist entity, component by component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonistRecord {
    pub colonist: Colonist,
    pub position: Position,
    pub needs: Needs,
    pub task: Task,
    pub orders: OrderQueue,
    pub role: Role,
    pub work_priorities: WorkPriorities,
}

/// Position of the world RNG in its stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: [u8; 32],
    pub stream: u64,
    pub word_pos: u128,
}

impl RngState {
    fn capture(rng: &ChaCha8Rng) -> Self {
        Self {
            seed: rng.get_seed(),
            stream: rng.get_stream(),
            word_pos: rng.get_word_pos(),
        }
    }

    fn restore(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(self.word_pos);
        rng
    }
}

/// Serializable snapshot of the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Save format version
    pub version: u32,
    pub width: i32,
    pub height: i32,
    pub config: WorldConfig,
    pub inventory: Inventory,
    /// Row-major, `width * height` entries.
    pub cells: Vec<Cell>,
    /// Sorted by colonist id.
    pub colonists: Vec<ColonistRecord>,
    pub next_colonist_id: u32,
    pub rng: RngState,
    pub tree_spread_accum: f32,
    pub sim_time: f64,
    pub tick_count: u64,
    pub path_stats: PathStats,
    pub search_stats: SearchStats,
}

impl World {
    /// Capture the current state. Only valid between ticks.
    pub fn snapshot(&self) -> WorldSnapshot {
        let colonists = crate::systems::colonists_in_order(&self.colonists)
            .into_iter()
            .filter_map(|(_, entity)| {
                let mut q = self
                    .colonists
                    .query_one::<(&Colonist, &Position, &Needs, &Task, &OrderQueue, &Role, &WorkPriorities)>(entity)
                    .ok()?;
                let (colonist, position, needs, task, orders, role, work_priorities) = q.get()?;
                Some(ColonistRecord {
                    colonist: *colonist,
                    position: *position,
                    needs: *needs,
                    task: task.clone(),
                    orders: orders.clone(),
                    role: *role,
                    work_priorities: *work_priorities,
                })
            })
            .collect();

        WorldSnapshot {
            version: SAVE_VERSION,
            width: self.grid.width(),
            height: self.grid.height(),
            config: self.config.clone(),
            inventory: self.inventory,
            cells: self.grid.cells().to_vec(),
            colonists,
            next_colonist_id: self.next_colonist_id,
            rng: RngState::capture(&self.rng),
            tree_spread_accum: self.tree_spread_accum,
            sim_time: self.sim_time,
            tick_count: self.tick_count,
            path_stats: *self.router.stats(),
            search_stats: self.pathfinder.stats(),
        }
    }

    /// Replace this world with a snapshot. The snapshot is fully checked
    /// first; on error the world is left untouched.
    pub fn restore(&mut self, snapshot: WorldSnapshot) -> Result<(), SaveError> {
        if snapshot.version != SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                expected: SAVE_VERSION,
                found: snapshot.version,
            });
        }
        let problems = validate_config(&snapshot.config);
        if let Some(first) = problems.first() {
            return Err(SaveError::InvalidSnapshot(format!("config: {}", first)));
        }
        let mut ids: Vec<u32> = snapshot.colonists.iter().map(|r| r.colonist.id.0).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != snapshot.colonists.len() {
            return Err(SaveError::InvalidSnapshot("duplicate colonist id".into()));
        }
        if ids.last().map_or(false, |max| *max >= snapshot.next_colonist_id) {
            return Err(SaveError::InvalidSnapshot("colonist id beyond id counter".into()));
        }
        let config = snapshot.config;
        let Some(mut grid) = WorldGrid::from_cells(
            snapshot.width,
            snapshot.height,
            snapshot.cells,
            config.nav_use_terrain_costs,
        ) else {
            return Err(SaveError::InvalidSnapshot(format!(
                "cell count does not match {}x{}",
                snapshot.width, snapshot.height
            )));
        };
        grid.rebuild_rooms();

        let mut colonists = hecs::World::new();
        for r in snapshot.colonists {
            colonists.spawn((
                r.colonist,
                r.position,
                r.needs,
                r.task,
                r.orders,
                r.role,
                r.work_priorities,
            ));
        }

        let mut router = JobRouter::new(config.allow_diagonal);
        router.set_stats(snapshot.path_stats);
        let mut pathfinder = pathfinder_for(&config);
        pathfinder.set_stats(snapshot.search_stats);

        self.grid = grid;
        self.colonists = colonists;
        self.router = router;
        self.pathfinder = pathfinder;
        self.inventory = snapshot.inventory;
        self.next_colonist_id = snapshot.next_colonist_id;
        self.rng = snapshot.rng.restore();
        self.tree_spread_accum = snapshot.tree_spread_accum;
        self.sim_time = snapshot.sim_time;
        self.tick_count = snapshot.tick_count;
        self.config = config;
        Ok(())
    }

    /// Save the world to a writer
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        bincode::serialize_into(writer, &self.snapshot())?;
        info!("World saved at tick {}", self.tick_count);
        Ok(())
    }

    /// Load a world from a reader, replacing this one
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let snapshot: WorldSnapshot = bincode::deserialize_from(reader)?;
        match self.restore(snapshot) {
            Ok(()) => {
                info!(
                    "World loaded: {}x{}, {} colonists, tick {}",
                    self.width(),
                    self.height(),
                    self.colonist_count(),
                    self.tick_count
                );
                Ok(())
            }
            Err(e) => {
                warn!("Rejected world snapshot: {}", e);
                Err(e)
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        Ok(bincode::serialize(&self.snapshot())?)
    }
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    /// Decoded fine but describes an impossible world.
    InvalidSnapshot(String),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(f, "Save version mismatch: expected {}, found {}", expected, found)
            }
            SaveError::InvalidSnapshot(why) => write!(f, "Invalid snapshot: {}", why),
        }
    }
}

impl std::error::Error for SaveError {}
