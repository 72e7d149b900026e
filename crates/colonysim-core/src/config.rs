//! World tuning: rates, durations and navigation switches.
//!
//! `WorldConfig` is plain data with serde support so a front end can load it
//! from JSON. [`validate_config`] reports every problem at once instead of
//! stopping at the first.

use colonysim_logic::pathfinding::PathAlgo;
use serde::{Deserialize, Serialize};

/// Simulation tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Construction work units applied per second by one colonist.
    pub build_work_per_second: f32,
    /// Tiles per second on a unit-cost tile.
    pub colonist_walk_speed: f32,

    pub farm_grow_duration_seconds: f32,
    pub farm_harvest_yield_food: f32,
    pub farm_harvest_duration_seconds: f32,

    pub tree_chop_yield_wood: i32,
    pub tree_spread_attempts_per_second: f32,
    pub tree_spread_chance_per_attempt: f32,

    pub food_per_colonist_per_second: f32,
    pub colonist_max_personal_food: f32,
    pub colonist_eat_threshold_food: f32,
    pub colonist_eat_duration_seconds: f32,

    pub haul_carry_capacity: i32,
    pub haul_pickup_duration_seconds: f32,
    pub haul_dropoff_duration_seconds: f32,

    pub path_algo: PathAlgo,
    pub nav_use_terrain_costs: bool,
    pub allow_diagonal: bool,
    /// Memoise point-to-point paths until the walkability grid changes.
    pub path_cache_enabled: bool,
    pub path_cache_max_entries: usize,

    pub history_max_commands: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            build_work_per_second: 1.0,
            colonist_walk_speed: 3.0,
            farm_grow_duration_seconds: 40.0,
            farm_harvest_yield_food: 10.0,
            farm_harvest_duration_seconds: 1.0,
            tree_chop_yield_wood: 4,
            tree_spread_attempts_per_second: 2.5,
            tree_spread_chance_per_attempt: 0.15,
            food_per_colonist_per_second: 0.05,
            colonist_max_personal_food: 6.0,
            colonist_eat_threshold_food: 2.0,
            colonist_eat_duration_seconds: 1.5,
            haul_carry_capacity: 25,
            haul_pickup_duration_seconds: 0.25,
            haul_dropoff_duration_seconds: 0.25,
            path_algo: PathAlgo::AStar,
            nav_use_terrain_costs: true,
            allow_diagonal: true,
            path_cache_enabled: true,
            path_cache_max_entries: 256,
            history_max_commands: 128,
        }
    }
}

impl WorldConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigLoadError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        let errors = validate_config(&config);
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigLoadError::Invalid(errors))
        }
    }

    /// Entries the path cache may hold; zero when caching is off.
    pub fn path_cache_capacity(&self) -> usize {
        if self.path_cache_enabled {
            self.path_cache_max_entries
        } else {
            0
        }
    }

    pub fn to_json_pretty(&self) -> String {
        // A struct of plain numbers and enums always serializes.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A rate or duration is negative, NaN or infinite.
    InvalidValue(&'static str, f32),
    /// Colonists could never move.
    ZeroWalkSpeed,
    /// Hauling could never move wood.
    ZeroCarryCapacity,
    NegativeYield(&'static str, i32),
    /// Spread chance outside `[0, 1]`.
    ChanceOutOfRange(f32),
    /// Colonists would be hungry even when full.
    EatThresholdAboveMax { threshold: f32, max: f32 },
    ZeroHistoryCap,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(name, v) => write!(f, "{} must be a finite non-negative number (got {})", name, v),
            ConfigError::ZeroWalkSpeed => write!(f, "colonist_walk_speed must be greater than zero"),
            ConfigError::ZeroCarryCapacity => write!(f, "haul_carry_capacity must be greater than zero"),
            ConfigError::NegativeYield(name, v) => write!(f, "{} must not be negative (got {})", name, v),
            ConfigError::ChanceOutOfRange(v) => {
                write!(f, "tree_spread_chance_per_attempt must be within [0, 1] (got {})", v)
            }
            ConfigError::EatThresholdAboveMax { threshold, max } => write!(
                f,
                "colonist_eat_threshold_food ({}) exceeds colonist_max_personal_food ({})",
                threshold, max
            ),
            ConfigError::ZeroHistoryCap => write!(f, "history_max_commands must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a config, returning every problem found.
pub fn validate_config(config: &WorldConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    let non_negative = [
        ("build_work_per_second", config.build_work_per_second),
        ("colonist_walk_speed", config.colonist_walk_speed),
        ("farm_grow_duration_seconds", config.farm_grow_duration_seconds),
        ("farm_harvest_yield_food", config.farm_harvest_yield_food),
        ("farm_harvest_duration_seconds", config.farm_harvest_duration_seconds),
        ("tree_spread_attempts_per_second", config.tree_spread_attempts_per_second),
        ("food_per_colonist_per_second", config.food_per_colonist_per_second),
        ("colonist_max_personal_food", config.colonist_max_personal_food),
        ("colonist_eat_threshold_food", config.colonist_eat_threshold_food),
        ("colonist_eat_duration_seconds", config.colonist_eat_duration_seconds),
        ("haul_pickup_duration_seconds", config.haul_pickup_duration_seconds),
        ("haul_dropoff_duration_seconds", config.haul_dropoff_duration_seconds),
    ];
    for (name, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            errors.push(ConfigError::InvalidValue(name, value));
        }
    }

    if config.colonist_walk_speed == 0.0 {
        errors.push(ConfigError::ZeroWalkSpeed);
    }
    if config.haul_carry_capacity <= 0 {
        errors.push(ConfigError::ZeroCarryCapacity);
    }
    if config.tree_chop_yield_wood < 0 {
        errors.push(ConfigError::NegativeYield("tree_chop_yield_wood", config.tree_chop_yield_wood));
    }
    let chance = config.tree_spread_chance_per_attempt;
    if !(0.0..=1.0).contains(&chance) {
        errors.push(ConfigError::ChanceOutOfRange(chance));
    }
    if config.colonist_eat_threshold_food > config.colonist_max_personal_food {
        errors.push(ConfigError::EatThresholdAboveMax {
            threshold: config.colonist_eat_threshold_food,
            max: config.colonist_max_personal_food,
        });
    }
    if config.history_max_commands == 0 {
        errors.push(ConfigError::ZeroHistoryCap);
    }

    errors
}

/// Failure to load a config from JSON.
#[derive(Debug)]
pub enum ConfigLoadError {
    Json(serde_json::Error),
    Invalid(Vec<ConfigError>),
}

impl From<serde_json::Error> for ConfigLoadError {
    fn from(e: serde_json::Error) -> Self {
        ConfigLoadError::Json(e)
    }
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::Json(e) => write!(f, "Config parse error: {}", e),
            ConfigLoadError::Invalid(errors) => {
                write!(f, "Invalid config:")?;
                for e in errors {
                    write!(f, " {};", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigLoadError {}
