use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::constants::{combat, spawn, tick};
use crate::game::state::Rgb;
use crate::util::vec2::Vec2;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-swarm simulation parameters, fixed for the whole match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Inner edge of the spawn band around home
    pub min_dist: f32,
    /// Outer edge of the spawn band; beyond it the correction force kicks in
    pub max_dist: f32,
    /// Damping coefficient (scaled by speed and distance from home)
    pub damping: f32,
    /// Strength of the pull back toward home past `max_dist`
    pub correction_force: f32,
    /// Exponent applied to `dist / max_dist` for the correction pull
    pub correction_power: f32,
    /// Reference particle speed used to normalize damping
    pub max_particle_vel: f32,
    /// Orbit thrust magnitude for connected particles
    pub thruster: f32,
    /// Thrust magnitude toward a locked target
    pub attack_thrust: f32,
    /// Cap on the total acceleration magnitude
    pub max_accel: f32,
    pub radius: f32,
    pub lives: u32,
    pub max_age: f32,
    /// Replenishment never grows the swarm past this
    pub population_cap: usize,
    /// Ticks between replenishment spawns
    pub add_time: u32,
    pub initial_population: usize,
    /// Integration step size
    pub dt: f32,
    /// Distance the home moves per tick when steered
    pub home_speed: f32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            min_dist: 40.0,
            max_dist: 120.0,
            damping: 0.3,
            correction_force: 0.25,
            correction_power: 2.0,
            max_particle_vel: 4.0,
            thruster: 0.12,
            attack_thrust: 0.6,
            max_accel: 1.0,
            radius: spawn::RADIUS,
            lives: spawn::LIVES,
            max_age: spawn::MAX_AGE,
            population_cap: spawn::POPULATION_CAP,
            add_time: spawn::ADD_TIME,
            initial_population: spawn::INITIAL_POPULATION,
            dt: tick::DT,
            home_speed: 2.0,
        }
    }
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("min_dist", self.min_dist),
            ("max_dist", self.max_dist),
            ("damping", self.damping),
            ("correction_force", self.correction_force),
            ("correction_power", self.correction_power),
            ("max_particle_vel", self.max_particle_vel),
            ("thruster", self.thruster),
            ("attack_thrust", self.attack_thrust),
            ("max_accel", self.max_accel),
            ("radius", self.radius),
            ("max_age", self.max_age),
            ("dt", self.dt),
            ("home_speed", self.home_speed),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{} must be finite, got {}", name, value)));
            }
        }

        // Magnitudes that flip the physics when negative
        let non_negative = [
            ("radius", self.radius),
            ("damping", self.damping),
            ("correction_force", self.correction_force),
            ("correction_power", self.correction_power),
            ("thruster", self.thruster),
            ("attack_thrust", self.attack_thrust),
            ("home_speed", self.home_speed),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::Invalid(format!("{} cannot be negative, got {}", name, value)));
            }
        }

        let positive = [
            ("max_dist", self.max_dist),
            ("max_particle_vel", self.max_particle_vel),
            ("max_accel", self.max_accel),
            ("max_age", self.max_age),
            ("dt", self.dt),
        ];
        for (name, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }

        if self.min_dist < 0.0 || self.min_dist > self.max_dist {
            return Err(ConfigError::Invalid(format!(
                "min_dist must be within [0, max_dist], got {} > {}",
                self.min_dist, self.max_dist
            )));
        }
        if self.lives == 0 {
            return Err(ConfigError::Invalid("lives must be at least 1".to_string()));
        }
        if self.population_cap == 0 {
            return Err(ConfigError::Invalid("population_cap must be at least 1".to_string()));
        }
        if self.initial_population > self.population_cap {
            return Err(ConfigError::Invalid(
                "initial_population cannot exceed population_cap".to_string(),
            ));
        }
        if self.radius * 2.0 + combat::COLLISION_EPSILON >= combat::ATTACK_DISTANCE {
            tracing::warn!(
                "radius {} leaves no room between contact and attack distance",
                self.radius
            );
        }
        Ok(())
    }
}

/// Team identity: display name, particle color and starting home
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,
    pub color: Rgb,
    pub home: Vec2,
}

/// Whole-match configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub swarm: SwarmConfig,
    pub teams: [TeamConfig; 2],
    pub logic_hz: u32,
    pub render_hz: u32,
    /// Stop after this many logic ticks (None = until one side is wiped out)
    pub max_ticks: Option<u64>,
    /// Seed for the simulation RNG (None = seeded from entropy)
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            swarm: SwarmConfig::default(),
            teams: [
                TeamConfig {
                    name: "red".to_string(),
                    color: Rgb::new(230, 60, 60),
                    home: Vec2::new(-200.0, 0.0),
                },
                TeamConfig {
                    name: "blue".to_string(),
                    color: Rgb::new(60, 110, 230),
                    home: Vec2::new(200.0, 0.0),
                },
            ],
            logic_hz: tick::LOGIC_RATE,
            render_hz: tick::RENDER_RATE,
            max_ticks: None,
            seed: None,
        }
    }
}

impl MatchConfig {
    /// Load a config from a JSON file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load config from `SWARM_CONFIG` and environment overrides, or use defaults
    pub fn load_or_default() -> Self {
        let mut config = match std::env::var("SWARM_CONFIG") {
            Ok(path) => match Self::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring SWARM_CONFIG: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Some(hz) = env_override::<u32>("LOGIC_HZ", |v| (1..=1000).contains(v), "1-1000") {
            config.logic_hz = hz;
        }
        if let Some(hz) = env_override::<u32>("RENDER_HZ", |v| (1..=1000).contains(v), "1-1000") {
            config.render_hz = hz;
        }
        if let Some(cap) = env_override::<usize>("POPULATION_CAP", |v| *v > 0, "> 0") {
            config.swarm.population_cap = cap;
        }
        if let Some(initial) = env_override::<usize>("INITIAL_POPULATION", |_| true, "a count") {
            config.swarm.initial_population = initial;
        }
        if let Some(ticks) = env_override::<u64>("MATCH_TICKS", |v| *v > 0, "> 0") {
            config.max_ticks = Some(ticks);
        }
        if let Some(seed) = env_override::<u64>("SWARM_SEED", |_| true, "an integer") {
            config.seed = Some(seed);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logic_hz == 0 {
            return Err(ConfigError::Invalid("logic_hz must be at least 1".to_string()));
        }
        if self.render_hz == 0 {
            return Err(ConfigError::Invalid("render_hz must be at least 1".to_string()));
        }
        self.swarm.validate()
    }
}

/// Parse an environment variable, warning and returning None when it is
/// malformed or fails `accept`
fn env_override<T: FromStr>(name: &str, accept: impl Fn(&T) -> bool, expected: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(parsed) if accept(&parsed) => Some(parsed),
        Ok(_) => {
            tracing::warn!("{} must be {}, using default", name, expected);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}
