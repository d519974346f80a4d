//! Simulation constants
//!
//! Distances are in world units (pixels), time is measured in logic ticks.
//! Per-swarm tunables live in `SwarmConfig`; the values here are fixed for
//! every swarm.

/// Logic/render tick constants
pub mod tick {
    /// Logic tick rate in Hz
    pub const LOGIC_RATE: u32 = 30;
    /// Render tick rate in Hz (independent of logic rate)
    pub const RENDER_RATE: u32 = 60;
    /// Integration step, one logic tick
    pub const DT: f32 = 1.0;
}

/// Motion constants shared by every attack particle
pub mod motion {
    /// Maximum angular jitter (radians, either side) applied to the orbit heading
    pub const HEADING_JITTER: f32 = 0.35;
    /// Distance from home under which a disconnected particle rejoins the swarm
    pub const CONNECT_DIST: f32 = 60.0;
}

/// Combat constants
pub mod combat {
    /// Maximum distance at which an idle particle locks onto an enemy
    pub const ATTACK_DISTANCE: f32 = 90.0;
    /// Ticks a target must be held before attack thrust is applied
    pub const ATTACK_DELAY: f32 = 6.0;
    /// Added to the radius sum when testing for overlap
    pub const COLLISION_EPSILON: f32 = 0.1;
}

/// Spawn defaults
pub mod spawn {
    /// Particles created for each swarm at match start
    pub const INITIAL_POPULATION: usize = 40;
    /// Population cap enforced by replenishment
    pub const POPULATION_CAP: usize = 60;
    /// Ticks between replenishment spawns
    pub const ADD_TIME: u32 = 15;
    /// Hit points of a freshly spawned particle
    pub const LIVES: u32 = 3;
    /// Lifetime bound used for fade shading (ticks)
    pub const MAX_AGE: f32 = 900.0;
    /// Collision and draw radius
    pub const RADIUS: f32 = 3.0;
}

/// Number of teams in a match
pub const TEAM_COUNT: usize = 2;
