//! Particle entities and the capability trait the swarm drives them through
//!
//! A `PlayerSystem` owns its particles by key; anything pointing across
//! swarms (targets, neighbor records) holds a `ParticleHandle` and looks the
//! particle up again before use.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::SwarmConfig;
use crate::game::events::FlashEvent;
use crate::game::integrator::StateVector;
use crate::game::systems::motion::{Derivative, MotionEnv};
use crate::util::vec2::Vec2;

/// Key of a particle within its owning swarm (never reused)
pub type ParticleId = u32;

/// Team index, equal to the owning swarm's slot in the battle
pub type TeamId = usize;

/// Weak reference to a particle in any swarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleHandle {
    pub team: TeamId,
    pub id: ParticleId,
}

impl ParticleHandle {
    pub fn new(team: TeamId, id: ParticleId) -> Self {
        Self { team, id }
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Base particle: kinematics, age and hit points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Elapsed ticks since spawn
    pub age: f32,
    /// Lifetime bound used for fade shading
    pub max_age: f32,
    /// Remaining hit points
    pub lives: u32,
    pub radius: f32,
    pub color: Rgb,
}

impl Particle {
    pub fn new(position: Vec2, config: &SwarmConfig, color: Rgb) -> Self {
        debug_assert!(config.radius >= 0.0, "negative particle radius");
        Self {
            position,
            velocity: Vec2::ZERO,
            age: 0.0,
            max_age: config.max_age,
            lives: config.lives,
            radius: config.radius,
            color,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.lives == 0
    }

    /// Remove one hit point
    pub fn hit(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    /// Age relative to `max_age`, clamped to [0, 1]
    pub fn fade(&self) -> f32 {
        if self.max_age > 0.0 {
            (self.age / self.max_age).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Combat particle owned by one team's swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackParticle {
    pub body: Particle,
    pub team: TeamId,
    /// Current adversary in the opposing swarm; re-validated every use
    pub target: Option<ParticleHandle>,
    /// Flying in formation around home (as opposed to independent/attacking)
    pub connected: bool,
    pub attacking: bool,
    /// Ticks since the current target was acquired
    pub attack_delay: f32,
}

impl AttackParticle {
    pub fn new(team: TeamId, position: Vec2, config: &SwarmConfig, color: Rgb) -> Self {
        Self {
            body: Particle::new(position, config, color),
            team,
            target: None,
            connected: true,
            attacking: false,
            attack_delay: 0.0,
        }
    }

    /// Lock onto an enemy and leave the formation
    pub fn lock_target(&mut self, target: ParticleHandle) {
        debug_assert_ne!(target.team, self.team, "locking onto a teammate");
        self.target = Some(target);
        self.attacking = true;
        self.connected = false;
        self.attack_delay = 0.0;
    }

    /// Drop any target and return to formation
    pub fn disengage(&mut self) {
        self.target = None;
        self.attacking = false;
        self.connected = true;
    }

    /// Rejoin the swarm after drifting back within connect distance
    pub fn rejoin(&mut self) {
        self.connected = true;
        self.attacking = false;
    }
}

/// Drawable attributes exposed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub position: Vec2,
    pub color: Rgb,
    pub radius: f32,
    /// age / max_age, for fade shading
    pub fade: f32,
}

/// Capability interface every swarm member provides
pub trait SwarmMember {
    /// Flattened integrator state
    fn state_vector(&self) -> StateVector;

    /// Write integrated state back into the entity
    fn apply_state(&mut self, state: &[f32]);

    /// Time derivative of `state` (same layout as `state_vector`)
    fn eval_deriv(&self, state: &[f32], env: &MotionEnv<'_>, rng: &mut dyn RngCore) -> Derivative;

    fn is_dead(&self) -> bool;

    fn drawable(&self) -> Drawable;

    /// Final effect emitted when the member is removed from its swarm
    fn die(&self, config: &SwarmConfig) -> FlashEvent;
}
