//! One player's swarm of attack particles
//!
//! Owns its particles by key, spawns them around a movable home, keeps the
//! population topped up on a fixed cadence and steps every particle with a
//! trapezoidal integrator.

use std::f32::consts::TAU;

use hashbrown::{HashMap, HashSet};
use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxBuildHasher;

use crate::config::{SwarmConfig, TeamConfig};
use crate::game::events::EffectSink;
use crate::game::integrator::{trapezoidal_step, Integrable, StateMap};
use crate::game::state::{AttackParticle, Drawable, ParticleHandle, ParticleId, Rgb, SwarmMember, TeamId};
use crate::game::systems::collision::Body;
use crate::game::systems::motion::{MotionEnv, PositionSnapshot};
use crate::util::vec2::Vec2;

/// Particles of one swarm, keyed by id
pub type ParticleMap = HashMap<ParticleId, AttackParticle, FxBuildHasher>;

/// A player's swarm
pub struct PlayerSystem {
    team: TeamId,
    name: String,
    color: Rgb,
    home: Vec2,
    /// Point the home is travelling toward, if any
    destination: Option<Vec2>,
    /// Direction the home is steered in this tick
    steering: Vec2,
    config: SwarmConfig,
    particles: ParticleMap,
    /// Last key handed out; keys are never reused
    last_index: ParticleId,
    /// Ticks since the last replenishment spawn
    add_counter: u32,
    rng: StdRng,
}

impl PlayerSystem {
    /// Create a swarm and spawn its initial population. `config` must have
    /// passed `SwarmConfig::validate` (see `Battle::new`).
    pub(crate) fn new(team: TeamId, team_config: &TeamConfig, config: SwarmConfig, rng: StdRng) -> Self {
        debug_assert!(config.validate().is_ok(), "unvalidated swarm config");
        let mut system = Self {
            team,
            name: team_config.name.clone(),
            color: team_config.color,
            home: team_config.home,
            destination: None,
            steering: Vec2::ZERO,
            config,
            particles: ParticleMap::default(),
            last_index: 0,
            add_counter: 0,
            rng,
        };
        system.add_particles(system.config.initial_population);
        system
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn home(&self) -> Vec2 {
        self.home
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &ParticleMap {
        &self.particles
    }

    pub fn get(&self, id: ParticleId) -> Option<&AttackParticle> {
        self.particles.get(&id)
    }

    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut AttackParticle> {
        self.particles.get_mut(&id)
    }

    /// Spawn `n` particles at random angles within the spawn band around
    /// home. Returns the new keys.
    pub fn add_particles(&mut self, n: usize) -> Vec<ParticleId> {
        let mut added = Vec::with_capacity(n);
        for _ in 0..n {
            let angle = self.rng.gen_range(0.0..TAU);
            let dist = self
                .rng
                .gen_range(self.config.min_dist..=self.config.max_dist);
            let position = self.home + Vec2::from_polar(angle, dist);

            self.last_index += 1;
            let id = self.last_index;
            let particle = AttackParticle::new(self.team, position, &self.config, self.color);
            let previous = self.particles.insert(id, particle);
            debug_assert!(previous.is_none(), "particle key {} reused", id);
            added.push(id);
        }
        if !added.is_empty() {
            tracing::debug!("{}: spawned {} particle(s), population {}", self.name, n, self.len());
        }
        added
    }

    /// Count toward the next spawn; spawn one particle when the cadence is
    /// reached and the swarm is below its cap. Returns true on spawn.
    pub fn replenish_particles(&mut self) -> bool {
        if self.add_counter < self.config.add_time {
            self.add_counter += 1;
        }
        if self.add_counter >= self.config.add_time && self.len() < self.config.population_cap {
            self.add_counter = 0;
            self.add_particles(1);
            return true;
        }
        false
    }

    /// Steer the home in `direction` (any length; zero stops) each tick
    pub fn steer(&mut self, direction: Vec2) {
        self.steering = direction;
        if direction != Vec2::ZERO {
            self.destination = None;
        }
    }

    /// Move the home toward `position` until it arrives
    pub fn set_destination(&mut self, position: Vec2) {
        self.destination = Some(position);
        self.steering = Vec2::ZERO;
    }

    /// Apply this tick's home movement
    fn update_home(&mut self) {
        let speed = self.config.home_speed;
        if let Some(destination) = self.destination {
            let (dir, dist) = (destination - self.home).normalize_with_length();
            if dist <= speed {
                self.home = destination;
                self.destination = None;
            } else {
                self.home += dir * speed;
            }
        } else {
            self.home += self.steering.normalize() * speed;
        }
    }

    /// Per-tick logic: move home, replenish, then one trapezoidal step.
    /// `positions` is where every live particle (either swarm) stands.
    /// Returns true when a particle was spawned.
    pub fn do_logic(&mut self, positions: &PositionSnapshot) -> bool {
        self.update_home();
        let spawned = self.replenish_particles();
        self.integrate(positions);
        spawned
    }

    /// One trapezoidal step over all particles' combined state
    pub fn integrate(&mut self, positions: &PositionSnapshot) {
        let dt = self.config.dt;
        let mut rejoined = HashSet::new();
        {
            let mut step = SwarmStep {
                particles: &mut self.particles,
                env: MotionEnv {
                    home: self.home,
                    config: &self.config,
                    positions,
                },
                rng: &mut self.rng,
                rejoined: &mut rejoined,
            };
            trapezoidal_step(&mut step, dt);
        }

        for id in rejoined {
            if let Some(particle) = self.particles.get_mut(&id) {
                particle.rejoin();
            }
        }
    }

    /// Remove dead particles, emitting a flash for each. Returns how many died.
    pub fn remove_dead<S: EffectSink + ?Sized>(&mut self, effects: &mut S) -> usize {
        let config = &self.config;
        let before = self.particles.len();
        self.particles.retain(|_, particle| {
            if particle.is_dead() {
                effects.flash(particle.die(config));
                false
            } else {
                true
            }
        });
        before - self.particles.len()
    }

    /// Collision bodies for every live particle
    pub fn bodies(&self) -> impl Iterator<Item = Body> + '_ {
        self.particles
            .iter()
            .filter(|(_, p)| !p.is_dead())
            .map(move |(id, p)| Body {
                handle: ParticleHandle::new(self.team, *id),
                position: p.body.position,
                velocity: p.body.velocity,
                radius: p.body.radius,
                lives: p.body.lives,
            })
    }

    /// Write every live particle's position into `snapshot`
    pub fn snapshot_positions(&self, snapshot: &mut PositionSnapshot) {
        snapshot.extend(
            self.particles
                .iter()
                .filter(|(_, p)| !p.is_dead())
                .map(|(id, p)| (ParticleHandle::new(self.team, *id), p.body.position)),
        );
    }

    /// Drawable attributes of every live particle
    pub fn drawables(&self) -> impl Iterator<Item = Drawable> + '_ {
        self.particles
            .values()
            .filter(|p| !p.is_dead())
            .map(|p| p.drawable())
    }
}

/// Integrator view of a swarm for one step
struct SwarmStep<'a> {
    particles: &'a mut ParticleMap,
    env: MotionEnv<'a>,
    rng: &'a mut StdRng,
    rejoined: &'a mut HashSet<ParticleId>,
}

impl Integrable for SwarmStep<'_> {
    type Key = ParticleId;

    fn get_state(&self) -> StateMap<ParticleId> {
        self.particles
            .iter()
            .map(|(id, p)| (*id, p.state_vector()))
            .collect()
    }

    fn set_state(&mut self, state: StateMap<ParticleId>) {
        for (id, values) in state {
            if let Some(particle) = self.particles.get_mut(&id) {
                particle.apply_state(&values);
            }
        }
    }

    fn eval_deriv(&mut self, state: &StateMap<ParticleId>) -> StateMap<ParticleId> {
        let mut deriv = StateMap::with_capacity_and_hasher(state.len(), FxBuildHasher);
        for (id, values) in state {
            let Some(particle) = self.particles.get(id) else {
                continue;
            };
            let d = particle.eval_deriv(values, &self.env, &mut *self.rng);
            if d.rejoin {
                self.rejoined.insert(*id);
            }
            deriv.insert(*id, d.rates);
        }
        deriv
    }
}
