//! Attack particle equations of motion
//!
//! Each evaluation picks one of three modes:
//! 1. target held past the attack delay: thrust straight at the target
//! 2. connected: jittered orbit thrust, pulled back home past `max_dist`
//! 3. disconnected with no target near home: flag a rejoin, no thrust
//!
//! Damping is added in every mode and the total acceleration is clamped
//! to `max_accel`.

use std::f32::consts::TAU;

use hashbrown::HashMap;
use rand::{Rng, RngCore};
use rustc_hash::FxBuildHasher;
use smallvec::smallvec;

use crate::config::SwarmConfig;
use crate::game::constants::combat::ATTACK_DELAY;
use crate::game::constants::motion::{CONNECT_DIST, HEADING_JITTER};
use crate::game::events::{FlashEvent, FlashSpeed};
use crate::game::integrator::StateVector;
use crate::game::state::{AttackParticle, Drawable, ParticleHandle, SwarmMember};
use crate::util::vec2::Vec2;

/// State vector layout: [px, py, vx, vy, age, attack_delay]
pub const POS_X: usize = 0;
pub const POS_Y: usize = 1;
pub const VEL_X: usize = 2;
pub const VEL_Y: usize = 3;
pub const AGE: usize = 4;
pub const DELAY: usize = 5;
pub const STATE_LEN: usize = 6;

/// Positions of every live particle, keyed by handle
pub type PositionSnapshot = HashMap<ParticleHandle, Vec2, FxBuildHasher>;

/// Read-only context for one swarm's derivative evaluation
pub struct MotionEnv<'a> {
    pub home: Vec2,
    pub config: &'a SwarmConfig,
    /// Where targets are this tick
    pub positions: &'a PositionSnapshot,
}

/// Result of one derivative evaluation
#[derive(Debug, Clone)]
pub struct Derivative {
    /// [vx, vy, ax, ay, 1, delay_rate]
    pub rates: StateVector,
    /// Particle is back within connect distance and should rejoin the swarm
    pub rejoin: bool,
}

impl Derivative {
    pub fn acceleration(&self) -> Vec2 {
        Vec2::new(self.rates[VEL_X], self.rates[VEL_Y])
    }
}

/// Jittered thrust along the current heading, plus the pull back home when
/// the particle has strayed past `max_dist`
pub fn orbit_acceleration(
    velocity: Vec2,
    to_home: Vec2,
    config: &SwarmConfig,
    rng: &mut dyn RngCore,
) -> Vec2 {
    let heading = velocity
        .angle()
        .unwrap_or_else(|| rng.gen_range(0.0..TAU));
    let heading = heading + rng.gen_range(-HEADING_JITTER..=HEADING_JITTER);
    let mut accel = Vec2::from_polar(heading, config.thruster);

    let (home_dir, dist) = to_home.normalize_with_length();
    if dist > config.max_dist {
        let correction = (dist / config.max_dist).powf(config.correction_power) * config.correction_force;
        accel += home_dir * correction;
    }

    accel
}

/// Acceleration opposing velocity, stronger when fast and far from home
pub fn damping_acceleration(velocity: Vec2, home_dist: f32, config: &SwarmConfig) -> Vec2 {
    let (dir, speed) = velocity.normalize_with_length();
    let magnitude =
        config.damping * speed * home_dist / (config.max_particle_vel * config.max_dist);
    -dir * magnitude
}

impl SwarmMember for AttackParticle {
    fn state_vector(&self) -> StateVector {
        smallvec![
            self.body.position.x,
            self.body.position.y,
            self.body.velocity.x,
            self.body.velocity.y,
            self.body.age,
            self.attack_delay,
        ]
    }

    fn apply_state(&mut self, state: &[f32]) {
        debug_assert_eq!(state.len(), STATE_LEN);
        debug_assert!(state.iter().all(|v| v.is_finite()), "non-finite particle state");
        self.body.position = Vec2::new(state[POS_X], state[POS_Y]);
        self.body.velocity = Vec2::new(state[VEL_X], state[VEL_Y]);
        self.body.age = state[AGE];
        self.attack_delay = state[DELAY];
    }

    fn eval_deriv(&self, state: &[f32], env: &MotionEnv<'_>, rng: &mut dyn RngCore) -> Derivative {
        let position = Vec2::new(state[POS_X], state[POS_Y]);
        let velocity = Vec2::new(state[VEL_X], state[VEL_Y]);
        let to_home = env.home - position;
        let home_dist = to_home.length();

        // A target that left the snapshot counts as no target
        let target_position = self
            .target
            .and_then(|handle| env.positions.get(&handle))
            .copied();

        let mut accel = Vec2::ZERO;
        let mut rejoin = false;
        let delay_rate = if target_position.is_some() { 1.0 } else { 0.0 };

        match target_position {
            Some(target) if state[DELAY] > ATTACK_DELAY => {
                accel += (target - position).normalize() * env.config.attack_thrust;
            }
            _ if self.connected => {
                accel += orbit_acceleration(velocity, to_home, env.config, rng);
            }
            None if home_dist < CONNECT_DIST => {
                rejoin = true;
            }
            _ => {}
        }

        accel += damping_acceleration(velocity, home_dist, env.config);
        let accel = accel.clamp_length(env.config.max_accel);

        Derivative {
            rates: smallvec![velocity.x, velocity.y, accel.x, accel.y, 1.0, delay_rate],
            rejoin,
        }
    }

    fn is_dead(&self) -> bool {
        self.body.is_dead()
    }

    fn drawable(&self) -> Drawable {
        Drawable {
            position: self.body.position,
            color: self.body.color,
            radius: self.body.radius,
            fade: self.body.fade(),
        }
    }

    fn die(&self, config: &SwarmConfig) -> FlashEvent {
        let speed = if self.body.velocity.length() > 0.5 * config.max_particle_vel {
            FlashSpeed::Fast
        } else {
            FlashSpeed::Slow
        };
        FlashEvent {
            position: self.body.position,
            color: self.body.color,
            speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPSILON: f32 = 1e-4;

    fn config() -> SwarmConfig {
        SwarmConfig::default()
    }

    fn particle_at(position: Vec2, velocity: Vec2) -> AttackParticle {
        let mut p = AttackParticle::new(0, position, &config(), Rgb::new(200, 0, 0));
        p.body.velocity = velocity;
        p
    }

    fn eval(p: &AttackParticle, positions: &PositionSnapshot) -> Derivative {
        let config = config();
        let env = MotionEnv {
            home: Vec2::ZERO,
            config: &config,
            positions,
        };
        let mut rng = StdRng::seed_from_u64(7);
        p.eval_deriv(&p.state_vector(), &env, &mut rng)
    }

    #[test]
    fn test_state_vector_round_trip_layout() {
        let mut p = particle_at(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0));
        p.body.age = 5.0;
        p.attack_delay = 6.0;
        let state = p.state_vector();
        assert_eq!(state.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut q = particle_at(Vec2::ZERO, Vec2::ZERO);
        q.apply_state(&state);
        assert_eq!(q.body.position, p.body.position);
        assert_eq!(q.body.velocity, p.body.velocity);
        assert_eq!(q.attack_delay, 6.0);
    }

    #[test]
    fn test_derivative_carries_velocity_and_age_rate() {
        let p = particle_at(Vec2::new(50.0, 0.0), Vec2::new(1.0, -1.0));
        let d = eval(&p, &PositionSnapshot::default());
        assert_eq!(d.rates.len(), STATE_LEN);
        assert_eq!(d.rates[POS_X], 1.0);
        assert_eq!(d.rates[POS_Y], -1.0);
        assert_eq!(d.rates[AGE], 1.0);
        assert_eq!(d.rates[DELAY], 0.0);
    }

    #[test]
    fn test_attack_thrust_points_at_target() {
        let mut p = particle_at(Vec2::new(10.0, 0.0), Vec2::ZERO);
        let enemy = ParticleHandle::new(1, 3);
        p.lock_target(enemy);
        p.attack_delay = ATTACK_DELAY + 1.0;

        let mut positions = PositionSnapshot::default();
        positions.insert(enemy, Vec2::new(10.0, 40.0));

        let d = eval(&p, &positions);
        let accel = d.acceleration();
        // Zero velocity: no damping, pure attack thrust
        assert!(accel.approx_eq(Vec2::new(0.0, config().attack_thrust), EPSILON));
        assert_eq!(d.rates[DELAY], 1.0);
        assert!(!d.rejoin);
    }

    #[test]
    fn test_target_below_delay_gives_no_attack_thrust() {
        // Disconnected, holding a target, delay not yet reached
        let mut p = particle_at(Vec2::new(200.0, 0.0), Vec2::ZERO);
        let enemy = ParticleHandle::new(1, 3);
        p.lock_target(enemy);
        p.attack_delay = ATTACK_DELAY - 1.0;

        let mut positions = PositionSnapshot::default();
        positions.insert(enemy, Vec2::new(200.0, 40.0));

        let d = eval(&p, &positions);
        assert_eq!(d.acceleration(), Vec2::ZERO);
        // Delay keeps counting while the target is held
        assert_eq!(d.rates[DELAY], 1.0);
    }

    #[test]
    fn test_stale_target_is_ignored() {
        let mut p = particle_at(Vec2::new(200.0, 0.0), Vec2::ZERO);
        p.lock_target(ParticleHandle::new(1, 99));
        p.attack_delay = ATTACK_DELAY + 5.0;

        let d = eval(&p, &PositionSnapshot::default());
        assert_eq!(d.acceleration(), Vec2::ZERO);
        assert_eq!(d.rates[DELAY], 0.0);
    }

    #[test]
    fn test_connected_orbit_thrust_magnitude() {
        // Inside max_dist, zero velocity: only the thruster acts
        let p = particle_at(Vec2::new(50.0, 0.0), Vec2::ZERO);
        let d = eval(&p, &PositionSnapshot::default());
        assert!((d.acceleration().length() - config().thruster).abs() < EPSILON);
    }

    #[test]
    fn test_orbit_heading_stays_within_jitter() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = config();
        let velocity = Vec2::new(1.0, 0.0);
        for _ in 0..200 {
            let accel = orbit_acceleration(velocity, Vec2::new(-10.0, 0.0), &config, &mut rng);
            let angle = accel.angle().unwrap();
            assert!(angle.abs() <= HEADING_JITTER + EPSILON);
        }
    }

    #[test]
    fn test_zero_velocity_heading_is_finite() {
        let mut rng = StdRng::seed_from_u64(3);
        let accel = orbit_acceleration(Vec2::ZERO, Vec2::ZERO, &config(), &mut rng);
        assert!(accel.is_finite());
        assert!((accel.length() - config().thruster).abs() < EPSILON);
    }

    #[test]
    fn test_correction_pulls_home_past_max_dist() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(5);
        // Particle at 2 * max_dist on +x, moving tangentially
        let to_home = Vec2::new(-2.0 * config.max_dist, 0.0);
        let accel = orbit_acceleration(Vec2::new(0.0, 1.0), to_home, &config, &mut rng);
        let expected_pull = 2.0f32.powf(config.correction_power) * config.correction_force;
        assert!(accel.x < 0.0);
        assert!((accel.x + expected_pull).abs() <= config.thruster + EPSILON);
    }

    #[test]
    fn test_damping_formula() {
        let config = config();
        let velocity = Vec2::new(2.0, 0.0);
        let damp = damping_acceleration(velocity, 60.0, &config);
        let expected = config.damping * 2.0 * 60.0 / (config.max_particle_vel * config.max_dist);
        assert!(damp.approx_eq(Vec2::new(-expected, 0.0), EPSILON));
        assert_eq!(damping_acceleration(Vec2::ZERO, 60.0, &config), Vec2::ZERO);
    }

    #[test]
    fn test_disconnected_near_home_flags_rejoin_with_damping_only() {
        let velocity = Vec2::new(0.0, 1.5);
        let mut p = particle_at(Vec2::new(20.0, 0.0), velocity);
        p.connected = false;
        p.attacking = true;

        let d = eval(&p, &PositionSnapshot::default());
        assert!(d.rejoin);
        let expected = damping_acceleration(velocity, 20.0, &config());
        assert!(d.acceleration().approx_eq(expected, EPSILON));
    }

    #[test]
    fn test_disconnected_far_from_home_drifts() {
        let mut p = particle_at(Vec2::new(300.0, 0.0), Vec2::ZERO);
        p.connected = false;
        let d = eval(&p, &PositionSnapshot::default());
        assert!(!d.rejoin);
        assert_eq!(d.acceleration(), Vec2::ZERO);
    }

    #[test]
    fn test_acceleration_is_clamped() {
        let mut config = config();
        config.attack_thrust = 50.0;
        let mut p = particle_at(Vec2::ZERO, Vec2::ZERO);
        let enemy = ParticleHandle::new(1, 1);
        p.lock_target(enemy);
        p.attack_delay = ATTACK_DELAY + 1.0;
        let mut positions = PositionSnapshot::default();
        positions.insert(enemy, Vec2::new(5.0, 0.0));

        let env = MotionEnv {
            home: Vec2::new(-500.0, 0.0),
            config: &config,
            positions: &positions,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let d = p.eval_deriv(&p.state_vector(), &env, &mut rng);
        assert!((d.acceleration().length() - config.max_accel).abs() < EPSILON);
    }

    #[test]
    fn test_die_flash_speed() {
        let config = config();
        let slow = particle_at(Vec2::new(4.0, 4.0), Vec2::new(0.1, 0.0));
        let fast = particle_at(Vec2::ZERO, Vec2::new(config.max_particle_vel, 0.0));

        let flash = slow.die(&config);
        assert_eq!(flash.speed, FlashSpeed::Slow);
        assert_eq!(flash.position, Vec2::new(4.0, 4.0));
        assert_eq!(flash.color, Rgb::new(200, 0, 0));
        assert_eq!(fast.die(&config).speed, FlashSpeed::Fast);
    }
}
