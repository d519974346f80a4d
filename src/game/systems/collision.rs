//! Collision scan across both swarms
//!
//! Every live particle is tested against every other exactly once
//! (incremental triangular scan, no spatial partitioning). Each pair's
//! distance is recorded for target acquisition; overlapping pairs are
//! rewound along their own velocities and reflected about the contact
//! normal. Enemy contacts cost both particles one life.

use rustc_hash::FxHashMap;

use crate::game::constants::combat::COLLISION_EPSILON;
use crate::game::state::{ParticleHandle, TeamId};
use crate::game::swarm::PlayerSystem;
use crate::util::vec2::Vec2;

/// Distance to another particle recorded during the scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub handle: ParticleHandle,
    pub distance: f32,
}

/// Flat copy of a particle's collision-relevant state
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub handle: ParticleHandle,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub lives: u32,
}

impl Body {
    pub fn team(&self) -> TeamId {
        self.handle.team
    }
}

/// Counters from one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub pairs: usize,
    pub collisions: usize,
    /// Collisions between enemies (each costs two lives)
    pub hits: usize,
}

/// Per-tick collision pass; owns the neighbor buffers target acquisition reads
#[derive(Debug, Default)]
pub struct CollisionEngine {
    /// Bodies already scanned this tick
    scanned: Vec<Body>,
    /// Neighbor distances per particle, sorted ascending after each scan
    neighbors: FxHashMap<ParticleHandle, Vec<Neighbor>>,
}

impl CollisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every live particle of every swarm, resolve overlaps and write
    /// positions, velocities and lives back. `dt` bounds the rewind.
    pub fn scan(&mut self, systems: &mut [PlayerSystem], dt: f32) -> ScanStats {
        let bodies: Vec<Body> = systems
            .iter()
            .flat_map(|system| system.bodies())
            .collect();

        let stats = self.scan_bodies(bodies, dt);

        for body in &self.scanned {
            let Some(system) = systems.get_mut(body.team()) else {
                continue;
            };
            if let Some(particle) = system.get_mut(body.handle.id) {
                debug_assert!(body.position.is_finite() && body.velocity.is_finite());
                debug_assert!(body.lives <= particle.body.lives, "lives increased in collision");
                particle.body.position = body.position;
                particle.body.velocity = body.velocity;
                particle.body.lives = body.lives;
            }
        }

        stats
    }

    /// Scan a flat list of bodies; results stay in `scanned()` and `neighbors()`
    pub fn scan_bodies(&mut self, bodies: impl IntoIterator<Item = Body>, dt: f32) -> ScanStats {
        // Drop buffers of particles absent from the last scan, empty the rest
        self.scanned.clear();
        self.neighbors.retain(|_, list| {
            let seen = !list.is_empty();
            list.clear();
            seen
        });

        let mut stats = ScanStats::default();

        for mut body in bodies {
            for other in self.scanned.iter_mut() {
                let distance = body.position.distance_to(other.position);
                stats.pairs += 1;

                self.neighbors.entry(body.handle).or_default().push(Neighbor {
                    handle: other.handle,
                    distance,
                });
                self.neighbors.entry(other.handle).or_default().push(Neighbor {
                    handle: body.handle,
                    distance,
                });

                if overlaps(&body, other, distance) {
                    stats.collisions += 1;
                    if resolve_collision(&mut body, other, dt) {
                        stats.hits += 1;
                    }
                }
            }
            self.scanned.push(body);
        }

        for list in self.neighbors.values_mut() {
            list.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        }

        stats
    }

    /// Bodies as they stand after the last scan
    pub fn scanned(&self) -> &[Body] {
        &self.scanned
    }

    /// Neighbors of `handle` from the last scan, nearest first
    pub fn neighbors(&self, handle: ParticleHandle) -> &[Neighbor] {
        self.neighbors.get(&handle).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Overlap predicate: center distance below radius sum plus epsilon
pub fn overlaps(a: &Body, b: &Body, distance: f32) -> bool {
    distance < a.radius + b.radius + COLLISION_EPSILON
}

/// Rewind both bodies out of overlap and reflect their velocities about the
/// contact normal. The rewind never exceeds one integration step `dt`.
/// Returns true (and costs each a life) for enemy contacts.
pub fn resolve_collision(a: &mut Body, b: &mut Body, dt: f32) -> bool {
    let relative = a.velocity - b.velocity;
    let (normal, distance) = (b.position - a.position).normalize_with_length();
    let normal = if distance > 0.0 {
        normal
    } else {
        // Coincident centers: fall back to the approach direction
        let approach = relative.normalize();
        if approach == Vec2::ZERO {
            Vec2::RIGHT
        } else {
            approach
        }
    };

    let closing_speed = relative.length();
    let rewind_time = if closing_speed > 0.0 {
        ((a.radius + b.radius - distance).abs() / closing_speed).min(dt)
    } else {
        0.0
    };

    a.position -= a.velocity * rewind_time;
    b.position -= b.velocity * rewind_time;
    a.velocity = a.velocity.reflect(normal);
    b.velocity = b.velocity.reflect(normal);

    if a.team() != b.team() {
        a.lives = a.lives.saturating_sub(1);
        b.lives = b.lives.saturating_sub(1);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::tick::DT;

    const EPSILON: f32 = 1e-5;

    fn body(team: TeamId, id: u32, position: Vec2, velocity: Vec2) -> Body {
        Body {
            handle: ParticleHandle::new(team, id),
            position,
            velocity,
            radius: 2.0,
            lives: 3,
        }
    }

    #[test]
    fn test_same_team_head_on_collision() {
        let mut a = body(0, 1, Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        let mut b = body(0, 2, Vec2::new(3.0, 0.0), Vec2::new(-1.0, 0.0));

        let distance = a.position.distance_to(b.position);
        assert!(overlaps(&a, &b, distance));
        assert!(!resolve_collision(&mut a, &mut b, DT));

        assert_eq!(a.lives, 3);
        assert_eq!(b.lives, 3);
        assert!(a.velocity.approx_eq(Vec2::new(-1.0, 0.0), EPSILON));
        assert!(b.velocity.approx_eq(Vec2::new(1.0, 0.0), EPSILON));
        // Rewound by half a tick each: just touching again
        assert!(a.position.approx_eq(Vec2::new(-0.5, 0.0), EPSILON));
        assert!(b.position.approx_eq(Vec2::new(3.5, 0.0), EPSILON));
    }

    #[test]
    fn test_rewind_bounded_by_step_size() {
        // Overlap 3.5 at closing speed 2 would need 1.75 ticks of rewind
        let mut a = body(0, 1, Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        let mut b = body(0, 2, Vec2::new(0.5, 0.0), Vec2::new(-1.0, 0.0));
        resolve_collision(&mut a, &mut b, 0.5);
        assert!(a.position.approx_eq(Vec2::new(-0.5, 0.0), EPSILON));
        assert!(b.position.approx_eq(Vec2::new(1.0, 0.0), EPSILON));

        let mut a = body(0, 1, Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        let mut b = body(0, 2, Vec2::new(0.5, 0.0), Vec2::new(-1.0, 0.0));
        resolve_collision(&mut a, &mut b, 2.0);
        assert!(a.position.approx_eq(Vec2::new(-1.75, 0.0), EPSILON));
        assert!(b.position.approx_eq(Vec2::new(2.25, 0.0), EPSILON));
    }

    #[test]
    fn test_enemy_collision_costs_one_life_each() {
        let mut a = body(0, 1, Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.2));
        let mut b = body(1, 1, Vec2::new(1.0, 1.0), Vec2::new(-0.3, 0.0));
        assert!(resolve_collision(&mut a, &mut b, DT));
        assert_eq!(a.lives, 2);
        assert_eq!(b.lives, 2);
    }

    #[test]
    fn test_zero_relative_velocity_skips_rewind() {
        let mut a = body(0, 1, Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let mut b = body(1, 1, Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0));
        resolve_collision(&mut a, &mut b, DT);
        assert!(a.position.is_finite() && b.position.is_finite());
        assert!(a.velocity.is_finite() && b.velocity.is_finite());
        assert_eq!(a.position, Vec2::new(0.0, 0.0));
        assert_eq!(b.position, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_stationary_coincident_bodies_stay_finite() {
        let mut a = body(0, 1, Vec2::new(5.0, 5.0), Vec2::ZERO);
        let mut b = body(1, 1, Vec2::new(5.0, 5.0), Vec2::ZERO);
        assert!(resolve_collision(&mut a, &mut b, DT));
        assert!(a.position.is_finite() && a.velocity.is_finite());
        assert!(b.position.is_finite() && b.velocity.is_finite());
    }

    #[test]
    fn test_dead_body_lives_do_not_underflow() {
        let mut a = body(0, 1, Vec2::ZERO, Vec2::RIGHT);
        let mut b = body(1, 1, Vec2::new(1.0, 0.0), Vec2::ZERO);
        a.lives = 0;
        resolve_collision(&mut a, &mut b, DT);
        assert_eq!(a.lives, 0);
        assert_eq!(b.lives, 2);
    }

    #[test]
    fn test_scan_records_each_pair_once_for_both_sides() {
        let mut engine = CollisionEngine::new();
        let bodies = vec![
            body(0, 1, Vec2::new(0.0, 0.0), Vec2::ZERO),
            body(0, 2, Vec2::new(50.0, 0.0), Vec2::ZERO),
            body(1, 1, Vec2::new(20.0, 0.0), Vec2::ZERO),
        ];
        let stats = engine.scan_bodies(bodies, DT);

        assert_eq!(stats.pairs, 3);
        assert_eq!(stats.collisions, 0);

        let first = engine.neighbors(ParticleHandle::new(0, 1));
        assert_eq!(first.len(), 2);
        // Sorted nearest first
        assert_eq!(first[0].handle, ParticleHandle::new(1, 1));
        assert!((first[0].distance - 20.0).abs() < EPSILON);
        assert!((first[1].distance - 50.0).abs() < EPSILON);

        let enemy = engine.neighbors(ParticleHandle::new(1, 1));
        assert_eq!(enemy.len(), 2);
        assert!((enemy[0].distance - 20.0).abs() < EPSILON);
        assert!((enemy[1].distance - 30.0).abs() < EPSILON);
    }

    #[test]
    fn test_scan_clears_previous_tick() {
        let mut engine = CollisionEngine::new();
        let first = vec![
            body(0, 1, Vec2::ZERO, Vec2::ZERO),
            body(1, 1, Vec2::new(10.0, 0.0), Vec2::ZERO),
        ];
        engine.scan_bodies(first, DT);
        engine.scan_bodies(vec![body(0, 1, Vec2::ZERO, Vec2::ZERO)], DT);

        assert!(engine.neighbors(ParticleHandle::new(0, 1)).is_empty());
        assert!(engine.neighbors(ParticleHandle::new(1, 1)).is_empty());
        assert_eq!(engine.scanned().len(), 1);
    }

    #[test]
    fn test_scan_applies_enemy_damage() {
        let mut engine = CollisionEngine::new();
        let bodies = vec![
            body(0, 1, Vec2::ZERO, Vec2::new(1.0, 0.0)),
            body(1, 1, Vec2::new(3.0, 0.0), Vec2::new(-1.0, 0.0)),
            body(1, 2, Vec2::new(100.0, 0.0), Vec2::ZERO),
        ];
        let stats = engine.scan_bodies(bodies, DT);

        assert_eq!(stats.collisions, 1);
        assert_eq!(stats.hits, 1);
        let lives: Vec<u32> = engine.scanned().iter().map(|b| b.lives).collect();
        assert_eq!(lives, vec![2, 2, 3]);
    }
}
