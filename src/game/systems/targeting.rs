//! Target acquisition
//!
//! Runs once per tick after the collision scan. Each particle keeps a live
//! target; otherwise it walks its neighbors nearest first and locks onto the
//! first live enemy that is either already attacking (when it is attacking
//! itself) or inside `ATTACK_DISTANCE`. With nothing to lock onto it either
//! falls back to formation or just lets the stale target go.
//!
//! Decisions for both swarms are computed against the same snapshot and only
//! then applied, so neither swarm sees the other's fresh decisions.

#[cfg(feature = "parallel_targeting")]
use rayon::prelude::*;

use crate::game::constants::combat::ATTACK_DISTANCE;
use crate::game::state::{AttackParticle, ParticleHandle};
use crate::game::swarm::PlayerSystem;
use crate::game::systems::collision::{CollisionEngine, Neighbor};

/// What a particle does with its target this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetDecision {
    /// Current target is still alive
    Keep,
    /// Lock onto a new enemy
    Lock(ParticleHandle),
    /// No enemy worth chasing and home is further than the nearest enemy:
    /// return to formation
    Disengage,
    /// Target gone, nothing new; just forget it
    Release,
}

/// What targeting needs to know about a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateStatus {
    pub alive: bool,
    pub attacking: bool,
}

/// Counters from one acquisition pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetingStats {
    pub locks: usize,
    pub disengaged: usize,
    pub released: usize,
}

/// Decide one particle's target. `neighbors` must be sorted nearest first.
pub fn decide<F>(
    particle: &AttackParticle,
    home_distance: f32,
    neighbors: &[Neighbor],
    lookup: F,
) -> TargetDecision
where
    F: Fn(ParticleHandle) -> Option<CandidateStatus>,
{
    let target_alive = particle
        .target
        .and_then(&lookup)
        .is_some_and(|status| status.alive);
    if target_alive {
        return TargetDecision::Keep;
    }

    let mut nearest_enemy: Option<f32> = None;

    for neighbor in neighbors {
        if neighbor.handle.team == particle.team {
            continue;
        }
        let Some(status) = lookup(neighbor.handle) else {
            continue;
        };
        if !status.alive {
            continue;
        }
        nearest_enemy.get_or_insert(neighbor.distance);

        if particle.attacking && status.attacking {
            return TargetDecision::Lock(neighbor.handle);
        }
        if neighbor.distance < ATTACK_DISTANCE {
            return TargetDecision::Lock(neighbor.handle);
        }
    }

    match nearest_enemy {
        Some(distance) if home_distance > distance => TargetDecision::Disengage,
        None => TargetDecision::Disengage,
        Some(_) if particle.target.is_some() => TargetDecision::Release,
        Some(_) => TargetDecision::Keep,
    }
}

/// Run target acquisition for every particle of every swarm
pub fn acquire_targets(systems: &mut [PlayerSystem], engine: &CollisionEngine) -> TargetingStats {
    let decisions = collect_decisions(systems, engine);
    let mut stats = TargetingStats::default();

    for (handle, decision) in decisions {
        let Some(particle) = systems
            .get_mut(handle.team)
            .and_then(|system| system.get_mut(handle.id))
        else {
            continue;
        };

        match decision {
            TargetDecision::Keep => {}
            TargetDecision::Lock(target) => {
                tracing::trace!("{:?} locked onto {:?}", handle, target);
                particle.lock_target(target);
                stats.locks += 1;
            }
            TargetDecision::Disengage => {
                if particle.attacking || !particle.connected || particle.target.is_some() {
                    stats.disengaged += 1;
                }
                particle.disengage();
            }
            TargetDecision::Release => {
                particle.target = None;
                stats.released += 1;
            }
        }
    }

    stats
}

fn status_of(systems: &[PlayerSystem], handle: ParticleHandle) -> Option<CandidateStatus> {
    let particle = systems.get(handle.team)?.get(handle.id)?;
    Some(CandidateStatus {
        alive: !particle.body.is_dead(),
        attacking: particle.attacking,
    })
}

fn decide_in(
    systems: &[PlayerSystem],
    system: &PlayerSystem,
    engine: &CollisionEngine,
    handle: ParticleHandle,
    particle: &AttackParticle,
) -> Option<(ParticleHandle, TargetDecision)> {
    // Killed this tick, removed at the next cleanup: never locks, only lets go
    if particle.body.is_dead() {
        return particle
            .target
            .is_some()
            .then_some((handle, TargetDecision::Release));
    }
    let home_distance = particle.body.position.distance_to(system.home());
    let decision = decide(particle, home_distance, engine.neighbors(handle), |candidate| {
        status_of(systems, candidate)
    });
    (decision != TargetDecision::Keep).then_some((handle, decision))
}

#[cfg(feature = "parallel_targeting")]
fn collect_decisions(
    systems: &[PlayerSystem],
    engine: &CollisionEngine,
) -> Vec<(ParticleHandle, TargetDecision)> {
    systems
        .par_iter()
        .flat_map(|system| {
            let team = system.team();
            system.particles().par_iter().filter_map(move |(id, particle)| {
                decide_in(systems, system, engine, ParticleHandle::new(team, *id), particle)
            })
        })
        .collect()
}

#[cfg(not(feature = "parallel_targeting"))]
fn collect_decisions(
    systems: &[PlayerSystem],
    engine: &CollisionEngine,
) -> Vec<(ParticleHandle, TargetDecision)> {
    systems
        .iter()
        .flat_map(|system| {
            let team = system.team();
            system.particles().iter().filter_map(move |(id, particle)| {
                decide_in(systems, system, engine, ParticleHandle::new(team, *id), particle)
            })
        })
        .collect()
}
