//! Two-swarm battle: the simulation context passed through every tick
//!
//! Holds both swarms, the collision engine and the effects sink. One logic
//! tick runs, in this exact order:
//! 1. dead-particle cleanup (flash events)
//! 2. collision scan, resolution and neighbor recording
//! 3. target acquisition from this tick's neighbors
//! 4. per-swarm logic: home movement, replenishment, integration

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, MatchConfig};
use crate::game::constants::TEAM_COUNT;
use crate::game::events::EffectSink;
use crate::game::render::Frame;
use crate::game::state::{Drawable, TeamId};
use crate::game::swarm::PlayerSystem;
use crate::game::systems::collision::{CollisionEngine, ScanStats};
use crate::game::systems::motion::PositionSnapshot;
use crate::game::systems::targeting::{self, TargetingStats};
use crate::util::vec2::Vec2;

/// What happened during one logic tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Particles removed in cleanup
    pub deaths: usize,
    pub collisions: ScanStats,
    pub targeting: TargetingStats,
    /// Particles spawned by replenishment
    pub spawned: usize,
}

pub struct Battle<S: EffectSink> {
    systems: [PlayerSystem; TEAM_COUNT],
    collisions: CollisionEngine,
    effects: S,
    tick: u64,
    /// Particles lost per team
    losses: [usize; TEAM_COUNT],
    /// Reused every tick for the integration snapshot
    positions: PositionSnapshot,
}

impl<S: EffectSink> Battle<S> {
    /// Validate the config and create both swarms with their initial population
    pub fn new(config: &MatchConfig, effects: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut seeder = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let systems = std::array::from_fn(|team| {
            PlayerSystem::new(
                team,
                &config.teams[team],
                config.swarm.clone(),
                StdRng::seed_from_u64(seeder.gen()),
            )
        });

        Ok(Self {
            systems,
            collisions: CollisionEngine::new(),
            effects,
            tick: 0,
            losses: [0; TEAM_COUNT],
            positions: PositionSnapshot::default(),
        })
    }

    /// Run one logic tick
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        for system in &mut self.systems {
            let died = system.remove_dead(&mut self.effects);
            self.losses[system.team()] += died;
            report.deaths += died;
        }

        let dt = self.systems[0].config().dt;
        report.collisions = self.collisions.scan(&mut self.systems, dt);

        report.targeting = targeting::acquire_targets(&mut self.systems, &self.collisions);

        self.positions.clear();
        for system in &self.systems {
            system.snapshot_positions(&mut self.positions);
        }
        for system in &mut self.systems {
            if system.do_logic(&self.positions) {
                report.spawned += 1;
            }
        }

        if report.deaths > 0 || report.targeting.disengaged > 0 {
            tracing::debug!(
                "tick {}: {} died, {} hits, {} locks, {} disengaged",
                self.tick,
                report.deaths,
                report.collisions.hits,
                report.targeting.locks,
                report.targeting.disengaged
            );
        }

        report
    }

    /// Steer a team's home (direction intent from input)
    pub fn steer(&mut self, team: TeamId, direction: Vec2) {
        if let Some(system) = self.systems.get_mut(team) {
            system.steer(direction);
        }
    }

    /// Send a team's home toward a point
    pub fn set_destination(&mut self, team: TeamId, position: Vec2) {
        if let Some(system) = self.systems.get_mut(team) {
            system.set_destination(position);
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn systems(&self) -> &[PlayerSystem; TEAM_COUNT] {
        &self.systems
    }

    pub fn system(&self, team: TeamId) -> Option<&PlayerSystem> {
        self.systems.get(team)
    }

    pub fn system_mut(&mut self, team: TeamId) -> Option<&mut PlayerSystem> {
        self.systems.get_mut(team)
    }

    pub fn effects(&self) -> &S {
        &self.effects
    }

    /// Particles lost by `team` so far
    pub fn losses(&self, team: TeamId) -> usize {
        self.losses.get(team).copied().unwrap_or(0)
    }

    pub fn populations(&self) -> [usize; TEAM_COUNT] {
        std::array::from_fn(|team| self.systems[team].len())
    }

    /// First team whose swarm has been wiped out
    pub fn eliminated(&self) -> Option<TeamId> {
        self.systems.iter().position(PlayerSystem::is_empty)
    }

    /// Team with the larger population, None on a tie
    pub fn leader(&self) -> Option<TeamId> {
        let [a, b] = self.populations();
        match a.cmp(&b) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Drawables of every live particle in both swarms
    pub fn drawables(&self) -> impl Iterator<Item = Drawable> + '_ {
        self.systems.iter().flat_map(PlayerSystem::drawables)
    }

    /// Fill `frame` in place, reusing its drawable buffer
    pub fn fill_frame(&self, frame: &mut Frame) {
        frame.tick = self.tick;
        frame.drawables.clear();
        frame.drawables.extend(self.drawables());
        frame.homes = std::array::from_fn(|team| self.systems[team].home());
        frame.populations = self.populations();
    }

    pub fn frame(&self) -> Frame {
        let mut frame = Frame::default();
        self.fill_frame(&mut frame);
        frame
    }
}
