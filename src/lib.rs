//! Swarm Duel simulation core
//!
//! Two players each command a swarm of attack particles that orbit a home,
//! pick fights with nearby enemies and resolve them through collisions.
//!
//! # Features
//!
//! - `parallel_targeting` - Compute target acquisition decisions on the rayon pool (enabled by default)

pub mod config;
pub mod game;
pub mod util;

pub use config::{ConfigError, MatchConfig, SwarmConfig};
pub use game::battle::{Battle, TickReport};
pub use game::events::{EffectSink, FlashEvent};
pub use game::render::{Frame, FrameBuffer};
