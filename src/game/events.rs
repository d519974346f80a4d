//! Effect events emitted by the simulation
//!
//! The core only emits; pooled display objects live with the collaborator.

use serde::{Deserialize, Serialize};

use crate::game::state::Rgb;
use crate::util::vec2::Vec2;

/// Flash animation speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashSpeed {
    Slow,
    Fast,
}

/// A particle died at `position`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlashEvent {
    pub position: Vec2,
    pub color: Rgb,
    pub speed: FlashSpeed,
}

/// Receiver of effect events
pub trait EffectSink {
    fn flash(&mut self, event: FlashEvent);
}

/// Collect events in memory (tests, single-threaded hosts)
impl EffectSink for Vec<FlashEvent> {
    fn flash(&mut self, event: FlashEvent) {
        self.push(event);
    }
}

/// Forward events to an effects thread
impl EffectSink for crossbeam_channel::Sender<FlashEvent> {
    fn flash(&mut self, event: FlashEvent) {
        if self.send(event).is_err() {
            tracing::trace!("Effects receiver gone, dropping flash");
        }
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEffects;

impl EffectSink for NoEffects {
    fn flash(&mut self, _event: FlashEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> FlashEvent {
        FlashEvent {
            position: Vec2::new(1.0, 2.0),
            color: Rgb::new(255, 0, 0),
            speed: FlashSpeed::Fast,
        }
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<FlashEvent> = Vec::new();
        sink.flash(event());
        sink.flash(event());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (mut tx, rx) = crossbeam_channel::unbounded();
        tx.flash(event());
        assert_eq!(rx.try_recv().unwrap(), event());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (mut tx, rx) = crossbeam_channel::unbounded::<FlashEvent>();
        drop(rx);
        tx.flash(event());
    }
}
