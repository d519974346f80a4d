//! Render-side view of the simulation
//!
//! The logic loop publishes a `Frame` after stepping; renderers read the
//! latest published frame and never touch simulation state, so a render
//! loop may run on another thread.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::game::constants::TEAM_COUNT;
use crate::game::state::Drawable;
use crate::util::vec2::Vec2;

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Default, Serialize)]
pub struct Frame {
    /// Logic tick the frame was taken after
    pub tick: u64,
    pub drawables: Vec<Drawable>,
    pub homes: [Vec2; TEAM_COUNT],
    pub populations: [usize; TEAM_COUNT],
}

/// Double-buffered frame exchange between the logic loop and renderers
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    front: Arc<RwLock<Arc<Frame>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new frame; readers holding the old one keep it
    pub fn publish(&self, frame: Frame) {
        *self.front.write() = Arc::new(frame);
    }

    /// Most recently published frame
    pub fn latest(&self) -> Arc<Frame> {
        Arc::clone(&self.front.read())
    }
}
