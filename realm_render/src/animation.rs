//! Animation playback policies and the global animation clock.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a frame strip behaves once the animation index runs past its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationType {
    /// Loop forever.
    #[default]
    Repeat,
    /// Play once, then hold the last frame.
    SingleThenFreeze,
    /// Play once, then draw nothing.
    SingleThenStop,
}

impl AnimationType {
    /// Frame to show for animation index `index` in a strip of `len` frames.
    pub fn frame_index(self, index: u32, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let index = index as usize;
        match self {
            AnimationType::Repeat => Some(index % len),
            AnimationType::SingleThenFreeze => Some(index.min(len - 1)),
            AnimationType::SingleThenStop => (index < len).then_some(index),
        }
    }
}

/// Advances the global animation index once per period.
///
/// Time that doesn't fill a whole period carries over to the next call.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    period: Duration,
    index: u32,
    overshoot: Duration,
}

impl AnimationClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            index: 0,
            overshoot: Duration::ZERO,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Time accumulated towards the next tick.
    pub fn overshoot(&self) -> Duration {
        self.overshoot
    }

    /// Adds elapsed time and returns how many ticks that produced.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.period.is_zero() {
            return 0;
        }
        let total = self.overshoot + elapsed;
        let ticks = (total.as_nanos() / self.period.as_nanos()) as u32;
        self.overshoot = total - self.period * ticks;
        self.index = self.index.wrapping_add(ticks);
        ticks
    }
}
