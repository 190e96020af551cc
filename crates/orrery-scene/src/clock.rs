//! Session clock.

use std::time::Instant;

/// A single start timestamp; elapsed time is `now - start` in seconds.
///
/// There is no pause and no rewind. Elapsed time saturates at zero for
/// instants taken before the start.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    /// Start the clock now.
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start }
    }

    pub fn start_instant(&self) -> Instant {
        self.start
    }

    /// Seconds elapsed between the start and `now`.
    pub fn elapsed_at(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.start).as_secs_f32()
    }

    /// Seconds elapsed since the start.
    pub fn elapsed(&self) -> f32 {
        self.elapsed_at(Instant::now())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}
