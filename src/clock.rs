use web_time::Instant;

/// Elapsed-play-time tracker. Started on the first interaction of a game,
/// frozen once the game reaches a terminal state.
///
/// The engine does not own a timer thread: a host scheduler polls
/// [`GameEngine::tick_clock`](crate::GameEngine::tick_clock) on its own
/// cadence, and the reading is always derived from the reference instant.
#[derive(Copy, Clone, Debug, Default)]
pub struct Clock {
    started_at: Option<Instant>,
    frozen_secs: Option<u32>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the reference instant. No-op while already running.
    pub fn start(&mut self) {
        if !self.is_running() {
            self.started_at = Some(Instant::now());
            self.frozen_secs = None;
        }
    }

    /// Freeze the reading at its current value. Idempotent.
    pub fn stop(&mut self) {
        if self.is_running() {
            self.frozen_secs = Some(self.running_secs());
        }
    }

    /// Back to the never-started state.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.frozen_secs = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.frozen_secs.is_none()
    }

    /// Whole seconds since `start`: 0 before it, frozen after `stop`, never
    /// negative.
    pub fn elapsed_secs(&self) -> u32 {
        self.frozen_secs.unwrap_or_else(|| self.running_secs())
    }

    fn running_secs(&self) -> u32 {
        self.started_at
            .map(|started| started.elapsed().as_secs().min(u32::MAX as u64) as u32)
            .unwrap_or(0)
    }
}
