use std::time::{Duration, Instant};

pub const MODIFIER_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    Ctrl,
    Shift,
}

/// One modifier cell. The application tracker and the global listener each
/// own a separate instance; writes are last-writer-wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub ctrl: bool,
    pub shift: bool,
}

impl ModifierState {
    pub fn apply(&mut self, key: ModifierKey, pressed: bool) {
        match key {
            ModifierKey::Ctrl => self.ctrl = pressed,
            ModifierKey::Shift => self.shift = pressed,
        }
    }

    pub fn ctrl_shift(self) -> bool {
        self.ctrl && self.shift
    }
}

/// Fixed-interval sampler for the application-level modifier state.
#[derive(Debug, Clone)]
pub struct ModifierPoller {
    interval: Duration,
    last_poll: Option<Instant>,
}

impl Default for ModifierPoller {
    fn default() -> Self {
        Self::new(MODIFIER_POLL_INTERVAL)
    }
}

impl ModifierPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true when a sample should be taken at `now`.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last_poll {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_poll = Some(now);
                true
            }
        }
    }

    /// Writes `sample` into `tracker` when it differs. Returns whether the
    /// tracker changed.
    pub fn sample_into(&self, sample: ModifierState, tracker: &mut ModifierState) -> bool {
        if *tracker == sample {
            return false;
        }
        tracing::trace!(?sample, "application modifier state changed");
        *tracker = sample;
        true
    }
}
