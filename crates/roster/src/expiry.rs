//! Per-channel inactivity timer.
//!
//! Each monitored channel is either `Unarmed` or `Armed` with a deadline and
//! a running timer task. [`ExpiryState::arm`] and [`ExpiryState::cancel`] are
//! the only mutators. A fired timer carries a token; the channel is expired
//! only if that token is still the armed one, so a timer that lost a race
//! against a re-arm does nothing.

use std::time::Duration;

use {
    rollcall_config::RosterConfig,
    tokio::{task::AbortHandle, time::Instant},
};

/// Whether and when monitoring stops on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryPolicy {
    #[default]
    Disabled,
    /// Stop monitoring `window` after the last start command.
    Idle { window: Duration },
}

impl ExpiryPolicy {
    #[must_use]
    pub fn window(&self) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::Idle { window } => Some(*window),
        }
    }
}

impl From<&RosterConfig> for ExpiryPolicy {
    fn from(config: &RosterConfig) -> Self {
        match config.expiry_window() {
            Some(window) => Self::Idle { window },
            None => Self::Disabled,
        }
    }
}

/// Identifies one arming of one channel's timer.
pub type ExpiryToken = u64;

#[derive(Debug, Default)]
pub enum ExpiryState {
    #[default]
    Unarmed,
    Armed {
        deadline: Instant,
        token: ExpiryToken,
        timer: AbortHandle,
    },
}

impl ExpiryState {
    /// Replace any running timer with a new one.
    pub fn arm(&mut self, deadline: Instant, token: ExpiryToken, timer: AbortHandle) {
        self.cancel();
        *self = Self::Armed {
            deadline,
            token,
            timer,
        };
    }

    /// Abort the running timer, if any.
    pub fn cancel(&mut self) {
        if let Self::Armed { timer, .. } = std::mem::take(self) {
            timer.abort();
        }
    }

    /// Forget the timer without aborting it. Used from inside the timer task
    /// itself, which must not abort its own teardown.
    pub fn disarm(&mut self) {
        *self = Self::Unarmed;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Unarmed => None,
            Self::Armed { deadline, .. } => Some(*deadline),
        }
    }

    #[must_use]
    pub fn matches(&self, candidate: ExpiryToken) -> bool {
        matches!(self, Self::Armed { token, .. } if *token == candidate)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tokio::task::JoinHandle};

    fn idle_task() -> JoinHandle<()> {
        tokio::spawn(std::future::pending::<()>())
    }

    #[test]
    fn policy_from_config() {
        let mut config = RosterConfig::default();
        assert_eq!(ExpiryPolicy::from(&config), ExpiryPolicy::Disabled);

        config.expiry_secs = 120;
        assert_eq!(ExpiryPolicy::from(&config), ExpiryPolicy::Idle {
            window: Duration::from_secs(120)
        });
    }

    #[tokio::test]
    async fn rearm_aborts_previous_timer() {
        let mut state = ExpiryState::default();
        let first = idle_task();
        let second = idle_task();
        state.arm(Instant::now(), 1, first.abort_handle());
        state.arm(Instant::now(), 2, second.abort_handle());

        assert!(first.await.unwrap_err().is_cancelled());
        assert!(!state.matches(1));
        assert!(state.matches(2));
        second.abort();
    }

    #[tokio::test]
    async fn cancel_returns_to_unarmed() {
        let mut state = ExpiryState::default();
        let timer = idle_task();
        state.arm(Instant::now(), 7, timer.abort_handle());
        state.cancel();

        assert!(timer.await.unwrap_err().is_cancelled());
        assert!(!state.is_armed());
        assert!(state.deadline().is_none());
    }

    #[tokio::test]
    async fn disarm_leaves_the_task_running() {
        let mut state = ExpiryState::default();
        let timer = idle_task();
        state.arm(Instant::now(), 3, timer.abort_handle());
        state.disarm();

        tokio::task::yield_now().await;
        assert!(!timer.is_finished());
        assert!(!state.matches(3));
        timer.abort();
    }
}
