use std::env;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;
use xdnd_core::{XDND_MIN_VERSION, XDND_VERSION};

/// Overrides [`SessionConfig::poll_interval`] when read through [`SessionConfig::from_env`].
pub const POLL_INTERVAL_ENV_VAR: &str = "XDND_POLL_INTERVAL_MS";
/// Overrides [`SessionConfig::selection_timeout`].
pub const SELECTION_TIMEOUT_ENV_VAR: &str = "XDND_SELECTION_TIMEOUT_MS";
/// Overrides [`SessionConfig::finish_timeout`].
pub const FINISH_TIMEOUT_ENV_VAR: &str = "XDND_FINISH_TIMEOUT_MS";

/// Tunables of a [`DragSession`](crate::DragSession).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// Highest XDND version spoken, and the one advertised through `XdndAware`.
    pub version: u8,
    /// Lowest version a peer may announce.
    pub min_version: u8,
    /// Interval of the timer tick.
    pub poll_interval: Duration,
    /// How long to wait for a `SelectionNotify` carrying the dropped data.
    pub selection_timeout: Duration,
    /// How long to wait for `XdndFinished` after sending `XdndDrop`.
    pub finish_timeout: Duration,
    /// Whether drags started by us sample the pointer on each tick.
    pub poll_pointer: bool,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            version: XDND_VERSION,
            min_version: XDND_MIN_VERSION,
            poll_interval: Duration::from_millis(50),
            selection_timeout: Duration::from_secs(2),
            finish_timeout: Duration::from_secs(2),
            poll_pointer: true,
        }
    }
}

impl SessionConfig {
    /// The defaults, with the durations overridden from the environment.
    ///
    /// Values are whole milliseconds; values that do not parse are ignored.
    pub fn from_env() -> SessionConfig {
        let mut config = SessionConfig::default();
        if let Some(interval) = duration_from_env(POLL_INTERVAL_ENV_VAR) {
            config.poll_interval = interval;
        }
        if let Some(timeout) = duration_from_env(SELECTION_TIMEOUT_ENV_VAR) {
            config.selection_timeout = timeout;
        }
        if let Some(timeout) = duration_from_env(FINISH_TIMEOUT_ENV_VAR) {
            config.finish_timeout = timeout;
        }
        config
    }

    /// Sets the highest XDND version spoken.
    ///
    /// Clamped to the range this crate understands.
    #[inline]
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version.clamp(XDND_MIN_VERSION, XDND_VERSION);
        self.min_version = self.min_version.min(self.version);
        self
    }

    /// Sets the lowest XDND version accepted from a peer.
    #[inline]
    pub fn with_min_version(mut self, min_version: u8) -> Self {
        self.min_version = min_version.min(self.version);
        self
    }

    /// Sets the timer interval.
    ///
    /// The default is 50 ms.
    #[inline]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the bound on waiting for dropped data.
    ///
    /// The default is 2 s.
    #[inline]
    pub fn with_selection_timeout(mut self, selection_timeout: Duration) -> Self {
        self.selection_timeout = selection_timeout;
        self
    }

    /// Sets the bound on waiting for `XdndFinished`.
    ///
    /// The default is 2 s.
    #[inline]
    pub fn with_finish_timeout(mut self, finish_timeout: Duration) -> Self {
        self.finish_timeout = finish_timeout;
        self
    }

    /// Sets whether drags we start poll the pointer.
    #[inline]
    pub fn with_pointer_polling(mut self, poll_pointer: bool) -> Self {
        self.poll_pointer = poll_pointer;
        self
    }
}

fn duration_from_env(var: &str) -> Option<Duration> {
    let value = env::var(var).ok()?;
    match value.trim().parse::<u64>() {
        Ok(millis) => Some(Duration::from_millis(millis)),
        Err(err) => {
            warn!("`{var}` invalid, expected whole milliseconds. Got `{value}`: {err}");
            None
        },
    }
}
