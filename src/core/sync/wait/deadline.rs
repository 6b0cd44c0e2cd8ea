/*!
 * Timeouts and Deadlines
 *
 * A [`Timeout`] is what callers pass in; a [`Deadline`] is the absolute
 * point in time the wait path measures against. Pure value types, no
 * shared state.
 */

use std::time::{Duration, Instant};

/// How long a blocking operation may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeout {
    /// Wait until fulfilled or cancelled
    #[default]
    Infinite,
    /// Try once, never block
    Poll,
    /// Wait at most this long
    After(Duration),
}

impl Timeout {
    /// Timeout in milliseconds; zero means [`Timeout::Poll`]
    pub const fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::Poll
        } else {
            Self::After(Duration::from_millis(millis))
        }
    }

    /// Whether this timeout forbids blocking
    #[inline]
    pub fn is_poll(&self) -> bool {
        match self {
            Self::Poll => true,
            Self::After(d) => d.is_zero(),
            Self::Infinite => false,
        }
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Duration of this timeout, `None` if infinite
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::Poll => Some(Duration::ZERO),
            Self::After(d) => Some(*d),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::Poll
        } else {
            Self::After(duration)
        }
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Self::Infinite, Self::from)
    }
}

/// Time left before a [`Deadline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Infinite,
    Left(Duration),
    Expired,
}

impl Remaining {
    #[inline]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Absolute point in time a wait gives up at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    /// `None` means no deadline
    at: Option<Instant>,
}

impl Deadline {
    /// Start counting `timeout` from now
    ///
    /// A finite timeout too large to represent as an [`Instant`] is treated
    /// as infinite.
    pub fn start(timeout: Timeout) -> Self {
        let at = match timeout {
            Timeout::Infinite => None,
            Timeout::Poll => Some(Instant::now()),
            Timeout::After(d) => Instant::now().checked_add(d),
        };
        Self { at }
    }

    /// A deadline that never expires
    pub const fn infinite() -> Self {
        Self { at: None }
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.at.is_none()
    }

    /// Time left, or [`Remaining::Expired`] once the deadline is reached
    pub fn remaining(&self) -> Remaining {
        match self.at {
            None => Remaining::Infinite,
            Some(at) => {
                let now = Instant::now();
                if now >= at {
                    Remaining::Expired
                } else {
                    Remaining::Left(at - now)
                }
            }
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_expired()
    }
}
