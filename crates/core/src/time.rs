use chrono::{DateTime, Duration, Utc};

/// Source of answer timestamps.
///
/// Services take a `Clock` instead of calling `Utc::now()` so tests can pin
/// time down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock time.
    #[default]
    System,
    /// Always reports the same instant.
    Fixed(DateTime<Utc>),
    /// Starts at `next` and moves forward by `step` every time a timestamp is
    /// taken with [`Clock::stamp`].
    Stepping { next: DateTime<Utc>, step: Duration },
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a clock that starts at `start` and advances by `step` per stamp.
    #[must_use]
    pub fn stepping(start: DateTime<Utc>, step: Duration) -> Self {
        Self::Stepping { next: start, step }
    }

    /// Current time without advancing a stepping clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
            Clock::Stepping { next, .. } => *next,
        }
    }

    /// Takes a timestamp for a new event.
    ///
    /// Stepping clocks advance after each call so consecutive events get
    /// strictly increasing times.
    pub fn stamp(&mut self) -> DateTime<Utc> {
        match self {
            Clock::Stepping { next, step } => {
                let at = *next;
                *next += *step;
                at
            }
            other => other.now(),
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// A stepping clock starting at [`fixed_now`] that ticks one second per stamp.
#[must_use]
pub fn stepping_test_clock() -> Clock {
    Clock::stepping(fixed_now(), Duration::seconds(1))
}
