//! Time sources used while building signed requests.
//!
//! Signing needs the current time twice (the `X-Amz-Date` header and the
//! credential scope). Callers take a single reading from a [`Clock`] per
//! request and pass it along so both always agree.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Create a clock that always reports `time`.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(time)
    }
}

impl From<DateTime<Utc>> for FixedClock {
    fn from(time: DateTime<Utc>) -> Self {
        Self(time)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn it_returns_reasonable_timestamp() {
        // Should be after year 2020
        assert!(SystemClock.now().timestamp() > 1_577_836_800);
    }

    #[test]
    fn it_returns_increasing_values() {
        let t1 = SystemClock.now();
        let t2 = SystemClock.now();
        assert!(t2 >= t1);
    }

    #[test]
    fn it_freezes_time() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(time);

        assert_eq!(clock.now(), time);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn it_shares_a_clock_behind_pointers() {
        let time = Utc.with_ymd_and_hms(2025, 5, 7, 5, 48, 59).unwrap();
        let shared: Arc<dyn Clock> = Arc::new(FixedClock::from(time));
        let boxed: Box<dyn Clock> = Box::new(FixedClock::from(time));

        assert_eq!(shared.now(), time);
        assert_eq!(boxed.now(), time);
        assert_eq!((&shared).now(), time);
    }
}
