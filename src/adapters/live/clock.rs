//! Wall clock for gate evaluation.

use chrono::{DateTime, Utc};

use crate::ports::clock::Clock;

/// System clock; override expiry is judged against real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
