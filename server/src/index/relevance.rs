//! Live / upcoming classification of occurrences.
//!
//! An occurrence is live while `start <= now < end`. Without a known end it
//! is treated as live for a grace window after it starts, standing in for a
//! typical event length. Anything starting after `now` is upcoming.

use chrono::{DateTime, Duration, Utc};

use crate::models::Occurrence;

pub const DEFAULT_LIVE_GRACE_MINUTES: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Live,
    Upcoming,
    Past,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveWindow {
    grace: Duration,
}

impl Default for LiveWindow {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_LIVE_GRACE_MINUTES)
    }
}

impl LiveWindow {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Earliest start an end-less occurrence may have and still be live.
    pub fn grace_floor(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.grace).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn classify(&self, occurrence: &Occurrence, now: DateTime<Utc>) -> Temporal {
        let start = occurrence.dtstart_utc;
        if start > now {
            return Temporal::Upcoming;
        }

        let live = match occurrence.effective_end() {
            Some(end) => now < end,
            None => start >= self.grace_floor(now),
        };

        if live {
            Temporal::Live
        } else {
            Temporal::Past
        }
    }

    pub fn is_live(&self, occurrence: &Occurrence, now: DateTime<Utc>) -> bool {
        self.classify(occurrence, now) == Temporal::Live
    }

    /// The occurrence an event is ranked and displayed by: the earliest live
    /// one, else the earliest upcoming one. Start ties break on occurrence id.
    pub fn relevant_occurrence<'a, I>(
        &self,
        occurrences: I,
        now: DateTime<Utc>,
    ) -> Option<&'a Occurrence>
    where
        I: IntoIterator<Item = &'a Occurrence>,
    {
        let mut earliest_live: Option<&Occurrence> = None;
        let mut earliest_upcoming: Option<&Occurrence> = None;

        for occurrence in occurrences {
            let slot = match self.classify(occurrence, now) {
                Temporal::Live => &mut earliest_live,
                Temporal::Upcoming => &mut earliest_upcoming,
                Temporal::Past => continue,
            };
            let replace = slot.map_or(true, |current| {
                (occurrence.dtstart_utc, occurrence.id) < (current.dtstart_utc, current.id)
            });
            if replace {
                *slot = Some(occurrence);
            }
        }

        earliest_live.or(earliest_upcoming)
    }
}
