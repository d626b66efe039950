//! Free-date allocation for a monthly plan.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};

use super::Month;

/// Weekdays a user is available to post on.
///
/// Built from the profile's `availability_days` (0 = Sunday .. 6 = Saturday).
/// Values outside that range are ignored; an empty or all-invalid list means
/// every day is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability([bool; 7]);

impl Availability {
    pub const ALL: Self = Self([true; 7]);

    pub fn from_days(days: &[i64]) -> Self {
        let mut set = [false; 7];
        for day in days {
            if let Ok(idx) = usize::try_from(*day) {
                if idx < 7 {
                    set[idx] = true;
                }
            }
        }
        if set.iter().any(|d| *d) {
            Self(set)
        } else {
            Self::ALL
        }
    }

    pub fn allows(&self, weekday: Weekday) -> bool {
        self.0[weekday.num_days_from_sunday() as usize]
    }

    /// Day numbers in the profile encoding, ascending.
    pub fn days(&self) -> Vec<u32> {
        (0..7u32).filter(|d| self.0[*d as usize]).collect()
    }
}

/// Every date of `month` the user can still be given a post on, ascending.
///
/// A date qualifies when its weekday is available, no item is already
/// scheduled on it, and it is not before `today`. The month as a whole is
/// not checked against `today`; callers reject past months first.
pub fn allocate_slots(
    month: Month,
    availability: Availability,
    occupied: &HashSet<NaiveDate>,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    month
        .days()
        .filter(|d| *d >= today)
        .filter(|d| availability.allows(d.weekday()))
        .filter(|d| !occupied.contains(d))
        .collect()
}
