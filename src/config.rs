//! Run configuration: timeslot geometry, availability and solver budget.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimetableError};

pub type Timeslot = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimetableConfig {
    /// Number of one-hour slots in a teaching day.
    pub slots_per_day: u32,
    /// Number of scheduled days, Monday first.
    pub days: u32,
    /// Clock hour of the first slot; display only.
    pub start_hour: u32,
    /// Days (0 = Monday) on which nothing may be scheduled.
    pub excluded_days: BTreeSet<u32>,
    /// Individual timeslots on which nothing may be scheduled.
    pub excluded_slots: BTreeSet<Timeslot>,
    /// Wall-clock budget for each satisfiability check.
    pub time_limit_secs: f64,
    pub workers: i32,
    pub random_seed: i32,
    /// Run the opportunistic second pass.
    pub improve: bool,
    /// On infeasibility, find the constraint families responsible.
    pub diagnose: bool,
    /// Name engine variables and constraints after their labels.
    pub label_constraints: bool,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            slots_per_day: 7,
            days: 6,
            start_hour: 8,
            excluded_days: BTreeSet::new(),
            excluded_slots: BTreeSet::new(),
            time_limit_secs: 60.0,
            workers: 8,
            random_seed: 42,
            improve: true,
            diagnose: true,
            label_constraints: false,
        }
    }
}

impl TimetableConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TimetableError::Usage(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| TimetableError::Usage(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slots_per_day == 0 {
            return Err(TimetableError::Usage("slots_per_day must be at least 1".into()));
        }
        if self.days == 0 {
            return Err(TimetableError::Usage("days must be at least 1".into()));
        }
        if (0..self.days).all(|d| self.excluded_days.contains(&d)) {
            return Err(TimetableError::Usage("every scheduled day is excluded".into()));
        }
        if !(self.time_limit_secs > 0.0) {
            return Err(TimetableError::Usage("time_limit_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn num_slots(&self) -> u32 {
        self.slots_per_day * self.days
    }

    pub fn timeslots(&self) -> std::ops::Range<Timeslot> {
        0..self.num_slots()
    }

    pub fn day_of(&self, slot: Timeslot) -> u32 {
        slot / self.slots_per_day
    }

    pub fn slot_in_day(&self, slot: Timeslot) -> u32 {
        slot % self.slots_per_day
    }

    pub fn end_hour(&self) -> u32 {
        self.start_hour + self.slots_per_day
    }

    /// Availability predicate over timeslots.
    pub fn slot_available(&self, slot: Timeslot) -> bool {
        slot < self.num_slots()
            && !self.excluded_days.contains(&self.day_of(slot))
            && !self.excluded_slots.contains(&slot)
    }

    /// Whether a block of `hours` slots may start at `start`: the whole window
    /// must lie in one day and every slot of it must be available.
    pub fn window_fits(&self, start: Timeslot, hours: u32) -> bool {
        if hours == 0 || hours > self.slots_per_day {
            return false;
        }
        let Some(last) = start.checked_add(hours - 1) else {
            return false;
        };
        last < self.num_slots()
            && self.day_of(last) == self.day_of(start)
            && (start..=last).all(|t| self.slot_available(t))
    }

    /// Length of the longest run of available slots within a single day.
    pub fn longest_window(&self) -> u32 {
        let mut best = 0;
        let mut run = 0;
        for t in self.timeslots() {
            if self.slot_in_day(t) == 0 {
                run = 0;
            }
            if self.slot_available(t) {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(slots_per_day: u32, days: u32) -> TimetableConfig {
        TimetableConfig {
            slots_per_day,
            days,
            ..Default::default()
        }
    }

    #[test]
    fn test_day_buckets() {
        let c = config(7, 6);
        assert_eq!(c.num_slots(), 42);
        assert_eq!(c.day_of(6), 0);
        assert_eq!(c.day_of(7), 1);
        assert_eq!(c.slot_in_day(15), 1);
        assert_eq!(c.end_hour(), 15);
    }

    #[test]
    fn test_window_must_stay_in_one_day() {
        let c = config(7, 2);
        assert!(c.window_fits(0, 7));
        assert!(c.window_fits(5, 2));
        assert!(!c.window_fits(6, 2));
        assert!(!c.window_fits(13, 2));
        assert!(!c.window_fits(0, 8));
        assert!(!c.window_fits(3, 0));
    }

    #[test]
    fn test_huge_windows_never_fit() {
        let c = config(7, 2);
        assert!(!c.window_fits(0, u32::MAX));
        assert!(!c.window_fits(1, u32::MAX));
        assert!(!c.window_fits(5, u32::MAX - 3));
        assert!(!c.window_fits(u32::MAX, 2));
    }

    #[test]
    fn test_excluded_slots_break_windows() {
        let mut c = config(4, 2);
        c.excluded_slots.insert(2);
        c.excluded_days.insert(1);
        assert!(c.window_fits(0, 2));
        assert!(!c.window_fits(1, 2));
        assert!(!c.window_fits(4, 1));
        assert!(!c.slot_available(6));
        assert_eq!(c.longest_window(), 2);
    }

    #[test]
    fn test_longest_window_resets_at_day_boundary() {
        let c = config(3, 4);
        assert_eq!(c.longest_window(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(TimetableConfig::default().validate().is_ok());
        assert!(matches!(config(0, 6).validate(), Err(TimetableError::Usage(_))));
        assert!(matches!(config(7, 0).validate(), Err(TimetableError::Usage(_))));

        let mut all_off = config(7, 2);
        all_off.excluded_days = [0, 1].into_iter().collect();
        assert!(all_off.validate().is_err());

        let mut no_budget = config(7, 2);
        no_budget.time_limit_secs = 0.0;
        assert!(no_budget.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: TimetableConfig = serde_json::from_str(r#"{ "slots_per_day": 10, "excluded_days": [5] }"#).unwrap();
        assert_eq!(c.slots_per_day, 10);
        assert_eq!(c.days, 6);
        assert!(!c.slot_available(50));
        assert!(c.slot_available(49));
    }
}
