use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::daily::BusinessWindow;
use crate::ISO_FORMAT_DATE;

pub const DEFAULT_STEP_MINUTES: u16 = 30;

/// The weekly opening hours, indexed from Sunday (0) to Saturday (6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Schedule {
    timings: [BusinessWindow; 7],
    standard_interval_min: u16,
}

/// The bookable slots for one day.
///
/// `closed` is only true when the day has a window and that window is closed.
/// A date that could not be read has no window at all and reports
/// `closed: false` with no slots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DaySlots {
    pub closed: bool,
    pub slots: Vec<String>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl Schedule {
    /// Sunday closed, Saturday 10:00 - 16:00, weekdays 9:00 - 18:00.
    pub fn standard() -> Self {
        let weekday = BusinessWindow::new_open(9 * 60, 18 * 60);
        let saturday = BusinessWindow::new_open(10 * 60, 16 * 60);
        Self {
            timings: [
                BusinessWindow::new_closed(),
                weekday,
                weekday,
                weekday,
                weekday,
                weekday,
                saturday,
            ],
            standard_interval_min: DEFAULT_STEP_MINUTES,
        }
    }

    pub fn with_interval(mut self, step_minutes: u16) -> Self {
        self.standard_interval_min = step_minutes;
        self
    }

    pub fn interval(&self) -> u16 {
        self.standard_interval_min
    }

    pub fn window_for(&self, date: NaiveDate) -> BusinessWindow {
        let weekday = date.weekday().num_days_from_sunday();
        self.timings[weekday as usize]
    }

    /// Window for a `YYYY-MM-DD` string. Anything unreadable is `Closed`.
    pub fn business_window_for(&self, date: &str) -> BusinessWindow {
        match parse_date(date) {
            Some(date) => self.window_for(date),
            None => BusinessWindow::new_closed(),
        }
    }

    /// Slots for a `YYYY-MM-DD` string at the schedule's own interval.
    pub fn slots_for(&self, date: &str) -> DaySlots {
        self.generate_slots(date, self.standard_interval_min)
    }

    pub fn generate_slots(&self, date: &str, step_minutes: u16) -> DaySlots {
        let Some(date) = parse_date(date) else {
            return DaySlots::default();
        };
        match self.window_for(date) {
            BusinessWindow::Closed => DaySlots {
                closed: true,
                slots: Vec::new(),
            },
            window => DaySlots {
                closed: false,
                slots: Self::slots_in(window, step_minutes),
            },
        }
    }

    /// Labels at `start`, `start + step`, ... for every slot that ends by
    /// `end`. A trailing step that would overrun closing time is dropped.
    pub fn slots_in(window: BusinessWindow, step_minutes: u16) -> Vec<String> {
        let Some(start) = window.start() else {
            return Vec::new();
        };
        if step_minutes == 0 {
            return Vec::new();
        }
        let count = window.length() / step_minutes;
        (0..count)
            .map(|i| start + i * step_minutes)
            .map(|minute| to_12h(minute / 60, minute % 60))
            .collect()
    }
}

/// Window for a `YYYY-MM-DD` string under the standard opening hours.
pub fn business_window_for(date: &str) -> BusinessWindow {
    Schedule::standard().business_window_for(date)
}

/// Slots for a `YYYY-MM-DD` string under the standard opening hours.
pub fn generate_slots(date: &str, step_minutes: u16) -> DaySlots {
    Schedule::standard().generate_slots(date, step_minutes)
}

/// "9:00 AM", "12:30 PM". Hours 0 and 12 both render as 12.
pub fn to_12h(hour: u16, minute: u16) -> String {
    let suffix = if hour % 24 >= 12 { "PM" } else { "AM" };
    let hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour, minute, suffix)
}

pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), ISO_FORMAT_DATE).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sunday_is_closed() {
        let slots = generate_slots("2024-03-10", 30);
        assert_eq!(
            slots,
            DaySlots {
                closed: true,
                slots: vec![]
            }
        );
    }

    #[test]
    fn saturday_runs_ten_to_half_three() {
        let slots = generate_slots("2024-03-09", 30);
        assert!(!slots.closed);
        assert_eq!(slots.slots.len(), 12);
        assert_eq!(slots.slots.first().unwrap(), "10:00 AM");
        assert_eq!(slots.slots.last().unwrap(), "3:30 PM");
    }

    #[test]
    fn weekdays_run_nine_to_half_five() {
        // 2024-03-04 is a Monday
        for day in 4..=8 {
            let slots = generate_slots(&format!("2024-03-{:02}", day), 30);
            assert!(!slots.closed);
            assert_eq!(slots.slots.len(), 18);
            assert_eq!(slots.slots[0], "9:00 AM");
            assert_eq!(slots.slots[6], "12:00 PM");
            assert_eq!(slots.slots[17], "5:30 PM");
        }
    }

    #[test]
    fn window_lookup() {
        assert_eq!(business_window_for("2024-03-10"), BusinessWindow::Closed);
        assert_eq!(
            business_window_for("2024-03-09"),
            BusinessWindow::new_open(600, 960)
        );
        assert_eq!(
            business_window_for("2024-03-06"),
            BusinessWindow::new_open(540, 1080)
        );
        assert_eq!(business_window_for(""), BusinessWindow::Closed);
        assert_eq!(business_window_for("2024-13-40"), BusinessWindow::Closed);
    }

    #[test]
    fn unreadable_dates_have_no_window() {
        for date in ["", "tomorrow", "2024-02-30", "09/03/2024"] {
            assert_eq!(generate_slots(date, 30), DaySlots::default());
        }
    }

    #[test]
    fn partial_last_step_is_dropped() {
        let window = BusinessWindow::new_open(540, 1080);
        let slots = Schedule::slots_in(window, 45);
        // 540 / 45 = 12 full steps
        assert_eq!(slots.len(), 12);
        assert_eq!(slots.last().unwrap(), "5:15 PM");

        // 1040 + 100 would run past 18:00
        let slots = Schedule::slots_in(window, 100);
        assert_eq!(slots.len(), 5);
        assert_eq!(slots.last().unwrap(), "3:40 PM");
    }

    #[test]
    fn slot_count_matches_window() {
        let schedule = Schedule::standard();
        for step in [1u16, 7, 15, 25, 30, 60, 90, 361] {
            for date in ["2024-03-04", "2024-03-09"] {
                let window = schedule.business_window_for(date);
                let expected = (window.length() / step) as usize;
                assert_eq!(schedule.generate_slots(date, step).slots.len(), expected);
            }
        }
    }

    #[test]
    fn degenerate_windows() {
        assert!(Schedule::slots_in(BusinessWindow::new_open(600, 600), 30).is_empty());
        assert!(Schedule::slots_in(BusinessWindow::new_open(700, 600), 30).is_empty());
        assert!(Schedule::slots_in(BusinessWindow::new_open(540, 1080), 0).is_empty());
        assert!(Schedule::slots_in(BusinessWindow::Closed, 30).is_empty());
    }

    #[test]
    fn generation_is_repeatable() {
        let schedule = Schedule::standard();
        assert_eq!(
            schedule.generate_slots("2024-03-05", 30),
            schedule.generate_slots("2024-03-05", 30)
        );
    }

    #[test]
    fn twelve_hour_labels() {
        assert_eq!(to_12h(0, 0), "12:00 AM");
        assert_eq!(to_12h(9, 5), "9:05 AM");
        assert_eq!(to_12h(12, 0), "12:00 PM");
        assert_eq!(to_12h(16, 30), "4:30 PM");
        assert_eq!(to_12h(23, 59), "11:59 PM");
    }
}
