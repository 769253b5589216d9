use serde::{Deserialize, Serialize};

use crate::{
    error::ContactError,
    timing::schedule::{parse_date, Schedule},
};

/// The "schedule a call" part of the contact form.
///
/// `date` is `YYYY-MM-DD` and `time` a slot label such as "10:30 AM"; both
/// are empty when nothing has been picked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSelection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

impl ScheduleSelection {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Turning the schedule off forgets the picked date and time.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.date.clear();
            self.time.clear();
        }
    }

    /// A new date invalidates the previously picked time.
    pub fn set_date(&mut self, date: &str) {
        self.date = date.to_owned();
        self.time.clear();
    }

    pub fn set_time(&mut self, time: &str) {
        self.time = time.to_owned();
    }

    pub fn is_complete(&self, schedule: &Schedule) -> bool {
        self.enabled && self.check(schedule).is_ok()
    }

    /// `Ok` for an empty disabled selection or a complete enabled one.
    pub fn validate(&self, schedule: &Schedule) -> Result<(), ContactError> {
        if !self.enabled {
            if self.date.is_empty() && self.time.is_empty() {
                return Ok(());
            }
            return Err(ContactError::InconsistentSchedule);
        }
        self.check(schedule)
    }

    fn check(&self, schedule: &Schedule) -> Result<(), ContactError> {
        if self.date.is_empty() || self.time.is_empty() || parse_date(&self.date).is_none() {
            return Err(ContactError::IncompleteSchedule);
        }
        let day = schedule.slots_for(&self.date);
        if day.closed {
            return Err(ContactError::ClosedDay);
        }
        if !day.slots.iter().any(|slot| *slot == self.time) {
            return Err(ContactError::UnknownSlot(self.time.clone()));
        }
        Ok(())
    }
}
