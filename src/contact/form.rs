use std::sync::OnceLock;

use chrono::DateTime;
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::selection::ScheduleSelection;
use crate::{error::ContactError, timing::schedule::Schedule};

const SENT_AT_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

/// What a visitor submits from the landing page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub schedule: ScheduleSelection,
}

/// The body stored through the contacts REST endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// The message handed to the email delivery service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub from_name: String,
    pub from_email: String,
    pub message: String,
    pub time: String,
}

impl ContactForm {
    pub fn validate(&self, schedule: &Schedule) -> Result<(), ContactError> {
        if self.name.trim().is_empty() {
            return Err(ContactError::MissingName);
        }
        if !email_pattern().is_match(self.email.trim()) {
            return Err(ContactError::InvalidEmail);
        }
        if self.message.trim().is_empty() {
            return Err(ContactError::MissingMessage);
        }
        self.schedule.validate(schedule)
    }

    /// The visitor's message with the picked call time appended, if any.
    pub fn message_body(&self, schedule: &Schedule, timezone: Tz) -> String {
        if !self.schedule.is_complete(schedule) {
            return self.message.clone();
        }
        format!(
            "{}\n\n---\nScheduled Call:\nDate: {}\nTime: {}\nTimezone: {}",
            self.message,
            self.schedule.date,
            self.schedule.time,
            timezone.name()
        )
    }

    /// Validates the form and builds the outbound message stamped with `now`.
    pub fn compose(
        &self,
        schedule: &Schedule,
        now: DateTime<Tz>,
    ) -> Result<OutboundMessage, ContactError> {
        self.validate(schedule)?;
        Ok(OutboundMessage {
            from_name: self.name.trim().to_owned(),
            from_email: self.email.trim().to_owned(),
            message: self.message_body(schedule, now.timezone()),
            time: now.format(SENT_AT_FORMAT).to_string(),
        })
    }

    pub fn payload(&self) -> ContactPayload {
        ContactPayload {
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            message: self.message.clone(),
        }
    }
}
