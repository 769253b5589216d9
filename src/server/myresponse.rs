use serde::{Deserialize, Serialize};

use crate::{
    contact::form::{ContactPayload, OutboundMessage},
    session::gate::SessionRecord,
    timing::schedule::DaySlots,
};

/// Body of the /api/slots response.
#[derive(Serialize, Clone, Debug)]
pub struct SlotsResponse {
    date: String,
    closed: bool,
    slots: Vec<String>,
}

impl SlotsResponse {
    pub fn new(date: &str, day: DaySlots) -> Self {
        Self {
            date: date.to_owned(),
            closed: day.closed,
            slots: day.slots,
        }
    }
}

/// Body of the /api/contact response: the email to send and the record to
/// store through the contacts API.
#[derive(Serialize, Clone, Debug)]
pub struct ContactResponse {
    email: OutboundMessage,
    contact: ContactPayload,
}

impl ContactResponse {
    pub fn new(email: OutboundMessage, contact: ContactPayload) -> Self {
        Self { email, contact }
    }
}

#[derive(Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Body of a successful /api/login response. `redirect` is where the
/// client should navigate next.
#[derive(Serialize, Clone, Debug)]
pub struct LoginResponse {
    token: String,
    username: String,
    expires_at: i64,
    redirect: String,
}

impl LoginResponse {
    pub fn new(record: SessionRecord, redirect: String) -> Self {
        Self {
            token: record.token,
            username: record.username,
            expires_at: record.expires_at,
            redirect,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct RedirectResponse {
    redirect: String,
}

impl RedirectResponse {
    pub fn new(redirect: String) -> Self {
        Self { redirect }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct AdminResponse {
    username: String,
    admin_path: String,
}

impl AdminResponse {
    pub fn new(username: String, admin_path: String) -> Self {
        Self {
            username,
            admin_path,
        }
    }
}
