use thiserror::Error;

/// Failures of the durable key/value store behind the session gate.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not get connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Storage query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage unavailable")]
    Unavailable,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
}

/// Contact form validation failures. The messages are shown to the visitor.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContactError {
    #[error("Please enter your name.")]
    MissingName,

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Please enter a message.")]
    MissingMessage,

    #[error("Please complete the schedule: select a date and a time slot.")]
    IncompleteSchedule,

    #[error("We're closed on Sunday. Please pick another date.")]
    ClosedDay,

    #[error("{0} is not an available time slot for that date.")]
    UnknownSlot(String),

    #[error("A disabled schedule cannot carry a date or time.")]
    InconsistentSchedule,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Could not deserialize config: {0}")]
    Deserialize(#[from] serde_json::Error),
}
