use serde::Serialize;

/// Opening hours for a single day, in minutes from midnight.
///
/// `Open` is a half-open interval: `start` is bookable, `end` is not.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BusinessWindow {
    Closed,
    Open { start: u16, end: u16 },
}

impl BusinessWindow {
    pub fn new_open(start: u16, end: u16) -> Self {
        Self::Open { start, end }
    }

    pub fn new_closed() -> Self {
        Self::Closed
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn start(&self) -> Option<u16> {
        match self {
            Self::Open { start, .. } => Some(*start),
            Self::Closed => None,
        }
    }

    pub fn end(&self) -> Option<u16> {
        match self {
            Self::Open { end, .. } => Some(*end),
            Self::Closed => None,
        }
    }

    /// Length of the window in minutes. Zero for closed days and for
    /// inverted boundaries.
    pub fn length(&self) -> u16 {
        match self {
            Self::Open { start, end } => end.saturating_sub(*start),
            Self::Closed => 0,
        }
    }
}
