use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Half-open minute-of-day interval. (0, 1440) denotes an all-day slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: u32,
    pub end: u32,
}

impl TimeInterval {
    /// Builds a validated candidate interval; rejects end <= start and
    /// anything past the end of the day.
    pub fn new(start: u32, end: u32) -> Option<Self> {
        if end > start && end <= MINUTES_PER_DAY {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Standard half-open overlap test; touching endpoints do not conflict.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Parameters for creating an event through the calendar UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// One rendered event scraped from the day view. Never cached across calls;
/// the live UI is the only source of truth.
#[derive(Debug, Clone, Default)]
pub struct EventSnippet {
    pub label: Option<String>,
    pub text: Option<String>,
}

impl EventSnippet {
    /// Joins the aria-label and visible text the same way the day-view scan
    /// reads them, skipping whichever side is missing.
    pub fn combined(&self) -> String {
        let parts: Vec<&str> = [self.label.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Free,
    Busy,
    /// The candidate interval itself could not be validated. Distinct from
    /// Free: the caller must ask for clarification, never treat it as open.
    Unknown,
}
