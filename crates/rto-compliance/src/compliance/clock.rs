use chrono::{Local, NaiveDate};

/// Source of the calendar date that every window is anchored to. Read once
/// per request.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Server-local calendar date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Pinned date for reports run "as of" a day and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
