//! Database models
//!
//! The logbook document (entry, weeks, days) and the row types the
//! repository reads back. Documents are persisted as JSON text.

use crate::config::{CANONICAL_DATE_FORMAT, WEEKDAY_NAMES};
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A date field inside a logbook document.
///
/// Freshly generated schedules carry native dates; documents read back from
/// the store carry the canonical `YYYY-MM-DD` string exactly as stored.
/// Either way the serialized form is the canonical string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Native(NaiveDate),
    Canonical(String),
}

impl DateValue {
    /// Canonical `YYYY-MM-DD` form (strings are returned as-is)
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            DateValue::Native(date) => Cow::Owned(date.format(CANONICAL_DATE_FORMAT).to_string()),
            DateValue::Canonical(s) => Cow::Borrowed(s),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, DateValue::Native(_))
    }

    /// Calendar date, parsing the string form when needed
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Native(date) => Some(*date),
            DateValue::Canonical(s) => NaiveDate::parse_from_str(s, CANONICAL_DATE_FORMAT).ok(),
        }
    }
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        DateValue::Native(date)
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for DateValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(DateValue::Canonical)
    }
}

/// Day of the five-day work week. Ordering follows the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Days after the week's first day
    pub fn offset(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        WEEKDAY_NAMES[self as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown weekday: {}", s)))
    }
}

/// One working day of a week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub date: DateValue,
    pub text: String,
    /// Kept for document compatibility; nothing reads or writes it
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One week of the logbook, mapped to one PDF page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub week_number: u32,
    pub start_date: DateValue,
    pub end_date: DateValue,
    pub weekly_goal: String,
    pub days: BTreeMap<Weekday, Day>,
}

/// Date range chosen at upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub start_date: String,
    pub end_date: String,
}

impl Timeframe {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: start.format(CANONICAL_DATE_FORMAT).to_string(),
            end_date: end.format(CANONICAL_DATE_FORMAT).to_string(),
        }
    }
}

/// A scanned logbook plus its annotation document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogbookEntry {
    /// Uploaded file name
    pub id: String,
    /// Blob store reference of the original PDF
    pub pdf_file_id: String,
    pub timeframe: Timeframe,
    pub total_pages: u32,
    pub weeks: Vec<Week>,
}

/// Projection of an entry used for selection lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EntrySummary {
    pub internal_id: String,
    pub id: String,
}

/// Raw row of the logbook_entries table
#[derive(Debug, Clone, FromRow)]
pub struct EntryRecord {
    pub internal_id: String,
    pub entry_id: String,
    /// JSON-encoded LogbookEntry
    pub document: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equality filter for single-entry lookups
#[derive(Debug, Clone, Copy)]
pub enum EntryFilter<'a> {
    InternalId(&'a str),
    EntryId(&'a str),
}
