//! In-memory edit buffer
//!
//! Holds the documents a user has open, keyed by internal id. Edits land
//! here and only reach the store when the entry is saved.

use crate::config::{MARKER_ILLEGIBLE, MARKER_NAME, MARKER_NO_ENTRY};
use crate::database::{LogbookEntry, Weekday};
use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Fixed annotation appended to a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// A personal name was redacted
    Name,
    /// The handwriting cannot be read
    Illegible,
    /// Nothing was written
    NoEntry,
}

impl Marker {
    pub fn text(self) -> &'static str {
        match self {
            Marker::Name => MARKER_NAME,
            Marker::Illegible => MARKER_ILLEGIBLE,
            Marker::NoEntry => MARKER_NO_ENTRY,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl FromStr for Marker {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Marker::Name),
            "illegible" => Ok(Marker::Illegible),
            "no-entry" | "no_entry" | "noentry" => Ok(Marker::NoEntry),
            _ => Err(AppError::Validation(format!("Unknown marker: {}", s))),
        }
    }
}

/// Editable text field of a logbook entry; weeks are numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    WeeklyGoal { week: u32 },
    Day { week: u32, weekday: Weekday },
}

impl EditTarget {
    pub fn week(self) -> u32 {
        match self {
            EditTarget::WeeklyGoal { week } | EditTarget::Day { week, .. } => week,
        }
    }
}

struct BufferedEntry {
    entry: LogbookEntry,
    dirty: bool,
}

/// Open documents keyed by internal id
#[derive(Clone, Default)]
pub struct EditBuffer {
    entries: Arc<Mutex<HashMap<String, BufferedEntry>>>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BufferedEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a freshly fetched document into the buffer, replacing unsaved edits
    pub fn load(&self, internal_id: &str, entry: LogbookEntry) {
        let previous = self.lock().insert(
            internal_id.to_string(),
            BufferedEntry {
                entry,
                dirty: false,
            },
        );

        if previous.is_some_and(|p| p.dirty) {
            tracing::warn!("Discarded unsaved edits of entry {} on reload", internal_id);
        }
    }

    /// Copy of the buffered document
    pub fn get(&self, internal_id: &str) -> Result<LogbookEntry> {
        self.lock()
            .get(internal_id)
            .map(|buffered| buffered.entry.clone())
            .ok_or_else(|| AppError::NotOpen(internal_id.to_string()))
    }

    pub fn is_open(&self, internal_id: &str) -> bool {
        self.lock().contains_key(internal_id)
    }

    pub fn is_dirty(&self, internal_id: &str) -> bool {
        self.lock()
            .get(internal_id)
            .is_some_and(|buffered| buffered.dirty)
    }

    /// Replace a field's text, returns the new text
    pub fn set_text(&self, internal_id: &str, target: EditTarget, text: String) -> Result<String> {
        self.edit(internal_id, target, |field| *field = text)
    }

    /// Append a marker separated by one space, returns the new text
    pub fn append_marker(
        &self,
        internal_id: &str,
        target: EditTarget,
        marker: Marker,
    ) -> Result<String> {
        self.edit(internal_id, target, |field| {
            field.push(' ');
            field.push_str(marker.text());
        })
    }

    fn edit(
        &self,
        internal_id: &str,
        target: EditTarget,
        apply: impl FnOnce(&mut String),
    ) -> Result<String> {
        let mut entries = self.lock();
        let buffered = entries
            .get_mut(internal_id)
            .ok_or_else(|| AppError::NotOpen(internal_id.to_string()))?;

        let field = field_mut(&mut buffered.entry, target)?;
        apply(field);
        let text = field.clone();

        buffered.dirty = true;
        Ok(text)
    }

    /// Store the saved version and clear the dirty flag
    pub fn commit(&self, internal_id: &str, entry: LogbookEntry) {
        self.lock().insert(
            internal_id.to_string(),
            BufferedEntry {
                entry,
                dirty: false,
            },
        );
    }

    /// Drop an entry from the buffer, returns whether it had unsaved edits
    pub fn discard(&self, internal_id: &str) -> bool {
        self.lock()
            .remove(internal_id)
            .is_some_and(|buffered| buffered.dirty)
    }
}

fn field_mut(entry: &mut LogbookEntry, target: EditTarget) -> Result<&mut String> {
    let total = entry.weeks.len();
    let week_number = target.week() as usize;

    let week = week_number
        .checked_sub(1)
        .and_then(|index| entry.weeks.get_mut(index))
        .ok_or(AppError::WeekOutOfRange {
            week: week_number,
            total,
        })?;

    match target {
        EditTarget::WeeklyGoal { .. } => Ok(&mut week.weekly_goal),
        EditTarget::Day { weekday, .. } => week
            .days
            .get_mut(&weekday)
            .map(|day| &mut day.text)
            .ok_or_else(|| {
                AppError::Validation(format!("Week {} has no {}", week_number, weekday))
            }),
    }
}
