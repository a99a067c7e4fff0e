//! Document normalization
//!
//! Every document passes through here before it reaches the store: native
//! dates become canonical strings and the top-level structure is checked.
//! Validation is deliberately shallow; weeks and days are not inspected.

use crate::database::{DateValue, LogbookEntry};
use crate::error::{AppError, Result};
use serde_json::Value;

/// JSON form of a logbook entry as it is persisted
pub type Document = Value;

/// Top-level keys every stored document must carry
pub const REQUIRED_FIELDS: [&str; 5] = ["id", "pdf_file_id", "timeframe", "total_pages", "weeks"];

/// Replace native week and day dates with their canonical strings.
///
/// Strings are left untouched, so repeated calls are no-ops.
pub fn standardize_dates(entry: &mut LogbookEntry) {
    for week in &mut entry.weeks {
        standardize(&mut week.start_date);
        standardize(&mut week.end_date);
        for day in week.days.values_mut() {
            standardize(&mut day.date);
        }
    }
}

fn standardize(value: &mut DateValue) {
    if value.is_native() {
        *value = DateValue::Canonical(value.canonical().into_owned());
    }
}

/// Check that a document has every required key and that `weeks` is a list
pub fn validate_structure(document: &Document) -> Result<()> {
    let object = document
        .as_object()
        .ok_or_else(|| AppError::Validation("Document must be an object".to_string()))?;

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(AppError::Validation(format!(
                "Missing required field: {}",
                field
            )));
        }
    }

    if !object["weeks"].is_array() {
        return Err(AppError::Validation(
            "The 'weeks' field must be a list".to_string(),
        ));
    }

    Ok(())
}

/// Standardize dates in place, then produce the validated document to persist
pub fn normalize_and_validate(entry: &mut LogbookEntry) -> Result<Document> {
    standardize_dates(entry);

    let document = serde_json::to_value(&*entry)?;
    validate_structure(&document)?;

    Ok(document)
}

/// Decode a document read from the store
pub fn load_document(document: Document) -> Result<LogbookEntry> {
    validate_structure(&document)?;

    let mut entry: LogbookEntry = serde_json::from_value(document)?;
    standardize_dates(&mut entry);

    Ok(entry)
}
