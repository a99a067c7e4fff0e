//! Services module
//!
//! Business logic that coordinates the repository, blob store and renderer.

pub mod edit_buffer;
pub mod logbook;

pub use edit_buffer::{EditBuffer, EditTarget, Marker};
pub use logbook::{CreateOutcome, LogbookService, NewUpload, OpenedEntry};
