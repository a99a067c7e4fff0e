//! Application configuration
//!
//! Central location for constants, resource limits and the runtime
//! configuration the front end resolves from flags and environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

// ===== Schedule =====

/// Weekday labels of the five-day work week, in insertion order
pub const WEEKDAY_NAMES: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Days from a week's first day to its last working day
pub const WORK_WEEK_SPAN_DAYS: u64 = 4;

/// Days from a week's last working day to the first day of the next week
pub const WEEKEND_SKIP_DAYS: u64 = 3;

/// Days added per PDF page when no end date is given at upload
pub const DEFAULT_DAYS_PER_PAGE: u64 = 7;

/// Canonical date format used for every date at rest
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

// ===== Viewer =====

/// Zoom factors offered by the page viewer
pub const ZOOM_LEVELS: [f32; 5] = [0.5, 1.0, 1.5, 2.0, 3.0];

/// Zoom factor used when none is requested
pub const DEFAULT_ZOOM: f32 = 1.0;

// ===== Annotation markers =====

pub const MARKER_NAME: &str = "[NAME]";
pub const MARKER_ILLEGIBLE: &str = "[NICHT LESBAR]";
pub const MARKER_NO_ENTRY: &str = "[KEIN EINTRAG]";

// ===== Storage =====

/// SQLite database file inside the data directory
pub const DATABASE_FILE_NAME: &str = "logbook.db";

/// Blob store root inside the data directory
pub const BLOB_DIR_NAME: &str = "blobs";

/// Data directory used when neither flag nor environment sets one
pub const DEFAULT_DATA_DIR: &str = "logbook-data";

/// Maximum pooled SQLite connections
pub const DATABASE_MAX_CONNECTIONS: u32 = 5;

/// How long SQLite waits on a locked database before failing
pub const DATABASE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Explicit pdfium shared library; the system library is used when unset
    pub pdfium_library: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            pdfium_library: None,
        }
    }

    pub fn with_pdfium_library(mut self, path: Option<PathBuf>) -> Self {
        self.pdfium_library = path;
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join(BLOB_DIR_NAME)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
