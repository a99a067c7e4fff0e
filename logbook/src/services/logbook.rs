//! Logbook service
//!
//! Orchestrates the lifecycle of a logbook entry: upload, selection,
//! page viewing, editing and saving. Integrates Repository, BlobStore
//! and the page renderer, and owns the edit buffer.

use super::edit_buffer::{EditBuffer, EditTarget, Marker};
use crate::config::DEFAULT_DAYS_PER_PAGE;
use crate::database::{
    EntryFilter, EntrySummary, LogbookEntry, Repository, Timeframe, Week, Weekday,
};
use crate::error::{AppError, Result};
use crate::normalize::{load_document, normalize_and_validate, Document};
use crate::render::{PageRenderer, RenderedPage, ZoomLevel};
use crate::schedule::generate_weeks;
use crate::storage::BlobStore;
use chrono::{Days, NaiveDate};
use std::collections::HashSet;
use std::sync::Arc;

/// A PDF handed in for a new logbook entry
#[derive(Debug, Clone)]
pub struct NewUpload<'a> {
    pub filename: &'a str,
    pub data: &'a [u8],
    pub start_date: NaiveDate,
    /// Defaults to seven days per page after `start_date`
    pub end_date: Option<NaiveDate>,
}

/// Result of an upload
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created {
        internal_id: String,
        entry: LogbookEntry,
    },
    /// An entry with this id is already stored; nothing was inserted
    AlreadyExists(String),
}

/// An entry loaded for editing
#[derive(Debug, Clone)]
pub struct OpenedEntry {
    pub internal_id: String,
    pub entry: LogbookEntry,
    /// Size of the original PDF in bytes
    pub pdf_size: usize,
}

/// Service for managing logbook entries
#[derive(Clone)]
pub struct LogbookService {
    repo: Repository,
    blob_store: BlobStore,
    renderer: Arc<dyn PageRenderer>,
    buffer: EditBuffer,
}

impl LogbookService {
    pub fn new(repo: Repository, blob_store: BlobStore, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            repo,
            blob_store,
            renderer,
            buffer: EditBuffer::new(),
        }
    }

    /// Store an uploaded PDF and create its logbook entry.
    ///
    /// An existing entry with the same file name short-circuits before
    /// anything is written. Failures after the PDF was stored leave the blob
    /// behind; see [`LogbookService::find_orphaned_pdfs`].
    pub async fn create_entry(&self, upload: NewUpload<'_>) -> Result<CreateOutcome> {
        if upload.filename.trim().is_empty() {
            return Err(AppError::Validation("File name is empty".to_string()));
        }
        let id = upload.filename.to_string();

        if self.repo.find_one(EntryFilter::EntryId(&id)).await?.is_some() {
            tracing::info!("Logbook entry already exists: {}", id);
            return Ok(CreateOutcome::AlreadyExists(id));
        }

        tracing::info!(
            "Creating logbook entry: {} ({} bytes)",
            id,
            upload.data.len()
        );

        let pdf_file_id = self.blob_store.write(upload.data, &id).await?;

        match self.insert_new_entry(&id, &pdf_file_id, &upload).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!(
                    "Entry {} was not created; PDF blob {} is left unreferenced",
                    id,
                    pdf_file_id
                );
                Err(e)
            }
        }
    }

    async fn insert_new_entry(
        &self,
        id: &str,
        pdf_file_id: &str,
        upload: &NewUpload<'_>,
    ) -> Result<CreateOutcome> {
        let total_pages = self.count_pages(upload.data.to_vec()).await?;

        let start_date = upload.start_date;
        let end_date = upload
            .end_date
            .unwrap_or_else(|| default_end_date(start_date, total_pages));

        if end_date < start_date {
            tracing::warn!(
                "End date {} precedes start date {} for {}",
                end_date,
                start_date,
                id
            );
        }

        let mut entry = LogbookEntry {
            id: id.to_string(),
            pdf_file_id: pdf_file_id.to_string(),
            timeframe: Timeframe::new(start_date, end_date),
            total_pages,
            weeks: generate_weeks(start_date, end_date, total_pages),
        };

        let document = normalize_and_validate(&mut entry)?;

        match self.repo.insert_entry(&document).await {
            Ok(internal_id) => {
                tracing::info!(
                    "Logbook entry created: {} as {} ({} pages, {} weeks)",
                    id,
                    internal_id,
                    entry.total_pages,
                    entry.weeks.len()
                );
                Ok(CreateOutcome::Created { internal_id, entry })
            }
            Err(AppError::DuplicateEntry(existing)) => {
                tracing::warn!("Logbook entry {} was created concurrently", existing);
                Ok(CreateOutcome::AlreadyExists(existing))
            }
            Err(e) => Err(e),
        }
    }

    async fn count_pages(&self, pdf: Vec<u8>) -> Result<u32> {
        let renderer = Arc::clone(&self.renderer);

        tokio::task::spawn_blocking(move || renderer.page_count(&pdf))
            .await
            .map_err(|e| AppError::Render(format!("Page count task panicked: {}", e)))?
    }

    /// List internal id and name of every entry
    pub async fn list_entries(&self) -> Result<Vec<EntrySummary>> {
        self.repo.list_entries().await
    }

    /// Stored document of an entry as JSON
    pub async fn get_document(&self, internal_id: &str) -> Result<Document> {
        let record = self.repo.get_entry(internal_id).await?;
        Ok(serde_json::from_str(&record.document)?)
    }

    /// Stored version of an entry, ignoring unsaved edits
    pub async fn get_entry(&self, internal_id: &str) -> Result<LogbookEntry> {
        load_document(self.get_document(internal_id).await?)
    }

    /// Load an entry and check that its PDF is readable.
    ///
    /// Reopening an entry replaces any unsaved edits with the stored version.
    pub async fn open_entry(&self, internal_id: &str) -> Result<OpenedEntry> {
        let entry = self.get_entry(internal_id).await?;
        let pdf = self.blob_store.read(&entry.pdf_file_id).await?;

        self.buffer.load(internal_id, entry.clone());

        tracing::info!(
            "Opened logbook entry {} ({}, {} pages)",
            internal_id,
            entry.id,
            entry.total_pages
        );

        Ok(OpenedEntry {
            internal_id: internal_id.to_string(),
            entry,
            pdf_size: pdf.len(),
        })
    }

    /// Buffered version of an open entry, including unsaved edits
    pub fn current_entry(&self, internal_id: &str) -> Result<LogbookEntry> {
        self.buffer.get(internal_id)
    }

    /// Week shown next to a zero-based PDF page
    pub fn week_for_page(&self, internal_id: &str, page_index: usize) -> Result<Week> {
        let entry = self.buffer.get(internal_id)?;
        let total = entry.weeks.len();

        entry
            .weeks
            .into_iter()
            .nth(page_index)
            .ok_or(AppError::WeekOutOfRange {
                week: page_index + 1,
                total,
            })
    }

    /// Render a zero-based page of an open entry
    pub async fn render_page(
        &self,
        internal_id: &str,
        page_index: usize,
        zoom: ZoomLevel,
    ) -> Result<RenderedPage> {
        let entry = self.buffer.get(internal_id)?;

        let total = entry.total_pages as usize;
        if page_index >= total {
            return Err(AppError::PageOutOfRange {
                page: page_index + 1,
                total,
            });
        }

        let pdf = self.blob_store.read(&entry.pdf_file_id).await?;
        let renderer = Arc::clone(&self.renderer);

        tokio::task::spawn_blocking(move || renderer.render_page(&pdf, page_index, zoom))
            .await
            .map_err(|e| AppError::Render(format!("Render task panicked: {}", e)))?
    }

    /// Replace the weekly goal of a week (numbered from 1)
    pub fn set_weekly_goal(&self, internal_id: &str, week: u32, text: String) -> Result<String> {
        self.buffer
            .set_text(internal_id, EditTarget::WeeklyGoal { week }, text)
    }

    /// Replace the text of one day
    pub fn set_day_text(
        &self,
        internal_id: &str,
        week: u32,
        weekday: Weekday,
        text: String,
    ) -> Result<String> {
        self.buffer
            .set_text(internal_id, EditTarget::Day { week, weekday }, text)
    }

    /// Append an annotation marker to a weekly goal or day text
    pub fn append_marker(
        &self,
        internal_id: &str,
        target: EditTarget,
        marker: Marker,
    ) -> Result<String> {
        self.buffer.append_marker(internal_id, target, marker)
    }

    pub fn has_unsaved_changes(&self, internal_id: &str) -> bool {
        self.buffer.is_dirty(internal_id)
    }

    /// Drop an open entry, returns whether unsaved edits were lost
    pub fn discard(&self, internal_id: &str) -> bool {
        self.buffer.discard(internal_id)
    }

    /// Normalize the buffered document and replace the stored one with it
    pub async fn save(&self, internal_id: &str) -> Result<LogbookEntry> {
        let mut entry = self.buffer.get(internal_id)?;

        let document = normalize_and_validate(&mut entry)?;
        self.repo.update_entry(internal_id, &document).await?;

        self.buffer.commit(internal_id, entry.clone());

        tracing::info!("Logbook entry {} saved", internal_id);
        Ok(entry)
    }

    /// Stored PDFs that no entry references
    pub async fn find_orphaned_pdfs(&self) -> Result<Vec<String>> {
        let mut referenced = HashSet::new();
        for record in self.repo.list_records().await? {
            let document: Document = serde_json::from_str(&record.document).map_err(|e| {
                tracing::warn!(
                    "Stored document of entry {} is not valid JSON: {}",
                    record.internal_id,
                    e
                );
                e
            })?;
            if let Some(pdf_file_id) = document.get("pdf_file_id").and_then(|id| id.as_str()) {
                referenced.insert(pdf_file_id.to_string());
            }
        }

        let mut orphans: Vec<String> = self
            .blob_store
            .list_all()
            .await?
            .into_iter()
            .filter(|hash| !referenced.contains(hash))
            .collect();
        orphans.sort();

        Ok(orphans)
    }
}

fn default_end_date(start_date: NaiveDate, total_pages: u32) -> NaiveDate {
    start_date
        .checked_add_days(Days::new(DEFAULT_DAYS_PER_PAGE * u64::from(total_pages)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, DateValue};
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    /// Renderer that accepts anything starting with the PDF magic bytes
    struct StubRenderer {
        pages: u32,
    }

    impl PageRenderer for StubRenderer {
        fn page_count(&self, pdf: &[u8]) -> Result<u32> {
            if pdf.starts_with(b"%PDF") {
                Ok(self.pages)
            } else {
                Err(AppError::Render("Failed to open PDF: not a PDF".to_string()))
            }
        }

        fn render_page(
            &self,
            _pdf: &[u8],
            page_index: usize,
            zoom: ZoomLevel,
        ) -> Result<RenderedPage> {
            Ok(RenderedPage {
                page_index,
                zoom,
                width: 1,
                height: 1,
                png: vec![0x89, b'P', b'N', b'G'],
            })
        }
    }

    async fn create_test_service(pages: u32) -> (LogbookService, BlobStore, Repository, TempDir) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);

        let temp_dir = TempDir::new().unwrap();
        let blob_store = BlobStore::new(temp_dir.path().join("blobs"));
        blob_store.initialize().await.unwrap();

        let service = LogbookService::new(
            repo.clone(),
            blob_store.clone(),
            Arc::new(StubRenderer { pages }),
        );
        (service, blob_store, repo, temp_dir)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn upload<'a>(filename: &'a str, data: &'a [u8]) -> NewUpload<'a> {
        NewUpload {
            filename,
            data,
            start_date: date(2024, 1, 1),
            end_date: Some(date(2024, 1, 31)),
        }
    }

    async fn create(service: &LogbookService, filename: &str) -> String {
        match service
            .create_entry(upload(filename, b"%PDF-1.7 logbook"))
            .await
            .unwrap()
        {
            CreateOutcome::Created { internal_id, .. } => internal_id,
            CreateOutcome::AlreadyExists(id) => panic!("unexpected duplicate: {}", id),
        }
    }

    #[tokio::test]
    async fn test_create_entry() {
        let (service, blob_store, _repo, _temp) = create_test_service(5).await;

        let outcome = service
            .create_entry(upload("2024.pdf", b"%PDF-1.7 logbook"))
            .await
            .unwrap();

        let CreateOutcome::Created { internal_id, entry } = outcome else {
            panic!("entry should be created");
        };

        assert_eq!(entry.id, "2024.pdf");
        assert_eq!(entry.total_pages, 5);
        assert_eq!(entry.weeks.len(), 5);
        assert_eq!(entry.timeframe.start_date, "2024-01-01");
        assert_eq!(
            entry.weeks[1].start_date,
            DateValue::Canonical("2024-01-08".to_string())
        );
        assert!(blob_store.exists(&entry.pdf_file_id).await.unwrap());

        let stored = service.get_entry(&internal_id).await.unwrap();
        assert_eq!(stored, entry);
    }

    #[tokio::test]
    async fn test_default_end_date_spans_seven_days_per_page() {
        let (service, _blobs, _repo, _temp) = create_test_service(4).await;

        let outcome = service
            .create_entry(NewUpload {
                filename: "open.pdf",
                data: b"%PDF-1.4",
                start_date: date(2024, 1, 1),
                end_date: None,
            })
            .await
            .unwrap();

        let CreateOutcome::Created { entry, .. } = outcome else {
            panic!("entry should be created");
        };
        assert_eq!(entry.timeframe.end_date, "2024-01-29");
        assert_eq!(entry.weeks.len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_upload_writes_nothing() {
        let (service, blob_store, repo, _temp) = create_test_service(2).await;

        create(&service, "dup.pdf").await;
        let blobs_before = blob_store.list_all().await.unwrap();

        let outcome = service
            .create_entry(upload("dup.pdf", b"%PDF-1.7 different bytes"))
            .await
            .unwrap();

        assert!(matches!(outcome, CreateOutcome::AlreadyExists(ref id) if id == "dup.pdf"));
        assert_eq!(blob_store.list_all().await.unwrap(), blobs_before);
        assert_eq!(repo.list_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_leaves_orphan() {
        let (service, _blobs, repo, _temp) = create_test_service(2).await;

        let err = service
            .create_entry(upload("broken.pdf", b"not a pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Render(_)));
        assert!(repo
            .find_one(EntryFilter::EntryId("broken.pdf"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(service.find_orphaned_pdfs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_missing_entry() {
        let (service, _blobs, _repo, _temp) = create_test_service(1).await;

        let err = service.open_entry("missing").await.unwrap_err();
        assert!(matches!(err, AppError::EntryNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_entry_with_missing_pdf() {
        let (service, _blobs, repo, _temp) = create_test_service(1).await;

        let internal_id = create(&service, "lost.pdf").await;

        let mut document = service.get_document(&internal_id).await.unwrap();
        document["pdf_file_id"] = serde_json::json!("e".repeat(64));
        repo.update_entry(&internal_id, &document).await.unwrap();

        let err = service.open_entry(&internal_id).await.unwrap_err();
        assert!(matches!(err, AppError::BlobNotFound(_)));
        assert!(service.current_entry(&internal_id).is_err());
    }

    #[tokio::test]
    async fn test_edit_and_save() {
        let (service, _blobs, _repo, _temp) = create_test_service(3).await;
        let internal_id = create(&service, "edit.pdf").await;

        service.open_entry(&internal_id).await.unwrap();
        service
            .set_weekly_goal(&internal_id, 1, "Build the gearbox".to_string())
            .unwrap();
        service
            .set_day_text(&internal_id, 2, Weekday::Wednesday, "Filed parts".to_string())
            .unwrap();
        service
            .append_marker(
                &internal_id,
                EditTarget::Day {
                    week: 2,
                    weekday: Weekday::Wednesday,
                },
                Marker::Illegible,
            )
            .unwrap();

        assert!(service.has_unsaved_changes(&internal_id));

        // Unsaved edits are not visible in the store
        let stored = service.get_entry(&internal_id).await.unwrap();
        assert!(stored.weeks[0].weekly_goal.is_empty());

        let saved = service.save(&internal_id).await.unwrap();
        assert!(!service.has_unsaved_changes(&internal_id));

        let stored = service.get_entry(&internal_id).await.unwrap();
        assert_eq!(stored, saved);
        assert_eq!(stored.weeks[0].weekly_goal, "Build the gearbox");
        assert_eq!(
            stored.weeks[1].days[&Weekday::Wednesday].text,
            "Filed parts [NICHT LESBAR]"
        );
    }

    #[tokio::test]
    async fn test_discard_drops_edits() {
        let (service, _blobs, _repo, _temp) = create_test_service(2).await;
        let internal_id = create(&service, "discard.pdf").await;

        service.open_entry(&internal_id).await.unwrap();
        service
            .set_weekly_goal(&internal_id, 1, "temp".to_string())
            .unwrap();

        assert!(service.discard(&internal_id));

        let err = service.save(&internal_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotOpen(_)));

        let stored = service.get_entry(&internal_id).await.unwrap();
        assert!(stored.weeks[0].weekly_goal.is_empty());
    }

    #[tokio::test]
    async fn test_render_page_bounds() {
        let (service, _blobs, _repo, _temp) = create_test_service(2).await;
        let internal_id = create(&service, "render.pdf").await;

        let err = service
            .render_page(&internal_id, 0, ZoomLevel::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotOpen(_)));

        service.open_entry(&internal_id).await.unwrap();

        let page = service
            .render_page(&internal_id, 1, ZoomLevel::Double)
            .await
            .unwrap();
        assert_eq!(page.page_index, 1);
        assert_eq!(page.zoom, ZoomLevel::Double);

        let err = service
            .render_page(&internal_id, 2, ZoomLevel::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PageOutOfRange { page: 3, total: 2 }));
    }

    #[tokio::test]
    async fn test_week_for_page() {
        let (service, _blobs, _repo, _temp) = create_test_service(2).await;
        let internal_id = create(&service, "weeks.pdf").await;
        service.open_entry(&internal_id).await.unwrap();

        let week = service.week_for_page(&internal_id, 1).unwrap();
        assert_eq!(week.week_number, 2);

        let err = service.week_for_page(&internal_id, 5).unwrap_err();
        assert!(matches!(err, AppError::WeekOutOfRange { week: 6, total: 2 }));
    }

    #[tokio::test]
    async fn test_list_entries() {
        let (service, _blobs, _repo, _temp) = create_test_service(1).await;

        let first = create(&service, "a.pdf").await;
        create(&service, "b.pdf").await;

        let entries = service.list_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].internal_id, first);
        assert_eq!(entries[0].id, "a.pdf");
        assert!(service.find_orphaned_pdfs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_name_is_kept_verbatim() {
        let (service, _blobs, repo, _temp) = create_test_service(1).await;

        let long_a = format!("{}a.pdf", "x".repeat(260));
        let long_b = format!("{}b.pdf", "x".repeat(260));

        for (filename, data) in [
            ("ab.pdf", b"%PDF first".as_slice()),
            ("a\\b.pdf", b"%PDF second".as_slice()),
            (long_a.as_str(), b"%PDF third".as_slice()),
            (long_b.as_str(), b"%PDF fourth".as_slice()),
        ] {
            let outcome = service.create_entry(upload(filename, data)).await.unwrap();
            let CreateOutcome::Created { entry, .. } = outcome else {
                panic!("{} should be created", filename);
            };
            assert_eq!(entry.id, filename);
        }

        let ids: Vec<String> = repo
            .list_entries()
            .await
            .unwrap()
            .into_iter()
            .map(|summary| summary.id)
            .collect();
        assert_eq!(ids, vec!["ab.pdf".to_string(), "a\\b.pdf".to_string(), long_a, long_b]);
    }

    #[tokio::test]
    async fn test_empty_file_name_is_rejected() {
        let (service, blob_store, _repo, _temp) = create_test_service(1).await;

        let err = service
            .create_entry(upload("  ", b"%PDF"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(blob_store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orphan_scan_fails_on_corrupt_record() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();

        let temp_dir = TempDir::new().unwrap();
        let blob_store = BlobStore::new(temp_dir.path().join("blobs"));
        blob_store.initialize().await.unwrap();

        let service = LogbookService::new(
            Repository::new(pool.clone()),
            blob_store,
            Arc::new(StubRenderer { pages: 1 }),
        );
        let internal_id = create(&service, "corrupt.pdf").await;

        sqlx::query("UPDATE logbook_entries SET document = '{not json' WHERE internal_id = ?")
            .bind(&internal_id)
            .execute(&pool)
            .await
            .unwrap();

        let err = service.find_orphaned_pdfs().await.unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
