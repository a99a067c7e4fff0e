//! Application state and initialization
//!
//! Opens the stores once at start-up and hands them to the services.
//! Nothing is global; callers own the [`AppState`] and shut it down.

use crate::config::AppConfig;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::render::PageRenderer;
use crate::services::LogbookService;
use crate::storage::BlobStore;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repo: Repository,
    pub blob_store: BlobStore,
    pub logbook_service: LogbookService,
}

impl AppState {
    /// Create directories, open the database and blob store, wire the services
    pub async fn initialize(config: AppConfig, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("Data directory: {:?}", config.data_dir());

        tokio::fs::create_dir_all(config.data_dir()).await?;

        let pool = create_pool(&config.database_path()).await?;
        let repo = Repository::new(pool);

        let blob_store = BlobStore::new(config.blob_dir());
        blob_store.initialize().await?;

        let logbook_service = LogbookService::new(repo.clone(), blob_store.clone(), renderer);

        tracing::info!("Application initialized successfully");

        Ok(Self {
            config,
            repo,
            blob_store,
            logbook_service,
        })
    }

    /// Close the database pool
    pub async fn shutdown(self) {
        self.repo.close().await;
        tracing::info!("Application shut down");
    }
}
