//! Storage module
//!
//! Provides blob storage for the original PDF bytes.

pub mod blob_store;

pub use blob_store::BlobStore;
