//! Logbook library
//!
//! Core of the logbook editor: schedule generation, document normalization,
//! storage and the entry lifecycle. The `logbook` binary is a thin front end.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod normalize;
pub mod render;
pub mod schedule;
pub mod services;
pub mod storage;
