//! Segmerge - reconcile and merge recorded stream segments
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod fetch;
pub mod ingest;
pub mod playlist;
pub mod resolve;
pub mod runner;
