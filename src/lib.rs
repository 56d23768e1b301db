//! Aniweave - multi-source anime/manga aggregation service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod fallback;
pub mod playback;
pub mod providers;
pub mod proxy;
pub mod reconcile;
pub mod resolver;
pub mod server;
