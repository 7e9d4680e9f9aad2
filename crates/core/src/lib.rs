//! Core types and shared functionality for kerb.
//!
//! This crate provides:
//! - Cache store trait with memory (LRU) and disk (file-per-key) backends
//! - Request fingerprinting for cache keys
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;

pub use cache::{CacheStore, CachedResponse, DiskCache, MemoryCache};
pub use config::GovernorConfig;
pub use error::Error;
