//! # Haber Common Library
//!
//! Shared code for the haber training pipeline and serving API:
//! - Error type used across crates
//! - TOML configuration loading and config file resolution
//! - SQLite initialization and additive schema synchronization
//! - Label-to-polarity mapping for stored analyses

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod polarity;

pub use error::{Error, Result};
pub use polarity::{Polarity, Verdict};
