//! # Haber Train
//!
//! Offline training for the three classifier variants. Each run loads the
//! labeled sources, cleans, splits, fits, evaluates, and writes the model
//! artifact (plus the performance report where enabled).

pub mod report;
pub mod variants;

pub use report::{render_report, report_file_name, write_report};
pub use variants::{run_variant, TrainingOutcome, VariantSettings};
