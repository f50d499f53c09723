//! Model handle
//!
//! The pipeline artifact is loaded once at startup and shared read-only.
//! A missing or unreadable artifact leaves the server running without a
//! model; `/predict` then answers 503.

use haber_common::Verdict;
use haber_ml::TrainedPipeline;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub type ModelHandle = Arc<TrainedPipeline>;

/// Load the artifact at `path`, logging instead of failing
pub fn load_model(path: &Path) -> Option<ModelHandle> {
    match TrainedPipeline::load(path) {
        Ok(pipeline) => {
            info!(
                "Model ready: {} ({} features, labels {:?})",
                pipeline.variant,
                pipeline.vectorizer.n_features(),
                pipeline.labels
            );
            Some(Arc::new(pipeline))
        }
        Err(e) => {
            error!(
                "Failed to load model from {}: {}; /predict will be unavailable",
                path.display(),
                e
            );
            None
        }
    }
}

/// Clean, classify and map to a verdict
pub fn classify(pipeline: &TrainedPipeline, text: &str) -> Verdict {
    Verdict::from_label(pipeline.predict(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_artifact_yields_no_model() {
        let dir = TempDir::new().unwrap();
        assert!(load_model(&dir.path().join("model_boost.json")).is_none());
    }

    #[test]
    fn test_corrupt_artifact_yields_no_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model_svm.json");
        std::fs::write(&path, "{\"format_version\": 1").unwrap();
        assert!(load_model(&path).is_none());
    }
}
