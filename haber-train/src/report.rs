//! Human-readable performance report

use haber_common::Result;
use haber_ml::{ClassificationReport, Label, TrainedPipeline, Variant};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

/// Report file inside the output directory; one per variant so runs of
/// different variants do not overwrite each other
pub fn report_file_name(variant: Variant) -> String {
    format!("performance_report_{}.txt", variant.as_str())
}

pub fn render_report(
    pipeline: &TrainedPipeline,
    report: &ClassificationReport,
    confusion: &[Vec<usize>],
    labels: &[Label],
) -> String {
    let mut out = String::new();
    let config = pipeline.vectorizer.config();

    // Writing to a String cannot fail
    let _ = writeln!(out, "Variant: {}", pipeline.variant);
    let _ = writeln!(out, "Trained: {}", pipeline.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(
        out,
        "Vectorizer: {} features, ngram {:?}",
        pipeline.vectorizer.n_features(),
        config.ngram_range
    );
    let _ = writeln!(out, "Accuracy (test set): {:.4}", report.accuracy);
    let _ = writeln!(out, "Classification report:");
    out.push_str(&report.render());

    let _ = writeln!(out, "\nConfusion matrix (rows: true, columns: predicted):");
    let _ = write!(out, "{:>6}", "");
    for label in labels {
        let _ = write!(out, "{:>6}", label);
    }
    out.push('\n');
    for (label, row) in labels.iter().zip(confusion) {
        let _ = write!(out, "{:>6}", label);
        for count in row {
            let _ = write!(out, "{:>6}", count);
        }
        out.push('\n');
    }

    out
}

pub fn write_report(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, text)?;
    info!("Performance report written: {}", path.display());
    Ok(())
}
