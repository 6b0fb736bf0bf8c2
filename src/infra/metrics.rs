// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records one CSV row per training epoch.
//
// Metrics recorded per epoch:
//   - epoch:         the epoch number (1, 2, 3, ...)
//   - total_loss:    sum of batch losses, empty when no
//                    objective produced a loss
//   - learning_rate: rate after the scheduler step
//   - batches:       batches seen
//   - samples:       samples seen
//   - edits_applied: direction edits that succeeded
//   - edits_skipped: direction edits the editor refused
//
// Output file: <save_dir>/metrics.csv
//
// Example CSV output:
//   epoch,total_loss,learning_rate,batches,samples,edits_applied,edits_skipped
//   1,0.812300,5.000e-5,4,32,95,1
//   2,,5.000e-5,4,32,96,0
//
// A growing edits_skipped column usually means the predicted
// factors drift outside the range the editor accepts.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,total_loss,learning_rate,batches,samples,edits_applied,edits_skipped";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// `None` when no sample in the epoch produced a loss
    pub total_loss: Option<f64>,

    pub learning_rate: f64,
    pub batches:       usize,
    pub samples:       usize,
    pub edits_applied: usize,
    pub edits_skipped: usize,
}

impl EpochMetrics {
    fn csv_row(&self) -> String {
        let loss = self.total_loss.map(|l| format!("{l:.6}")).unwrap_or_default();
        format!(
            "{},{},{:.3e},{},{},{},{}",
            self.epoch,
            loss,
            self.learning_rate,
            self.batches,
            self.samples,
            self.edits_applied,
            self.edits_skipped,
        )
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet, so runs
    /// that share a directory append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: total_loss={:?}, skipped={}",
            m.epoch,
            m.total_loss,
            m.edits_skipped,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, total_loss: Option<f64>) -> EpochMetrics {
        EpochMetrics {
            epoch,
            total_loss,
            learning_rate: 5e-5,
            batches:       4,
            samples:       32,
            edits_applied: 95,
            edits_skipped: 1,
        }
    }

    #[test]
    fn test_writes_header_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(1, Some(0.8123))).unwrap();

        // A second logger on the same directory keeps the existing header.
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(2, None)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![
            HEADER,
            "1,0.812300,5.000e-5,4,32,95,1",
            "2,,5.000e-5,4,32,95,1",
        ]);
    }
}
