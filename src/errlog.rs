use chrono::Local;
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::error;

/// Append-only failure journal: one timestamped human-readable line per
/// failed loop iteration. Created on first use.
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one entry. A failing append must not take the loop down, so
    /// the io error is only reported through tracing.
    pub fn record(&self, entry: &dyn Display) {
        let line = format!("[{}] {entry}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        if let Err(e) = self.append(&line) {
            error!(error = %e, path = %self.path.display(), "failed to append to error log");
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}
