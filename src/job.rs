//! # Print Jobs
//!
//! A job is the ordered sequence of g-code lines for one print. The host's
//! job renderer supplies it through [`JobSource`]; the transfer session never
//! reaches into global application state to find the current job.
//!
//! Lines are written to the transfer buffer verbatim. Sources are expected to
//! keep their own line terminators (a "line" may also be a whole layer chunk).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, WirelessPrintError};

/// Provider of the job to transfer.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Name of the job, used when the caller does not suggest a file name.
    fn job_name(&self) -> String;

    /// Render the job into its instruction lines.
    async fn lines(&self) -> Result<Vec<String>>;
}

/// An already-rendered job held in memory.
#[derive(Debug, Clone, Default)]
pub struct Job {
    pub name: String,
    pub lines: Vec<String>,
}

impl Job {
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    /// Split text into lines, keeping each `\n` terminator.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, split_lines(text))
    }
}

#[async_trait]
impl JobSource for Job {
    fn job_name(&self) -> String {
        self.name.clone()
    }

    async fn lines(&self) -> Result<Vec<String>> {
        Ok(self.lines.clone())
    }
}

/// A g-code file on disk, read when the transfer starts.
#[derive(Debug, Clone)]
pub struct FileJob {
    path: PathBuf,
}

impl FileJob {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl JobSource for FileJob {
    /// File stem, e.g. `benchy` for `/tmp/benchy.gcode`.
    fn job_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "job".to_string())
    }

    async fn lines(&self) -> Result<Vec<String>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            WirelessPrintError::Job(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(split_lines(&text))
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_from_text_keeps_terminators() {
        let job = Job::from_text("cube", "G28\nG1 X10\nM84");
        assert_eq!(job.lines, vec!["G28\n", "G1 X10\n", "M84"]);
    }

    #[test]
    fn test_from_text_empty() {
        assert!(Job::from_text("empty", "").lines.is_empty());
    }

    #[tokio::test]
    async fn test_job_source_for_job() {
        let job = Job::from_text("cube", "G28\n");
        assert_eq!(job.job_name(), "cube");
        assert_eq!(job.lines().await.unwrap(), vec!["G28\n"]);
    }

    #[tokio::test]
    async fn test_file_job_reads_lines() {
        let mut file = tempfile::Builder::new()
            .prefix("benchy")
            .suffix(".gcode")
            .tempfile()
            .unwrap();
        write!(file, "G28\nG1 Z0.2\n").unwrap();

        let job = FileJob::new(file.path());
        assert!(job.job_name().starts_with("benchy"));
        assert_eq!(job.lines().await.unwrap(), vec!["G28\n", "G1 Z0.2\n"]);
    }

    #[tokio::test]
    async fn test_file_job_missing_file() {
        let job = FileJob::new("/nonexistent/dir/part.gcode");
        assert_eq!(job.job_name(), "part");
        assert!(matches!(job.lines().await, Err(WirelessPrintError::Job(_))));
    }
}
