//! Batch result reporting.
//!
//! Collects one record per attempted job and renders a plain-text
//! summary: encoded files with their elapsed times, failures with
//! captured error text, and the batch total. The report can be written
//! to a path, emailed via the system `sendmail`, or both; configuring
//! neither makes reporting a no-op.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Sender address stamped on emailed reports.
const EMAIL_FROM: &str = "batchencode@localhost";

/// Error type for reporting operations. Reporting failures never touch
/// job statuses; callers log them and fold them into the exit code only.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Could not write the report file
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// The sendmail invocation failed
    #[error("Failed to email report: {0}")]
    Email(String),
}

/// Result record for one attempted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Source file basename
    pub source: String,
    /// Full destination path of the encoded file
    pub dest: String,
    /// Did the transcoder exit zero?
    pub success: bool,
    /// Captured error text for failures
    pub error_text: Option<String>,
    /// Wall-clock seconds the job took
    pub elapsed_secs: u64,
}

impl Encoded {
    /// Elapsed time as `hh:mm:ss`, hours omitted when zero.
    pub fn elapsed_display(&self) -> String {
        let hours = self.elapsed_secs / 3600;
        let minutes = (self.elapsed_secs % 3600) / 60;
        let seconds = self.elapsed_secs % 60;
        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }
}

/// Accumulates per-job results over a batch run.
#[derive(Debug)]
pub struct EncodeReport {
    encoded: Vec<Encoded>,
    failures: Vec<Encoded>,
    started: Instant,
}

impl Default for EncodeReport {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeReport {
    pub fn new() -> Self {
        Self {
            encoded: Vec::new(),
            failures: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Record one attempted job.
    pub fn add(&mut self, record: Encoded) {
        if record.success {
            self.encoded.push(record);
        } else {
            self.failures.push(record);
        }
    }

    pub fn succeeded(&self) -> usize {
        self.encoded.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Render the human-readable text report.
    pub fn render(&self) -> String {
        let mut lines = vec!["Video Encoding Report".to_string(), String::new()];

        if !self.encoded.is_empty() {
            lines.extend(header("Encoded files"));
            for record in &self.encoded {
                lines.push(format!("{} [{}]", record.dest, record.elapsed_display()));
            }
            lines.push(String::new());
        }

        if !self.failures.is_empty() {
            lines.extend(header("Encoding failures"));
            for record in &self.failures {
                lines.extend(header(&record.source));
                if let Some(err) = &record.error_text {
                    lines.push(err.clone());
                }
                lines.push(format!("Total elapsed: {}", record.elapsed_display()));
                lines.push(String::new());
            }
        }

        lines.extend(header("Total time"));
        let total = self.started.elapsed().as_secs();
        lines.push(format!(
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        ));
        lines.push(String::new());

        lines.join("\n")
    }

    /// Write the report to a path.
    ///
    /// A directory path gets a timestamped filename inside it; missing
    /// parent directories are created.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let path = path.as_ref();

        let full_path = if path.is_dir() {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            path.join(format!("batch-encoding-report-{}.txt", stamp))
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            path.to_path_buf()
        };

        fs::write(full_path, self.render())?;
        Ok(())
    }

    /// Email the report by piping a constructed message to `sendmail -t`.
    /// The transport is a black box; we only check its exit status.
    pub fn email(&self, to_address: &str) -> Result<(), ReportError> {
        let message = format!(
            "To: {}\nFrom: {}\nSubject: Video Encoding Report\n\n{}",
            to_address,
            EMAIL_FROM,
            self.render()
        );

        let mut child = Command::new("sendmail")
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ReportError::Email(e.to_string()))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(message.as_bytes())
                .map_err(|e| ReportError::Email(e.to_string()))?;
        }

        let status = child.wait().map_err(|e| ReportError::Email(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(ReportError::Email(format!(
                "sendmail exited with status {}",
                status
            )))
        }
    }
}

/// An underlined section header, as the report format uses throughout.
fn header(text: &str) -> Vec<String> {
    vec![text.to_string(), "-".repeat(text.len()), String::new()]
}
