//! Source archival with path mirroring.
//!
//! After a successful encode the source file can be tucked away under a
//! separate archive root, mirroring the directory structure the encoded
//! output landed in. The archive directory for an output at
//! `<media_root>/Show/S01/ep01.m4v` is `<archive_root>/Show/S01/ep01.m4v/`,
//! holding the original source file, the transcode log, and a JSON
//! snapshot of the job record.
//!
//! Archiving is best-effort: failures are recorded as warnings on the
//! job, never demoting a successful encode.

use crate::jobs::Job;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for archival operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Copy or directory creation failed
    #[error("Archive copy failed: {0}")]
    Io(#[from] std::io::Error),

    /// The output file does not live under the media root, so no
    /// mirrored path exists for it
    #[error("Output path {} is not under media root {}", .output.display(), .media_root.display())]
    OutsideMediaRoot {
        output: PathBuf,
        media_root: PathBuf,
    },

    /// Failed to serialize the job snapshot
    #[error("Failed to serialize job snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Compute the mirrored archive directory for an encoded output file.
///
/// The output path relative to the media root, re-rooted under the
/// archive root: media root `/a/b`, archive root `/x/y`, output
/// `/a/b/Show/S01/ep01.m4v` gives `/x/y/Show/S01/ep01.m4v`.
pub fn archive_destination(
    archive_root: &Path,
    media_root: &Path,
    output_file: &Path,
) -> Result<PathBuf, ArchiveError> {
    let relative = output_file
        .strip_prefix(media_root)
        .map_err(|_| ArchiveError::OutsideMediaRoot {
            output: output_file.to_path_buf(),
            media_root: media_root.to_path_buf(),
        })?;
    Ok(archive_root.join(relative))
}

/// Copy the source file into its mirrored archive directory.
///
/// Alongside the source we keep the per-job transcode log (when one
/// exists) and a `job-config.json` snapshot of the job record, so the
/// encode can be reproduced from the archive alone.
pub fn archive_source(
    dest_dir: &Path,
    input_path: &Path,
    log_path: &Path,
    job: &Job,
) -> Result<(), ArchiveError> {
    fs::create_dir_all(dest_dir)?;

    let input_name = input_path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no input filename"))?;
    fs::copy(input_path, dest_dir.join(input_name))?;

    if log_path.exists() {
        if let Some(log_name) = log_path.file_name() {
            if let Err(e) = fs::copy(log_path, dest_dir.join(log_name)) {
                log::warn!("Could not archive transcode log {}: {}", log_path.display(), e);
            }
        }
    }

    let snapshot = serde_json::to_string_pretty(job)?;
    fs::write(dest_dir.join("job-config.json"), snapshot)?;

    Ok(())
}
