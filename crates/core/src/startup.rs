//! Preflight checks run before any job starts.
//!
//! Fatal configuration problems (missing workdir, unusable output path,
//! inconsistent archive roots, absent transcoder) abort the batch here,
//! before the first transcode is attempted.

use crate::jobs::JobFile;
use crate::transcode::TRANSCODE_COMMAND;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Working directory not found: {}", .0.display())]
    WorkdirMissing(PathBuf),

    #[error("Output path exists but is not a directory: {}", .0.display())]
    OutdirNotADirectory(PathBuf),

    #[error("Unable to create output path {}: {}", .0.display(), .1)]
    OutdirCreation(PathBuf, std::io::Error),

    #[error("Archive root path provided without media root path")]
    ArchiveWithoutMediaRoot,

    #[error("Output directory {} not a subdirectory of media root {}", .outdir.display(), .media_root.display())]
    OutdirOutsideMediaRoot {
        outdir: PathBuf,
        media_root: PathBuf,
    },

    #[error("Transcoder not available: {0}")]
    TranscoderUnavailable(String),
}

/// Verify the batch's directories.
///
/// The workdir must already exist (it holds the sources); the outdir is
/// created when absent, but an existing non-directory is fatal.
pub fn check_dirs(store: &JobFile) -> Result<(), StartupError> {
    if !store.workdir.is_dir() {
        return Err(StartupError::WorkdirMissing(store.workdir.clone()));
    }

    if store.outdir.exists() {
        if !store.outdir.is_dir() {
            return Err(StartupError::OutdirNotADirectory(store.outdir.clone()));
        }
    } else {
        log::info!("Creating output path: {}", store.outdir.display());
        fs::create_dir_all(&store.outdir)
            .map_err(|e| StartupError::OutdirCreation(store.outdir.clone(), e))?;
    }

    Ok(())
}

/// Verify the archive configuration is internally consistent.
///
/// An archive root needs a media root to mirror against, and the outdir
/// must live under the media root or no mirrored path exists for it.
pub fn check_archive_paths(store: &JobFile) -> Result<(), StartupError> {
    let archive_root = match &store.archive_root {
        Some(root) => root,
        None => return Ok(()),
    };

    let media_root = store
        .media_root
        .as_ref()
        .ok_or(StartupError::ArchiveWithoutMediaRoot)?;

    if !store.outdir.starts_with(media_root) {
        return Err(StartupError::OutdirOutsideMediaRoot {
            outdir: store.outdir.clone(),
            media_root: media_root.clone(),
        });
    }

    log::debug!(
        "Archiving sources under {} mirroring {}",
        archive_root.display(),
        media_root.display()
    );
    Ok(())
}

/// Verify the transcoder responds to `--version`.
pub fn check_transcoder_available() -> Result<(), StartupError> {
    let status = Command::new(TRANSCODE_COMMAND)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(StartupError::TranscoderUnavailable(format!(
            "{} --version exited with status {}",
            TRANSCODE_COMMAND, status
        ))),
        Err(e) => Err(StartupError::TranscoderUnavailable(format!(
            "failed to run {} --version: {}",
            TRANSCODE_COMMAND, e
        ))),
    }
}

/// Run all preflight checks for a loaded store.
///
/// The transcoder check is skipped when the batch will not spawn it
/// (skip-encode runs).
pub fn run_startup_checks(store: &JobFile, skip_transcoder_check: bool) -> Result<(), StartupError> {
    check_dirs(store)?;
    check_archive_paths(store)?;
    if !skip_transcoder_check {
        check_transcoder_available()?;
    }
    Ok(())
}
