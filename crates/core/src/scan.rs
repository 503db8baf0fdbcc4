//! Video list collection for job file generation.
//!
//! The batch's input files come from one of three places: a `.txt` file
//! listing one video per line, a glob pattern matched under the workdir,
//! or (when no list is given) a walk of the workdir itself filtered by
//! video extension. Matched paths are stored relative to the workdir so
//! the job file survives the workdir moving between machines.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Video file extensions recognized when walking the workdir
/// (case-insensitive matching).
pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "mov", "m4v", "ts", "m2ts"];

/// Error type for video list collection
#[derive(Debug, Error)]
pub enum ScanError {
    /// Could not read the line-list file
    #[error("Failed to read video list file: {0}")]
    Io(#[from] std::io::Error),

    /// The glob pattern is malformed
    #[error("Invalid video list glob: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Checks if a file has a recognized video extension (case-insensitive).
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            VIDEO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Collect the batch's input files, sorted, relative to `workdir`.
///
/// * `Some(spec)` ending in `.txt` reads a line-list file; blank lines
///   are skipped but interior spaces are preserved (spaces are valid on
///   most filesystems).
/// * Any other `Some(spec)` is treated as a glob, resolved under the
///   workdir when relative.
/// * `None` walks the workdir for files with video extensions, skipping
///   hidden directories.
///
/// An empty result is returned as such; the caller decides whether that
/// is fatal (it is, during job file generation).
pub fn collect_videos(spec: Option<&str>, workdir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut videos = match spec {
        Some(list) if list.ends_with(".txt") => videos_from_text_file(Path::new(list), workdir)?,
        Some(pattern) => videos_from_glob(pattern, workdir)?,
        None => videos_from_workdir(workdir),
    };
    videos.sort();
    Ok(videos)
}

fn videos_from_text_file(list_file: &Path, workdir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let content = fs::read_to_string(list_file)?;
    let videos = content
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| relative_to_workdir(Path::new(line), workdir))
        .collect();
    Ok(videos)
}

fn videos_from_glob(pattern: &str, workdir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        workdir.join(pattern).to_string_lossy().into_owned()
    };

    let mut videos = Vec::new();
    for entry in glob::glob(&full_pattern)? {
        match entry {
            Ok(path) if path.is_file() => videos.push(relative_to_workdir(&path, workdir)),
            Ok(_) => {}
            Err(e) => {
                log::warn!("Skipping unreadable glob match: {}", e);
            }
        }
    }
    Ok(videos)
}

fn videos_from_workdir(workdir: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(workdir).into_iter().filter_entry(|entry| {
        // Skip hidden directories, but allow the root itself
        if entry.file_type().is_dir() && entry.depth() > 0 {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with('.') {
                    return false;
                }
            }
        }
        true
    });

    let mut videos = Vec::new();
    for entry in walker.filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && is_video_file(entry.path()) {
            videos.push(relative_to_workdir(entry.path(), workdir));
        }
    }
    videos
}

/// Store paths relative to the workdir where possible; paths outside the
/// workdir are left alone.
fn relative_to_workdir(path: &Path, workdir: &Path) -> PathBuf {
    path.strip_prefix(workdir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("movie.mkv")));
        assert!(is_video_file(Path::new("MOVIE.MKV")));
        assert!(is_video_file(Path::new("show/ep01.m4v")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("noextension")));
    }

    #[test]
    fn test_glob_matches_relative_to_workdir() {
        let temp_dir = TempDir::new().unwrap();
        let workdir = temp_dir.path();
        touch(workdir, "b.mkv");
        touch(workdir, "a.mkv");
        touch(workdir, "skip.txt");

        let videos = collect_videos(Some("*.mkv"), workdir).expect("glob should work");

        assert_eq!(videos, vec![PathBuf::from("a.mkv"), PathBuf::from("b.mkv")]);
    }

    #[test]
    fn test_glob_matching_nothing_is_empty_not_error() {
        let temp_dir = TempDir::new().unwrap();

        let videos = collect_videos(Some("*.mkv"), temp_dir.path()).expect("empty glob is ok");
        assert!(videos.is_empty());
    }

    #[test]
    fn test_text_file_list_skips_blank_lines_keeps_spaces() {
        let temp_dir = TempDir::new().unwrap();
        let workdir = temp_dir.path();
        let list = workdir.join("videos.txt");
        fs::write(&list, "first one.mkv\n\nsecond.mkv\n").unwrap();

        let videos =
            collect_videos(Some(list.to_str().unwrap()), workdir).expect("list should read");

        assert_eq!(
            videos,
            vec![PathBuf::from("first one.mkv"), PathBuf::from("second.mkv")]
        );
    }

    #[test]
    fn test_text_file_entries_made_relative_to_workdir() {
        let temp_dir = TempDir::new().unwrap();
        let workdir = temp_dir.path();
        let list = workdir.join("videos.txt");
        let absolute = workdir.join("nested").join("deep.mkv");
        fs::write(&list, format!("{}\n", absolute.display())).unwrap();

        let videos =
            collect_videos(Some(list.to_str().unwrap()), workdir).expect("list should read");

        assert_eq!(videos, vec![PathBuf::from("nested/deep.mkv")]);
    }

    #[test]
    fn test_missing_text_file_is_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = collect_videos(Some("/no/such/list.txt"), temp_dir.path());
        assert!(matches!(result, Err(ScanError::Io(_))));
    }

    #[test]
    fn test_workdir_walk_filters_extensions_and_hidden_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let workdir = temp_dir.path();
        touch(workdir, "top.mkv");
        touch(workdir, "Show/S01/ep01.mkv");
        touch(workdir, "Show/S01/notes.txt");
        touch(workdir, ".hidden/secret.mkv");

        let videos = collect_videos(None, workdir).expect("walk should work");

        assert_eq!(
            videos,
            vec![PathBuf::from("Show/S01/ep01.mkv"), PathBuf::from("top.mkv")]
        );
    }
}
