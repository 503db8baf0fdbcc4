//! Transcoder invocation.
//!
//! Builds and executes `transcode-video` commands. The transcoder is a
//! black box: we construct its argument list from the job's effective
//! options, run it to completion, and interpret nothing but the exit
//! status. Tool output goes to a per-job log file; stderr is captured so
//! a failure can be recorded on the job.

use crate::options::EffectiveOptions;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// The external transcoding CLI (Don Melton's video_transcoding project).
pub const TRANSCODE_COMMAND: &str = "transcode-video";

/// How many characters of captured stderr to keep on a failed job.
const STDERR_TAIL_CHARS: usize = 2000;

/// Error type for transcoder invocations
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Transcoder exited with non-zero status
    #[error("Transcoder failed with exit code {code}: {detail}")]
    Failed { code: i32, detail: String },

    /// Transcoder process was terminated by signal
    #[error("Transcoder process was terminated by signal")]
    Terminated,

    /// IO error spawning the process or opening its log file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to invoke the transcoder for one job.
#[derive(Debug, Clone)]
pub struct TranscodeParams {
    /// Full path to the source video file
    pub input_path: PathBuf,
    /// Full path the encoded file is written to (a temp location; the
    /// runner moves it into place on success)
    pub output_path: PathBuf,
    /// Per-job log file receiving the transcoder's stdout
    pub log_path: PathBuf,
    /// Directory holding external `.srt` files for this batch
    pub subtitles_dir: PathBuf,
    /// The job's resolved options
    pub options: EffectiveOptions,
}

/// Build the `transcode-video` command for one job.
///
/// Flag layout follows the tool's conventions: crop, subtitle directives,
/// deinterlacing, container, chapters, then the input path and `--output`.
pub fn build_transcode_command(params: &TranscodeParams) -> Command {
    let mut cmd = Command::new(TRANSCODE_COMMAND);
    let opts = &params.options;

    // Crop: explicit geometry when configured, else let the tool detect.
    match &opts.crop_params {
        Some(crop) => cmd.arg("--crop").arg(crop),
        None => cmd.arg("--crop").arg("detect"),
    };

    // Subtitle burning: disabled, a specific track, or scan for the
    // first forced track.
    if opts.disable_auto_burn {
        cmd.arg("--disable-auto-burn");
    } else if let Some(num) = opts.burn_subtitle_num {
        cmd.arg("--burn-subtitle").arg(num.to_string());
    } else {
        cmd.arg("--burn-subtitle").arg("scan");
    }

    if let Some(lang) = &opts.add_subtitle {
        cmd.arg("--add-subtitle").arg(lang);
    }

    // External srt files named `<input-stem>.<lang>.srt` in the batch
    // subtitles directory ride along with their language binding.
    for srt_file in matching_srt_files(&params.subtitles_dir, &params.input_path) {
        let lang = srt_language(&srt_file);
        cmd.arg("--add-srt").arg(&srt_file);
        cmd.arg("--bind-srt-language").arg(lang);
    }

    if opts.decomb {
        // comb-detect makes the decomb filter selective: only frames
        // with detected interlacing artifacts are deinterlaced.
        cmd.arg("-H").arg("comb-detect");
        cmd.arg("--filter").arg("decomb");
    }

    if opts.m4v {
        cmd.arg("--m4v");
    }

    if let Some(chapters) = &opts.chapters {
        cmd.arg("--chapters").arg(chapters);
    }

    cmd.arg(&params.input_path);
    cmd.arg("--output").arg(&params.output_path);

    cmd
}

/// Execute the transcoder for one job, blocking until it exits.
///
/// stdout goes to the per-job log file; stderr is captured and its tail
/// returned in the error on a non-zero exit. Success is exit code zero,
/// nothing more.
pub fn run_transcode(params: &TranscodeParams) -> Result<(), TranscodeError> {
    let mut cmd = build_transcode_command(params);

    let log_file = fs::File::create(&params.log_path)?;
    cmd.stdout(log_file);
    cmd.stderr(Stdio::piped());

    let child = cmd.spawn()?;
    let output = child.wait_with_output()?;

    if output.status.success() {
        return Ok(());
    }

    match output.status.code() {
        Some(code) => Err(TranscodeError::Failed {
            code,
            detail: stderr_tail(&output.stderr),
        }),
        None => Err(TranscodeError::Terminated),
    }
}

/// Find `<stem>.*.srt` files for the input in the subtitles directory.
fn matching_srt_files(subtitles_dir: &Path, input_path: &Path) -> Vec<PathBuf> {
    let stem = match input_path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem,
        None => return Vec::new(),
    };

    let pattern = subtitles_dir
        .join(format!("{}.*.srt", glob::Pattern::escape(stem)))
        .to_string_lossy()
        .into_owned();

    let mut files: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(|entry| entry.ok()).collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

/// Pull the language code out of an srt filename: the penultimate
/// extension, so `mymovie.eng.srt` yields `eng`.
fn srt_language(srt_file: &Path) -> String {
    srt_file
        .file_stem()
        .map(Path::new)
        .and_then(|stem| stem.extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_string()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim_end();
    match text.char_indices().nth_back(STDERR_TAIL_CHARS - 1) {
        Some((idx, _)) => text[idx..].to_string(),
        None => text.to_string(),
    }
}
