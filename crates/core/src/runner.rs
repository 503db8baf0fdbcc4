//! Job runner: executes one job end to end.
//!
//! Builds the transcoder invocation from the job's effective options,
//! runs it, interprets the exit status, and applies the side effects:
//! moving the encoded file from the temp area into the output tree,
//! updating the job status, and archiving the source when configured.
//! A job's failure is recorded on the job and never escalated; the
//! batch controller keeps going.

use crate::archive::{archive_destination, archive_source};
use crate::jobs::Job;
use crate::options::EffectiveOptions;
use crate::report::Encoded;
use crate::transcode::{run_transcode, TranscodeParams};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Batch-level paths and switches shared by every job run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory containing the source files
    pub workdir: PathBuf,
    /// Directory encoded files are written to
    pub outdir: PathBuf,
    /// Scratch directory encodes are written to before the final move
    pub tempdir: PathBuf,
    /// Media library root, required for archive mirroring
    pub media_root: Option<PathBuf>,
    /// Archive tree root; archiving is off when unset
    pub archive_root: Option<PathBuf>,
    /// Go through the motions without spawning the transcoder
    pub skip_encode: bool,
}

/// Construct the output file basename from the job's title and options:
/// `"<title> - <quality>.<ext>"` for movies with a quality label, else
/// `"<title>.<ext>"`.
pub fn output_basename(title: &str, options: &EffectiveOptions) -> String {
    let ext = if options.m4v { "m4v" } else { "mkv" };
    match (&options.quality, options.movie) {
        (Some(quality), true) => format!("{} - {}.{}", title, quality, ext),
        _ => format!("{}.{}", title, ext),
    }
}

/// Compute the final output path. Movies get a per-title subdirectory
/// so multiple versions and related assets can live together.
pub fn output_path(outdir: &Path, title: &str, options: &EffectiveOptions) -> PathBuf {
    let basename = output_basename(title, options);
    if options.movie {
        outdir.join(title).join(basename)
    } else {
        outdir.join(basename)
    }
}

/// Execute one job, mutating its status in place.
///
/// Returns the result record for the reporter. Every exit path from
/// this function leaves the job marked Success or Failed.
pub fn run_job(job: &mut Job, effective: &EffectiveOptions, ctx: &RunContext) -> Encoded {
    let started = Instant::now();
    let input_path = ctx.workdir.join(&job.input_file);
    let source = job
        .input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| job.input_file.to_string_lossy().into_owned());

    // Per-job sanity: a missing input or an unfilled title fails this
    // job only, not the batch.
    if !input_path.exists() {
        return fail(job, &source, started, format!("Input file not found: {}", input_path.display()));
    }
    if job.output_title.is_empty() {
        return fail(job, &source, started, format!("No output title for {}", job.input_file.display()));
    }

    let final_path = output_path(&ctx.outdir, &job.output_title, effective);
    let temp_path = ctx.tempdir.join(output_basename(&job.output_title, effective));
    let log_path = ctx.workdir.join(format!("{}-output.log", source));

    if let Some(parent) = final_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            return fail(job, &source, started, format!("Unable to create output path {}: {}", parent.display(), e));
        }
    }

    if ctx.skip_encode {
        log::info!("Skipping encode of {} (skip-encode enabled)", source);
        job.succeed();
        return Encoded {
            source,
            dest: final_path.to_string_lossy().into_owned(),
            success: true,
            error_text: None,
            elapsed_secs: started.elapsed().as_secs(),
        };
    }

    let params = TranscodeParams {
        input_path: input_path.clone(),
        output_path: temp_path.clone(),
        log_path: log_path.clone(),
        subtitles_dir: ctx.workdir.join("subtitles"),
        options: effective.clone(),
    };

    log::info!("Encoding {} -> {}", source, final_path.display());
    if let Err(e) = run_transcode(&params) {
        return fail(job, &source, started, e.to_string());
    }

    if let Err(e) = move_file(&temp_path, &final_path) {
        return fail(job, &source, started, format!("Unable to move encoded file into place: {}", e));
    }

    job.succeed();

    // Archival is best-effort: trouble here is a warning on the job,
    // never a demotion of the encode's success.
    if effective.archive {
        if let (Some(archive_root), Some(media_root)) = (&ctx.archive_root, &ctx.media_root) {
            match archive_destination(archive_root, media_root, &final_path) {
                Ok(dest_dir) => {
                    log::info!("Archiving {} to {}", source, dest_dir.display());
                    if let Err(e) = archive_source(&dest_dir, &input_path, &log_path, job) {
                        log::warn!("Archive of {} failed: {}", source, e);
                        job.warn(&format!("Archive failed: {}", e));
                    }
                }
                Err(e) => {
                    log::warn!("Archive of {} skipped: {}", source, e);
                    job.warn(&format!("Archive skipped: {}", e));
                }
            }
        }
    }

    Encoded {
        source,
        dest: final_path.to_string_lossy().into_owned(),
        success: true,
        error_text: None,
        elapsed_secs: started.elapsed().as_secs(),
    }
}

fn fail(job: &mut Job, source: &str, started: Instant, reason: String) -> Encoded {
    log::error!("Job for {} failed: {}", source, reason);
    job.fail(&reason);
    Encoded {
        source: source.to_string(),
        dest: String::new(),
        success: false,
        error_text: Some(reason),
        elapsed_secs: started.elapsed().as_secs(),
    }
}

/// Move the encoded file into place. Rename when possible; the temp
/// area and the output tree are often on different filesystems, so fall
/// back to copy-and-delete.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
