//! CLI entry point for batchencode
//!
//! Two-phase workflow: the first invocation against a fresh job file
//! generates it from the matched videos and exits so the user can fill
//! in output titles; subsequent invocations run the batch.

use batchencode::{
    collect_videos, resolve, run_startup_checks, BatchController, EncodeReport, JobFile,
    SleepInhibitor,
};
use batchencode_config::{default_config_path, Options};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// batchencode - Batch video transcoding with job files, resume, and archival
#[derive(Parser, Debug)]
#[command(name = "batchencode")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the job file. Generated from the matched videos when it
    /// does not exist yet.
    config_file: PathBuf,

    /// Input videos: a .txt file listing one path per line, or a glob
    /// pattern. Defaults to scanning the workdir for video files.
    #[arg(long)]
    video_list: Option<String>,

    /// Directory containing the source files (job file generation only)
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Directory encoded files are written to (job file generation only)
    #[arg(long, default_value = "encoded")]
    outdir: PathBuf,

    /// Media library root, required for archive mirroring
    #[arg(long)]
    media_root: Option<PathBuf>,

    /// Archive tree root; enables source archival
    #[arg(long)]
    archive_root: Option<PathBuf>,

    /// Where to write the batch report
    #[arg(long)]
    report_path: Option<PathBuf>,

    /// Where to email the batch report
    #[arg(long)]
    report_email: Option<String>,

    /// Scratch directory for in-flight encodes
    #[arg(long, default_value = "/tmp/batchencode")]
    tempdir: PathBuf,

    /// Selectively deinterlace frames where combing is detected
    #[arg(long)]
    decomb: bool,

    /// Prevent the host from sleeping while encoding
    #[arg(long)]
    no_sleep: bool,

    /// Don't automatically burn the first forced subtitle
    #[arg(long)]
    disable_auto_burn: bool,

    /// Burn the subtitle track with this number instead of scanning
    #[arg(long)]
    burn_subtitle_num: Option<u32>,

    /// Add the subtitle track selected by language code (e.g. "eng")
    #[arg(long)]
    add_subtitle: Option<String>,

    /// Explicit crop geometry passed to the transcoder
    #[arg(long)]
    crop_params: Option<String>,

    /// Quality label appended to movie output names (e.g. "1080p")
    #[arg(long)]
    quality: Option<String>,

    /// Treat outputs as movies (title subdirectory, quality suffix)
    #[arg(long)]
    movie: bool,

    /// Produce .mkv output instead of the default .m4v
    #[arg(long)]
    mkv: bool,

    /// Chapter specification passed to the transcoder
    #[arg(long)]
    chapters: Option<String>,

    /// Do not archive sources after successful encodes
    #[arg(long)]
    no_archive: bool,

    /// Run the batch without spawning the transcoder. For testing only.
    #[arg(long)]
    skip_encode: bool,

    /// List what would run and exit without encoding anything
    #[arg(long)]
    dry_run: bool,

    /// Write the passed option flags to the user defaults file and exit
    #[arg(long)]
    write_user_defaults: bool,
}

impl Args {
    /// The CLI options layer: only flags actually passed are present, so
    /// absent flags fall through to the lower layers.
    fn cli_options(&self) -> Options {
        Options {
            decomb: self.decomb.then_some(true),
            no_sleep: self.no_sleep.then_some(true),
            disable_auto_burn: self.disable_auto_burn.then_some(true),
            burn_subtitle_num: self.burn_subtitle_num,
            add_subtitle: self.add_subtitle.clone(),
            crop_params: self.crop_params.clone(),
            quality: self.quality.clone(),
            movie: self.movie.then_some(true),
            m4v: self.mkv.then_some(false),
            chapters: self.chapters.clone(),
            archive: self.no_archive.then_some(false),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("batchencode: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli_options = args.cli_options();

    if args.write_user_defaults {
        let path = default_config_path().ok_or("could not determine home directory")?;
        cli_options.save_to_file(&path)?;
        println!("Wrote user defaults to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let user_defaults = match default_config_path() {
        Some(path) => Options::load_or_default(&path)?,
        None => Options::default(),
    };

    // Phase 1: generate the job file and stop for review.
    if !args.config_file.exists() {
        let videos = collect_videos(args.video_list.as_deref(), &args.workdir)?;
        let spec = args.video_list.as_deref().unwrap_or("workdir scan");

        let mut store = JobFile::generate(
            &videos,
            args.workdir.clone(),
            args.outdir.clone(),
            spec,
        )?;
        store.media_root = args.media_root.clone();
        store.archive_root = args.archive_root.clone();
        store.report_path = args.report_path.clone();
        store.report_email = args.report_email.clone();
        // Option flags passed at generation time become the job file's
        // globals, so later runs keep them without repeating the flags.
        store.options = cli_options.clone();
        store.save(&args.config_file)?;

        println!(
            "Generated {} with {} jobs.",
            args.config_file.display(),
            store.jobs.len()
        );
        println!("Fill in the output titles, then run again to start the batch.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut store = JobFile::load(&args.config_file)?;

    // An explicit video list against an existing job file folds new
    // matches in, then stops for review of the added entries.
    if args.video_list.is_some() {
        let videos = collect_videos(args.video_list.as_deref(), &store.workdir)?;
        let added = store.merge_new_inputs(&videos);
        if added > 0 {
            store.save(&args.config_file)?;
            println!("Added {} new jobs to {}.", added, args.config_file.display());
            println!("Fill in the new output titles, then run again to start the batch.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    if args.dry_run {
        for job in &store.jobs {
            let action = if job.needs_run() { "run " } else { "skip" };
            println!("{}  [{}]  {}", action, job.status, job.input_file.display());
        }
        println!("{} of {} jobs would run.", store.remaining(), store.jobs.len());
        return Ok(ExitCode::SUCCESS);
    }

    run_startup_checks(&store, args.skip_encode)?;

    // Sleep inhibition is a batch-level concern; per-job overrides of
    // no_sleep cannot re-engage it mid-run, so resolve it without them.
    let batch_options = resolve(&cli_options, &Options::default(), &store.options, &user_defaults);
    let _inhibitor = if batch_options.no_sleep {
        SleepInhibitor::engage()
    } else {
        None
    };

    let controller = BatchController::new(
        args.config_file.clone(),
        cli_options,
        user_defaults,
        args.tempdir.clone(),
        args.skip_encode,
    );

    let mut report = EncodeReport::new();
    let summary = controller.run(&mut store, &mut report)?;

    println!(
        "Batch complete: {} succeeded, {} failed, {} skipped.",
        summary.succeeded, summary.failed, summary.skipped
    );

    let mut reporting_failed = false;
    if let Some(path) = &store.report_path {
        if let Err(e) = report.write(path) {
            log::error!("{}", e);
            reporting_failed = true;
        } else {
            println!("Report written to {}", path.display());
        }
    }
    if let Some(address) = &store.report_email {
        if let Err(e) = report.email(address) {
            log::error!("{}", e);
            reporting_failed = true;
        } else {
            println!("Report emailed to {}", address);
        }
    }

    if summary.all_succeeded() && !reporting_failed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_flags_produce_empty_cli_layer() {
        let args = Args::parse_from(["batchencode", "jobs.json"]);
        assert!(args.cli_options().is_empty());
    }

    #[test]
    fn test_off_switches_produce_explicit_false() {
        let args = Args::parse_from(["batchencode", "jobs.json", "--mkv", "--no-archive"]);
        let options = args.cli_options();
        assert_eq!(options.m4v, Some(false));
        assert_eq!(options.archive, Some(false));
    }

    #[test]
    fn test_user_defaults_hold_exactly_the_passed_flags() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("defaults.toml");

        let args = Args::parse_from(["batchencode", "jobs.json", "--decomb", "--mkv"]);
        args.cli_options().save_to_file(&path).unwrap();

        let saved = Options::load_from_file(&path).unwrap();
        assert_eq!(saved.decomb, Some(true));
        assert_eq!(saved.m4v, Some(false));
        let expected = Options {
            decomb: Some(true),
            m4v: Some(false),
            ..Options::default()
        };
        assert_eq!(saved, expected);
    }

    #[test]
    fn test_generation_persists_option_flags_as_globals() {
        let temp = tempfile::TempDir::new().unwrap();
        let workdir = temp.path().join("work");
        std::fs::create_dir_all(&workdir).unwrap();
        std::fs::write(workdir.join("ep01.mkv"), b"x").unwrap();
        let config_file = temp.path().join("jobs.json");

        let args = Args::parse_from([
            "batchencode",
            config_file.to_str().unwrap(),
            "--workdir",
            workdir.to_str().unwrap(),
            "--decomb",
            "--add-subtitle",
            "eng",
        ]);
        run(&args).expect("generation should succeed");

        // A later plain invocation sees the flags via the job file's
        // global options layer.
        let store = JobFile::load(&config_file).unwrap();
        assert_eq!(store.options.decomb, Some(true));
        assert_eq!(store.options.add_subtitle.as_deref(), Some("eng"));
    }

    #[test]
    fn test_zero_match_glob_is_fatal_with_no_job_file_written() {
        let temp = tempfile::TempDir::new().unwrap();
        let config_file = temp.path().join("jobs.json");

        let args = Args::parse_from([
            "batchencode",
            config_file.to_str().unwrap(),
            "--video-list",
            "*.mkv",
            "--workdir",
            temp.path().to_str().unwrap(),
        ]);

        assert!(run(&args).is_err());
        assert!(!config_file.exists());
    }

    #[test]
    fn test_option_flags_map_to_cli_layer() {
        let args = Args::parse_from([
            "batchencode",
            "jobs.json",
            "--decomb",
            "--burn-subtitle-num",
            "3",
            "--quality",
            "1080p",
            "--movie",
        ]);
        let options = args.cli_options();
        assert_eq!(options.decomb, Some(true));
        assert_eq!(options.burn_subtitle_num, Some(3));
        assert_eq!(options.quality.as_deref(), Some("1080p"));
        assert_eq!(options.movie, Some(true));
        assert_eq!(options.crop_params, None);
    }
}
