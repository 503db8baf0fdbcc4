//! batchencode
//!
//! Batch video transcoding around `transcode-video`: job file generation,
//! sequential batch execution with resume, source archival, and reporting.

pub mod archive;
pub mod batch;
pub mod jobs;
pub mod options;
pub mod report;
pub mod runner;
pub mod scan;
pub mod sleep;
pub mod startup;
pub mod transcode;

pub use batchencode_config as config;
pub use batchencode_config::Options;
pub use archive::{archive_destination, archive_source, ArchiveError};
pub use batch::{BatchController, BatchSummary};
pub use jobs::{Job, JobFile, JobStatus, StoreError};
pub use options::{resolve, EffectiveOptions};
pub use report::{EncodeReport, Encoded, ReportError};
pub use runner::{output_basename, output_path, run_job, RunContext};
pub use scan::{collect_videos, is_video_file, ScanError, VIDEO_EXTENSIONS};
pub use sleep::SleepInhibitor;
pub use startup::{
    check_archive_paths, check_dirs, check_transcoder_available, run_startup_checks, StartupError,
};
pub use transcode::{
    build_transcode_command, run_transcode, TranscodeError, TranscodeParams, TRANSCODE_COMMAND,
};
