//! Job store: the persisted batch configuration.
//!
//! A job file holds the batch-wide settings plus an ordered list of
//! per-file jobs. It is generated from a video list on first invocation,
//! hand-edited by the user (output titles, per-job overrides), then
//! loaded and rewritten on every subsequent run so a failed batch can be
//! resumed without re-running succeeded jobs.

use batchencode_config::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for job store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error reading or writing the job file
    #[error("Job file IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted job file is malformed. Fatal: the batch must not
    /// run against a job list we cannot fully understand.
    #[error("Failed to parse job file: {0}")]
    Parse(serde_json::Error),

    /// Failed to serialize the store
    #[error("Failed to serialize job file: {0}")]
    Serialize(serde_json::Error),

    /// The video list matched no input files
    #[error("No videos found in input specification: {0}")]
    NoInputFiles(String),

    /// The same input file appears twice in the batch
    #[error("Duplicate input file in job list: {}", .0.display())]
    DuplicateInput(PathBuf),
}

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job has not been attempted, or its last attempt failed and it
    /// has been reset for retry.
    Pending,
    /// Job completed successfully.
    Success,
    /// Job failed on its last attempt.
    Failed,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One unit of work: a single input file to transcode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Path of the source file, relative to the batch workdir.
    pub input_file: PathBuf,
    /// Title of the encoded output; empty until the user edits the
    /// generated job file.
    #[serde(default)]
    pub output_title: String,
    /// Current status. Success is terminal: the batch controller skips
    /// succeeded jobs on resume.
    #[serde(default)]
    pub status: JobStatus,
    /// Per-job option overrides, applied above the job-file globals.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub overrides: Options,
    /// Why the last attempt failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Non-fatal trouble recorded during a successful run (e.g. a
    /// best-effort archive copy that did not complete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Job {
    /// Create a fresh pending job for an input file.
    pub fn new(input_file: PathBuf) -> Self {
        Self {
            input_file,
            output_title: String::new(),
            status: JobStatus::Pending,
            overrides: Options::default(),
            error_reason: None,
            warning: None,
        }
    }

    /// Mark the job as succeeded, clearing any stale failure reason.
    pub fn succeed(&mut self) {
        self.status = JobStatus::Success;
        self.error_reason = None;
    }

    /// Mark the job as failed with a reason.
    pub fn fail(&mut self, reason: &str) {
        self.status = JobStatus::Failed;
        self.error_reason = Some(reason.to_string());
    }

    /// Record a non-fatal warning without touching the status.
    pub fn warn(&mut self, warning: &str) {
        self.warning = Some(warning.to_string());
    }

    /// True when the batch controller should attempt this job.
    pub fn needs_run(&self) -> bool {
        self.status != JobStatus::Success
    }
}

/// The persisted batch configuration: global settings plus the ordered
/// job list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobFile {
    /// Directory containing the source video files.
    pub workdir: PathBuf,
    /// Directory encoded files are written to.
    pub outdir: PathBuf,
    /// Root of the media library; outdir must live under it when
    /// archiving is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_root: Option<PathBuf>,
    /// Root of the source archive tree mirroring the library layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_root: Option<PathBuf>,
    /// Where to write the batch report, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    /// Where to email the batch report, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_email: Option<String>,
    /// Batch-wide option defaults, overridable per job and by the CLI.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    /// The ordered job list.
    pub jobs: Vec<Job>,
}

impl JobFile {
    /// Build a new job file from a list of matched input files.
    ///
    /// One pending job is created per file, with an empty output title
    /// for the user to fill in. Fails if the list is empty (nothing is
    /// written in that case) or contains the same file twice.
    pub fn generate(
        videos: &[PathBuf],
        workdir: PathBuf,
        outdir: PathBuf,
        source_spec: &str,
    ) -> Result<Self, StoreError> {
        if videos.is_empty() {
            return Err(StoreError::NoInputFiles(source_spec.to_string()));
        }

        let mut store = Self {
            workdir,
            outdir,
            media_root: None,
            archive_root: None,
            report_path: None,
            report_email: None,
            options: Options::default(),
            jobs: Vec::new(),
        };
        for video in videos {
            store.push_job(video.clone())?;
        }
        Ok(store)
    }

    /// Append a pending job, enforcing input-file uniqueness.
    fn push_job(&mut self, input_file: PathBuf) -> Result<(), StoreError> {
        if self.jobs.iter().any(|job| job.input_file == input_file) {
            return Err(StoreError::DuplicateInput(input_file));
        }
        self.jobs.push(Job::new(input_file));
        Ok(())
    }

    /// Fold newly matched inputs into an existing job list.
    ///
    /// Files already present keep their entries untouched, including
    /// statuses and hand edits; new files are appended as pending jobs.
    /// Returns how many jobs were added.
    pub fn merge_new_inputs(&mut self, videos: &[PathBuf]) -> usize {
        let mut added = 0;
        for video in videos {
            if self.jobs.iter().any(|job| &job.input_file == video) {
                continue;
            }
            self.jobs.push(Job::new(video.clone()));
            added += 1;
        }
        added
    }

    /// Load a persisted job file. A malformed file is fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        let store: JobFile = serde_json::from_str(&content).map_err(StoreError::Parse)?;
        store.check_unique_inputs()?;
        Ok(store)
    }

    /// Persist the store, atomically.
    ///
    /// The document is written to a sibling temp file and renamed into
    /// place so an interruption mid-write cannot truncate the resumable
    /// job list.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(StoreError::Serialize)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Enforce the input-file uniqueness invariant on a loaded store.
    fn check_unique_inputs(&self) -> Result<(), StoreError> {
        for (i, job) in self.jobs.iter().enumerate() {
            if self.jobs[..i].iter().any(|prev| prev.input_file == job.input_file) {
                return Err(StoreError::DuplicateInput(job.input_file.clone()));
            }
        }
        Ok(())
    }

    /// Jobs still needing a run (pending or failed).
    pub fn remaining(&self) -> usize {
        self.jobs.iter().filter(|job| job.needs_run()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn videos(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn make_store(names: &[&str]) -> JobFile {
        JobFile::generate(
            &videos(names),
            PathBuf::from("/work"),
            PathBuf::from("/out"),
            "*.mkv",
        )
        .expect("store should generate")
    }

    // Strategy for generating arbitrary job statuses
    fn job_status_strategy() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Pending),
            Just(JobStatus::Success),
            Just(JobStatus::Failed),
        ]
    }

    // Strategy for generating jobs with distinct input file names
    fn job_strategy(index: usize) -> impl Strategy<Value = Job> {
        (
            "[a-zA-Z0-9 _-]{1,30}",
            "[a-zA-Z0-9 ()-]{0,40}",
            job_status_strategy(),
            proptest::option::of(proptest::bool::ANY),
            proptest::option::of("[a-zA-Z0-9 ]{1,60}"),
            proptest::option::of("[a-zA-Z0-9 ]{1,60}"),
        )
            .prop_map(move |(name, title, status, decomb, error, warning)| Job {
                input_file: PathBuf::from(format!("{:03}-{}.mkv", index, name)),
                output_title: title,
                status,
                overrides: Options {
                    decomb,
                    ..Options::default()
                },
                error_reason: error,
                warning,
            })
    }

    fn store_strategy() -> impl Strategy<Value = JobFile> {
        (
            "[a-zA-Z0-9/_-]{1,30}",
            "[a-zA-Z0-9/_-]{1,30}",
            proptest::option::of("[a-zA-Z0-9/_-]{1,30}"),
            proptest::option::of("[a-zA-Z0-9/_-]{1,30}"),
            proptest::option::of("[a-z0-9.@]{3,30}"),
            proptest::collection::vec(proptest::bool::ANY, 0..4),
        )
            .prop_flat_map(|(workdir, outdir, media, archive, email, job_seeds)| {
                let jobs: Vec<_> = (0..job_seeds.len()).map(job_strategy).collect();
                (
                    Just(workdir),
                    Just(outdir),
                    Just(media),
                    Just(archive),
                    Just(email),
                    jobs,
                )
            })
            .prop_map(|(workdir, outdir, media, archive, email, jobs)| JobFile {
                workdir: PathBuf::from(workdir),
                outdir: PathBuf::from(outdir),
                media_root: media.map(PathBuf::from),
                archive_root: archive.map(PathBuf::from),
                report_path: None,
                report_email: email,
                options: Options::default(),
                jobs,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // *For any* valid in-memory store, load(save(store)) == store.
        #[test]
        fn prop_store_round_trip(store in store_strategy()) {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("jobs.json");

            store.save(&path).expect("store should save");
            let loaded = JobFile::load(&path).expect("saved store should load");

            prop_assert_eq!(store, loaded);
        }
    }

    #[test]
    fn test_generate_creates_pending_jobs_with_empty_titles() {
        let store = make_store(&["a.mkv", "b.mkv", "c.mkv"]);

        assert_eq!(store.jobs.len(), 3);
        for job in &store.jobs {
            assert_eq!(job.status, JobStatus::Pending);
            assert!(job.output_title.is_empty());
            assert!(job.overrides.is_empty());
        }
    }

    #[test]
    fn test_generate_empty_video_list_is_fatal() {
        let result = JobFile::generate(
            &[],
            PathBuf::from("/work"),
            PathBuf::from("/out"),
            "*.nothing",
        );
        assert!(matches!(result, Err(StoreError::NoInputFiles(_))));
    }

    #[test]
    fn test_generate_rejects_duplicate_inputs() {
        let result = JobFile::generate(
            &videos(&["a.mkv", "b.mkv", "a.mkv"]),
            PathBuf::from("/work"),
            PathBuf::from("/out"),
            "*.mkv",
        );
        assert!(matches!(result, Err(StoreError::DuplicateInput(_))));
    }

    #[test]
    fn test_merge_keeps_existing_entries_untouched() {
        let mut store = make_store(&["a.mkv", "b.mkv"]);
        store.jobs[0].output_title = "Title A".to_string();
        store.jobs[0].succeed();

        let added = store.merge_new_inputs(&videos(&["a.mkv", "b.mkv", "c.mkv"]));

        assert_eq!(added, 1);
        assert_eq!(store.jobs.len(), 3);
        assert_eq!(store.jobs[0].output_title, "Title A");
        assert_eq!(store.jobs[0].status, JobStatus::Success);
        assert_eq!(store.jobs[2].input_file, PathBuf::from("c.mkv"));
        assert_eq!(store.jobs[2].status, JobStatus::Pending);
    }

    #[test]
    fn test_load_malformed_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jobs.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(JobFile::load(&path), Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_unknown_top_level_shape() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jobs.json");
        fs::write(&path, r#"{"jobs": "not-a-list"}"#).unwrap();

        assert!(matches!(JobFile::load(&path), Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_duplicate_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jobs.json");

        let mut store = make_store(&["a.mkv", "b.mkv"]);
        store.jobs[1].input_file = PathBuf::from("a.mkv");
        // bypass save-side validation to simulate a hand-edited file
        fs::write(&path, serde_json::to_string_pretty(&store).unwrap()).unwrap();

        assert!(matches!(
            JobFile::load(&path),
            Err(StoreError::DuplicateInput(_))
        ));
    }

    #[test]
    fn test_save_overwrites_atomically() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jobs.json");

        let store = make_store(&["a.mkv"]);
        store.save(&path).expect("first save");

        let mut updated = store.clone();
        updated.jobs[0].succeed();
        updated.save(&path).expect("second save");

        // No temp residue left behind, and the file holds the new state.
        assert!(!path.with_extension("json.tmp").exists());
        let loaded = JobFile::load(&path).expect("should load");
        assert_eq!(loaded.jobs[0].status, JobStatus::Success);
    }

    #[test]
    fn test_remaining_counts_pending_and_failed() {
        let mut store = make_store(&["a.mkv", "b.mkv", "c.mkv"]);
        store.jobs[0].succeed();
        store.jobs[1].fail("transcoder exited with code 1");

        assert_eq!(store.remaining(), 2);
        assert!(!store.jobs[0].needs_run());
        assert!(store.jobs[1].needs_run());
        assert!(store.jobs[2].needs_run());
    }

    #[test]
    fn test_fail_then_succeed_clears_error_reason() {
        let mut job = Job::new(PathBuf::from("a.mkv"));
        job.fail("no space left on device");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_reason.is_some());

        job.succeed();
        assert_eq!(job.status, JobStatus::Success);
        assert!(job.error_reason.is_none());
    }
}
