//! Batch controller: drives the job list through the runner.
//!
//! Walks the store in order, skipping jobs that already succeeded
//! (idempotent resume), resolving effective options per job, and
//! persisting the store after every job rather than at batch end so
//! partial progress survives a crash. One job's failure never stops
//! the pass; the terminal state is simply "all jobs visited".

use crate::jobs::{JobFile, StoreError};
use crate::options::resolve;
use crate::report::EncodeReport;
use crate::runner::{run_job, RunContext};
use batchencode_config::Options;
use std::fs;
use std::path::PathBuf;

/// Aggregated results of one batch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Jobs that succeeded on this pass
    pub succeeded: usize,
    /// Jobs that failed on this pass
    pub failed: usize,
    /// Jobs skipped because they already succeeded on an earlier pass
    pub skipped: usize,
}

impl BatchSummary {
    /// True when every job either succeeded or was skipped.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Drives one sequential pass over the job store.
pub struct BatchController {
    /// Where the store is persisted after every job
    job_file_path: PathBuf,
    /// CLI option layer, highest precedence
    cli_options: Options,
    /// User defaults layer, lowest precedence
    user_defaults: Options,
    /// Scratch directory for in-flight encodes
    tempdir: PathBuf,
    /// Go through the motions without spawning the transcoder
    skip_encode: bool,
}

impl BatchController {
    pub fn new(
        job_file_path: PathBuf,
        cli_options: Options,
        user_defaults: Options,
        tempdir: PathBuf,
        skip_encode: bool,
    ) -> Self {
        Self {
            job_file_path,
            cli_options,
            user_defaults,
            tempdir,
            skip_encode,
        }
    }

    /// Run every job in the store that still needs a run, in store order,
    /// one at a time.
    ///
    /// The store is saved after each job. A save failure is fatal: the
    /// batch-resilience contract rests on the persisted job list, and
    /// running on without it would make a crash unrecoverable.
    pub fn run(
        &self,
        store: &mut JobFile,
        report: &mut EncodeReport,
    ) -> Result<BatchSummary, StoreError> {
        fs::create_dir_all(&self.tempdir)?;

        let mut summary = BatchSummary::default();

        for idx in 0..store.jobs.len() {
            if !store.jobs[idx].needs_run() {
                log::debug!(
                    "Skipping {} (already succeeded)",
                    store.jobs[idx].input_file.display()
                );
                summary.skipped += 1;
                continue;
            }

            let effective = resolve(
                &self.cli_options,
                &store.jobs[idx].overrides,
                &store.options,
                &self.user_defaults,
            );

            let ctx = RunContext {
                workdir: store.workdir.clone(),
                outdir: store.outdir.clone(),
                tempdir: self.tempdir.clone(),
                media_root: store.media_root.clone(),
                archive_root: store.archive_root.clone(),
                skip_encode: self.skip_encode,
            };

            let record = run_job(&mut store.jobs[idx], &effective, &ctx);
            if record.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            report.add(record);

            store.save(&self.job_file_path)?;
        }

        Ok(summary)
    }
}
