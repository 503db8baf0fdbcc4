//! System sleep inhibition for long batch runs.
//!
//! Holds a `caffeinate` child process alive for the duration of the
//! batch and kills it when dropped. Inhibition is best-effort: when the
//! helper cannot be spawned the batch runs anyway with a warning.

use std::process::{Child, Command, Stdio};

const CAFFEINATE_COMMAND: &str = "caffeinate";

/// Keeps the system awake while held. Dropping it releases the
/// inhibition.
pub struct SleepInhibitor {
    child: Child,
}

impl SleepInhibitor {
    /// Start inhibiting system sleep.
    ///
    /// Returns `None` when the helper is unavailable; the caller keeps
    /// going either way.
    pub fn engage() -> Option<Self> {
        Self::spawn_helper(CAFFEINATE_COMMAND)
    }

    fn spawn_helper(command: &str) -> Option<Self> {
        match Command::new(command)
            .arg("-i")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                log::info!("Inhibiting system sleep (pid {})", child.id());
                Some(Self { child })
            }
            Err(e) => {
                log::warn!("Could not inhibit system sleep: {}", e);
                None
            }
        }
    }
}

impl Drop for SleepInhibitor {
    fn drop(&mut self) {
        // Reap the helper so it does not outlive the batch.
        let _ = self.child.kill();
        let _ = self.child.wait();
        log::debug!("Released sleep inhibition");
    }
}
