use crate::job_state::{JobState, JobStatusMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Substring squeue prints for jobs pinned behind a maintenance
/// reservation. Best-effort: the exact wording depends on the scheduler
/// version.
pub const STUCK_REASON: &str = "ReqNodeNotAvail";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Terminal result of waiting on one or more (sub-)jobs.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// Every sub-job reached COMPLETED.
    Completed(JobStatusMap),
    /// No sub-job is transitional any more and at least one did not
    /// complete. `queue_info` is the diagnostic squeue output for the
    /// offending ids.
    Failed {
        status: JobStatusMap,
        failed: Vec<String>,
        queue_info: String,
    },
    /// Pending sub-jobs are parked behind a maintenance reservation and will
    /// not start; waiting longer is pointless.
    StuckPending {
        status: JobStatusMap,
        pending: Vec<String>,
        reservations: Vec<String>,
    },
    /// The caller cancelled the wait.
    Cancelled(JobStatusMap),
}

/// What one poll tick decided.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PollStep {
    AllCompleted,
    NoneActive { failed: Vec<String> },
    SomePending { pending: Vec<String> },
    KeepWaiting,
}

/// Transition rule over a fresh status record.
///
/// An empty record means the job is not visible in accounting yet and is
/// treated as still waiting.
pub(crate) fn classify(status: &JobStatusMap) -> PollStep {
    if status.is_empty() {
        return PollStep::KeepWaiting;
    }
    if status.all_in_state(JobState::Completed) {
        return PollStep::AllCompleted;
    }
    let any_running = status.any_in_state(JobState::Running);
    let any_pending = status.any_in_state(JobState::Pending);
    if !any_running && !any_pending {
        return PollStep::NoneActive {
            failed: status.ids_in_state(JobState::Failed),
        };
    }
    if any_pending {
        return PollStep::SomePending {
            pending: status.ids_in_state(JobState::Pending),
        };
    }
    PollStep::KeepWaiting
}

/// Cooperative cancellation flag for `wait_completion`. Clone it into
/// whatever needs to interrupt the wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `interval`, waking early on cancellation. Returns false
    /// when cancelled.
    pub(crate) fn sleep(&self, interval: Duration) -> bool {
        let step = Duration::from_millis(250);
        let mut remaining = interval;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let chunk = remaining.min(step);
            std::thread::sleep(chunk);
            remaining -= chunk;
        }
        !self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(entries: &[(&str, &str)]) -> JobStatusMap {
        let text: Vec<String> = entries
            .iter()
            .map(|(id, label)| format!("{}|{}", id, label))
            .collect();
        JobStatusMap::parse(&text.join("\n"))
    }

    #[test]
    fn all_completed_is_terminal_success() {
        let step = classify(&status(&[("123", "COMPLETED"), ("124", "COMPLETED")]));
        assert_eq!(step, PollStep::AllCompleted);
    }

    #[test]
    fn cancelled_job_fails_immediately() {
        let step = classify(&status(&[("123", "CANCELLED")]));
        assert_eq!(
            step,
            PollStep::NoneActive {
                failed: vec![String::from("123")]
            }
        );
    }

    #[test]
    fn mixed_terminal_states_report_only_offenders() {
        let step = classify(&status(&[
            ("900_1", "COMPLETED"),
            ("900_2", "TIMEOUT"),
            ("900_3", "NODE_FAIL"),
        ]));
        assert_eq!(
            step,
            PollStep::NoneActive {
                failed: vec![String::from("900_2"), String::from("900_3")]
            }
        );
    }

    #[test]
    fn pending_jobs_trigger_the_stuck_diagnostic() {
        let step = classify(&status(&[("123", "RUNNING"), ("124", "PENDING")]));
        assert_eq!(
            step,
            PollStep::SomePending {
                pending: vec![String::from("124")]
            }
        );
    }

    #[test]
    fn running_jobs_keep_waiting() {
        assert_eq!(classify(&status(&[("123", "RUNNING")])), PollStep::KeepWaiting);
    }

    #[test]
    fn empty_record_keeps_waiting() {
        assert_eq!(classify(&JobStatusMap::default()), PollStep::KeepWaiting);
    }

    #[test]
    fn cancel_token_interrupts_the_sleep() {
        let token = CancelToken::new();
        token.cancel();
        assert!(!token.sleep(Duration::from_secs(60)));
    }
}
