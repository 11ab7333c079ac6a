use crate::defaults::SlurmDefaults;
use crate::error::{SlurmError, SlurmResult};
use crate::job::{DEFAULT_SHELL, SlurmJob};
use crate::job_state::JobStatusMap;
use crate::poller::{
    CancelToken, DEFAULT_POLL_INTERVAL, PollStep, STUCK_REASON, WaitOutcome, classify,
};
use crate::runner::{CommandRunner, SystemRunner};
use log::{error, info, warn};
use std::time::Duration;

const SBATCH_SUCCESS_MARKER: &str = "Submitted batch job";
const DEFAULT_INFO_FORMAT: &str = "JobID%20,JobName%25,State,Partition,Elapsed,AllocCPUS,AllocNodes";

/// squeue filter set.
#[derive(Debug, Clone, Default)]
pub struct QueueQuery {
    pub user: Option<String>,
    pub account: Option<String>,
    pub jobs: Vec<String>,
    pub no_header: bool,
    pub extra_args: Vec<String>,
}

/// sacct query; `format` falls back to the default column set.
#[derive(Debug, Clone)]
pub struct JobInfoQuery {
    pub jobs: Vec<String>,
    pub format: Option<String>,
    pub no_header: bool,
    /// Restrict to allocations (`-X`), hiding per-step rows.
    pub allocations: bool,
    pub extra_args: Vec<String>,
}

impl JobInfoQuery {
    pub fn for_jobs(jobs: &[String]) -> JobInfoQuery {
        JobInfoQuery {
            jobs: jobs.to_vec(),
            format: None,
            no_header: false,
            allocations: true,
            extra_args: Vec::new(),
        }
    }
}

/// Front door to the scheduler binaries: submission, queries and the
/// completion wait. Holds the resolved cluster defaults; nothing here
/// touches the environment after construction.
pub struct SlurmClient<R: CommandRunner = SystemRunner> {
    runner: R,
    defaults: SlurmDefaults,
    poll_interval: Duration,
}

impl SlurmClient<SystemRunner> {
    /// Resolves the environment once and talks to the real binaries.
    pub fn from_env() -> SlurmClient<SystemRunner> {
        SlurmClient::with_runner(SystemRunner, SlurmDefaults::from_env())
    }
}

impl<R: CommandRunner> SlurmClient<R> {
    pub fn with_runner(runner: R, defaults: SlurmDefaults) -> SlurmClient<R> {
        SlurmClient {
            runner,
            defaults,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn defaults(&self) -> &SlurmDefaults {
        &self.defaults
    }

    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.poll_interval = poll_interval;
    }

    /// Submits the job script through sbatch stdin and returns the job id.
    ///
    /// sbatch output without its acknowledgement line is a fatal error
    /// carrying the raw output.
    pub fn sbatch(&self, job: &SlurmJob) -> SlurmResult<String> {
        let script = job.wrap_command_to_script(DEFAULT_SHELL)?;
        let output = self.runner.run("sbatch", &[], Some(&script))?;
        let text = output.text.trim();
        let acknowledged = text.lines().find(|line| line.contains(SBATCH_SUCCESS_MARKER));
        let job_id = acknowledged
            .and_then(|line| line.split_whitespace().nth(3))
            .map(str::to_string);
        match job_id {
            Some(job_id) => {
                info!("job {} submitted as batch job {}", job, job_id);
                Ok(job_id)
            }
            None => {
                error!("sbatch rejected job {}: {}", job, text);
                Err(SlurmError::BadSbatchResponse(text.to_string()))
            }
        }
    }

    /// Runs the job command through srun, blocking until it exits. Returns
    /// the exit code, -1 when the process died to a signal.
    pub fn srun(&self, job: &SlurmJob) -> SlurmResult<i32> {
        job.validate_command()?;
        let mut body = job.array_preamble();
        body.extend(job.command.iter().cloned());
        let mut args = job.inline_args();
        args.push(String::from("sh"));
        args.push(String::from("-c"));
        args.push(format!("({})", body.join("; ")));
        let output = self.runner.run("srun", &args, None)?;
        Ok(output.code.unwrap_or(-1))
    }

    pub fn get_queue(&self, query: &QueueQuery) -> SlurmResult<String> {
        let mut args = query.extra_args.clone();
        if let Some(user) = &query.user {
            args.push(String::from("--user"));
            args.push(user.clone());
        }
        if let Some(account) = &query.account {
            args.push(String::from("--account"));
            args.push(account.clone());
        }
        if !query.jobs.is_empty() {
            args.push(String::from("--jobs"));
            args.push(query.jobs.join(","));
        }
        if query.no_header {
            args.push(String::from("--noheader"));
        }
        Ok(self.runner.run("squeue", &args, None)?.text)
    }

    pub fn get_job_info(&self, query: &JobInfoQuery) -> SlurmResult<String> {
        let mut args = vec![String::from("-j"), query.jobs.join(",")];
        args.extend(query.extra_args.iter().cloned());
        if query.no_header {
            args.push(String::from("-n"));
        }
        if query.allocations {
            args.push(String::from("-X"));
        }
        args.push(String::from("--format"));
        args.push(
            query
                .format
                .clone()
                .unwrap_or_else(|| String::from(DEFAULT_INFO_FORMAT)),
        );
        Ok(self.runner.run("sacct", &args, None)?.text)
    }

    /// One fresh status record per call: job id to verbatim state label.
    pub fn get_status(&self, job_ids: &[String]) -> SlurmResult<JobStatusMap> {
        let query = JobInfoQuery {
            format: Some(String::from("JobID,State")),
            no_header: true,
            extra_args: vec![String::from("--parsable2")],
            ..JobInfoQuery::for_jobs(job_ids)
        };
        Ok(JobStatusMap::parse(&self.get_job_info(&query)?))
    }

    /// Blocks until every sub-job reaches a terminal state, polling sacct
    /// every poll interval.
    ///
    /// Jobs pending behind a maintenance reservation end the wait early
    /// instead of parking it forever; there is no other timeout.
    pub fn wait_completion(
        &self,
        job_ids: &[String],
        cancel: &CancelToken,
    ) -> SlurmResult<WaitOutcome> {
        info!("waiting for jobs [{}] to finish", job_ids.join(","));
        loop {
            if cancel.is_cancelled() {
                return Ok(WaitOutcome::Cancelled(JobStatusMap::default()));
            }
            let status = self.get_status(job_ids)?;
            match classify(&status) {
                PollStep::AllCompleted => {
                    info!("all jobs have successfully finished");
                    return Ok(WaitOutcome::Completed(status));
                }
                PollStep::NoneActive { failed } => {
                    let queue_info = self.get_queue(&QueueQuery {
                        jobs: failed.clone(),
                        ..QueueQuery::default()
                    })?;
                    error!("jobs [{}] finished without completing", failed.join(","));
                    return Ok(WaitOutcome::Failed {
                        status,
                        failed,
                        queue_info,
                    });
                }
                PollStep::SomePending { pending } => {
                    let queue_info = self.get_queue(&QueueQuery {
                        jobs: pending.clone(),
                        ..QueueQuery::default()
                    })?;
                    let reservations: Vec<String> = queue_info
                        .lines()
                        .filter(|line| line.contains(STUCK_REASON))
                        .map(str::to_string)
                        .collect();
                    if !reservations.is_empty() {
                        warn!(
                            "jobs [{}] are pending behind a maintenance reservation",
                            pending.join(",")
                        );
                        return Ok(WaitOutcome::StuckPending {
                            status,
                            pending,
                            reservations,
                        });
                    }
                }
                PollStep::KeepWaiting => {}
            }
            if !cancel.sleep(self.poll_interval) {
                return Ok(WaitOutcome::Cancelled(status));
            }
        }
    }
}
