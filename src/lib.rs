pub mod arg_value;
pub mod defaults;
pub mod error;
pub mod job;
pub mod job_builder;
pub mod job_state;
pub mod memory_size;
pub mod poller;
pub mod runner;
pub mod slurm_client;

#[cfg(test)]
mod tests {
    use crate::defaults::SlurmDefaults;
    use crate::job::SlurmJob;
    use crate::job_builder::SlurmJobBuilder;
    use crate::memory_size::Memory::MegaByte;
    use crate::poller::{CancelToken, WaitOutcome};
    use crate::runner::fake::FakeRunner;
    use crate::slurm_client::SlurmClient;
    use chrono::TimeDelta;
    use std::time::Duration;

    fn generate_job(defaults: &SlurmDefaults) -> SlurmJob {
        SlurmJobBuilder::new("sleep 5".to_string()) // job is to sleep for 5 seconds
            .set_job_name("sleeper".to_string()) // name shown in the queue
            .set_cpus(1) // run on a single cpu
            .set_memory(MegaByte(100)) // use at most 100 MB of RAM
            .set_time(TimeDelta::minutes(5)) // run for a maximum of five minutes
            .build(defaults) // build the job
    }

    #[test]
    fn submit_and_wait_for_a_job() {
        // scripted scheduler: one submission, one status poll
        let runner = FakeRunner::new(["Submitted batch job 123\n", "123|COMPLETED\n"]);
        let mut client = SlurmClient::with_runner(runner, SlurmDefaults::resolve(|_| None));
        client.set_poll_interval(Duration::from_millis(1));
        let job = generate_job(client.defaults());
        let job_id = client.sbatch(&job).expect("submission should be acknowledged");
        assert_eq!(job_id, "123");
        let outcome = client
            .wait_completion(&[job_id], &CancelToken::new())
            .expect("scheduler should stay reachable");
        assert!(matches!(outcome, WaitOutcome::Completed(_)));
    }
}
