use crate::memory_size::Memory;
use std::env;
use std::path::PathBuf;

pub const ACCOUNT_VAR: &str = "SLURM_ACCOUNT";
pub const PARTITION_VAR: &str = "SLURM_PARTITION";
pub const NOTIFY_EMAIL_VAR: &str = "SLURM_NOTIFY_EMAIL";
pub const LOG_DIR_VAR: &str = "LOG_DIR";

/// Cluster-wide defaults, resolved once and passed to job construction.
///
/// This is the only place the library reads the environment.
#[derive(Debug, Clone)]
pub struct SlurmDefaults {
    pub account: Option<String>,
    pub partition: Option<String>,
    pub mail_user: Option<String>,
    pub log_dir: PathBuf,
    pub nodes: u32,
    pub cpus_per_task: u32,
    pub mem: Memory,
    pub time: String,
    pub job_name: String,
}

impl Default for SlurmDefaults {
    fn default() -> SlurmDefaults {
        SlurmDefaults {
            account: None,
            partition: None,
            mail_user: None,
            log_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            nodes: 1,
            cpus_per_task: 2,
            mem: Memory::GigaByte(8),
            time: String::from("3-00:00:00"),
            job_name: String::from("Job"),
        }
    }
}

impl SlurmDefaults {
    pub fn from_env() -> SlurmDefaults {
        Self::resolve(|name| env::var(name).ok())
    }

    pub(crate) fn resolve(lookup: impl Fn(&str) -> Option<String>) -> SlurmDefaults {
        let mut defaults = SlurmDefaults::default();
        defaults.account = lookup(ACCOUNT_VAR);
        defaults.partition = lookup(PARTITION_VAR);
        defaults.mail_user = lookup(NOTIFY_EMAIL_VAR);
        if let Some(log_dir) = lookup(LOG_DIR_VAR) {
            defaults.log_dir = PathBuf::from(log_dir);
        }
        defaults
    }
}
