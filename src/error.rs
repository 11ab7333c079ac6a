use thiserror::Error;

pub type SlurmResult<T> = Result<T, SlurmError>;

#[derive(Debug, Error)]
pub enum SlurmError {
    /// The scheduler binary could not be executed at all. Not retried.
    #[error("could not run `{command}`: {source}")]
    SlurmUnresponsive {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// sbatch ran but did not acknowledge the submission.
    #[error("sbatch did not acknowledge the submission: {0}")]
    BadSbatchResponse(String),
    #[error("job command must contain at least one line")]
    EmptyCommand,
    #[error("could not write script to {}: {source}", path.display())]
    ScriptWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
