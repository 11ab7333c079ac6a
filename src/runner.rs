use crate::error::{SlurmError, SlurmResult};
use std::io::Write;
use std::process::{Command, Stdio};

/// Captured result of one scheduler command invocation.
///
/// stdout and stderr are merged into `text`, matching what the scheduler
/// tools print when run interactively.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub text: String,
}

/// Seam between the library and the scheduler binaries.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>)
    -> SlurmResult<CommandOutput>;
}

/// Runs scheduler commands as child processes.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> SlurmResult<CommandOutput> {
        let unresponsive = |source: std::io::Error| SlurmError::SlurmUnresponsive {
            command: program.to_string(),
            source,
        };
        let mut command = Command::new(program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if stdin.is_some() {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }
        let mut child = command.spawn().map_err(unresponsive)?;
        if let Some(input) = stdin {
            // stdin handle was requested above, so it is present here
            if let Some(mut handle) = child.stdin.take() {
                handle.write_all(input.as_bytes()).map_err(unresponsive)?;
            }
        }
        let output = child.wait_with_output().map_err(unresponsive)?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutput {
            code: output.status.code(),
            text,
        })
    }
}
