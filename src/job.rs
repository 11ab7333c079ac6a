use crate::arg_value::ArgValue;
use crate::error::{SlurmError, SlurmResult};
use crate::memory_size::Memory;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

// filename patterns sbatch expands in --output
pub const JOB_NAME: &str = "%x";
pub const JOB_ID: &str = "%j";
pub const JOB_ARRAY_MASTER_ID: &str = "%A";
pub const JOB_ARRAY_ID: &str = "%a";
// variable slurm exports inside each array task
pub const SLURM_ARRAY_TASK_ID: &str = "$SLURM_ARRAY_TASK_ID";

pub const DIRECTIVE_PREFIX: &str = "#SBATCH";
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Variable setup for array jobs: expands to an `ARRAY=(..)` preamble and a
/// per-task variable picked by `$SLURM_ARRAY_TASK_ID`.
#[derive(Debug, Clone)]
pub(crate) struct ArrayInfo {
    pub(crate) variable: String,
    pub(crate) values: Vec<String>,
}

/// A batch job: one named field per supported sbatch option, plus the
/// command body. Built through `SlurmJobBuilder`.
#[derive(Clone)]
pub struct SlurmJob {
    pub(crate) id: String,
    pub(crate) command: Vec<String>,
    pub(crate) job_name: String,
    pub(crate) account: Option<String>,
    pub(crate) partition: Option<String>,
    pub(crate) nodes: u32,
    pub(crate) ntasks: Option<u32>,
    pub(crate) cpus_per_task: u32,
    pub(crate) mem: Memory,
    pub(crate) time: ArgValue,
    /// `None` derives the log path from `log_dir` and the job name.
    pub(crate) output: Option<PathBuf>,
    pub(crate) error: Option<PathBuf>,
    pub(crate) array: Option<ArgValue>,
    pub(crate) dependency: Option<ArgValue>,
    pub(crate) mail_user: Option<String>,
    pub(crate) mail_type: Option<ArgValue>,
    pub(crate) chdir: Option<PathBuf>,
    pub(crate) qos: Option<String>,
    pub(crate) gres: Option<ArgValue>,
    pub(crate) constraint: Option<String>,
    pub(crate) nodelist: Option<String>,
    pub(crate) exclusive: Option<bool>,
    pub(crate) requeue: Option<bool>,
    pub(crate) extra: Vec<(String, ArgValue)>,
    pub(crate) array_info: Option<ArrayInfo>,
    pub(crate) log_dir: PathBuf,
}

impl Display for SlurmJob {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id.as_str())
    }
}

impl SlurmJob {
    pub(crate) fn validate_command(&self) -> SlurmResult<()> {
        if self.command.is_empty() {
            return Err(SlurmError::EmptyCommand);
        }
        Ok(())
    }

    /// Log file target: `{log_dir}/%x_%j.log`, or `%x_%A_%a.log` for array
    /// jobs without a caller-chosen output.
    pub(crate) fn effective_output(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None if self.array.is_some() => self.log_dir.join(format!(
                "{}_{}_{}.log",
                JOB_NAME, JOB_ARRAY_MASTER_ID, JOB_ARRAY_ID
            )),
            None => self.log_dir.join(format!("{}_{}.log", JOB_NAME, JOB_ID)),
        }
    }

    /// Set options in declaration order, formatted; omitted flags dropped.
    fn argument_entries(&self) -> Vec<(String, String)> {
        let mut raw: Vec<(&str, ArgValue)> = Vec::new();
        raw.push(("job-name", ArgValue::from(self.job_name.clone())));
        if let Some(account) = &self.account {
            raw.push(("account", ArgValue::from(account.clone())));
        }
        if let Some(partition) = &self.partition {
            raw.push(("partition", ArgValue::from(partition.clone())));
        }
        raw.push(("nodes", ArgValue::from(self.nodes)));
        if let Some(ntasks) = self.ntasks {
            raw.push(("ntasks", ArgValue::from(ntasks)));
        }
        raw.push(("cpus-per-task", ArgValue::from(self.cpus_per_task)));
        raw.push(("mem", ArgValue::from(self.mem.to_string())));
        raw.push(("time", self.time.clone()));
        raw.push((
            "output",
            ArgValue::from(self.effective_output().to_string_lossy().into_owned()),
        ));
        if let Some(error) = &self.error {
            raw.push(("error", ArgValue::from(error.to_string_lossy().into_owned())));
        }
        if let Some(array) = &self.array {
            raw.push(("array", array.clone()));
        }
        if let Some(dependency) = &self.dependency {
            raw.push(("dependency", dependency.clone()));
        }
        if let Some(mail_user) = &self.mail_user {
            raw.push(("mail-user", ArgValue::from(mail_user.clone())));
        }
        if let Some(mail_type) = &self.mail_type {
            raw.push(("mail-type", mail_type.clone()));
        }
        if let Some(chdir) = &self.chdir {
            raw.push(("chdir", ArgValue::from(chdir.to_string_lossy().into_owned())));
        }
        if let Some(qos) = &self.qos {
            raw.push(("qos", ArgValue::from(qos.clone())));
        }
        if let Some(gres) = &self.gres {
            raw.push(("gres", gres.clone()));
        }
        if let Some(constraint) = &self.constraint {
            raw.push(("constraint", ArgValue::from(constraint.clone())));
        }
        if let Some(nodelist) = &self.nodelist {
            raw.push(("nodelist", ArgValue::from(nodelist.clone())));
        }
        if let Some(exclusive) = self.exclusive {
            raw.push(("exclusive", ArgValue::Flag(exclusive)));
        }
        if let Some(requeue) = self.requeue {
            raw.push(("requeue", ArgValue::Flag(requeue)));
        }
        let mut entries: Vec<(String, String)> = raw
            .into_iter()
            .filter_map(|(key, value)| value.format().map(|text| (key.to_string(), text)))
            .collect();
        entries.extend(
            self.extra
                .iter()
                .filter_map(|(key, value)| value.format().map(|text| (key.clone(), text))),
        );
        entries
    }

    /// Script header: shebang, blank line, one directive per set option.
    pub fn format_arguments(&self, shell: &str) -> String {
        let mut lines = vec![format!("#!{}", shell), String::new()];
        for (key, value) in self.argument_entries() {
            let line = format!("{} --{:<19} {}", DIRECTIVE_PREFIX, key, value);
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }

    /// Command-line form: `--key=value` tokens, bare `--key` for valueless
    /// flags.
    pub fn inline_args(&self) -> Vec<String> {
        self.argument_entries()
            .into_iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    format!("--{}", key)
                } else {
                    format!("--{}={}", key, value)
                }
            })
            .collect()
    }

    pub(crate) fn array_preamble(&self) -> Vec<String> {
        match &self.array_info {
            Some(info) => vec![
                format!("ARRAY=({})", info.values.join(" ")),
                format!("{}=${{ARRAY[{}]}}", info.variable, SLURM_ARRAY_TASK_ID),
            ],
            None => Vec::new(),
        }
    }

    /// Full submission script: header, blank line, array preamble, command.
    pub fn wrap_command_to_script(&self, shell: &str) -> SlurmResult<String> {
        self.validate_command()?;
        let mut lines = vec![self.format_arguments(shell), String::new()];
        lines.extend(self.array_preamble());
        lines.extend(self.command.iter().cloned());
        Ok(lines.join("\n"))
    }

    /// Single-line invocation: inline args plus a quoted `--wrap` body.
    /// `escape_vars` backslash-escapes `$` so variables survive one level of
    /// shell expansion.
    pub fn wrap_command_to_argument(&self, escape_vars: bool) -> SlurmResult<String> {
        self.validate_command()?;
        let mut body = self.array_preamble();
        body.extend(self.command.iter().cloned());
        if escape_vars {
            body = body.iter().map(|line| line.replace('$', "\\$")).collect();
        }
        let mut parts = self.inline_args();
        parts.push(format!("--wrap=\"{}\"", body.join("; ")));
        Ok(parts.join(" "))
    }

    pub fn write_command_to_file(&self, out_file: &Path, shell: &str) -> SlurmResult<()> {
        let script = self.wrap_command_to_script(shell)?;
        fs::write(out_file, script).map_err(|source| SlurmError::ScriptWrite {
            path: out_file.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::SlurmDefaults;
    use crate::job_builder::SlurmJobBuilder;
    use chrono::TimeDelta;

    fn bare_defaults() -> SlurmDefaults {
        SlurmDefaults {
            log_dir: PathBuf::from("/var/log/slurm"),
            ..SlurmDefaults::resolve(|_| None)
        }
    }

    #[test]
    fn script_header_carries_defaults_in_declaration_order() {
        let job = SlurmJobBuilder::new("sleep 5").build(&bare_defaults());
        let header = job.format_arguments(DEFAULT_SHELL);
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines[0], "#!/bin/sh");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "#SBATCH --job-name            Job");
        assert_eq!(lines[3], "#SBATCH --nodes               1");
        assert_eq!(lines[4], "#SBATCH --cpus-per-task       2");
        assert_eq!(lines[5], "#SBATCH --mem                 8G");
        assert_eq!(lines[6], "#SBATCH --time                3-00:00:00");
        assert_eq!(
            lines[7],
            "#SBATCH --output              /var/log/slurm/%x_%j.log"
        );
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn wrap_command_to_script_appends_body_after_blank_line() {
        let job = SlurmJobBuilder::new(vec![
            String::from("module load python"),
            String::from("python train.py"),
        ])
        .build(&bare_defaults());
        let script = job.wrap_command_to_script(DEFAULT_SHELL).unwrap();
        assert!(script.ends_with("\n\nmodule load python\npython train.py"));
    }

    #[test]
    fn true_flag_renders_bare_false_flag_disappears() {
        let job = SlurmJobBuilder::new("sleep 5")
            .set_exclusive(true)
            .set_requeue(false)
            .build(&bare_defaults());
        let header = job.format_arguments(DEFAULT_SHELL);
        assert!(header.lines().any(|line| line == "#SBATCH --exclusive"));
        assert!(!header.contains("requeue"));
        let inline = job.inline_args();
        assert!(inline.contains(&String::from("--exclusive")));
        assert!(!inline.iter().any(|token| token.contains("requeue")));
    }

    #[test]
    fn typed_values_flow_through_the_formatter() {
        let job = SlurmJobBuilder::new("sleep 5")
            .set_time(TimeDelta::days(1) + TimeDelta::minutes(30))
            .set_array(3..15)
            .set_dependency(ArgValue::map([("afterok", 34987)]))
            .build(&bare_defaults());
        let inline = job.inline_args();
        assert!(inline.contains(&String::from("--time=1-00:30:00")));
        assert!(inline.contains(&String::from("--array=3-14")));
        assert!(inline.contains(&String::from("--dependency=afterok:34987")));
    }

    #[test]
    fn array_jobs_derive_task_numbered_log_files() {
        let defaults = bare_defaults();
        let plain = SlurmJobBuilder::new("sleep 5").build(&defaults);
        assert_eq!(
            plain.effective_output(),
            PathBuf::from("/var/log/slurm/%x_%j.log")
        );
        let array = SlurmJobBuilder::new("sleep 5").set_array(0..4).build(&defaults);
        assert_eq!(
            array.effective_output(),
            PathBuf::from("/var/log/slurm/%x_%A_%a.log")
        );
        let custom = SlurmJobBuilder::new("sleep 5")
            .set_array(0..4)
            .set_output("/tmp/custom.log")
            .build(&defaults);
        assert_eq!(custom.effective_output(), PathBuf::from("/tmp/custom.log"));
    }

    #[test]
    fn array_info_expands_to_preamble_lines() {
        let job = SlurmJobBuilder::new("echo $SUBJECT")
            .set_array(0..2)
            .set_array_info("SUBJECT", ["sub-01", "sub-02"])
            .build(&bare_defaults());
        let script = job.wrap_command_to_script(DEFAULT_SHELL).unwrap();
        assert!(script.contains("ARRAY=(sub-01 sub-02)"));
        assert!(script.contains("SUBJECT=${ARRAY[$SLURM_ARRAY_TASK_ID]}"));
    }

    #[test]
    fn wrap_command_to_argument_quotes_and_escapes() {
        let job = SlurmJobBuilder::new("echo $HOME").build(&bare_defaults());
        let plain = job.wrap_command_to_argument(false).unwrap();
        assert!(plain.ends_with("--wrap=\"echo $HOME\""));
        let escaped = job.wrap_command_to_argument(true).unwrap();
        assert!(escaped.ends_with("--wrap=\"echo \\$HOME\""));
        assert!(escaped.starts_with("--job-name=Job "));
    }

    #[test]
    fn empty_command_is_rejected_before_rendering() {
        let job = SlurmJobBuilder::new(Vec::<String>::new()).build(&bare_defaults());
        assert!(matches!(
            job.wrap_command_to_script(DEFAULT_SHELL),
            Err(SlurmError::EmptyCommand)
        ));
    }

    #[test]
    fn write_command_to_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.slurm");
        let job = SlurmJobBuilder::new("sleep 5").build(&bare_defaults());
        job.write_command_to_file(&path, DEFAULT_SHELL).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, job.wrap_command_to_script(DEFAULT_SHELL).unwrap());
    }
}
