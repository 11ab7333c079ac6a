use crate::arg_value::ArgValue;
use crate::defaults::SlurmDefaults;
use crate::job::{ArrayInfo, SlurmJob};
use crate::memory_size::Memory;
use std::path::PathBuf;
use uuid::Uuid;

/// One entry per supported sbatch option; anything else goes through
/// `add_argument`. `build` fills unset fields from the cluster defaults.
pub struct SlurmJobBuilder {
    command: Vec<String>,
    job_name: Option<String>,
    account: Option<String>,
    partition: Option<String>,
    nodes: Option<u32>,
    ntasks: Option<u32>,
    cpus_per_task: Option<u32>,
    mem: Option<Memory>,
    time: Option<ArgValue>,
    output: Option<PathBuf>,
    error: Option<PathBuf>,
    array: Option<ArgValue>,
    dependency: Option<ArgValue>,
    mail_user: Option<String>,
    mail_type: Option<ArgValue>,
    chdir: Option<PathBuf>,
    qos: Option<String>,
    gres: Option<ArgValue>,
    constraint: Option<String>,
    nodelist: Option<String>,
    exclusive: Option<bool>,
    requeue: Option<bool>,
    extra: Vec<(String, ArgValue)>,
    array_info: Option<ArrayInfo>,
    log_dir: Option<PathBuf>,
}

impl SlurmJobBuilder {
    pub fn new(command: impl Into<CommandLines>) -> SlurmJobBuilder {
        SlurmJobBuilder {
            command: command.into().0,
            job_name: None,
            account: None,
            partition: None,
            nodes: None,
            ntasks: None,
            cpus_per_task: None,
            mem: None,
            time: None,
            output: None,
            error: None,
            array: None,
            dependency: None,
            mail_user: None,
            mail_type: None,
            chdir: None,
            qos: None,
            gres: None,
            constraint: None,
            nodelist: None,
            exclusive: None,
            requeue: None,
            extra: Vec::new(),
            array_info: None,
            log_dir: None,
        }
    }

    pub fn set_job_name(mut self, job_name: impl Into<String>) -> SlurmJobBuilder {
        self.job_name = Some(job_name.into());
        self
    }

    pub fn set_account(mut self, account: impl Into<String>) -> SlurmJobBuilder {
        self.account = Some(account.into());
        self
    }

    pub fn set_partition(mut self, partition: impl Into<String>) -> SlurmJobBuilder {
        self.partition = Some(partition.into());
        self
    }

    pub fn set_nodes(mut self, nodes: u32) -> SlurmJobBuilder {
        self.nodes = Some(nodes);
        self
    }

    pub fn set_ntasks(mut self, ntasks: u32) -> SlurmJobBuilder {
        self.ntasks = Some(ntasks);
        self
    }

    pub fn set_cpus(mut self, cpus: u32) -> SlurmJobBuilder {
        self.cpus_per_task = Some(cpus);
        self
    }

    pub fn set_memory(mut self, memory: Memory) -> SlurmJobBuilder {
        self.mem = Some(memory);
        self
    }

    /// Accepts anything the formatter understands: a `D-HH:MM:SS` string or
    /// a `chrono::TimeDelta`.
    pub fn set_time(mut self, time: impl Into<ArgValue>) -> SlurmJobBuilder {
        self.time = Some(time.into());
        self
    }

    pub fn set_output(mut self, output: impl Into<PathBuf>) -> SlurmJobBuilder {
        self.output = Some(output.into());
        self
    }

    pub fn set_error(mut self, error: impl Into<PathBuf>) -> SlurmJobBuilder {
        self.error = Some(error.into());
        self
    }

    pub fn set_array(mut self, array: impl Into<ArgValue>) -> SlurmJobBuilder {
        self.array = Some(array.into());
        self
    }

    pub fn set_dependency(mut self, dependency: impl Into<ArgValue>) -> SlurmJobBuilder {
        self.dependency = Some(dependency.into());
        self
    }

    pub fn set_mail_user(mut self, mail_user: impl Into<String>) -> SlurmJobBuilder {
        self.mail_user = Some(mail_user.into());
        self
    }

    pub fn set_mail_type(mut self, mail_type: impl Into<ArgValue>) -> SlurmJobBuilder {
        self.mail_type = Some(mail_type.into());
        self
    }

    pub fn set_chdir(mut self, chdir: impl Into<PathBuf>) -> SlurmJobBuilder {
        self.chdir = Some(chdir.into());
        self
    }

    pub fn set_qos(mut self, qos: impl Into<String>) -> SlurmJobBuilder {
        self.qos = Some(qos.into());
        self
    }

    pub fn set_gres(mut self, gres: impl Into<ArgValue>) -> SlurmJobBuilder {
        self.gres = Some(gres.into());
        self
    }

    pub fn set_constraint(mut self, constraint: impl Into<String>) -> SlurmJobBuilder {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn set_nodelist(mut self, nodelist: impl Into<String>) -> SlurmJobBuilder {
        self.nodelist = Some(nodelist.into());
        self
    }

    pub fn set_exclusive(mut self, exclusive: bool) -> SlurmJobBuilder {
        self.exclusive = Some(exclusive);
        self
    }

    pub fn set_requeue(mut self, requeue: bool) -> SlurmJobBuilder {
        self.requeue = Some(requeue);
        self
    }

    /// Any further long option; underscores in the key become hyphens.
    pub fn add_argument(
        mut self,
        key: impl Into<String>,
        value: impl Into<ArgValue>,
    ) -> SlurmJobBuilder {
        let key = key
            .into()
            .trim()
            .trim_start_matches('-')
            .replace('_', "-");
        self.extra.push((key, value.into()));
        self
    }

    /// Exposes the array values under `variable`, one per task, inside the
    /// generated script.
    pub fn set_array_info<V: Into<String>>(
        mut self,
        variable: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> SlurmJobBuilder {
        self.array_info = Some(ArrayInfo {
            variable: variable.into(),
            values: values.into_iter().map(|value| value.into()).collect(),
        });
        self
    }

    pub fn set_log_dir(mut self, log_dir: impl Into<PathBuf>) -> SlurmJobBuilder {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn build(self, defaults: &SlurmDefaults) -> SlurmJob {
        SlurmJob {
            id: Uuid::new_v4().to_string(),
            command: self.command,
            job_name: self.job_name.unwrap_or_else(|| defaults.job_name.clone()),
            account: self.account.or_else(|| defaults.account.clone()),
            partition: self.partition.or_else(|| defaults.partition.clone()),
            nodes: self.nodes.unwrap_or(defaults.nodes),
            ntasks: self.ntasks,
            cpus_per_task: self.cpus_per_task.unwrap_or(defaults.cpus_per_task),
            mem: self.mem.unwrap_or(defaults.mem),
            time: self
                .time
                .unwrap_or_else(|| ArgValue::from(defaults.time.clone())),
            output: self.output,
            error: self.error,
            array: self.array,
            dependency: self.dependency,
            mail_user: self.mail_user.or_else(|| defaults.mail_user.clone()),
            mail_type: self.mail_type,
            chdir: self.chdir,
            qos: self.qos,
            gres: self.gres,
            constraint: self.constraint,
            nodelist: self.nodelist,
            exclusive: self.exclusive,
            requeue: self.requeue,
            extra: self.extra,
            array_info: self.array_info,
            log_dir: self.log_dir.unwrap_or_else(|| defaults.log_dir.clone()),
        }
    }
}

/// The command body: a string is one script line, a list is one line per
/// entry.
pub struct CommandLines(pub(crate) Vec<String>);

impl From<&str> for CommandLines {
    fn from(line: &str) -> CommandLines {
        CommandLines(vec![line.to_string()])
    }
}

impl From<String> for CommandLines {
    fn from(line: String) -> CommandLines {
        CommandLines(vec![line])
    }
}

impl From<Vec<String>> for CommandLines {
    fn from(lines: Vec<String>) -> CommandLines {
        CommandLines(lines)
    }
}

impl From<&[&str]> for CommandLines {
    fn from(lines: &[&str]) -> CommandLines {
        CommandLines(lines.iter().map(|line| line.to_string()).collect())
    }
}
