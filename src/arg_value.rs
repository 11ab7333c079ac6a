use chrono::TimeDelta;

/// A typed sbatch argument value with a single deterministic string form.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    /// Half-open range [start, stop), rendered in slurm's array syntax.
    Range { start: i64, stop: i64, step: i64 },
    /// Insertion-ordered key:value pairs, e.g. for --dependency.
    Map(Vec<(String, ArgValue)>),
    Duration(TimeDelta),
    List(Vec<ArgValue>),
    Flag(bool),
}

impl ArgValue {
    pub fn range(start: i64, stop: i64, step: i64) -> ArgValue {
        ArgValue::Range { start, stop, step }
    }

    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> ArgValue
    where
        K: Into<String>,
        V: Into<ArgValue>,
    {
        ArgValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn list<V: Into<ArgValue>>(items: impl IntoIterator<Item = V>) -> ArgValue {
        ArgValue::List(items.into_iter().map(|v| v.into()).collect())
    }

    /// Formats the value for use in an sbatch directive or --key=value pair.
    ///
    /// `None` is the omit sentinel: the argument must not be emitted at all.
    /// `Some("")` means the flag is emitted bare, without a value.
    pub fn format(&self) -> Option<String> {
        match self {
            ArgValue::Str(text) => Some(text.trim().to_string()),
            ArgValue::Int(number) => Some(number.to_string()),
            ArgValue::Range { start, stop, step } => {
                // step 1 renders the last element of the exclusive range
                if *step == 1 {
                    Some(format!("{}-{}", start, stop - 1))
                } else {
                    Some(format!("{}-{}:{}", start, stop, step))
                }
            }
            ArgValue::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .filter_map(|(key, value)| {
                        value.format().map(|formatted| format!("{}:{}", key, formatted))
                    })
                    .collect();
                Some(parts.join(","))
            }
            ArgValue::Duration(delta) => Some(format_time_delta(delta)),
            ArgValue::List(items) => {
                let parts: Vec<String> = items.iter().filter_map(|item| item.format()).collect();
                Some(parts.join(","))
            }
            ArgValue::Flag(true) => Some(String::new()),
            ArgValue::Flag(false) => None,
        }
    }
}

/// Renders a delta as D-HH:MM:SS, carrying seconds up through days.
fn format_time_delta(delta: &TimeDelta) -> String {
    let total = delta.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{}-{:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

impl From<&str> for ArgValue {
    fn from(text: &str) -> ArgValue {
        ArgValue::Str(text.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(text: String) -> ArgValue {
        ArgValue::Str(text)
    }
}

impl From<i64> for ArgValue {
    fn from(number: i64) -> ArgValue {
        ArgValue::Int(number)
    }
}

impl From<i32> for ArgValue {
    fn from(number: i32) -> ArgValue {
        ArgValue::Int(number as i64)
    }
}

impl From<u32> for ArgValue {
    fn from(number: u32) -> ArgValue {
        ArgValue::Int(number as i64)
    }
}

impl From<bool> for ArgValue {
    fn from(flag: bool) -> ArgValue {
        ArgValue::Flag(flag)
    }
}

impl From<TimeDelta> for ArgValue {
    fn from(delta: TimeDelta) -> ArgValue {
        ArgValue::Duration(delta)
    }
}

impl From<std::ops::Range<i64>> for ArgValue {
    fn from(range: std::ops::Range<i64>) -> ArgValue {
        ArgValue::Range {
            start: range.start,
            stop: range.end,
            step: 1,
        }
    }
}

impl From<Vec<ArgValue>> for ArgValue {
    fn from(items: Vec<ArgValue>) -> ArgValue {
        ArgValue::List(items)
    }
}
