pub const PENDING: &str = "PENDING";
pub const RUNNING: &str = "RUNNING";
pub const COMPLETED: &str = "COMPLETED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    /// Catch-all for every label that is not transitional or completed.
    Failed,
}

impl JobState {
    pub fn from_label(label: &str) -> JobState {
        match label {
            PENDING => JobState::Pending,
            RUNNING => JobState::Running,
            COMPLETED => JobState::Completed,
            _ => JobState::Failed,
        }
    }
}

/// Job id to verbatim status label, in the order the accounting tool
/// reported them. Rebuilt on every poll, never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobStatusMap {
    entries: Vec<(String, String)>,
}

impl JobStatusMap {
    /// Parses `sacct --parsable2` output, one `id|label` pair per line.
    pub fn parse(text: &str) -> JobStatusMap {
        let mut map = JobStatusMap::default();
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('|');
            if let (Some(id), Some(label)) = (fields.next(), fields.next()) {
                map.entries
                    .push((id.trim().to_string(), label.trim().to_string()));
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, label)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, label)| (id.as_str(), label.as_str()))
    }

    pub fn all_in_state(&self, state: JobState) -> bool {
        self.iter()
            .all(|(_, label)| JobState::from_label(label) == state)
    }

    pub fn any_in_state(&self, state: JobState) -> bool {
        self.iter()
            .any(|(_, label)| JobState::from_label(label) == state)
    }

    pub fn ids_in_state(&self, state: JobState) -> Vec<String> {
        self.iter()
            .filter(|(_, label)| JobState::from_label(label) == state)
            .map(|(id, _)| id.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parsable2_lines_in_order() {
        let map = JobStatusMap::parse("123|RUNNING\n124|PENDING\n\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("123"), Some("RUNNING"));
        assert_eq!(map.get("124"), Some("PENDING"));
        let ids: Vec<&str> = map.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["123", "124"]);
    }

    #[test]
    fn unknown_labels_classify_as_failed() {
        assert_eq!(JobState::from_label("CANCELLED"), JobState::Failed);
        assert_eq!(JobState::from_label("CANCELLED by 0"), JobState::Failed);
        assert_eq!(JobState::from_label("TIMEOUT"), JobState::Failed);
        assert_eq!(JobState::from_label("COMPLETED"), JobState::Completed);
    }

    #[test]
    fn array_sub_job_ids_are_kept_verbatim() {
        let map = JobStatusMap::parse("900_1|COMPLETED\n900_2|FAILED");
        assert_eq!(map.ids_in_state(JobState::Failed), ["900_2"]);
        assert!(map.any_in_state(JobState::Completed));
        assert!(!map.all_in_state(JobState::Completed));
    }
}
