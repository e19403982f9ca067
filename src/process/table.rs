use super::ProcessRecord;
use std::collections::HashMap;
use sysinfo::Pid;

/// Which column a [`ProcessFilter`] matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterField {
    #[default]
    Name,
    Pid,
    User,
}

/// Case-insensitive substring search over one column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessFilter {
    pub field: FilterField,
    query: String,
}

impl ProcessFilter {
    pub fn new(field: FilterField, query: &str) -> Self {
        Self {
            field,
            query: query.trim().to_lowercase(),
        }
    }

    pub fn name(query: &str) -> Self {
        Self::new(FilterField::Name, query)
    }

    pub fn pid(query: &str) -> Self {
        Self::new(FilterField::Pid, query)
    }

    pub fn user(query: &str) -> Self {
        Self::new(FilterField::User, query)
    }

    /// Parses search-box input: `pid:42`, `user:root`, `name:ssh` or a bare
    /// name query.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Some((prefix, rest)) = input.split_once(':') {
            let field = match prefix.trim().to_lowercase().as_str() {
                "pid" => Some(FilterField::Pid),
                "user" => Some(FilterField::User),
                "name" => Some(FilterField::Name),
                _ => None,
            };
            if let Some(field) = field {
                return Self::new(field, rest);
            }
        }
        Self::name(input)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn matches(&self, record: &ProcessRecord) -> bool {
        if self.query.is_empty() {
            return true;
        }
        match self.field {
            FilterField::Name => record.name.to_lowercase().contains(&self.query),
            FilterField::Pid => record.pid.to_string().contains(&self.query),
            FilterField::User => record.user.to_lowercase().contains(&self.query),
        }
    }
}

/// Immutable process list for one cycle, in the order the source enumerated it.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    records: Vec<ProcessRecord>,
    by_pid: HashMap<Pid, usize>,
}

impl ProcessTable {
    pub fn build(records: Vec<ProcessRecord>) -> Self {
        let by_pid = records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.pid, idx))
            .collect();
        Self { records, by_pid }
    }

    pub fn lookup(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.by_pid.get(&pid).and_then(|&idx| self.records.get(idx))
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.by_pid.contains_key(&pid)
    }

    pub fn filter(&self, filter: &ProcessFilter) -> Vec<ProcessRecord> {
        self.records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The `n` busiest processes, highest CPU first.
    pub fn top_by_cpu(&self, n: usize) -> Vec<&ProcessRecord> {
        let mut sorted: Vec<_> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        sorted.truncate(n);
        sorted
    }
}
