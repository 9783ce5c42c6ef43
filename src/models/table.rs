use serde::Serialize;

use super::LogRecord;

/// Ordered collection of log records.
///
/// Views derived from a table (trims, filters) are new tables; nothing here
/// touches the backing file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LogTable {
    records: Vec<LogRecord>,
}

impl LogTable {
    pub fn new(records: Vec<LogRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [LogRecord] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogRecord> {
        self.records.iter()
    }

    /// First `n` records as a new view
    pub fn head(&self, n: usize) -> LogTable {
        Self::new(self.records.iter().take(n).cloned().collect())
    }

    /// Records matching `predicate`, in table order
    pub fn select<P>(&self, mut predicate: P) -> LogTable
    where
        P: FnMut(&LogRecord) -> bool,
    {
        Self::new(
            self.records
                .iter()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
        )
    }
}

impl From<Vec<LogRecord>> for LogTable {
    fn from(records: Vec<LogRecord>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a LogTable {
    type Item = &'a LogRecord;
    type IntoIter = std::slice::Iter<'a, LogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
