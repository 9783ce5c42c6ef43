//! Grouped counts and duration statistics over a log table
//!
//! Results are recomputed on demand from the table they are given and are
//! never persisted. Numeric summaries over no rows are `None` ("no data"),
//! never `0`.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::logs::duration::{derive, DurationStrategy};
use crate::models::{LogRecord, LogTable};

/// Categorical column used as an aggregation key
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Grouping {
    Country,
    Endpoint,
    Device,
    Browser,
    SportsActivity,
}

impl Grouping {
    pub const ALL: [Grouping; 5] = [
        Grouping::Country,
        Grouping::Endpoint,
        Grouping::Device,
        Grouping::Browser,
        Grouping::SportsActivity,
    ];

    /// Column name in the persisted table
    pub fn column(self) -> &'static str {
        match self {
            Grouping::Country => "Country",
            Grouping::Endpoint => "Endpoint",
            Grouping::Device => "Device",
            Grouping::Browser => "Browser",
            Grouping::SportsActivity => "Sports Activity",
        }
    }

    /// The record's value for this column
    pub fn key(self, record: &LogRecord) -> &str {
        match self {
            Grouping::Country => &record.country,
            Grouping::Endpoint => &record.endpoint,
            Grouping::Device => record.device.as_ref(),
            Grouping::Browser => record.browser.as_ref(),
            Grouping::SportsActivity => record.sports_activity.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub value: String,
    pub count: usize,
    pub mean_duration: f64,
}

/// Counts per distinct value, most frequent first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCounts {
    pub grouping: Grouping,
    pub column: &'static str,
    pub entries: Vec<CategoryStats>,
}

impl GroupCounts {
    pub fn count_of(&self, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.value == value)
            .map(|entry| entry.count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

/// Mean and sample standard deviation of durations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationSummary {
    pub samples: usize,
    pub mean: Option<f64>,
    /// Needs at least two samples
    pub std_dev: Option<f64>,
}

impl DurationSummary {
    pub fn from_durations(durations: &[f64]) -> Self {
        let mean = (!durations.is_empty()).then(|| durations.iter().mean());
        let std_dev = (durations.len() > 1).then(|| durations.iter().std_dev());
        Self {
            samples: durations.len(),
            mean,
            std_dev,
        }
    }

    pub fn of_table(table: &LogTable) -> Self {
        let durations: Vec<f64> = table.iter().map(|record| record.duration).collect();
        Self::from_durations(&durations)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_records: usize,
    pub duration: DurationSummary,
    pub groupings: Vec<GroupCounts>,
}

impl AggregateResult {
    pub fn grouping(&self, grouping: Grouping) -> Option<&GroupCounts> {
        self.groupings.iter().find(|g| g.grouping == grouping)
    }

    pub fn has_data(&self) -> bool {
        self.total_records > 0
    }
}

/// Aggregate every grouping column of `table`
pub fn aggregate(table: &LogTable) -> AggregateResult {
    let result = AggregateResult {
        total_records: table.len(),
        duration: DurationSummary::of_table(table),
        groupings: Grouping::ALL
            .iter()
            .map(|&grouping| group_counts(table, grouping))
            .collect(),
    };
    debug!(records = result.total_records, "Aggregated log table");
    result
}

/// Count rows per distinct value of `grouping`.
///
/// Entries are ordered by descending count; ties keep first-seen order.
pub fn group_counts(table: &LogTable, grouping: Grouping) -> GroupCounts {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, usize, f64)> = Vec::new();

    for record in table {
        let key = grouping.key(record);
        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push((key, 0, 0.0));
            buckets.len() - 1
        });
        buckets[slot].1 += 1;
        buckets[slot].2 += record.duration;
    }

    let mut entries: Vec<CategoryStats> = buckets
        .into_iter()
        .map(|(value, count, total)| CategoryStats {
            value: value.to_string(),
            count,
            mean_duration: total / count as f64,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));

    GroupCounts {
        grouping,
        column: grouping.column(),
        entries,
    }
}

/// Visit statistics for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSlice {
    pub endpoint: String,
    pub visits: usize,
    /// `sqrt(visits)`, a crude spread proxy; not a standard deviation
    pub spread: f64,
}

pub fn endpoint_slice(table: &LogTable, endpoint: &str) -> EndpointSlice {
    let visits = table
        .iter()
        .filter(|record| record.endpoint == endpoint)
        .count();
    EndpointSlice {
        endpoint: endpoint.to_string(),
        visits,
        spread: (visits as f64).sqrt(),
    }
}

/// Duration summary after recomputing durations per IP session.
///
/// The input table is not modified.
pub fn session_summary(table: &LogTable) -> DurationSummary {
    let mut records = table.records().to_vec();
    derive(&mut records, DurationStrategy::PerSession);
    let durations: Vec<f64> = records.iter().map(|record| record.duration).collect();
    DurationSummary::from_durations(&durations)
}

/// Multi-select filter; an empty selection does not filter its column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub sports_activities: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub browsers: Vec<String>,
}

impl LogFilter {
    fn selections(&self) -> [(Grouping, &[String]); 5] {
        [
            (Grouping::Country, self.countries.as_slice()),
            (Grouping::SportsActivity, self.sports_activities.as_slice()),
            (Grouping::Endpoint, self.endpoints.as_slice()),
            (Grouping::Device, self.devices.as_slice()),
            (Grouping::Browser, self.browsers.as_slice()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.selections().iter().all(|(_, values)| values.is_empty())
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        self.selections().iter().all(|(grouping, values)| {
            values.is_empty() || values.iter().any(|v| v == grouping.key(record))
        })
    }

    pub fn apply(&self, table: &LogTable) -> LogTable {
        if self.is_empty() {
            return table.clone();
        }
        table.select(|record| self.matches(record))
    }
}
