//! Inter-arrival duration derivation
//!
//! Two strategies coexist and are NOT interchangeable:
//!
//! - [`DurationStrategy::Chronological`] is used when a batch is generated.
//!   It ignores IP addresses and measures the gap to the previous record of
//!   the time-sorted batch.
//! - [`DurationStrategy::PerSession`] is used at analysis time over a loaded
//!   table. Records sharing an IP address form a session and each record gets
//!   the gap to the *next* record of its session; the last record of every
//!   session gets `0`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::models::LogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationStrategy {
    /// Gap to the preceding record of a timestamp-sorted batch
    Chronological,
    /// Gap to the following record with the same IP address
    PerSession,
}

/// Populate `duration` on every record according to `strategy`
pub fn derive(records: &mut [LogRecord], strategy: DurationStrategy) {
    match strategy {
        DurationStrategy::Chronological => derive_chronological(records),
        DurationStrategy::PerSession => derive_per_session(records),
    }
}

fn seconds_between(earlier: NaiveDateTime, later: NaiveDateTime) -> f64 {
    (later - earlier).num_seconds() as f64
}

/// Records must already be sorted by timestamp, non-decreasing.
fn derive_chronological(records: &mut [LogRecord]) {
    debug_assert!(
        records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
        "chronological derivation requires a timestamp-sorted batch"
    );

    let Some(first) = records.first_mut() else {
        return;
    };
    first.duration = 0.0;

    for i in 1..records.len() {
        records[i].duration = seconds_between(records[i - 1].timestamp, records[i].timestamp);
    }
}

/// Table order is preserved; only the durations change.
fn derive_per_session(records: &mut [LogRecord]) {
    let mut sessions: HashMap<Ipv4Addr, Vec<usize>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        sessions.entry(record.ip_address).or_default().push(index);
    }

    for indices in sessions.values_mut() {
        // Stable sort keeps table order among equal timestamps
        indices.sort_by_key(|&i| records[i].timestamp);

        for pair in indices.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            records[current].duration =
                seconds_between(records[current].timestamp, records[next].timestamp);
        }

        if let Some(&last) = indices.last() {
            records[last].duration = 0.0;
        }
    }
}
