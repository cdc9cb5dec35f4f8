//! Polling rounds over a `DataRefReader`.

use dataref_client::{
    ClientError, DataRefName, DataRefReader, DataRefStore, DataRefType, DataRefValue,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::PollEntry;

/// Result of one read in a round.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub name: DataRefName,
    pub data_type: DataRefType,
    pub result: Result<DataRefValue, ClientError>,
}

/// Outcomes of one round, in poll-list order.
#[derive(Debug, Clone, Default)]
pub struct RoundReport {
    pub outcomes: Vec<PollOutcome>,
}

impl RoundReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

pub struct Poller {
    reader: Arc<dyn DataRefReader>,
    entries: Vec<PollEntry>,
    concurrent: bool,
}

impl Poller {
    pub fn new(reader: Arc<dyn DataRefReader>, entries: Vec<PollEntry>, concurrent: bool) -> Self {
        Self {
            reader,
            entries,
            concurrent,
        }
    }

    /// Read every entry once and log each outcome.
    pub async fn poll_once(&self) -> RoundReport {
        let outcomes = if self.concurrent {
            join_all(self.entries.iter().map(|entry| self.read_entry(entry))).await
        } else {
            let mut outcomes = Vec::with_capacity(self.entries.len());
            for entry in &self.entries {
                outcomes.push(self.read_entry(entry).await);
            }
            outcomes
        };

        RoundReport { outcomes }
    }

    /// Poll forever, one round per `interval`.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = self.poll_once().await;
            if !report.is_clean() {
                warn!(
                    failed = report.failures(),
                    total = report.outcomes.len(),
                    "Polling round had failures"
                );
            }
        }
    }

    async fn read_entry(&self, entry: &PollEntry) -> PollOutcome {
        let result = self.reader.read(&entry.name, entry.data_type).await;

        match &result {
            Ok(value) => info!(
                dataref = %entry.name,
                data_type = %entry.data_type,
                value = %value,
                "Dataref read"
            ),
            Err(e) => warn!(
                dataref = %entry.name,
                data_type = %entry.data_type,
                error = %e,
                "Dataref read failed"
            ),
        }

        PollOutcome {
            name: entry.name.clone(),
            data_type: entry.data_type,
            result,
        }
    }
}

#[derive(Debug, Serialize)]
struct SnapshotEntry<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    data_type: DataRefType,
    value: Option<&'a DataRefValue>,
    age_ms: u128,
}

/// Latest values in `store` as a JSON array, sorted by name. Failed reads
/// have a `null` value.
pub fn snapshot_json(store: &DataRefStore) -> serde_json::Result<String> {
    let snapshot = store.snapshot();
    let entries: Vec<SnapshotEntry<'_>> = snapshot
        .iter()
        .map(|(name, stored)| SnapshotEntry {
            name: name.as_str(),
            data_type: stored.data_type,
            value: Some(&stored.value).filter(|v| v.is_valid()),
            age_ms: stored.updated_at.elapsed().as_millis(),
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}
