// 🚘 Mileage Service
// Wires an injected key-value store to the analytics engine and CSV codec.

use crate::analytics::{compute_analytics, MileageAnalytics};
use crate::csv_codec::{self, ImportError};
use crate::model::{FieldError, MileageLog, NewMileageLog};
use crate::quality::{odometer_report, OdometerReport};
use crate::store::{KeyValueStore, StorageError};
use crate::trends::{time_series, TrendPoint};
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

/// Key holding the entire log as one JSON array
pub const MILEAGE_LOGS_KEY: &str = "mileage_logs";

// ============================================================================
// ERRORS + REPORTS
// ============================================================================

#[derive(Debug, Error)]
pub enum AddMileageError {
    #[error("invalid mileage log: {}", join_messages(.0))]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// What an import did, in row order
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Entries built and persisted
    pub imported: usize,
    pub errors: Vec<ImportError>,
}

impl ImportReport {
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

/// Storage failed mid-import; earlier rows stay persisted
#[derive(Debug, Error)]
#[error("import aborted at row {row}: {source}")]
pub struct ImportAborted {
    pub row: usize,
    /// Progress up to (not including) the failed row
    pub report: ImportReport,
    #[source]
    pub source: StorageError,
}

// ============================================================================
// SERVICE
// ============================================================================

/// MileageService - owns its store handle
pub struct MileageService<S: KeyValueStore> {
    store: S,
    clock: fn() -> i64,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl<S: KeyValueStore> MileageService<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, now_millis)
    }

    /// Service with a custom source of creation timestamps
    pub fn with_clock(store: S, clock: fn() -> i64) -> Self {
        MileageService { store, clock }
    }

    /// Stored order (insertion order)
    pub fn mileages(&self) -> Result<Vec<MileageLog>, StorageError> {
        match self.store.get(MILEAGE_LOGS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn mileages_newest_first(&self) -> Result<Vec<MileageLog>, StorageError> {
        let mut logs = self.mileages()?;
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }

    fn save(&mut self, logs: &[MileageLog]) -> Result<(), StorageError> {
        let json = serde_json::to_string(logs)?;
        self.store.set(MILEAGE_LOGS_KEY, &json)
    }

    /// Validate a draft, stamp it with the current time, and append it
    pub fn add_mileage(&mut self, draft: NewMileageLog) -> Result<MileageLog, AddMileageError> {
        let log = MileageLog::create(draft, (self.clock)()).map_err(AddMileageError::Validation)?;
        self.insert(log.clone())?;
        info!(id = %log.id, reading = log.current_reading, "added mileage log");
        Ok(log)
    }

    /// Append an already-built entry
    pub fn insert(&mut self, log: MileageLog) -> Result<(), StorageError> {
        let mut logs = self.mileages()?;
        logs.push(log);
        self.save(&logs)
    }

    /// Returns whether anything was removed
    pub fn delete_mileage(&mut self, id: &str) -> Result<bool, StorageError> {
        let mut logs = self.mileages()?;
        let before = logs.len();
        logs.retain(|log| log.id != id);

        if logs.len() == before {
            return Ok(false);
        }

        if logs.is_empty() {
            self.store.remove(MILEAGE_LOGS_KEY)?;
        } else {
            self.save(&logs)?;
        }
        info!(id, "deleted mileage log");
        Ok(true)
    }

    pub fn clear_all_data(&mut self) -> Result<(), StorageError> {
        self.store.clear()?;
        info!("cleared all mileage data");
        Ok(())
    }

    pub fn analytics(&self) -> Result<MileageAnalytics, StorageError> {
        Ok(compute_analytics(&self.mileages()?))
    }

    pub fn trends(&self) -> Result<Vec<TrendPoint>, StorageError> {
        Ok(time_series(&self.mileages()?))
    }

    pub fn odometer_report(&self) -> Result<OdometerReport, StorageError> {
        Ok(odometer_report(&self.mileages()?))
    }

    /// CSV of every log, newest first (same order as the list view)
    pub fn export_csv(&self) -> anyhow::Result<String> {
        let logs = self.mileages_newest_first()?;
        csv_codec::to_csv(&logs)
    }

    /// Parse and persist row by row
    ///
    /// Row errors are collected and never stop the import. A storage
    /// failure stops it at once; rows already persisted stay persisted.
    pub fn import_csv(&mut self, text: &str) -> Result<ImportReport, ImportAborted> {
        let mut report = ImportReport::default();

        let rows = match csv_codec::rows(text) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("CSV import: {}", e);
                report.errors.push(e);
                return Ok(report);
            }
        };

        for (row, result) in rows {
            match result {
                Ok(log) => {
                    if let Err(source) = self.insert(log) {
                        warn!(row, "CSV import aborted: {}", source);
                        return Err(ImportAborted { row, report, source });
                    }
                    report.imported += 1;
                }
                Err(e) => {
                    warn!("CSV import: {}", e);
                    report.errors.push(e);
                }
            }
        }

        info!(
            imported = report.imported,
            errors = report.errors.len(),
            "CSV import finished"
        );
        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================
