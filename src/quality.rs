// ✅ Odometer Quality Report
// Surfaces the pairs analytics silently drops: rollbacks, stationary
// readings and timestamp collisions.
//
// Purely advisory; `compute_analytics` never consults it.

use crate::model::MileageLog;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OdometerIssue {
    /// Reading went down
    Rollback,
    /// Reading unchanged between two logs
    Stationary,
    /// Two logs share a timestamp, so their order is input order
    DuplicateTimestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometerWarning {
    pub issue: OdometerIssue,
    pub previous_id: String,
    pub current_id: String,
    pub miles_covered: f64,
    pub timestamp: i64,
}

impl OdometerWarning {
    pub fn message(&self) -> String {
        match self.issue {
            OdometerIssue::Rollback => format!(
                "Odometer went back {} miles between {} and {}",
                -self.miles_covered, self.previous_id, self.current_id
            ),
            OdometerIssue::Stationary => format!(
                "Odometer did not move between {} and {}",
                self.previous_id, self.current_id
            ),
            OdometerIssue::DuplicateTimestamp => format!(
                "Logs {} and {} share timestamp {}",
                self.previous_id, self.current_id, self.timestamp
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OdometerReport {
    pub pairs_checked: usize,
    pub warnings: Vec<OdometerWarning>,
}

impl OdometerReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn count(&self, issue: &OdometerIssue) -> usize {
        self.warnings.iter().filter(|w| &w.issue == issue).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} pairs checked: {} rollbacks, {} stationary, {} duplicate timestamps",
            self.pairs_checked,
            self.count(&OdometerIssue::Rollback),
            self.count(&OdometerIssue::Stationary),
            self.count(&OdometerIssue::DuplicateTimestamp)
        )
    }
}

/// Check adjacent pairs in the same order analytics walks them
pub fn odometer_report(entries: &[MileageLog]) -> OdometerReport {
    let mut sorted: Vec<&MileageLog> = entries.iter().collect();
    sorted.sort_by_key(|log| log.timestamp);

    let mut report = OdometerReport::default();

    for pair in sorted.windows(2) {
        let (prev, current) = (pair[0], pair[1]);
        let miles_covered = current.current_reading - prev.current_reading;
        report.pairs_checked += 1;

        let mut warn = |issue| {
            report.warnings.push(OdometerWarning {
                issue,
                previous_id: prev.id.clone(),
                current_id: current.id.clone(),
                miles_covered,
                timestamp: current.timestamp,
            })
        };

        if prev.timestamp == current.timestamp {
            warn(OdometerIssue::DuplicateTimestamp);
        }
        if miles_covered < 0.0 {
            warn(OdometerIssue::Rollback);
        } else if miles_covered == 0.0 {
            warn(OdometerIssue::Stationary);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewMileageLog;

    fn at(reading: f64, timestamp: i64) -> MileageLog {
        MileageLog::create(NewMileageLog::new(reading, 5.0), timestamp).unwrap()
    }

    #[test]
    fn test_clean_log() {
        let report = odometer_report(&[at(100.0, 1), at(200.0, 2), at(300.0, 3)]);

        assert!(report.is_clean());
        assert_eq!(report.pairs_checked, 2);
    }

    #[test]
    fn test_detects_each_issue() {
        let report = odometer_report(&[at(500.0, 1), at(400.0, 2), at(400.0, 3), at(450.0, 3)]);

        println!("{}", report.summary());

        assert_eq!(report.pairs_checked, 3);
        assert_eq!(report.count(&OdometerIssue::Rollback), 1);
        assert_eq!(report.count(&OdometerIssue::Stationary), 1);
        assert_eq!(report.count(&OdometerIssue::DuplicateTimestamp), 1);
        assert_eq!(report.warnings[0].miles_covered, -100.0);
        assert!(report.warnings[0].message().contains("went back 100 miles"));
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(odometer_report(&[]).pairs_checked, 0);
        assert!(odometer_report(&[at(1.0, 1)]).is_clean());
    }
}
