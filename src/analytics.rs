// 📊 Analytics Engine
// Fuel-economy aggregates derived from the full mileage log
//
// Pure functions only: same entries in → same analytics out.

use crate::model::{MileageLog, LITERS_TO_GALLONS};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// OUTPUT
// ============================================================================

/// MileageAnalytics - recomputed on demand, never persisted
///
/// Every average is 0 when its denominator is 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MileageAnalytics {
    /// Raw number of entries (not pairs)
    pub total_logs: usize,
    pub total_miles_covered: f64,
    pub total_fuel_spent: f64,
    pub average_fuel_per_mile: f64,
    pub longest_mile_per_gauge_tick: f64,
    pub average_fuel_per_gauge_tick: f64,
    pub total_gauge_ticks: u32,

    /// Mean of per-fillup MPG samples
    #[serde(rename = "actualMPG")]
    pub actual_mpg: f64,
    pub average_fuel_price_per_liter: f64,
    pub total_fuel_liters: f64,
    pub average_miles_per_fillup: f64,
    pub fillup_count: usize,

    /// Mean of the car's own tank-average readings
    #[serde(rename = "carEstimatedMPG")]
    pub car_estimated_mpg: f64,
    /// Percent difference between actual and car-reported MPG
    pub mpg_accuracy: f64,
    /// 100 = the car's range estimates matched the miles driven exactly
    pub range_accuracy: f64,

    #[serde(rename = "bestMPG")]
    pub best_mpg: f64,
    #[serde(rename = "worstMPG")]
    pub worst_mpg: f64,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Default)]
struct Accumulators {
    total_miles: f64,
    total_fuel_spent: f64,
    total_gauge_ticks: u32,
    max_mile_per_gauge_tick: f64,
    total_fuel_liters: f64,
    price_sum: f64,
    price_count: usize,
    car_mpg_sum: f64,
    car_mpg_count: usize,
    fillup_count: usize,
    fillups_with_liters: usize,
    miles_per_fillup_sum: f64,
    mpg_samples: Vec<f64>,
    range_error_sum: f64,
    range_samples: usize,
}

impl Accumulators {
    /// Fold one (previous, current) pair into the running totals
    fn add_pair(&mut self, prev: &MileageLog, current: &MileageLog) {
        let miles_covered = current.current_reading - prev.current_reading;
        let gauge_delta = current.fuel_gauge.abs_diff(prev.fuel_gauge);

        if miles_covered > 0.0 {
            self.total_miles += miles_covered;

            if gauge_delta > 0 {
                self.total_gauge_ticks += u32::from(gauge_delta);
                let per_tick = miles_covered / f64::from(gauge_delta);
                self.max_mile_per_gauge_tick = self.max_mile_per_gauge_tick.max(per_tick);
            }
        } else {
            debug!(
                prev_id = %prev.id,
                current_id = %current.id,
                miles_covered,
                "skipping non-positive odometer delta"
            );
        }

        if current.is_fillup() {
            self.fillup_count += 1;

            if let Some(amount) = current.fuel_amount {
                self.total_fuel_spent += amount;
            }

            if let Some(liters) = current.fuel_liters {
                self.total_fuel_liters += liters;
                self.fillups_with_liters += 1;

                if miles_covered > 0.0 {
                    let gallons = liters * LITERS_TO_GALLONS;
                    self.mpg_samples.push(miles_covered / gallons);
                    self.miles_per_fillup_sum += miles_covered;
                }
            }

            if let Some(price) = current.fuel_price_per_liter {
                self.price_sum += price;
                self.price_count += 1;
            }
        }

        if let Some(car_mpg) = current.car_tank_average {
            self.car_mpg_sum += car_mpg;
            self.car_mpg_count += 1;
        }

        // Previous entry's range estimate vs miles actually driven since
        if let Some(estimate) = prev.car_range_estimate {
            if miles_covered > 0.0 {
                self.range_error_sum += (estimate - miles_covered).abs() / estimate;
                self.range_samples += 1;
            }
        }
    }

    fn finish(self, total_logs: usize) -> MileageAnalytics {
        let actual_mpg = mean(self.mpg_samples.iter().sum(), self.mpg_samples.len());
        let car_estimated_mpg = mean(self.car_mpg_sum, self.car_mpg_count);

        let mpg_accuracy = if actual_mpg > 0.0 && car_estimated_mpg > 0.0 {
            (actual_mpg - car_estimated_mpg) / car_estimated_mpg * 100.0
        } else {
            0.0
        };

        let range_accuracy = if self.range_samples > 0 {
            (1.0 - self.range_error_sum / self.range_samples as f64) * 100.0
        } else {
            0.0
        };

        MileageAnalytics {
            total_logs,
            total_miles_covered: self.total_miles,
            total_fuel_spent: self.total_fuel_spent,
            average_fuel_per_mile: ratio(self.total_fuel_spent, self.total_miles),
            longest_mile_per_gauge_tick: self.max_mile_per_gauge_tick,
            average_fuel_per_gauge_tick: ratio(self.total_fuel_spent, f64::from(self.total_gauge_ticks)),
            total_gauge_ticks: self.total_gauge_ticks,
            actual_mpg,
            average_fuel_price_per_liter: mean(self.price_sum, self.price_count),
            total_fuel_liters: self.total_fuel_liters,
            average_miles_per_fillup: mean(self.miles_per_fillup_sum, self.fillups_with_liters),
            fillup_count: self.fillup_count,
            car_estimated_mpg,
            mpg_accuracy,
            range_accuracy,
            best_mpg: extreme(&self.mpg_samples, |v, best| v > best),
            worst_mpg: extreme(&self.mpg_samples, |v, worst| v < worst),
        }
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Max/min that lets a NaN sample poison the result instead of hiding it
fn extreme(samples: &[f64], beats: fn(f64, f64) -> bool) -> f64 {
    let mut iter = samples.iter().copied();
    let Some(first) = iter.next() else {
        return 0.0;
    };

    iter.fold(first, |acc, v| {
        if acc.is_nan() {
            acc
        } else if v.is_nan() || beats(v, acc) {
            v
        } else {
            acc
        }
    })
}

/// Compute fuel-economy analytics over every entry
///
/// Entries are sorted by timestamp internally (stable, so ties keep their
/// input order); callers may pass them in any order.
pub fn compute_analytics(entries: &[MileageLog]) -> MileageAnalytics {
    if entries.is_empty() {
        return MileageAnalytics::default();
    }

    let mut sorted: Vec<&MileageLog> = entries.iter().collect();
    sorted.sort_by_key(|log| log.timestamp);

    let mut acc = Accumulators::default();
    for pair in sorted.windows(2) {
        acc.add_pair(pair[0], pair[1]);
    }

    let analytics = acc.finish(entries.len());

    debug!(
        total_logs = analytics.total_logs,
        total_miles = analytics.total_miles_covered,
        fillups = analytics.fillup_count,
        "analytics computed"
    );

    analytics
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn log(id: &str, reading: f64, gauge: u8, timestamp: i64) -> MileageLog {
        MileageLog {
            id: id.to_string(),
            current_reading: reading,
            fuel_gauge: gauge,
            just_bought_fuel: false,
            timestamp,
            fuel_amount: None,
            fuel_price_per_liter: None,
            fuel_liters: None,
            car_range_estimate: None,
            car_tank_average: None,
            filling_station: None,
            notes: None,
            trip_kilometers: None,
        }
    }

    fn fillup(id: &str, reading: f64, gauge: u8, timestamp: i64, liters: f64, amount: f64) -> MileageLog {
        MileageLog {
            just_bought_fuel: true,
            fuel_liters: Some(liters),
            fuel_amount: Some(amount),
            ..log(id, reading, gauge, timestamp)
        }
    }

    fn sample_log() -> Vec<MileageLog> {
        vec![
            MileageLog {
                car_range_estimate: Some(320.0),
                ..log("a", 1000.0, 10, 1_000)
            },
            MileageLog {
                fuel_price_per_liter: Some(750.0),
                car_tank_average: Some(50.0),
                car_range_estimate: Some(400.0),
                ..fillup("b", 1300.0, 8, 2_000, 20.0, 15000.0)
            },
            MileageLog {
                fuel_price_per_liter: Some(800.0),
                ..fillup("c", 1650.0, 4, 3_000, 30.0, 24000.0)
            },
            log("d", 1800.0, 3, 4_000),
        ]
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let analytics = compute_analytics(&[]);
        assert_eq!(analytics, MileageAnalytics::default());
        assert_eq!(analytics.total_logs, 0);
        assert_eq!(analytics.actual_mpg, 0.0);
    }

    #[test]
    fn test_single_entry_counts_but_has_no_pairs() {
        let analytics = compute_analytics(&[log("a", 1000.0, 10, 1)]);
        assert_eq!(analytics.total_logs, 1);
        assert_eq!(analytics.total_miles_covered, 0.0);
        assert_eq!(analytics.average_fuel_per_mile, 0.0);
    }

    #[test]
    fn test_two_entry_fillup_scenario() {
        let entries = vec![
            log("a", 1000.0, 10, 1_000),
            fillup("b", 1300.0, 8, 2_000, 20.0, 15000.0),
        ];

        let analytics = compute_analytics(&entries);

        assert_eq!(analytics.total_logs, 2);
        assert_eq!(analytics.total_miles_covered, 300.0);
        assert_eq!(analytics.total_gauge_ticks, 2);
        assert_eq!(analytics.longest_mile_per_gauge_tick, 150.0);
        assert_eq!(analytics.total_fuel_spent, 15000.0);
        assert_eq!(analytics.average_fuel_per_mile, 50.0);
        assert_eq!(analytics.average_fuel_per_gauge_tick, 7500.0);
        assert_eq!(analytics.total_fuel_liters, 20.0);
        assert_eq!(analytics.average_miles_per_fillup, 300.0);

        let expected_mpg = 300.0 / (20.0 * 0.264172);
        assert!((analytics.actual_mpg - expected_mpg).abs() < 1e-9);
        assert!((analytics.actual_mpg - 56.78).abs() < 0.01, "MPG was {}", analytics.actual_mpg);
        assert_eq!(analytics.best_mpg, analytics.actual_mpg);
        assert_eq!(analytics.worst_mpg, analytics.actual_mpg);
    }

    #[test]
    fn test_full_log_aggregates() {
        let analytics = compute_analytics(&sample_log());

        let mpg_b = 300.0 / (20.0 * LITERS_TO_GALLONS);
        let mpg_c = 350.0 / (30.0 * LITERS_TO_GALLONS);
        let actual = (mpg_b + mpg_c) / 2.0;

        assert_eq!(analytics.total_miles_covered, 800.0);
        assert_eq!(analytics.total_gauge_ticks, 2 + 4 + 1);
        assert_eq!(analytics.longest_mile_per_gauge_tick, 150.0);
        assert_eq!(analytics.fillup_count, 2);
        assert_eq!(analytics.total_fuel_spent, 39000.0);
        assert_eq!(analytics.total_fuel_liters, 50.0);
        assert_eq!(analytics.average_fuel_price_per_liter, 775.0);
        assert_eq!(analytics.average_miles_per_fillup, 325.0);
        assert!((analytics.actual_mpg - actual).abs() < 1e-9);
        assert_eq!(analytics.best_mpg, mpg_b);
        assert_eq!(analytics.worst_mpg, mpg_c);

        // Car reported 50 MPG once
        assert_eq!(analytics.car_estimated_mpg, 50.0);
        let expected_accuracy = (actual - 50.0) / 50.0 * 100.0;
        assert!((analytics.mpg_accuracy - expected_accuracy).abs() < 1e-9);

        // a→b: |320-300|/320, b→c: |400-350|/400
        let mean_error = (20.0 / 320.0 + 50.0 / 400.0) / 2.0;
        assert!((analytics.range_accuracy - (1.0 - mean_error) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_deltas_excluded() {
        let entries = vec![
            log("a", 1000.0, 10, 1_000),
            // Odometer went backwards, then stood still
            fillup("b", 900.0, 6, 2_000, 20.0, 15000.0),
            log("c", 900.0, 5, 3_000),
            log("d", 1100.0, 3, 4_000),
        ];

        let analytics = compute_analytics(&entries);

        assert_eq!(analytics.total_miles_covered, 200.0);
        assert_eq!(analytics.total_gauge_ticks, 2, "Only the c→d pair counts ticks");
        assert_eq!(analytics.longest_mile_per_gauge_tick, 100.0);
        // The fillup still counts toward spend and liters, but not MPG
        assert_eq!(analytics.total_fuel_spent, 15000.0);
        assert_eq!(analytics.total_fuel_liters, 20.0);
        assert_eq!(analytics.actual_mpg, 0.0);
        assert_eq!(analytics.average_miles_per_fillup, 0.0);
        assert_eq!(analytics.best_mpg, 0.0);
    }

    #[test]
    fn test_total_logs_and_order_independence() {
        let entries = sample_log();
        let mut reversed = entries.clone();
        reversed.reverse();
        let mut shuffled = entries.clone();
        shuffled.swap(0, 2);
        shuffled.swap(1, 3);

        let expected = compute_analytics(&entries);

        assert_eq!(expected.total_logs, entries.len());
        assert_eq!(compute_analytics(&reversed), expected);
        assert_eq!(compute_analytics(&shuffled), expected);
    }

    #[test]
    fn test_idempotent() {
        let entries = sample_log();
        assert_eq!(compute_analytics(&entries), compute_analytics(&entries));
    }

    #[test]
    fn test_timestamp_ties_keep_input_order() {
        let first = log("a", 1000.0, 10, 5);
        let second = log("b", 1200.0, 9, 5);

        let forward = compute_analytics(&[first.clone(), second.clone()]);
        let backward = compute_analytics(&[second, first]);

        assert_eq!(forward.total_miles_covered, 200.0);
        assert_eq!(backward.total_miles_covered, 0.0, "1200 → 1000 is a rollback");
    }

    #[test]
    fn test_fillup_without_liters() {
        let entries = vec![
            log("a", 1000.0, 2, 1),
            MileageLog {
                just_bought_fuel: true,
                fuel_amount: Some(5000.0),
                ..log("b", 1100.0, 9, 2)
            },
        ];

        let analytics = compute_analytics(&entries);

        assert_eq!(analytics.fillup_count, 1);
        assert_eq!(analytics.total_fuel_spent, 5000.0);
        assert_eq!(analytics.average_miles_per_fillup, 0.0);
        assert_eq!(analytics.actual_mpg, 0.0);
        assert_eq!(analytics.mpg_accuracy, 0.0);
    }

    #[test]
    fn test_nan_propagates() {
        let entries = vec![
            log("a", 1000.0, 10, 1),
            fillup("b", 1300.0, 8, 2, f64::NAN, 100.0),
        ];

        let analytics = compute_analytics(&entries);

        assert!(analytics.actual_mpg.is_nan());
        assert!(analytics.best_mpg.is_nan());
        assert!(analytics.total_fuel_liters.is_nan());
    }

    #[test]
    fn test_output_field_names() {
        let json = serde_json::to_value(compute_analytics(&sample_log())).unwrap();

        for key in [
            "totalLogs",
            "totalMilesCovered",
            "totalFuelSpent",
            "averageFuelPerMile",
            "longestMilePerGaugeTick",
            "averageFuelPerGaugeTick",
            "actualMPG",
            "averageFuelPricePerLiter",
            "totalFuelLiters",
            "averageMilesPerFillup",
            "carEstimatedMPG",
            "mpgAccuracy",
            "rangeAccuracy",
            "bestMPG",
            "worstMPG",
        ] {
            assert!(json.get(key).is_some(), "missing output field {key}");
        }
    }
}
