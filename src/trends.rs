// 📈 Trends - per-interval series behind the dashboard charts
// One point per adjacent pair of logs that actually covered distance.

use crate::model::{MileageLog, LITERS_TO_GALLONS};
use serde::{Deserialize, Serialize};

/// One driving interval, stamped with the later log's timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: i64,
    pub miles: f64,
    #[serde(rename = "actualMPG", skip_serializing_if = "Option::is_none")]
    pub actual_mpg: Option<f64>,
    #[serde(rename = "carEstimatedMPG", skip_serializing_if = "Option::is_none")]
    pub car_estimated_mpg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_liter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_mile: Option<f64>,
}

/// Every interval with a positive odometer delta, oldest first
pub fn time_series(entries: &[MileageLog]) -> Vec<TrendPoint> {
    if entries.len() < 2 {
        return Vec::new();
    }

    let mut sorted: Vec<&MileageLog> = entries.iter().collect();
    sorted.sort_by_key(|log| log.timestamp);

    sorted
        .windows(2)
        .filter_map(|pair| {
            let (prev, current) = (pair[0], pair[1]);
            let miles = current.current_reading - prev.current_reading;
            if miles <= 0.0 {
                return None;
            }

            let actual_mpg = match current.fuel_liters {
                Some(liters) if current.is_fillup() => Some(miles / (liters * LITERS_TO_GALLONS)),
                _ => None,
            };

            Some(TrendPoint {
                timestamp: current.timestamp,
                miles,
                actual_mpg,
                car_estimated_mpg: current.car_tank_average,
                price_per_liter: current.fuel_price_per_liter,
                cost_per_mile: current.fuel_amount.map(|amount| amount / miles),
            })
        })
        .collect()
}

/// (timestamp, actual MPG, car MPG) where either MPG is known
///
/// Missing actual MPG is reported as 0 so both lines share an x-axis.
pub fn mpg_series(entries: &[MileageLog]) -> Vec<(i64, f64, Option<f64>)> {
    time_series(entries)
        .into_iter()
        .filter(|p| p.actual_mpg.is_some() || p.car_estimated_mpg.is_some())
        .map(|p| (p.timestamp, p.actual_mpg.unwrap_or(0.0), p.car_estimated_mpg))
        .collect()
}

pub fn fuel_price_series(entries: &[MileageLog]) -> Vec<(i64, f64)> {
    time_series(entries)
        .into_iter()
        .filter_map(|p| p.price_per_liter.map(|price| (p.timestamp, price)))
        .collect()
}

pub fn miles_series(entries: &[MileageLog]) -> Vec<(i64, f64)> {
    time_series(entries)
        .into_iter()
        .map(|p| (p.timestamp, p.miles))
        .collect()
}

pub fn cost_per_mile_series(entries: &[MileageLog]) -> Vec<(i64, f64)> {
    time_series(entries)
        .into_iter()
        .filter_map(|p| p.cost_per_mile.map(|cost| (p.timestamp, cost)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewMileageLog;

    fn entries() -> Vec<MileageLog> {
        vec![
            MileageLog::create(
                NewMileageLog::new(1300.0, 8.0)
                    .bought_fuel()
                    .with_liters(20.0)
                    .with_fuel_amount(15000.0)
                    .with_price_per_liter(750.0),
                2_000,
            )
            .unwrap(),
            MileageLog::create(NewMileageLog::new(1000.0, 10.0), 1_000).unwrap(),
            MileageLog::create(NewMileageLog::new(1250.0, 6.0), 3_000).unwrap(),
            MileageLog::create(NewMileageLog::new(1400.0, 5.0).with_tank_average(45.0), 4_000).unwrap(),
        ]
    }

    #[test]
    fn test_time_series_skips_non_positive_intervals() {
        let points = time_series(&entries());

        // 1000→1300, (1300→1250 skipped), 1250→1400
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, 2_000);
        assert_eq!(points[0].miles, 300.0);
        assert_eq!(points[0].cost_per_mile, Some(50.0));
        assert_eq!(points[0].price_per_liter, Some(750.0));
        assert!((points[0].actual_mpg.unwrap() - 300.0 / (20.0 * 0.264172)).abs() < 1e-9);
        assert_eq!(points[1].miles, 150.0);
        assert_eq!(points[1].actual_mpg, None);
        assert_eq!(points[1].car_estimated_mpg, Some(45.0));
    }

    #[test]
    fn test_short_logs_have_no_trend() {
        assert!(time_series(&[]).is_empty());
        assert!(time_series(&entries()[..1]).is_empty());
    }

    #[test]
    fn test_derived_series() {
        let entries = entries();

        let mpg = mpg_series(&entries);
        assert_eq!(mpg.len(), 2);
        assert_eq!(mpg[1], (4_000, 0.0, Some(45.0)));

        assert_eq!(fuel_price_series(&entries), vec![(2_000, 750.0)]);
        assert_eq!(miles_series(&entries), vec![(2_000, 300.0), (4_000, 150.0)]);
        assert_eq!(cost_per_mile_series(&entries), vec![(2_000, 50.0)]);
    }
}
