// 🚗 Mileage Log Model
// Immutable log entries + creation-time validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Empty tank on the 11-point gauge
pub const FUEL_GAUGE_MIN: u8 = 1;

/// Full tank on the 11-point gauge
pub const FUEL_GAUGE_MAX: u8 = 11;

/// Liters → US gallons
pub const LITERS_TO_GALLONS: f64 = 0.264172;

// ============================================================================
// LOG ENTRY
// ============================================================================

/// MileageLog - one odometer/fuel reading
///
/// Entries are never mutated after `create`. Deletion and clearing happen
/// at the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MileageLog {
    pub id: String,
    pub current_reading: f64,
    pub fuel_gauge: u8,
    pub just_bought_fuel: bool,

    /// Epoch milliseconds, the only ordering key
    pub timestamp: i64,

    // Fuel purchase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_price_per_liter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_liters: Option<f64>,

    // Car display data
    /// Distance to empty shown by the car (miles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_range_estimate: Option<f64>,
    /// MPG shown by the car
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_tank_average: Option<f64>,

    // Metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filling_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_kilometers: Option<f64>,
}

impl MileageLog {
    /// Validate a draft and turn it into an entry with a fresh id
    ///
    /// When the amount paid is missing but price and liters are known,
    /// the amount is filled in as `price * liters`.
    pub fn create(draft: NewMileageLog, timestamp: i64) -> Result<Self, Vec<FieldError>> {
        let (current_reading, fuel_gauge) = draft.checked()?;

        let fuel_amount = match (draft.fuel_amount, draft.fuel_price_per_liter, draft.fuel_liters) {
            (None, Some(price), Some(liters)) if draft.just_bought_fuel => Some(price * liters),
            (amount, _, _) => amount,
        };

        Ok(MileageLog {
            id: uuid::Uuid::new_v4().to_string(),
            current_reading,
            fuel_gauge,
            just_bought_fuel: draft.just_bought_fuel,
            timestamp,
            fuel_amount,
            fuel_price_per_liter: draft.fuel_price_per_liter,
            fuel_liters: draft.fuel_liters,
            car_range_estimate: draft.car_range_estimate,
            car_tank_average: draft.car_tank_average,
            filling_station: non_blank(draft.filling_station),
            notes: non_blank(draft.notes),
            trip_kilometers: draft.trip_kilometers,
        })
    }

    /// Fuel was purchased at this log
    pub fn is_fillup(&self) -> bool {
        self.just_bought_fuel
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|s| !s.trim().is_empty())
}

/// Map a raw gauge reading onto the 1–11 scale
///
/// Non-integral, NaN and out-of-range values are rejected.
pub fn gauge_from_f64(value: f64) -> Option<u8> {
    let in_range = value >= FUEL_GAUGE_MIN as f64 && value <= FUEL_GAUGE_MAX as f64;
    if in_range && value.fract() == 0.0 {
        Some(value as u8)
    } else {
        None
    }
}

// ============================================================================
// DRAFT + VALIDATION
// ============================================================================

/// Which constraint a draft field broke
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be a whole number between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u8,
        max: u8,
    },

    #[error("{field} must be greater than 0")]
    NotPositive { field: &'static str },
}

impl FieldError {
    /// Name of the offending field (camelCase, as serialized)
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::Required { field }
            | FieldError::OutOfRange { field, .. }
            | FieldError::NotPositive { field } => *field,
        }
    }
}

/// NewMileageLog - everything a caller supplies before id/timestamp exist
///
/// Gauge is kept as `f64` so a bad reading can be reported instead of
/// silently truncated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMileageLog {
    pub current_reading: Option<f64>,
    pub fuel_gauge: Option<f64>,
    pub just_bought_fuel: bool,
    pub fuel_amount: Option<f64>,
    pub fuel_price_per_liter: Option<f64>,
    pub fuel_liters: Option<f64>,
    pub car_range_estimate: Option<f64>,
    pub car_tank_average: Option<f64>,
    pub filling_station: Option<String>,
    pub notes: Option<String>,
    pub trip_kilometers: Option<f64>,
}

impl NewMileageLog {
    /// Draft with the two required readings
    pub fn new(current_reading: f64, fuel_gauge: f64) -> Self {
        NewMileageLog {
            current_reading: Some(current_reading),
            fuel_gauge: Some(fuel_gauge),
            ..Default::default()
        }
    }

    /// Builder pattern: mark as fillup
    pub fn bought_fuel(mut self) -> Self {
        self.just_bought_fuel = true;
        self
    }

    pub fn with_fuel_amount(mut self, amount: f64) -> Self {
        self.fuel_amount = Some(amount);
        self
    }

    pub fn with_price_per_liter(mut self, price: f64) -> Self {
        self.fuel_price_per_liter = Some(price);
        self
    }

    pub fn with_liters(mut self, liters: f64) -> Self {
        self.fuel_liters = Some(liters);
        self
    }

    pub fn with_range_estimate(mut self, miles: f64) -> Self {
        self.car_range_estimate = Some(miles);
        self
    }

    pub fn with_tank_average(mut self, mpg: f64) -> Self {
        self.car_tank_average = Some(mpg);
        self
    }

    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.filling_station = Some(station.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_trip_kilometers(mut self, km: f64) -> Self {
        self.trip_kilometers = Some(km);
        self
    }

    /// Every violated constraint, in field order
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        self.checked().map(|_| ())
    }

    fn optional_numbers(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("fuelAmount", self.fuel_amount),
            ("fuelPricePerLiter", self.fuel_price_per_liter),
            ("fuelLiters", self.fuel_liters),
            ("carRangeEstimate", self.car_range_estimate),
            ("carTankAverage", self.car_tank_average),
            ("tripKilometers", self.trip_kilometers),
        ]
    }

    /// Validation that also hands back the required pair
    fn checked(&self) -> Result<(f64, u8), Vec<FieldError>> {
        let mut errors = Vec::new();

        // NaN fails `> 0.0`, so it is rejected here too
        let reading = match self.current_reading {
            None => {
                errors.push(FieldError::Required { field: "currentReading" });
                None
            }
            Some(r) if !(r > 0.0) => {
                errors.push(FieldError::NotPositive { field: "currentReading" });
                None
            }
            Some(r) => Some(r),
        };

        let gauge = match self.fuel_gauge {
            None => {
                errors.push(FieldError::Required { field: "fuelGauge" });
                None
            }
            Some(g) => {
                let gauge = gauge_from_f64(g);
                if gauge.is_none() {
                    errors.push(FieldError::OutOfRange {
                        field: "fuelGauge",
                        min: FUEL_GAUGE_MIN,
                        max: FUEL_GAUGE_MAX,
                    });
                }
                gauge
            }
        };

        for (field, value) in self.optional_numbers() {
            if let Some(v) = value {
                if !(v > 0.0) {
                    errors.push(FieldError::NotPositive { field });
                }
            }
        }

        match (reading, gauge) {
            (Some(r), Some(g)) if errors.is_empty() => Ok((r, g)),
            _ => Err(errors),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
