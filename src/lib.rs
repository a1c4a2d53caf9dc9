// Mile Tracker - Core Library
// Fuel-economy analytics + CSV interchange over a single-vehicle mileage log

pub mod model;
pub mod analytics;
pub mod csv_codec;
pub mod trends;
pub mod quality;   // Odometer anomalies analytics skips silently
pub mod store;
pub mod service;
pub mod config;

// Re-export commonly used types
pub use model::{
    MileageLog, NewMileageLog, FieldError,
    FUEL_GAUGE_MIN, FUEL_GAUGE_MAX, LITERS_TO_GALLONS,
};
pub use analytics::{compute_analytics, MileageAnalytics};
pub use csv_codec::{
    to_csv, from_csv, CsvImport, ImportError,
    CSV_HEADERS, NO_DATA_SENTINEL,
};
pub use trends::{
    time_series, mpg_series, fuel_price_series, miles_series, cost_per_mile_series,
    TrendPoint,
};
pub use quality::{odometer_report, OdometerReport, OdometerWarning, OdometerIssue};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StorageError};
pub use service::{
    MileageService, AddMileageError, ImportReport, ImportAborted,
    MILEAGE_LOGS_KEY,
};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
