// 📄 CSV Codec - export + tolerant import
//
// Export: one fixed header row, one row per entry, `N/A` for missing values.
// Import: record-by-record; a bad row becomes an error message, never an abort.

use crate::model::{gauge_from_f64, MileageLog, NewMileageLog};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// FORMAT
// ============================================================================

/// Header row, positional on import
pub const CSV_HEADERS: [&str; 12] = [
    "Date",
    "Current Reading (miles)",
    "Fuel Gauge",
    "Just Bought Fuel",
    "Fuel Amount (₦)",
    "Fuel Price/Liter (₦)",
    "Fuel Liters",
    "Filling Station",
    "Car Range Estimate (miles)",
    "Car Tank Average (MPG)",
    "Trip Kilometers",
    "Notes",
];

/// Returned by `to_csv` instead of a header-only document
pub const NO_DATA_SENTINEL: &str = "No data to export";

/// Token for an absent value
pub const NOT_AVAILABLE: &str = "N/A";

/// Date, reading, gauge, fuel flag
const MIN_COLUMNS: usize = 4;

// Column positions
const COL_DATE: usize = 0;
const COL_READING: usize = 1;
const COL_GAUGE: usize = 2;
const COL_BOUGHT_FUEL: usize = 3;
const COL_FUEL_AMOUNT: usize = 4;
const COL_PRICE_PER_LITER: usize = 5;
const COL_LITERS: usize = 6;
const COL_STATION: usize = 7;
const COL_RANGE: usize = 8;
const COL_TANK_AVERAGE: usize = 9;
const COL_TRIP_KM: usize = 10;
const COL_NOTES: usize = 11;

// ============================================================================
// EXPORT
// ============================================================================

/// Serialize entries to CSV text, in the order given
///
/// Text fields containing a comma, quote or line break are quoted with
/// inner quotes doubled. Rows are joined with `\n`, no trailing newline.
pub fn to_csv(entries: &[MileageLog]) -> Result<String> {
    if entries.is_empty() {
        return Ok(NO_DATA_SENTINEL.to_string());
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADERS)
        .context("Failed to write CSV header")?;

    for log in entries {
        writer
            .write_record(export_row(log))
            .with_context(|| format!("Failed to write CSV row for entry {}", log.id))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV writer: {}", e.error()))?;
    let mut text = String::from_utf8(bytes).context("CSV output was not valid UTF-8")?;

    if text.ends_with('\n') {
        text.pop();
    }

    debug!(rows = entries.len(), "exported CSV");
    Ok(text)
}

fn export_row(log: &MileageLog) -> [String; 12] {
    [
        format_timestamp(log.timestamp),
        log.current_reading.to_string(),
        log.fuel_gauge.to_string(),
        if log.just_bought_fuel { "Yes" } else { "No" }.to_string(),
        number_or_na(log.fuel_amount),
        number_or_na(log.fuel_price_per_liter),
        number_or_na(log.fuel_liters),
        text_or_na(log.filling_station.as_deref()),
        number_or_na(log.car_range_estimate),
        number_or_na(log.car_tank_average),
        number_or_na(log.trip_kilometers),
        text_or_na(log.notes.as_deref()),
    ]
}

/// RFC 3339, UTC, millisecond precision (round-trips epoch millis)
///
/// Timestamps chrono cannot represent are written as raw epoch millis,
/// which the importer also accepts.
fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => timestamp.to_string(),
    }
}

fn number_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

fn text_or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

// ============================================================================
// IMPORT ERRORS
// ============================================================================

/// One row-scoped import failure
///
/// Row numbers are 1-based and count the header, so the first data row is 2.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("CSV file is empty or has no data rows")]
    EmptyFile,

    #[error("Row {row}: Insufficient columns (expected at least 4, found {found})")]
    InsufficientColumns { row: usize, found: usize },

    #[error("Row {row}: Invalid date format '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("Row {row}: Invalid current reading '{value}' (must be a number greater than 0)")]
    InvalidCurrentReading { row: usize, value: String },

    #[error("Row {row}: Invalid fuel gauge '{value}' (must be a whole number from 1 to 11)")]
    InvalidFuelGauge { row: usize, value: String },

    #[error("Row {row}: Invalid {field}: {reason}")]
    InvalidField {
        row: usize,
        field: &'static str,
        reason: String,
    },
}

impl ImportError {
    /// Row the error belongs to (`None` for file-level errors)
    pub fn row(&self) -> Option<usize> {
        match self {
            ImportError::EmptyFile => None,
            ImportError::InsufficientColumns { row, .. }
            | ImportError::InvalidDate { row, .. }
            | ImportError::InvalidCurrentReading { row, .. }
            | ImportError::InvalidFuelGauge { row, .. }
            | ImportError::InvalidField { row, .. } => Some(*row),
        }
    }
}

/// Outcome of a parse-only import
#[derive(Debug, Default)]
pub struct CsvImport {
    /// Freshly created entries, in row order
    pub entries: Vec<MileageLog>,
    /// Row errors, in row order
    pub errors: Vec<ImportError>,
}

impl CsvImport {
    pub fn imported(&self) -> usize {
        self.entries.len()
    }

    /// Human-readable error lines
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

// ============================================================================
// IMPORT
// ============================================================================

/// Parse CSV text into new entries, collecting every row error
pub fn from_csv(text: &str) -> CsvImport {
    let mut import = CsvImport::default();

    let rows = match rows(text) {
        Ok(rows) => rows,
        Err(e) => {
            warn!("CSV import: {}", e);
            import.errors.push(e);
            return import;
        }
    };

    for (_, result) in rows {
        match result {
            Ok(log) => import.entries.push(log),
            Err(e) => {
                warn!("CSV import: {}", e);
                import.errors.push(e);
            }
        }
    }

    debug!(
        imported = import.entries.len(),
        errors = import.errors.len(),
        "parsed CSV import"
    );
    import
}

/// Row-by-row view of an import, header already skipped
///
/// Yields `(row number, outcome)` so callers can persist each entry before
/// the next row is parsed.
/// Blank records are ignored but still count toward row numbers.
pub fn rows(
    text: &str,
) -> Result<impl Iterator<Item = (usize, Result<MileageLog, ImportError>)>, ImportError> {
    let records: Vec<(usize, String)> = split_records(text)
        .into_iter()
        .enumerate()
        .filter(|(_, record)| !record.trim().is_empty())
        .map(|(index, record)| (index + 1, record))
        .collect();

    if records.len() < 2 {
        return Err(ImportError::EmptyFile);
    }

    Ok(records
        .into_iter()
        .skip(1)
        .map(|(row, record)| (row, parse_row(row, &record))))
}

fn parse_row(row: usize, record: &str) -> Result<MileageLog, ImportError> {
    let fields = split_fields(record);

    if fields.len() < MIN_COLUMNS {
        return Err(ImportError::InsufficientColumns {
            row,
            found: fields.len(),
        });
    }

    let raw_date = &fields[COL_DATE];
    let timestamp = parse_timestamp(raw_date).ok_or_else(|| ImportError::InvalidDate {
        row,
        value: raw_date.clone(),
    })?;

    let raw_reading = &fields[COL_READING];
    let current_reading = parse_number(raw_reading)
        .filter(|reading| *reading > 0.0)
        .ok_or_else(|| ImportError::InvalidCurrentReading {
            row,
            value: raw_reading.clone(),
        })?;

    let raw_gauge = &fields[COL_GAUGE];
    let fuel_gauge = parse_number(raw_gauge)
        .and_then(gauge_from_f64)
        .ok_or_else(|| ImportError::InvalidFuelGauge {
            row,
            value: raw_gauge.clone(),
        })?;

    let draft = NewMileageLog {
        current_reading: Some(current_reading),
        fuel_gauge: Some(f64::from(fuel_gauge)),
        just_bought_fuel: fields[COL_BOUGHT_FUEL].eq_ignore_ascii_case("yes"),
        fuel_amount: optional_number(row, &fields, COL_FUEL_AMOUNT, "fuelAmount")?,
        fuel_price_per_liter: optional_number(row, &fields, COL_PRICE_PER_LITER, "fuelPricePerLiter")?,
        fuel_liters: optional_number(row, &fields, COL_LITERS, "fuelLiters")?,
        car_range_estimate: optional_number(row, &fields, COL_RANGE, "carRangeEstimate")?,
        car_tank_average: optional_number(row, &fields, COL_TANK_AVERAGE, "carTankAverage")?,
        filling_station: optional_text(&fields, COL_STATION),
        notes: optional_text(&fields, COL_NOTES),
        trip_kilometers: optional_number(row, &fields, COL_TRIP_KM, "tripKilometers")?,
    };

    // Same invariants as a hand-entered log: optional numbers must be > 0
    MileageLog::create(draft, timestamp).map_err(|errors| {
        let (field, reason) = errors
            .first()
            .map(|e| (e.field(), e.to_string()))
            .unwrap_or(("entry", "failed validation".to_string()));
        ImportError::InvalidField { row, field, reason }
    })
}

fn optional_field<'a>(fields: &'a [String], index: usize) -> Option<&'a str> {
    fields
        .get(index)
        .map(String::as_str)
        .filter(|raw| !raw.is_empty() && !raw.eq_ignore_ascii_case(NOT_AVAILABLE))
}

fn optional_text(fields: &[String], index: usize) -> Option<String> {
    optional_field(fields, index).map(str::to_string)
}

fn optional_number(
    row: usize,
    fields: &[String],
    index: usize,
    field: &'static str,
) -> Result<Option<f64>, ImportError> {
    match optional_field(fields, index) {
        None => Ok(None),
        Some(raw) => parse_number(raw).map(Some).ok_or_else(|| ImportError::InvalidField {
            row,
            field,
            reason: format!("'{}' is not a number", raw),
        }),
    }
}

/// Finite decimal number, or nothing
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Naive date-times are read as UTC
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Parse an exported (or hand-written) date cell into epoch millis
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    if let Ok(millis) = raw.parse::<i64>() {
        return Some(millis);
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc().timestamp_millis());
        }
    }

    None
}

// ============================================================================
// SPLITTERS (explicit state machines)
// ============================================================================

/// Split text into records on line breaks outside quotes
///
/// Quote characters are left in place for `split_fields`. A `\r` directly
/// before a record break is dropped.
pub fn split_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut state = FieldState::Start;

    for c in text.chars() {
        if c == '\n' && state != FieldState::Quoted {
            if current.ends_with('\r') {
                current.pop();
            }
            records.push(std::mem::take(&mut current));
            state = FieldState::Start;
            continue;
        }

        current.push(c);
        state = state.advance(c);
    }

    if current.ends_with('\r') {
        current.pop();
    }
    if !current.is_empty() {
        records.push(current);
    }

    records
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldState {
    /// Nothing but whitespace seen in this field yet
    Start,
    /// Outside quotes; a `"` here is a literal character
    Unquoted,
    /// Inside a quoted section
    Quoted,
    /// Saw `"` while quoted: either an escaped quote or the closing quote
    QuoteInQuoted,
}

impl FieldState {
    fn advance(self, c: char) -> FieldState {
        match (self, c) {
            (FieldState::Start, '"') => FieldState::Quoted,
            (FieldState::Quoted, '"') => FieldState::QuoteInQuoted,
            (FieldState::Quoted, _) => FieldState::Quoted,
            (FieldState::QuoteInQuoted, '"') => FieldState::Quoted,
            (_, ',') => FieldState::Start,
            (FieldState::Start, c) if c.is_whitespace() => FieldState::Start,
            _ => FieldState::Unquoted,
        }
    }
}

/// Split one record into trimmed fields
///
/// Handles quoted fields with embedded commas, line breaks and `""` escapes.
/// Only a `"` opening a field starts a quoted section.
pub fn split_fields(record: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = FieldState::Start;

    for c in record.chars() {
        match (state, c) {
            (FieldState::Start, '"') | (FieldState::Quoted, '"') => {}
            (FieldState::QuoteInQuoted, '"') => field.push('"'),
            (FieldState::Quoted, _) => field.push(c),
            (_, ',') => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
        state = state.advance(c);
    }

    fields.push(field.trim().to_string());
    fields
}

// ============================================================================
// TESTS
// ============================================================================
