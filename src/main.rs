use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mile_tracker::{
    cost_per_mile_series, fuel_price_series, miles_series, mpg_series, AddMileageError, AppConfig,
    KeyValueStore, MileageService, NewMileageLog, SqliteStore, NO_DATA_SENTINEL,
};

#[derive(Parser, Debug)]
#[command(name = "mile-tracker", version, about = "Fuel-economy analytics over a mileage log")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an odometer reading
    Add(AddArgs),
    /// Show logs, newest first (default)
    List,
    /// Fuel-economy analytics (JSON)
    Stats,
    /// Per-interval MPG / price / cost series
    Trends {
        /// Print a single series instead of every interval as JSON
        #[arg(long, value_enum)]
        series: Option<Series>,
    },
    /// Odometer rollbacks and duplicate timestamps
    Quality,
    /// Write all logs as CSV
    Export {
        /// Target file (defaults to the configured export file)
        file: Option<PathBuf>,
    },
    /// Import logs from CSV
    Import {
        file: PathBuf,
    },
    /// Remove one log
    Delete {
        id: String,
    },
    /// Remove every log
    Clear,
}

#[derive(Args, Debug, Default)]
struct AddArgs {
    /// Odometer reading (miles)
    #[arg(long, allow_negative_numbers = true)]
    reading: Option<f64>,

    /// Fuel gauge position, 1-11
    #[arg(long, allow_negative_numbers = true)]
    gauge: Option<f64>,

    /// Fuel was bought at this reading
    #[arg(long)]
    fuel: bool,

    /// Total paid for fuel
    #[arg(long, allow_negative_numbers = true)]
    amount: Option<f64>,

    /// Fuel price per liter
    #[arg(long, allow_negative_numbers = true)]
    price: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    liters: Option<f64>,

    /// Car's range estimate (miles)
    #[arg(long, allow_negative_numbers = true)]
    range: Option<f64>,

    /// Car's tank average (MPG)
    #[arg(long, allow_negative_numbers = true)]
    tank_avg: Option<f64>,

    #[arg(long)]
    station: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    trip: Option<f64>,

    #[arg(long)]
    notes: Option<String>,
}

impl From<AddArgs> for NewMileageLog {
    fn from(args: AddArgs) -> Self {
        NewMileageLog {
            current_reading: args.reading,
            fuel_gauge: args.gauge,
            just_bought_fuel: args.fuel,
            fuel_amount: args.amount,
            fuel_price_per_liter: args.price,
            fuel_liters: args.liters,
            car_range_estimate: args.range,
            car_tank_average: args.tank_avg,
            filling_station: args.station,
            notes: args.notes,
            trip_kilometers: args.trip,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
enum Series {
    Mpg,
    Price,
    Miles,
    Cost,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    init_logging(&config);

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    let mut service = MileageService::new(store);

    match cli.command.unwrap_or(Command::List) {
        Command::List => run_list(&service),
        Command::Add(args) => run_add(&mut service, args.into()),
        Command::Stats => run_stats(&service),
        Command::Trends { series } => run_trends(&service, series),
        Command::Quality => run_quality(&service),
        Command::Export { file } => run_export(&service, file, &config),
        Command::Import { file } => run_import(&mut service, file),
        Command::Delete { id } => run_delete(&mut service, &id),
        Command::Clear => {
            service.clear_all_data()?;
            println!("✓ All mileage data cleared");
            Ok(())
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn format_time(timestamp: i64) -> String {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_list<S: KeyValueStore>(service: &MileageService<S>) -> Result<()> {
    let logs = service.mileages_newest_first()?;

    if logs.is_empty() {
        println!("No mileage logs yet. Add one with: mile-tracker add --reading <miles> --gauge <1-11>");
        return Ok(());
    }

    println!("📋 {} mileage logs\n", logs.len());
    for log in &logs {
        let fuel = if log.is_fillup() {
            match (log.fuel_liters, log.fuel_amount) {
                (Some(liters), Some(amount)) => format!("⛽ {} L for ₦{}", liters, amount),
                (Some(liters), None) => format!("⛽ {} L", liters),
                (None, Some(amount)) => format!("⛽ ₦{}", amount),
                (None, None) => "⛽".to_string(),
            }
        } else {
            String::new()
        };

        println!(
            "{}  {:>10} mi  gauge {:>2}/11  {}  [{}]",
            format_time(log.timestamp),
            log.current_reading,
            log.fuel_gauge,
            fuel,
            log.id
        );
    }

    Ok(())
}

fn run_add<S: KeyValueStore>(service: &mut MileageService<S>, draft: NewMileageLog) -> Result<()> {
    match service.add_mileage(draft) {
        Ok(log) => {
            println!("✓ Mileage log added ({})", log.id);
            Ok(())
        }
        Err(AddMileageError::Validation(errors)) => {
            eprintln!("❌ Mileage log not saved:");
            for error in &errors {
                eprintln!("   {}: {}", error.field(), error);
            }
            bail!("{} invalid field(s)", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_stats<S: KeyValueStore>(service: &MileageService<S>) -> Result<()> {
    let analytics = service.analytics()?;

    println!("📊 Fuel economy over {} logs", analytics.total_logs);
    println!("   Miles covered:   {:.1}", analytics.total_miles_covered);
    println!("   Fuel spent:      ₦{:.2}", analytics.total_fuel_spent);
    println!("   Actual MPG:      {:.1} (best {:.1}, worst {:.1})", analytics.actual_mpg, analytics.best_mpg, analytics.worst_mpg);
    println!("   Car MPG:         {:.1} ({:+.1}% actual vs car)", analytics.car_estimated_mpg, analytics.mpg_accuracy);
    println!("   Range accuracy:  {:.1}%\n", analytics.range_accuracy);

    println!("{}", serde_json::to_string_pretty(&analytics)?);
    Ok(())
}

fn run_trends<S: KeyValueStore>(service: &MileageService<S>, series: Option<Series>) -> Result<()> {
    let Some(series) = series else {
        let points = service.trends()?;

        if points.is_empty() {
            println!("Not enough logs for trends (need two readings with distance between them)");
            return Ok(());
        }

        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    };

    let logs = service.mileages()?;

    match series {
        Series::Mpg => {
            println!("📈 Actual vs car MPG");
            for (timestamp, actual, car) in mpg_series(&logs) {
                let car = car.map(|mpg| format!("{:.1}", mpg)).unwrap_or_else(|| "N/A".to_string());
                println!("{}  actual {:>6.1}  car {:>6}", format_time(timestamp), actual, car);
            }
        }
        Series::Price => print_series("📈 Fuel price per liter (₦)", fuel_price_series(&logs)),
        Series::Miles => print_series("📈 Miles per interval", miles_series(&logs)),
        Series::Cost => print_series("📈 Cost per mile (₦)", cost_per_mile_series(&logs)),
    }

    Ok(())
}

fn print_series(title: &str, points: Vec<(i64, f64)>) {
    println!("{}", title);
    for (timestamp, value) in points {
        println!("{}  {:>10.2}", format_time(timestamp), value);
    }
}

fn run_quality<S: KeyValueStore>(service: &MileageService<S>) -> Result<()> {
    let report = service.odometer_report()?;

    println!("🔍 {}", report.summary());
    for warning in &report.warnings {
        println!("   ⚠️  {}", warning.message());
    }

    Ok(())
}

fn run_export<S: KeyValueStore>(
    service: &MileageService<S>,
    path: Option<PathBuf>,
    config: &AppConfig,
) -> Result<()> {
    let csv_text = service.export_csv()?;

    if csv_text == NO_DATA_SENTINEL {
        println!("{}", NO_DATA_SENTINEL);
        return Ok(());
    }

    let path = path.unwrap_or_else(|| config.export_file.clone());
    fs::write(&path, &csv_text).with_context(|| format!("Failed to write {:?}", path))?;

    println!("✓ Exported mileage logs to {}", path.display());
    Ok(())
}

fn run_import<S: KeyValueStore>(service: &mut MileageService<S>, path: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read CSV file {:?}", path))?;

    println!("📂 Importing {}...", path.display());

    let report = match service.import_csv(&text) {
        Ok(report) => report,
        Err(aborted) => {
            eprintln!(
                "❌ Import stopped after {} rows: {}",
                aborted.report.imported, aborted
            );
            for message in aborted.report.messages() {
                eprintln!("   {}", message);
            }
            return Err(aborted.into());
        }
    };

    println!("✓ Imported: {} logs", report.imported);
    if !report.errors.is_empty() {
        println!("⚠️  Skipped {} rows:", report.errors.len());
        for message in report.messages() {
            println!("   {}", message);
        }
    }

    Ok(())
}

fn run_delete<S: KeyValueStore>(service: &mut MileageService<S>, id: &str) -> Result<()> {
    if service.delete_mileage(id)? {
        println!("✓ Deleted {}", id);
    } else {
        println!("No log with id {}", id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_command_defaults_to_list() {
        let cli = Cli::try_parse_from(["mile-tracker"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_add_flags_map_onto_draft() {
        let cli = Cli::try_parse_from([
            "mile-tracker", "add", "--reading=1000", "--gauge", "5", "--fuel",
            "--price", "750", "--liters", "20", "--tank-avg", "42.5", "--station", "Total, Ikeja",
        ])
        .unwrap();

        let Some(Command::Add(args)) = cli.command else {
            panic!("expected add command");
        };
        let draft = NewMileageLog::from(args);

        assert_eq!(draft.current_reading, Some(1000.0));
        assert_eq!(draft.fuel_gauge, Some(5.0));
        assert!(draft.just_bought_fuel);
        assert_eq!(draft.fuel_price_per_liter, Some(750.0));
        assert_eq!(draft.fuel_liters, Some(20.0));
        assert_eq!(draft.car_tank_average, Some(42.5));
        assert_eq!(draft.filling_station.as_deref(), Some("Total, Ikeja"));
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn test_negative_reading_reaches_validation() {
        let cli = Cli::try_parse_from(["mile-tracker", "add", "--reading", "-5", "--gauge", "3"]).unwrap();

        let Some(Command::Add(args)) = cli.command else {
            panic!("expected add command");
        };
        let errors = NewMileageLog::from(args).validate().unwrap_err();
        assert_eq!(errors[0].field(), "currentReading");
    }

    #[test]
    fn test_flag_is_not_taken_as_a_value() {
        let result = Cli::try_parse_from(["mile-tracker", "add", "--notes", "--fuel"]);
        assert!(result.is_err(), "--notes without a value must be rejected");
    }

    #[test]
    fn test_bad_number_and_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["mile-tracker", "add", "--reading", "lots"]).is_err());
        assert!(Cli::try_parse_from(["mile-tracker", "fly"]).is_err());
        assert!(Cli::try_parse_from(["mile-tracker", "import"]).is_err(), "import needs a file");
    }

    #[test]
    fn test_trends_series_choice() {
        let cli = Cli::try_parse_from(["mile-tracker", "trends", "--series", "cost"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Trends { series: Some(Series::Cost) })));

        assert!(Cli::try_parse_from(["mile-tracker", "trends", "--series", "speed"]).is_err());
    }
}
