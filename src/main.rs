mod calendar;
mod config;
mod predict;
mod report;
mod scheduler;

use std::io;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use crate::calendar::{GoogleCalendar, Publisher};
use crate::config::Config;
use crate::predict::{
    find_pass, ElementCatalog, HttpFetcher, PeakSearch, PredictError, Sgp4Propagator,
};
use crate::report::{JsonReport, ReportSink, TableReport};
use crate::scheduler::{Driver, Horizon};

#[derive(Parser)]
#[command(name = "pass-planner")]
#[command(about = "Weekly satellite pass planning with operator rotation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Plan a week of passes and optionally book them in the calendar
    Plan(PlanArgs),
    /// List the next passes of one satellite, unfiltered
    Passes {
        config: String,
        /// Object name or NORAD id
        #[arg(short, long)]
        satellite: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
}

#[derive(clap::Args)]
struct PlanArgs {
    config: String,
    /// Only plan these operations (repeatable)
    #[arg(short, long = "operation")]
    operations: Vec<String>,
    /// Weeks relative to the current one
    #[arg(long, allow_negative_numbers = true)]
    week_offset: Option<i64>,
    /// Insert events into the calendar instead of a dry run
    #[arg(long)]
    commit: bool,
    #[arg(long, value_enum, default_value = "table")]
    format: ReportFormat,
    #[arg(long, value_enum)]
    peak_search: Option<PeakSearch>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Table,
    Json,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Plan(args) => plan(args),
        Commands::Passes {
            config,
            satellite,
            count,
        } => passes(&config, &satellite, count),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            None
        }
    }
}

fn load_catalog(config: &Config) -> Result<ElementCatalog, PredictError> {
    let cache = config.tle_cache();
    let content = cache.load(&HttpFetcher::new()?)?;
    ElementCatalog::from_tle_text(&content, &cache.path().display().to_string())
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let operations = match config.operations() {
        Ok(ops) => ops,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Configuration is valid ({} operations, peak search: {})",
        operations.len(),
        config.schedule.peak_search
    );
    for (i, op) in operations.iter().enumerate() {
        println!(
            "  {}: {} -> {} (min. el. {}°, {} operators, calendar: {})",
            i + 1,
            op.name,
            op.satellite,
            op.min_elevation_deg,
            op.operators.len(),
            op.calendar_id.as_deref().unwrap_or("none")
        );
    }
    ExitCode::SUCCESS
}

fn plan(args: PlanArgs) -> ExitCode {
    let Some(config) = load_config(&args.config) else {
        return ExitCode::FAILURE;
    };
    let (station, zone, mut operations) =
        match (config.station(), config.zone(), config.operations()) {
            (Ok(s), Ok(z), Ok(o)) => (s, z, o),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };

    if !args.operations.is_empty() {
        if let Some(unknown) = args
            .operations
            .iter()
            .find(|name| !operations.iter().any(|op| &op.name == *name))
        {
            eprintln!("Unknown operation: {}", unknown);
            return ExitCode::FAILURE;
        }
        operations.retain(|op| args.operations.contains(&op.name));
    }

    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading orbital elements: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let horizon = match Horizon::week(
        Utc::now(),
        zone.offset,
        args.week_offset.unwrap_or(config.schedule.week_offset),
    ) {
        Ok(horizon) => horizon,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let peak = args.peak_search.unwrap_or(config.schedule.peak_search);

    let mut auth_failure = None;
    let mut calendar = if args.commit {
        match GoogleCalendar::from_token_file(&config.token_file(), Utc::now()) {
            Ok(google) => Some(Publisher::new(
                Box::new(google),
                zone.clone(),
                config.calendar.reminders.clone(),
            )),
            Err(e) => {
                log::error!("{}; events will not be submitted", e);
                auth_failure = Some(e.to_string());
                None
            }
        }
    } else {
        log::info!("Dry run, pass --commit to insert calendar events");
        None
    };

    log::info!(
        "Station {} at {}, week of {} ({}), peak search {}",
        config.station.name.as_deref().unwrap_or("unnamed"),
        config.station.coordinates,
        zone.localize(horizon.start).format("%Y-%m-%d"),
        zone.name,
        peak
    );

    let stdout = io::stdout().lock();
    let mut report: Box<dyn ReportSink> = match args.format {
        ReportFormat::Table => Box::new(TableReport::new(stdout, zone.clone())),
        ReportFormat::Json => Box::new(JsonReport::new(stdout, zone.clone())),
    };

    let driver = Driver::new(&station, &Sgp4Propagator, peak);
    let summary = driver.run(
        &mut operations,
        &catalog,
        &horizon,
        calendar.as_mut(),
        report.as_mut(),
    );

    log::info!(
        "{} passes scheduled, {} events created, {} submissions failed, {} operations skipped",
        summary.scheduled,
        summary.submitted,
        summary.submission_failures,
        summary.skipped.len()
    );

    if auth_failure.or(summary.auth_failure).is_some() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn passes(path: &str, key: &str, count: usize) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    let (station, zone) = match (config.station(), config.zone()) {
        (Ok(s), Ok(z)) => (s, z),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading orbital elements: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let Some(satellite) = catalog.get(key) else {
        eprintln!("No orbital elements for {}", key);
        return ExitCode::FAILURE;
    };

    println!("AOS, LOS, Duration (s), Max. el.");
    let mut cursor = Utc::now();
    for _ in 0..count {
        let pass = match find_pass(
            &Sgp4Propagator,
            &station,
            satellite,
            cursor,
            config.schedule.peak_search,
        ) {
            Ok(pass) => pass,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if pass.is_degenerate() {
            println!("(no complete pass within a day of {})", zone.localize(cursor));
            break;
        }
        println!(
            "{}, {}, {}, {:.2}",
            zone.localize(pass.aos).format("%Y/%m/%d %H:%M:%S"),
            zone.localize(pass.los).format("%H:%M:%S"),
            pass.duration_seconds,
            pass.max_elevation_deg
        );
        cursor = pass.los;
    }
    ExitCode::SUCCESS
}
