//! CLI entry point for the RCN rater tool.
//!
//! Provides subcommands for querying a single city, extracting records from a
//! saved GML response, fetching every supported city into a directory of JSON
//! reports, and listing the supported cities.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rcn_rater::{
    config::{ReferenceData, Settings},
    fetch::{BasicClient, fetch_bytes},
    output::{SummaryRow, append_record, to_json, write_report},
    parser::extract_records,
    pipeline::fetch_city,
    stats::StatsSummary,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rcn_rater")]
#[command(about = "Apartment transaction prices from the RCN WFS service", long_about = None)]
struct Cli {
    /// JSON file with the city reference table (built-in table if omitted)
    #[arg(long, global = true, value_name = "FILE")]
    cities: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch transactions and price statistics for one city
    Query {
        /// City name, e.g. "Gdańsk"
        city: String,

        /// Search radius around the city center in km
        #[arg(short, long)]
        radius: Option<f64>,

        /// Maximum number of features requested from the service
        #[arg(short = 'n', long)]
        max_records: Option<u32>,

        /// Include NBP reference prices in the report
        #[arg(long, default_value_t = false)]
        nbp: bool,

        /// Pretty-print the JSON report
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Extract transactions from a saved GML response or a URL
    Extract {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Pretty-print the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Fetch every supported city and write one JSON report per city
    FetchAll {
        /// Only fetch this city
        #[arg(long)]
        city: Option<String>,

        /// Directory to write reports to
        #[arg(short, long, default_value = "data")]
        output_dir: String,

        /// Maximum number of concurrent city fetches
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        /// Gzip compress the reports
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Optional: CSV file to append one summary row per city to
        #[arg(long)]
        history: Option<String>,
    },
    /// List supported cities with their NBP reference prices
    ListCities,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/rcn_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rcn_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    let reference = match &cli.cities {
        Some(path) => ReferenceData::load(path)?,
        None => ReferenceData::builtin(),
    };

    match cli.command {
        Commands::Query {
            city,
            radius,
            max_records,
            nbp,
            pretty,
            output,
        } => {
            let settings = Settings {
                radius_km: radius.unwrap_or(settings.radius_km),
                max_records: max_records.unwrap_or(settings.max_records),
                ..settings
            };
            if !(settings.radius_km.is_finite() && settings.radius_km > 0.0) {
                anyhow::bail!("radius must be a positive number of km");
            }
            ensure_known_city(&reference, &city)?;

            let client = BasicClient::new(&settings)?;
            let mut report = fetch_city(&client, &settings, &reference, &city).await?;
            if nbp {
                report = report.with_reference_prices(&reference);
            }

            info!(city = %report.city, count = report.count, "Query complete");

            let json = to_json(&report, pretty)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("writing {path}"))?
                }
                None => println!("{json}"),
            }
        }
        Commands::Extract { source, pretty } => {
            let bytes = fetcher(&source, &settings).await?;
            let transactions = extract_records(&bytes);
            let stats = StatsSummary::from_records(&transactions);

            info!(
                bytes = bytes.len(),
                transactions = transactions.len(),
                "Extraction complete"
            );

            let value = serde_json::json!({
                "transactions": transactions,
                "stats": stats,
                "count": transactions.len(),
            });
            let json = if pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{json}");
        }
        Commands::FetchAll {
            city,
            output_dir,
            concurrency,
            gzip,
            history,
        } => {
            let cities: Vec<String> = match city {
                Some(city) => {
                    ensure_known_city(&reference, &city)?;
                    vec![city]
                }
                None => reference.names().map(str::to_string).collect(),
            };

            fetch_all(
                cities,
                settings,
                reference,
                &output_dir,
                concurrency,
                gzip,
                history.as_deref(),
            )
            .await?;
        }
        Commands::ListCities => {
            for city in reference.iter() {
                match &city.nbp {
                    Some(nbp) => info!(
                        city = %city.name,
                        lat = city.center.lat,
                        lon = city.center.lon,
                        nbp_primary = nbp.primary,
                        nbp_secondary = nbp.secondary,
                        quarter = %nbp.quarter,
                        "City"
                    ),
                    None => info!(
                        city = %city.name,
                        lat = city.center.lat,
                        lon = city.center.lon,
                        "City"
                    ),
                }
            }
            info!(total = reference.len(), "City list");
        }
    }

    Ok(())
}

fn ensure_known_city(reference: &ReferenceData, city: &str) -> Result<()> {
    if !reference.contains(city) {
        let known: Vec<&str> = reference.names().collect();
        anyhow::bail!("unknown city: {city} (available: {})", known.join(", "));
    }
    Ok(())
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(settings), fields(source = %url))]
async fn fetcher(url: &str, settings: &Settings) -> Result<Vec<u8>> {
    let bytes = if url.starts_with("http") {
        let client = BasicClient::new(settings)?;
        fetch_bytes(&client, url).await?
    } else {
        std::fs::read(url).with_context(|| format!("reading {url}"))?
    };
    Ok(bytes)
}

/// Fetches each city in its own task, at most `concurrency` at a time, and
/// writes one report per city. A failing city is logged and skipped.
#[tracing::instrument(
    skip(cities, settings, reference, history),
    fields(cities = cities.len())
)]
async fn fetch_all(
    cities: Vec<String>,
    settings: Settings,
    reference: ReferenceData,
    output_dir: &str,
    concurrency: usize,
    gzip: bool,
    history: Option<&str>,
) -> Result<()> {
    let client = Arc::new(BasicClient::new(&settings)?);
    let settings = Arc::new(settings);
    let reference = Arc::new(reference);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));

    std::fs::create_dir_all(output_dir)?;
    info!(total = cities.len(), "Starting fetch round");

    let mut tasks = vec![];

    for city in cities {
        let sem = semaphore.clone();
        let client = client.clone();
        let settings = settings.clone();
        let reference = reference.clone();
        let output_dir = output_dir.to_string();

        let city_span = tracing::info_span!("fetch_city", city = %city);

        let task = tokio::spawn(
            async move {
                let _permit = match sem.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return SummaryRow::from_error(&city, "internal_error", &e.to_string()),
                };

                let fetch_start = std::time::Instant::now();
                let report = match fetch_city(&*client, &settings, &reference, &city).await {
                    Ok(report) => report,
                    Err(e) => {
                        error!(error = %e, "City query failed");
                        return SummaryRow::from_error(&city, "query_error", &e.to_string());
                    }
                };

                let elapsed = fetch_start.elapsed();
                if elapsed.as_secs() > 30 {
                    warn!(elapsed_secs = elapsed.as_secs(), "City fetch was slow");
                }

                match write_report(Path::new(&output_dir), &report, gzip) {
                    Ok(path) => {
                        info!(path = %path.display(), count = report.count, "City processed successfully");
                        SummaryRow::from_report(&report)
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to write report");
                        SummaryRow::from_error(&city, "write_error", &e.to_string())
                    }
                }
            }
            .instrument(city_span),
        );

        tasks.push(task);
    }

    let total = tasks.len();
    let mut rows = Vec::with_capacity(total);
    for task in tasks {
        match task.await {
            Ok(row) => rows.push(row),
            Err(e) => error!(error = %e, "City task panicked"),
        }
    }

    if let Some(path) = history {
        for row in &rows {
            if let Err(e) = append_record(path, row) {
                error!(city = %row.city, error = %e, "Failed to append history row");
            }
        }
    }

    let failed = rows.iter().filter(|r| r.error_type.is_some()).count();
    let transactions: usize = rows.iter().map(|r| r.count).sum();
    info!(
        done = rows.len() - failed,
        failed,
        total,
        transactions,
        output_dir,
        "Finished fetching all cities"
    );

    if failed > 0 || rows.len() < total {
        warn!(failed, "Some cities could not be fetched");
    }
    Ok(())
}
