//! EnergyLens CLI
//!
//! Command-line interface for the EnergyLens analytics service.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use energylens::analytics::ReportBuilder;
use energylens::api::HttpServer;
use energylens::db::{InMemoryStore, MetricRepository, MetricStore, PostgresPool};
use energylens::models::{start_of_day, DateRange, PerformanceReport, SummaryReport, TimeFrame};
use energylens::{telemetry, Config};
use serde::Serialize;
use tracing::{info, warn};

/// EnergyLens - Energy analytics for microservice telemetry
#[derive(Parser)]
#[command(name = "energylens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ENERGYLENS_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long, env = "ENERGYLENS_HOST")]
        host: Option<String>,

        /// HTTP port (overrides config)
        #[arg(long, env = "ENERGYLENS_PORT")]
        port: Option<u16>,

        /// Serve records from a JSON fixture file instead of PostgreSQL
        #[arg(long, value_name = "PATH")]
        fixture: Option<PathBuf>,
    },

    /// Energy summary of one container
    Summary {
        #[command(flatten)]
        target: Target,

        /// Time frame (weekly, monthly, yearly)
        #[arg(long, default_value = "weekly")]
        time_frame: String,
    },

    /// Per-API performance breakdown of one container
    Performance {
        #[command(flatten)]
        target: Target,

        /// Time frame (weekly, monthly, yearly)
        #[arg(long, default_value = "weekly")]
        time_frame: String,
    },

    /// List raw records of one container between two dates
    Records {
        #[command(flatten)]
        target: Target,

        /// Start date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        end: String,
    },

    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Show store health status
    Health,
}

#[derive(clap::Args)]
struct Target {
    /// Namespace of the container
    #[arg(long)]
    namespace: String,

    /// Container name
    #[arg(long)]
    container: String,
}

#[derive(Subcommand)]
enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging; the guard flushes file output on drop
    let _log_guard = telemetry::init_logging(&config.logging, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Serve {
            host,
            port,
            fixture,
        } => run_serve(config, host, port, fixture).await,
        Commands::Summary { target, time_frame } => {
            run_summary(config, &target, &time_frame, cli.format).await
        }
        Commands::Performance { target, time_frame } => {
            run_performance(config, &target, &time_frame, cli.format).await
        }
        Commands::Records { target, start, end } => {
            run_records(config, &target, &start, &end, cli.format).await
        }
        Commands::Db { command } => run_db(config, command).await,
        Commands::Health => run_health(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    fixture: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let prometheus = if config.telemetry.enabled {
        Some(telemetry::install_recorder()?)
    } else {
        None
    };

    let addr = config.bind_addr();

    if let Some(path) = fixture {
        let store = InMemoryStore::load(&path)?;
        if store.is_empty() {
            warn!(fixture = %path.display(), "Fixture holds no records");
        } else {
            info!(fixture = %path.display(), records = store.len(), "Loaded fixture records");
        }
        let reports = ReportBuilder::new(Arc::new(store));
        HttpServer::new(reports, prometheus).serve(&addr).await?;
        return Ok(());
    }

    let pool = PostgresPool::new(&config.database).await?;
    pool.health_check().await?;
    info!("Database connection healthy");

    let reports = ReportBuilder::new(Arc::new(MetricRepository::new(&pool)));
    let served = HttpServer::new(reports, prometheus).serve(&addr).await;

    pool.close().await;
    info!("Database connections closed");

    served?;
    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<(PostgresPool, ReportBuilder)> {
    let pool = PostgresPool::new(&config.database).await?;
    let reports = ReportBuilder::new(Arc::new(MetricRepository::new(&pool)));
    Ok((pool, reports))
}

async fn run_summary(
    config: Config,
    target: &Target,
    time_frame: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (pool, reports) = connect(&config).await?;
    let report = reports
        .summary_report(
            &target.namespace,
            &target.container,
            TimeFrame::parse_lenient(time_frame),
        )
        .await;
    pool.close().await;

    let report = report?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_summary(target, &report),
    }
    Ok(())
}

async fn run_performance(
    config: Config,
    target: &Target,
    time_frame: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (pool, reports) = connect(&config).await?;
    let report = reports
        .performance_report(
            &target.namespace,
            &target.container,
            TimeFrame::parse_lenient(time_frame),
        )
        .await;
    pool.close().await;

    let report = report?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_performance(target, &report),
    }
    Ok(())
}

async fn run_records(
    config: Config,
    target: &Target,
    start: &str,
    end: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let range = DateRange::new(parse_date(start)?, parse_date(end)?);

    let (pool, reports) = connect(&config).await?;
    let page = reports
        .filtered_records(&target.namespace, &target.container, range)
        .await;
    pool.close().await;

    let page = page?;
    match format {
        OutputFormat::Json => print_json(&page)?,
        OutputFormat::Text => {
            println!("{} record(s)", page.count);
            for record in &page.records {
                println!(
                    "  {}  {:<24} {:>6}  {:>10.2} J  {:>8.0} ms",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.api_name.as_deref().unwrap_or("-"),
                    record.method_name.as_deref().unwrap_or("-"),
                    record.total_energy_j,
                    record.total_execution_time_ms,
                );
            }
        }
    }
    Ok(())
}

async fn run_db(config: Config, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Migrate => {
            let pool = PostgresPool::new(&config.database).await?;
            println!("Running migrations...");
            pool.migrate().await?;
            pool.close().await;
            println!("Migrations complete");
        }
    }
    Ok(())
}

async fn run_health(config: Config) -> anyhow::Result<()> {
    println!("System Health Check");
    println!("-------------------");

    let pool = match PostgresPool::new(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            println!("Database:  unreachable ({e})");
            anyhow::bail!("store unavailable");
        }
    };

    let store = MetricRepository::new(&pool);
    let result = store.health_check().await;
    pool.close().await;

    match result {
        Ok(()) => {
            println!("Database:  connected");
            Ok(())
        }
        Err(e) => {
            println!("Database:  failing ({e})");
            Err(e.into())
        }
    }
}

fn parse_date(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid date {raw:?}: {e}"))?;
    Ok(start_of_day(date))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(target: &Target, report: &SummaryReport) {
    println!("{}/{}", target.namespace, target.container);
    println!("  Records:         {}", report.record_count);
    println!("  Total energy:    {} J", report.total_energy);
    println!("  CPU energy:      {} J", report.cpu_energy);
    println!("  RAM energy:      {} J", report.ram_energy);
    println!("  Avg execution:   {} ms", report.avg_execution_time);
    println!("  Memory used:     {:.2} MB", report.memory_used);
    println!("  vs previous:     {:+.2}%", report.comparison);
    let trend: Vec<String> = report
        .last_week_trend
        .iter()
        .map(|v| format!("{v:.2}"))
        .collect();
    println!("  Last 7 days:     [{}]", trend.join(", "));
}

fn print_performance(target: &Target, report: &PerformanceReport) {
    println!(
        "{}/{} ({}): {:.2} J across {} API(s)",
        target.namespace,
        target.container,
        report.time_frame,
        report.total_energy,
        report.apis.len()
    );
    for (name, api) in &report.apis {
        println!();
        println!("  {name} [{}]", api.method.as_deref().unwrap_or("-"));
        println!(
            "    energy {:.2} J, avg {:.2} ms, memory {:.2} MB, co2 {:.2}",
            api.energy, api.avg_time, api.memory_used, api.co2_emission
        );
        for dependent in &api.details.dependents {
            println!(
                "    -> {} {} ({:.2} J, co2 {:.2})",
                dependent.kind, dependent.service, dependent.energy, dependent.co2
            );
        }
        for suggestion in &api.details.suggestions {
            println!("    * {suggestion}");
        }
    }
}
