//! CLI entry point for the food delivery pipeline.
//!
//! Provides subcommands for cleaning the raw order export, generating a
//! database load script, and summarizing the cleaned table for analysis and
//! dashboards.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use food_delivery_pipeline::analysis::dashboard::{Filters, build_dashboard};
use food_delivery_pipeline::analysis::load_cleaned;
use food_delivery_pipeline::analysis::report::{build_report, format_groups};
use food_delivery_pipeline::analysis::types::EdaReport;
use food_delivery_pipeline::loader::{DEFAULT_CHUNK_SIZE, DEFAULT_TABLE, write_load_script};
use food_delivery_pipeline::output::{print_json, print_pretty};
use food_delivery_pipeline::config::ascii_delimiter;
use food_delivery_pipeline::{PipelineConfig, run};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_CLEANED: &str = "data/cleaned_food_delivery.csv";

#[derive(Parser)]
#[command(name = "food_delivery_pipeline")]
#[command(about = "Clean and analyze online food delivery orders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw order export and derive business metrics
    Clean {
        /// Raw CSV file (optionally .gz)
        #[arg(short, long, env = "FOOD_PIPELINE_INPUT")]
        input: Option<PathBuf>,

        /// Where to write the cleaned CSV
        #[arg(short, long, env = "FOOD_PIPELINE_OUTPUT")]
        output: Option<PathBuf>,

        /// JSON file overriding cleaning constants
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Gzip compress the cleaned CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Field delimiter for both input and output
        #[arg(short, long)]
        delimiter: Option<char>,
    },
    /// Generate a full replace-load SQL script from the cleaned table
    Load {
        /// Cleaned CSV produced by `clean`
        #[arg(short, long, default_value = DEFAULT_CLEANED)]
        input: PathBuf,

        /// SQL script to write
        #[arg(short, long, default_value = "data/food_orders.sql")]
        output: PathBuf,

        /// Target table name
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,

        /// Rows per INSERT statement
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Field delimiter of the cleaned CSV
        #[arg(short, long, default_value_t = ',')]
        delimiter: char,
    },
    /// Print exploratory business aggregates
    Analyze {
        /// Cleaned CSV produced by `clean`
        #[arg(short, long, default_value = DEFAULT_CLEANED)]
        input: PathBuf,

        /// Number of entries in ranked sections
        #[arg(short = 'n', long, default_value_t = 10)]
        top_n: usize,

        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Field delimiter of the cleaned CSV
        #[arg(short, long, default_value_t = ',')]
        delimiter: char,
    },
    /// Print dashboard KPIs and panels
    Dashboard {
        /// Cleaned CSV produced by `clean`
        #[arg(short, long, default_value = DEFAULT_CLEANED)]
        input: PathBuf,

        /// Only include these cities in panels (repeatable)
        #[arg(long = "city")]
        cities: Vec<String>,

        /// Only include these categories in panels (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Field delimiter of the cleaned CSV
        #[arg(short, long, default_value_t = ',')]
        delimiter: char,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/food_delivery_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("food_delivery_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean {
            input,
            output,
            config,
            gzip,
            delimiter,
        } => {
            let mut pipeline_config = match config {
                Some(path) => PipelineConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(input) = input {
                pipeline_config.input = input;
            }
            if let Some(output) = output {
                pipeline_config.output = output;
            }
            pipeline_config.gzip_output |= gzip;
            if let Some(delimiter) = delimiter {
                pipeline_config.delimiter = delimiter;
            }

            let report = run(&pipeline_config).inspect_err(|e| {
                error!(error = %e, "Cleaning aborted, no output written");
            })?;
            print_pretty(&report);
            print_json(&report)?;
        }
        Commands::Load {
            input,
            output,
            table,
            chunk_size,
            delimiter,
        } => {
            let delimiter = ascii_delimiter(delimiter)?;
            let summary = write_load_script(&input, &output, &table, chunk_size, delimiter)
                .context("load aborted, no script written")?;
            info!(
                table = %summary.table,
                rows = summary.rows,
                output = %output.display(),
                "Replace-load script ready"
            );
        }
        Commands::Analyze {
            input,
            top_n,
            format,
            delimiter,
        } => {
            let table = load_cleaned(&input, ascii_delimiter(delimiter)?)?;
            let report = build_report(&table, top_n);
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                Format::Text => print!("{}", render_text(&report)),
            }
        }
        Commands::Dashboard {
            input,
            cities,
            categories,
            delimiter,
        } => {
            let table = load_cleaned(&input, ascii_delimiter(delimiter)?)?;
            let dashboard = build_dashboard(&table, &Filters { cities, categories });
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
        }
    }

    Ok(())
}

fn render_text(report: &EdaReport) -> String {
    [
        ("Top customers by revenue", &report.top_customers_by_revenue),
        ("Average order value by age group", &report.avg_order_value_by_age_group),
        ("Orders by day type", &report.orders_by_day_type),
        ("Monthly revenue", &report.monthly_revenue),
        ("Average profit by discount applied", &report.avg_profit_by_discount_applied),
        ("Revenue by city", &report.revenue_by_city),
        ("Average delivery time by city", &report.avg_delivery_time_by_city),
        ("Average rating by delivery performance", &report.avg_rating_by_delivery_performance),
        ("Top restaurants by rating", &report.top_restaurants_by_rating),
        ("Cancellation rate by restaurant", &report.cancellation_rate_by_restaurant),
        ("Orders by hour", &report.orders_by_hour),
        ("Payment modes", &report.payment_modes),
        ("Cancellation reasons", &report.cancellation_reasons),
    ]
    .iter()
    .map(|(title, groups)| format_groups(title, groups))
    .collect::<Vec<_>>()
    .join("\n")
}
