use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loglens::analytics::{
    aggregate, enrich_countries, session_summary, with_geo_database, write_report, TrendModel,
};
use loglens::config::Config;
use loglens::logs::{GeneratorConfig, LogGenerator};
use loglens::storage::{write_csv, LogStore};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loglens-cli")]
#[command(about = "Synthetic web-server log generation and analysis", long_about = None)]
struct Cli {
    /// Log table path (overrides LOG_FILE)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic records and append them to the log table
    Generate {
        /// Number of records (defaults to GENERATE_BATCH_SIZE)
        #[arg(short, long)]
        count: Option<usize>,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Resolve countries, aggregate and write a text report
    Report {
        /// GeoLite2 City database (defaults to GEOIP_CITY_DB_PATH)
        #[arg(long)]
        geoip_db: Option<PathBuf>,
        #[arg(short, long, default_value = "report.txt")]
        output: PathBuf,
    },
    /// Fit the hour-of-day trend and predict a duration
    Predict {
        /// Hour of day, 0-23
        #[arg(long, default_value_t = 12, allow_negative_numbers = true)]
        hour: i64,
    },
    /// Write the table (optionally trimmed) as CSV
    Export {
        /// Keep only the first N records
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = LogStore::new(cli.log_file.unwrap_or(config.storage.log_file));

    match cli.command {
        Commands::Generate { count, seed } => {
            let count = count.unwrap_or(config.generator.batch_size);
            if count == 0 {
                anyhow::bail!("--count must be positive");
            }
            let mut generator = LogGenerator::new(GeneratorConfig {
                seed: seed.or(config.generator.seed),
                ..Default::default()
            });
            let written = store.append(&generator.generate(count))?;
            println!(
                "✓ Appended {} records to {}",
                written,
                store.path().display()
            );
        }
        Commands::Report { geoip_db, output } => {
            let mut table = store.load_or_empty()?.table;
            if table.is_empty() {
                println!("No data available.");
                return Ok(());
            }

            match geoip_db.or(config.geoip.city_db_path) {
                Some(path) => {
                    let stats = with_geo_database(&path, |geoip| enrich_countries(&mut table, geoip))?;
                    println!(
                        "Resolved {} countries ({} unknown)",
                        stats.resolved, stats.unknown
                    );
                }
                None => println!("⚠ No GeoIP database configured; keeping stored countries"),
            }

            let result = aggregate(&table);
            write_report(&output, &result, &session_summary(&table))?;
            println!("✓ Wrote report to {}", output.display());
        }
        Commands::Predict { hour } => {
            let table = store.load_or_empty()?.table;
            if table.is_empty() {
                println!("No data available for prediction.");
                return Ok(());
            }

            let model = TrendModel::fit_with_seed(&table, config.prediction.split_seed)?;
            if let Some(mse) = model.mse {
                println!("Mean Squared Error: {mse}");
            }
            let prediction = model.predict(hour)?;
            println!(
                "Predicted duration of visits at {}:00: {} seconds",
                hour, prediction as i64
            );
        }
        Commands::Export { limit, output } => {
            let loaded = store.load()?;
            let view = match limit {
                Some(n) => loaded.table.head(n),
                None => loaded.table,
            };
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_csv(&view, file)?;
                    println!("✓ Exported {} records to {}", view.len(), path.display());
                }
                None => write_csv(&view, io::stdout().lock())?,
            }
        }
    }

    Ok(())
}
