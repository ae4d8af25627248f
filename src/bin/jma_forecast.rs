//! Command-line front end: run an ingestion pass or print a region's forecast.

use argh::FromArgs;
use jma_forecast::{
    error_chain, resolve_database_path, CatalogSource, ForecastStore, IngestConfig,
    IngestionOrchestrator, RegionCode,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(FromArgs)]
/// Ingest JMA regional forecasts into SQLite and query them.
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Ingest(IngestArgs),
    Show(ShowArgs),
}

#[derive(FromArgs)]
/// Rebuild the forecast tables from the upstream service.
#[argh(subcommand, name = "ingest")]
struct IngestArgs {
    /// JSON config file; flags below override its values
    #[argh(option)]
    config: Option<PathBuf>,

    /// read the region catalog from a local area.json
    #[argh(option)]
    catalog_file: Option<PathBuf>,

    /// fetch the region catalog from this URL
    #[argh(option)]
    catalog_url: Option<String>,

    /// SQLite database file
    #[argh(option)]
    database: Option<PathBuf>,

    /// forecast endpoint prefix
    #[argh(option)]
    base_url: Option<String>,

    /// maximum concurrent region fetches
    #[argh(option)]
    concurrency: Option<usize>,
}

#[derive(FromArgs)]
/// Print the stored, date-ordered forecast of one region.
#[argh(subcommand, name = "show")]
struct ShowArgs {
    /// region code, e.g. 130000
    #[argh(positional)]
    region: String,

    /// SQLite database file
    #[argh(option)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();
    let result = match args.command {
        Command::Ingest(args) => ingest(args).await,
        Command::Show(args) => show(args).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", error_chain(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

async fn ingest(args: IngestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => IngestConfig::from_json_file(path)?,
        None => IngestConfig::default(),
    };
    if let Some(path) = args.catalog_file {
        config.catalog = CatalogSource::File(path);
    } else if let Some(url) = args.catalog_url {
        config.catalog = CatalogSource::Url(url);
    }
    if let Some(path) = args.database {
        config.database_path = Some(path);
    }
    if let Some(url) = args.base_url {
        config.forecast_base_url = url;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Received Ctrl+C, cancelling ingestion...");
                cancel.cancel();
            }
        }
    });

    let mut orchestrator = IngestionOrchestrator::new(config)?;
    let summary = orchestrator.run(cancel).await?;
    println!("{summary}");
    Ok(())
}

async fn show(args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = IngestConfig::builder()
        .maybe_database_path(args.database)
        .build();
    let path = resolve_database_path(&config).await?;
    let region = RegionCode::new(args.region);
    let rows = tokio::task::spawn_blocking(move || {
        ForecastStore::open(&path).and_then(|store| store.query_forecast(&region))
    })
    .await??;

    let cell = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
    println!("{:<12} {:>6} {:>6} {:>6}", "date", "code", "min", "max");
    for row in rows {
        println!(
            "{:<12} {:>6} {:>6} {:>6}",
            row.forecast_date,
            row.weather_code.as_deref().unwrap_or("-"),
            cell(row.temp_min),
            cell(row.temp_max)
        );
    }
    Ok(())
}
