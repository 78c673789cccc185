use crate::{
    commands::{Commands, WatermarkCommand},
    error::CliError,
};
use clap::Parser;
use connectors::file::csv::{sink::CsvSink, source::CsvSource};
use engine_config::{
    settings::load_config,
    state::{StateBackend, open_store},
};
use engine_core::state::StateStore;
use engine_processing::incremental::{late_data::detect_late_data, watermark::WatermarkManager};
use model::core::data_type::DataType;
use std::{collections::BTreeMap, path::PathBuf, str::FromStr, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "medallion",
    version = "0.1.0",
    about = "Bronze to silver curation: CDC resolution, history and watermarks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Curate {
            config,
            dry_run,
            report,
        } => curate(&config, dry_run, report.as_deref()).await?,
        Commands::Validate { config } => {
            let validated = load_config(&config)?;
            info!(
                source = %validated.source.path.display(),
                incremental = validated.is_incremental(),
                "Config is valid"
            );
            println!("{validated:#?}");
        }
        Commands::Watermark {
            state_dir,
            backend,
            command,
        } => {
            let backend = StateBackend::from_str(&backend).map_err(CliError::InvalidArgument)?;
            let dir = match state_dir {
                Some(dir) => PathBuf::from(dir),
                None => default_state_dir()?,
            };
            let manager = WatermarkManager::new(open_store(backend, &dir)?);
            watermark(&manager, command).await?;
        }
        Commands::Late {
            input,
            ts_column,
            watermark,
            ts_type,
        } => {
            let mut types = BTreeMap::new();
            if let Some(ts_type) = ts_type {
                let data_type = DataType::from_str(&ts_type).map_err(CliError::InvalidArgument)?;
                types.insert(ts_column.clone(), data_type);
            }
            let table = CsvSource::new(&input).with_column_types(types).read()?;
            let report = detect_late_data(&table, &ts_column, watermark.as_deref())?;
            output::print_report(&report)?;
        }
    }

    Ok(())
}

async fn curate(config: &str, dry_run: bool, report_path: Option<&str>) -> Result<(), CliError> {
    let config = load_config(config)?;

    let table = CsvSource::new(&config.source.path)
        .with_column_types(config.source.column_types.clone())
        .read_named(&config.source.name)?;

    let state_dir = match &config.state.dir {
        Some(dir) => dir.clone(),
        None => default_state_dir()?,
    };
    let store: Arc<dyn StateStore> = open_store(config.state.backend, &state_dir)?;
    let out = config.curator(store, dry_run).run(&table).await?;

    match &config.output_path {
        Some(path) if !dry_run => {
            CsvSink::new(path).write(&out.table)?;
        }
        Some(path) => info!(path = %path.display(), "Dry run, output not written"),
        None => info!("No output path configured, curated rows not persisted"),
    }

    match report_path {
        Some(path) => output::write_report(&out.report, path).await?,
        None => output::print_report(&out.report)?,
    }
    Ok(())
}

async fn watermark(manager: &WatermarkManager, command: WatermarkCommand) -> Result<(), CliError> {
    match command {
        WatermarkCommand::Get { system, entity } => {
            let wm = manager.get_watermark(&system, &entity).await?;
            output::print_watermark(wm.as_ref());
        }
        WatermarkCommand::Set {
            system,
            entity,
            value,
        } => {
            let wm = manager.save_watermark(&system, &entity, &value).await?;
            output::print_watermark(Some(&wm));
        }
        WatermarkCommand::Delete { system, entity } => {
            if manager.delete_watermark(&system, &entity).await? {
                println!("Deleted watermark for {system}/{entity}");
            } else {
                println!("No watermark stored for {system}/{entity}");
            }
        }
        WatermarkCommand::List { json } => {
            let watermarks = manager.list_watermarks().await?;
            if json {
                output::print_report(&watermarks)?;
            } else {
                output::print_watermark_table(&watermarks);
            }
        }
        WatermarkCommand::Age { system, entity } => {
            match manager.get_watermark_age(&system, &entity).await? {
                Some(hours) => println!("{hours:.2} hours"),
                None => println!("No watermark stored for {system}/{entity}"),
            }
        }
    }
    Ok(())
}

fn default_state_dir() -> Result<PathBuf, CliError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?;
    Ok(home.join(".medallion/state"))
}
