pub mod cli;
pub mod config;
pub mod import;
pub mod io_utils;
pub mod mapping;
pub mod schema;
pub mod setup;
pub mod store;
pub mod synonyms;
pub mod table;

use std::{env, sync::OnceLock, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, CsvOptions, ImportArgs, SetupArgs},
    config::DatabaseConfig,
    import::CsvImporter,
    store::ColumnInfo,
    synonyms::SynonymTable,
    table::TextTable,
};

pub use crate::import::{ImportError, ImportReport, import_csv};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("intel_import", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = DatabaseConfig::new(&cli.database)
        .with_busy_timeout(Duration::from_secs(cli.busy_timeout));
    match cli.command {
        Commands::Init => handle_init(&config),
        Commands::Import(args) => handle_import(&config, &args),
        Commands::Mapping(args) => handle_mapping(&config, &args),
        Commands::Setup(args) => handle_setup(&config, &args),
        Commands::Summary => handle_summary(&config),
    }
}

fn build_importer(options: &CsvOptions) -> Result<CsvImporter> {
    let encoding = io_utils::resolve_encoding(options.input_encoding.as_deref())?;
    let synonyms = match &options.synonyms {
        Some(path) => SynonymTable::load(path)?,
        None => SynonymTable::default(),
    };
    debug!(
        "Header synonyms: {}",
        synonyms
            .entries()
            .iter()
            .map(|(alias, target)| format!("{alias}->{target}"))
            .join(", ")
    );
    Ok(CsvImporter::new()
        .with_synonyms(synonyms)
        .with_delimiter(options.delimiter)
        .with_encoding(encoding))
}

fn handle_init(config: &DatabaseConfig) -> Result<()> {
    let mut conn = config.open()?;
    schema::create_all_tables(&mut conn)?;
    info!("Database ready at {:?}", config.path);
    Ok(())
}

fn handle_import(config: &DatabaseConfig, args: &ImportArgs) -> Result<()> {
    let importer = build_importer(&args.csv)?;
    let mut conn = config.open()?;
    // The error travels up to `main`, which prints it once.
    let report = importer
        .try_import(&mut conn, &args.input, &args.table)
        .with_context(|| format!("Importing {:?} into {}", args.input, args.table))?;
    println!("{report}");
    Ok(())
}

fn handle_mapping(config: &DatabaseConfig, args: &ImportArgs) -> Result<()> {
    let importer = build_importer(&args.csv)?;
    let conn = config.open()?;
    let plan = importer
        .plan(&conn, &args.input, &args.table)
        .with_context(|| format!("Resolving mapping for {:?} into {}", args.input, args.table))?;

    let mut table = TextTable::new(["source", "column", "type", "match"]);
    for column in plan.mapping.columns() {
        let declared = plan
            .schema
            .column(&column.target)
            .map(ColumnInfo::describe)
            .unwrap_or_default();
        table.push_row([
            column.source.clone(),
            column.target.clone(),
            declared,
            column.kind.to_string(),
        ]);
    }
    for header in plan.mapping.dropped() {
        table.push_row([
            header.clone(),
            String::new(),
            String::new(),
            "dropped".to_string(),
        ]);
    }
    table.print();
    info!(
        "{} of {} header(s) map onto {}; {} row(s) would be offered",
        plan.mapping.columns().len(),
        plan.contents.headers.len(),
        args.table,
        plan.contents.row_count()
    );
    Ok(())
}

fn handle_setup(config: &DatabaseConfig, args: &SetupArgs) -> Result<()> {
    let importer = build_importer(&args.csv)?;
    let mut conn = config.open()?;
    let report = setup::setup_database(&mut conn, &args.data_dir, &importer)?;
    for outcome in &report.outcomes {
        println!("{}", outcome.status_line());
    }
    println!();
    setup::summary_table(&report.row_counts).print();
    Ok(())
}

fn handle_summary(config: &DatabaseConfig) -> Result<()> {
    let conn = config.open()?;
    let tables = schema::DOMAIN_TABLES
        .iter()
        .map(|d| d.table)
        .collect::<Vec<_>>();
    let counts = setup::count_rows(&conn, &tables)?;
    setup::summary_table(&counts).print();
    Ok(())
}
