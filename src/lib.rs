pub mod cli;
pub mod codelist;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod io_utils;
pub mod listing;
pub mod metadata;
pub mod overrides;
pub mod pathify;
pub mod pipeline;
pub mod report;
pub mod writer;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands},
    codelist::CodelistSource,
    config::OverridesConfig,
    fetch::{DatasetSource, UrlSource},
    metadata::{HttpMetadataSource, MetadataAssembler},
    pipeline::{MetadataStage, Pipeline, RunReport},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sdg_data_filler", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Apply(args) => handle_apply(&args),
        Commands::Discover(args) => handle_discover(&args),
        Commands::Codelists(args) => handle_codelists(&args),
    }
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let config = OverridesConfig::load(&args.config)
        .with_context(|| format!("Loading overrides from {:?}", args.config))?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source = UrlSource::new(encoding);

    let identifiers = if args.urls.is_empty() {
        config.identifiers().map(str::to_string).collect::<Vec<_>>()
    } else {
        args.urls.clone()
    };
    info!(
        "Processing {} dataset(s) into {:?}",
        identifiers.len(),
        args.out_dir
    );

    let metadata_source = HttpMetadataSource::new(args.metadata_endpoint.as_str());
    let mut pipeline = Pipeline::new(&config, &source, &args.out_dir);
    if args.metadata {
        let mut assembler = MetadataAssembler::new(chrono::Local::now().date_naive());
        if let Some(path) = &args.base_info {
            assembler = assembler
                .load_template(path)
                .with_context(|| format!("Loading metadata template {path:?}"))?;
        }
        pipeline = pipeline.with_metadata(MetadataStage {
            source: &metadata_source,
            assembler,
        });
    }

    let run_report = pipeline.run(&identifiers);
    let results = run_report.finish();
    if let Some(listing_url) = &args.listing_url {
        report_missing(&source, listing_url, &results);
    }
    if args.table {
        print!("{}", report::render_report(&run_report));
    }
    fail_on_integrity_errors(&run_report)
}

fn report_missing(
    source: &UrlSource,
    listing_url: &str,
    results: &std::collections::BTreeMap<String, bool>,
) {
    match source.fetch_text(listing_url) {
        Ok(html) => {
            let listed = listing::find_csv_urls(&html);
            let missing = listed
                .iter()
                .filter(|url| !results.contains_key(&pipeline::dataset_filename(url)))
                .count();
            info!("Number of CSVs missing from output = {missing}");
        }
        Err(err) => warn!("Could not read folder listing {listing_url}: {err}"),
    }
}

fn fail_on_integrity_errors(report: &RunReport) -> Result<()> {
    let failures = report
        .integrity_failures()
        .map(|(filename, err)| format!("{filename}: {err}"))
        .collect::<Vec<_>>();
    if !failures.is_empty() {
        bail!(
            "{} dataset(s) failed integrity checks:\n  {}",
            failures.len(),
            failures.join("\n  ")
        );
    }
    Ok(())
}

fn handle_apply(args: &cli::ApplyArgs) -> Result<()> {
    let config = OverridesConfig::load(&args.config)
        .with_context(|| format!("Loading overrides from {:?}", args.config))?;
    let key = args
        .key
        .clone()
        .unwrap_or_else(|| args.input.display().to_string());
    let Some(spec) = config.spec_for(&key)? else {
        bail!("No override specification for '{key}' in {:?}", args.config);
    };

    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source = UrlSource::new(encoding);
    let dataset = source
        .fetch(&args.input.display().to_string())
        .with_context(|| format!("Reading {:?}", args.input))?
        .with_context(|| format!("{:?} holds no data", args.input))?;
    debug!(
        "Applying overrides for '{key}' to {} row(s)",
        dataset.row_count()
    );
    let transformed = overrides::apply_overrides(dataset, spec)
        .with_context(|| format!("Applying overrides for '{key}'"))?;

    if let Some(parent) = args
        .output
        .as_deref()
        .filter(|path| !io_utils::is_dash(path))
        .and_then(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {parent:?}"))?;
    }
    let output = io_utils::open_output(args.output.as_deref())?;
    writer::write_dataset(&transformed, output)?;
    info!(
        "Applied overrides to {} row(s) -> {}",
        transformed.row_count(),
        args.output
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "stdout".to_string())
    );
    Ok(())
}

fn handle_discover(args: &cli::DiscoverArgs) -> Result<()> {
    let source = UrlSource::default();
    let html = source
        .fetch_text(&args.listing_url)
        .with_context(|| format!("Fetching folder listing {}", args.listing_url))?;
    let urls = listing::find_csv_urls(&html);
    for url in &urls {
        println!("{url}");
    }
    info!("Found {} indicator CSV url(s)", urls.len());
    Ok(())
}

fn handle_codelists(args: &cli::CodelistArgs) -> Result<()> {
    let sources = if args.sources.is_empty() {
        CodelistSource::defaults()
    } else {
        args.sources
            .iter()
            .map(|spec| CodelistSource::parse(spec))
            .collect::<Result<Vec<_>>>()?
    };
    let failed = codelist::generate(&sources, &UrlSource::default(), &args.out_dir);
    if !failed.is_empty() {
        bail!("Failed to generate code list(s): {}", failed.join(", "));
    }
    Ok(())
}
