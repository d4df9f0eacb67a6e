use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{listing::DEFAULT_LISTING_URL, metadata::DEFAULT_METADATA_ENDPOINT};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fetch SDG indicator CSVs, apply value overrides, and write cleaned files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch, override, and write every configured dataset
    Run(RunArgs),
    /// Apply a dataset's overrides to a local CSV file
    Apply(ApplyArgs),
    /// List the indicator CSV urls linked from a repository folder page
    Discover(DiscoverArgs),
    /// Generate code lists from SDG disaggregation value endpoints
    Codelists(CodelistArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML file mapping dataset urls to override specifications
    #[arg(short, long, default_value = "overrides_dict.yaml")]
    pub config: PathBuf,
    /// Directory receiving the written CSV files
    #[arg(short, long = "out-dir", default_value = "out")]
    pub out_dir: PathBuf,
    /// Dataset url to process (repeatable; defaults to every configured url)
    #[arg(short = 'u', long = "url", action = clap::ArgAction::Append)]
    pub urls: Vec<String>,
    /// Folder listing page used to report datasets missing from the output
    #[arg(long = "listing-url")]
    pub listing_url: Option<String>,
    /// Also write a metadata document next to each dataset
    #[arg(long)]
    pub metadata: bool,
    /// Base JSON template the metadata documents are merged over
    #[arg(long = "base-info")]
    pub base_info: Option<PathBuf>,
    /// Metadata endpoint serving `<indicator>.json`
    #[arg(long = "metadata-endpoint", default_value = DEFAULT_METADATA_ENDPOINT)]
    pub metadata_endpoint: String,
    /// Character encoding of fetched CSV payloads (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Print the outcome table to stdout
    #[arg(long)]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Input CSV file to transform
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML file mapping dataset urls to override specifications
    #[arg(short, long, default_value = "overrides_dict.yaml")]
    pub config: PathBuf,
    /// Identifier whose override specification applies (defaults to the input path)
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Folder listing page to scan
    #[arg(long = "listing-url", default_value = DEFAULT_LISTING_URL)]
    pub listing_url: String,
}

#[derive(Debug, Args)]
pub struct CodelistArgs {
    /// Directory receiving the code-list CSV files
    #[arg(short, long = "out-dir", default_value = "codelists")]
    pub out_dir: PathBuf,
    /// Source in the form `name=url` (repeatable; defaults to sex and country)
    #[arg(short, long = "source", action = clap::ArgAction::Append)]
    pub sources: Vec<String>,
}
