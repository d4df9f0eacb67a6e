use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Reading overrides file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing overrides file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Dataset identifier must be a non-empty string")]
    InvalidIdentifier,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("Value '{sentinel}' has been found in the dataset; it is reserved for override configuration")]
    UnsafeReplacement { sentinel: String },
    #[error("Column '{column}' has no override entry")]
    MissingColumnSpec { column: String },
    #[error("Column '{column}' has no FILL_NA value")]
    MissingFillValue { column: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("Reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing CSV from {identifier}: {source}")]
    Csv {
        identifier: String,
        #[source]
        source: csv::Error,
    },
    #[error("Decoding {identifier} as {encoding}")]
    Decode {
        identifier: String,
        encoding: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Cannot find metadata at url \"{url}\" (status {status})")]
    MetadataFetch { url: String, status: u16 },
    #[error("Requesting metadata from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Metadata from {url} is not a JSON object")]
    NotAnObject { url: String },
    #[error("Reading metadata template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing metadata JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot derive an indicator from '{0}'")]
    NoIndicator(String),
}
