use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use log::{error, info};

use crate::{
    dataset::{Column, Dataset},
    fetch::UrlSource,
    pathify::pathify,
    writer,
};

pub const ROOT_LABEL: &str = "All";

pub const HEADERS: [&str; 4] = ["Label", "Notation", "Parent Notation", "Sort Priority"];

pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    (
        "sex.csv",
        "https://sdgdata.gov.uk/sdg-data/values--disaggregation--sex.csv",
    ),
    (
        "country.csv",
        "https://sdgdata.gov.uk/sdg-data/values--disaggregation--country.csv",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodelistSource {
    pub output_name: String,
    pub url: String,
}

impl CodelistSource {
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, url) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Code-list source '{spec}' must look like name=url"))?;
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            bail!("Code-list source '{spec}' must name both an output file and a url");
        }
        Ok(Self {
            output_name: name.to_string(),
            url: url.to_string(),
        })
    }

    pub fn defaults() -> Vec<Self> {
        DEFAULT_SOURCES
            .iter()
            .map(|(name, url)| Self {
                output_name: name.to_string(),
                url: url.to_string(),
            })
            .collect()
    }
}

/// Builds a code list from the `Value` column of a values listing.
///
/// Values containing `*` are dropped and the root `All` concept is prepended.
/// `Notation` is the pathified label, every entry but the root has `all` as
/// its parent, and `Sort Priority` is the 0-based position.
pub fn build_codelist(values: &Dataset) -> Result<Dataset> {
    let column = values
        .column("Value")
        .ok_or_else(|| anyhow!("Values listing has no 'Value' column"))?;
    let labels = std::iter::once(ROOT_LABEL.to_string())
        .chain(
            column
                .cells
                .iter()
                .flatten()
                .filter(|value| !value.contains('*'))
                .cloned(),
        )
        .collect::<Vec<_>>();
    let root_notation = pathify(ROOT_LABEL).into_owned();

    let notation = labels
        .iter()
        .map(|label| Some(pathify(label).into_owned()))
        .collect();
    let parents = labels
        .iter()
        .map(|label| (label != ROOT_LABEL).then(|| root_notation.clone()))
        .collect();
    let priorities = (0..labels.len()).map(|idx| Some(idx.to_string())).collect();
    let label_cells = labels.into_iter().map(Some).collect();

    Ok(Dataset::from_columns(vec![
        Column::new(HEADERS[0], label_cells),
        Column::new(HEADERS[1], notation),
        Column::new(HEADERS[2], parents),
        Column::new(HEADERS[3], priorities),
    ]))
}

pub fn generate(sources: &[CodelistSource], fetcher: &UrlSource, out_dir: &Path) -> Vec<String> {
    let mut failed = Vec::new();
    for source in sources {
        match generate_one(source, fetcher, out_dir) {
            Ok(()) => info!("Code list {} generated from {}", source.output_name, source.url),
            Err(err) => {
                error!("Code list {} failed: {err:#}", source.output_name);
                failed.push(source.output_name.clone());
            }
        }
    }
    failed
}

fn generate_one(source: &CodelistSource, fetcher: &UrlSource, out_dir: &Path) -> Result<()> {
    let bytes = fetcher
        .fetch_bytes(&source.url)
        .with_context(|| format!("Fetching {}", source.url))?;
    let values = Dataset::from_csv_bytes(&bytes, fetcher.encoding(), &source.url)?;
    let codelist = build_codelist(&values)?;
    if !writer::write_csv(&codelist, out_dir, &source.output_name) {
        bail!("Writing {:?}", out_dir.join(&source.output_name));
    }
    Ok(())
}
