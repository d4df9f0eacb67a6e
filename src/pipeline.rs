use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use log::{error, info, warn};
use regex::Regex;

use crate::{
    config::{OverrideSpec, OverridesConfig},
    error::{MetadataError, OverrideError},
    fetch::DatasetSource,
    metadata::{MetadataAssembler, MetadataSource, indicator_from_identifier},
    overrides::apply_overrides,
    pathify::pathify,
    writer,
};

/// Output filename for a dataset identifier.
///
/// The trailing `indicator_<a>-<b>-<c>.csv` is used when present, then a
/// last path segment ending in `.csv`, then the pathified identifier with
/// `.csv` appended.
pub fn dataset_filename(identifier: &str) -> String {
    static INDICATOR_FILE: OnceLock<Regex> = OnceLock::new();
    let pattern = INDICATOR_FILE.get_or_init(|| {
        Regex::new(r"(indicator_\d{1,2}-\d{1,2}-\d+\.csv)$").expect("valid filename pattern")
    });
    if let Some(found) = pattern.find(identifier) {
        return found.as_str().to_string();
    }
    let segment = identifier
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    if segment.len() > ".csv".len() && segment.ends_with(".csv") {
        return segment.to_string();
    }
    format!("{}.csv", pathify(identifier))
}

pub fn metadata_filename(filename: &str) -> String {
    format!("{filename}-metadata.json")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetStatus {
    Written,
    NotConfigured,
    NoData,
    FetchFailed(String),
    Integrity(OverrideError),
    WriteFailed,
}

impl DatasetStatus {
    pub fn written(&self) -> bool {
        matches!(self, DatasetStatus::Written)
    }

    pub fn describe(&self) -> String {
        match self {
            DatasetStatus::Written => "written".to_string(),
            DatasetStatus::NotConfigured => "no override configuration".to_string(),
            DatasetStatus::NoData => "no data available".to_string(),
            DatasetStatus::FetchFailed(reason) => format!("fetch failed: {reason}"),
            DatasetStatus::Integrity(err) => format!("integrity error: {err}"),
            DatasetStatus::WriteFailed => "write failed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStatus {
    Written,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOutcome {
    pub identifier: String,
    pub status: DatasetStatus,
    pub metadata: Option<MetadataStatus>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: BTreeMap<String, DatasetOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, filename: String, outcome: DatasetOutcome) {
        self.outcomes.insert(filename, outcome);
    }

    pub fn outcomes(&self) -> &BTreeMap<String, DatasetOutcome> {
        &self.outcomes
    }

    pub fn outcome(&self, filename: &str) -> Option<&DatasetOutcome> {
        self.outcomes.get(filename)
    }

    pub fn results(&self) -> BTreeMap<String, bool> {
        self.outcomes
            .iter()
            .map(|(filename, outcome)| (filename.clone(), outcome.status.written()))
            .collect()
    }

    pub fn written_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|outcome| outcome.status.written())
            .count()
    }

    pub fn integrity_failures(&self) -> impl Iterator<Item = (&str, &OverrideError)> {
        self.outcomes
            .iter()
            .filter_map(|(filename, outcome)| match &outcome.status {
                DatasetStatus::Integrity(err) => Some((filename.as_str(), err)),
                _ => None,
            })
    }

    pub fn has_integrity_failures(&self) -> bool {
        self.integrity_failures().next().is_some()
    }

    pub fn finish(&self) -> BTreeMap<String, bool> {
        let results = self.results();
        info!(
            "Wrote {} of {} dataset(s)",
            self.written_count(),
            results.len()
        );
        results
    }
}

pub struct MetadataStage<'a> {
    pub source: &'a dyn MetadataSource,
    pub assembler: MetadataAssembler,
}

pub struct Pipeline<'a> {
    config: &'a OverridesConfig,
    source: &'a dyn DatasetSource,
    out_dir: PathBuf,
    metadata: Option<MetadataStage<'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a OverridesConfig, source: &'a dyn DatasetSource, out_dir: &Path) -> Self {
        Self {
            config,
            source,
            out_dir: out_dir.to_path_buf(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, stage: MetadataStage<'a>) -> Self {
        self.metadata = Some(stage);
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn run<I, S>(&self, identifiers: I) -> RunReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = RunReport::new();
        for identifier in identifiers {
            self.process(identifier.as_ref(), &mut report);
        }
        report
    }

    pub fn process(&self, identifier: &str, report: &mut RunReport) {
        let filename = dataset_filename(identifier);
        let status = self.process_dataset(identifier, &filename);
        let metadata = match (&status, &self.metadata) {
            (DatasetStatus::Written, Some(stage)) => {
                Some(self.enrich(stage, identifier, &filename))
            }
            _ => None,
        };
        report.record(
            filename,
            DatasetOutcome {
                identifier: identifier.to_string(),
                status,
                metadata,
            },
        );
    }

    fn process_dataset(&self, identifier: &str, filename: &str) -> DatasetStatus {
        let spec = match self.config.spec_for(identifier) {
            Ok(Some(spec)) => spec,
            Ok(None) => return DatasetStatus::NotConfigured,
            Err(err) => {
                warn!("Skipping dataset: {err}");
                return DatasetStatus::NotConfigured;
            }
        };
        let dataset = match self.source.fetch(identifier) {
            Ok(Some(dataset)) => dataset,
            Ok(None) => {
                warn!("No data available for {identifier}; skipping");
                return DatasetStatus::NoData;
            }
            Err(err) => {
                error!("{err}");
                return DatasetStatus::FetchFailed(err.to_string());
            }
        };
        let transformed = match apply_overrides(dataset, spec) {
            Ok(transformed) => transformed,
            Err(err) => {
                error!("Refusing to write {filename}: {err}");
                return DatasetStatus::Integrity(err);
            }
        };
        if writer::write_csv(&transformed, &self.out_dir, filename) {
            DatasetStatus::Written
        } else {
            DatasetStatus::WriteFailed
        }
    }

    fn enrich(
        &self,
        stage: &MetadataStage<'_>,
        identifier: &str,
        filename: &str,
    ) -> MetadataStatus {
        match self.build_metadata(stage, identifier) {
            Ok(document) => {
                if writer::write_json(&document, &self.out_dir, &metadata_filename(filename)) {
                    MetadataStatus::Written
                } else {
                    MetadataStatus::Failed("metadata write failed".to_string())
                }
            }
            Err(err) => {
                error!("Skipping metadata for {filename}: {err}");
                MetadataStatus::Failed(err.to_string())
            }
        }
    }

    fn build_metadata(
        &self,
        stage: &MetadataStage<'_>,
        identifier: &str,
    ) -> Result<serde_json::Value, MetadataError> {
        let indicator = indicator_from_identifier(identifier)
            .ok_or_else(|| MetadataError::NoIndicator(identifier.to_string()))?;
        let spec = self.config.spec_for(identifier).ok().flatten();
        let metadata = stage.source.fetch_metadata(indicator)?;
        let default_spec = OverrideSpec::default();
        stage
            .assembler
            .assemble(identifier, &metadata, spec.unwrap_or(&default_spec))
    }
}
