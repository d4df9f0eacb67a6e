use std::{collections::BTreeMap, fs, path::Path, sync::OnceLock, time::Duration};

use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use log::{debug, warn};
use regex::Regex;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{config::OverrideSpec, error::MetadataError};

pub const DEFAULT_METADATA_ENDPOINT: &str = "https://sdgdata.gov.uk/sdg-data/en/meta";
pub const LICENSE: &str = "http://www.nationalarchives.gov.uk/doc/open-government-licence/version/3/";
pub const CREATOR: &str = "https://www.ons.gov.uk";
pub const PUBLISHER: &str = "https://www.ons.gov.uk";

const DESCRIPTION_FIELDS: &[&str] = &[
    "computation_definitions",
    "other_info",
    "computation_calculations",
];
const RELEASE_DATE_PREFIX: &str = "source_release_date_";
const RELEASE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Extracts the indicator token, the text between the last `_` and the
/// trailing `.csv` of a dataset identifier.
///
/// ```
/// use sdg_data_filler::metadata::indicator_from_identifier;
///
/// assert_eq!(
///     indicator_from_identifier("https://example.org/data/indicator_11-7-1.csv"),
///     Some("11-7-1")
/// );
/// assert_eq!(indicator_from_identifier("https://example.org/data/listing"), None);
/// ```
pub fn indicator_from_identifier(identifier: &str) -> Option<&str> {
    let stem = identifier.strip_suffix(".csv")?;
    let (_, indicator) = stem.rsplit_once('_')?;
    (!indicator.is_empty() && !indicator.contains('/')).then_some(indicator)
}

pub trait MetadataSource {
    fn fetch_metadata(&self, indicator: &str) -> Result<Map<String, Value>, MetadataError>;
}

pub struct HttpMetadataSource {
    client: Client,
    endpoint: String,
}

impl HttpMetadataSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, indicator: &str) -> String {
        format!("{}/{indicator}.json", self.endpoint)
    }
}

impl Default for HttpMetadataSource {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_ENDPOINT)
    }
}

impl MetadataSource for HttpMetadataSource {
    fn fetch_metadata(&self, indicator: &str) -> Result<Map<String, Value>, MetadataError> {
        let url = self.url_for(indicator);
        debug!("GET {url}");
        let http_error = |source| MetadataError::Http {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::MetadataFetch {
                url,
                status: status.as_u16(),
            });
        }
        match response.json::<Value>().map_err(http_error)? {
            Value::Object(map) => Ok(map),
            _ => Err(MetadataError::NotAnObject { url }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    #[serde(rename = "dataURL")]
    pub data_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_page: Option<String>,
    pub published: String,
    pub issued: String,
    pub modified: String,
    pub keywords: Vec<String>,
    pub license: String,
    pub creator: String,
    pub publisher: String,
    pub transform: Transform,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transform {
    pub columns: BTreeMap<String, Value>,
}

pub struct MetadataAssembler {
    template: Map<String, Value>,
    published: String,
}

impl MetadataAssembler {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            template: Map::new(),
            published: format!("{}T00:00", run_date.format("%Y-%m-%d")),
        }
    }

    pub fn with_template(mut self, template: Map<String, Value>) -> Self {
        self.template = template;
        self
    }

    pub fn load_template(self, path: &Path) -> Result<Self, MetadataError> {
        let raw = fs::read_to_string(path).map_err(|source| MetadataError::Template {
            path: path.to_path_buf(),
            source,
        })?;
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(template) => Ok(self.with_template(template)),
            _ => Err(MetadataError::NotAnObject {
                url: path.display().to_string(),
            }),
        }
    }

    pub fn describe(
        &self,
        identifier: &str,
        metadata: &Map<String, Value>,
        spec: &OverrideSpec,
    ) -> DatasetMetadata {
        let title = text_field(metadata, "indicator_available")
            .or_else(|| text_field(metadata, "indicator_name"))
            .map(str::to_string);
        let description = DESCRIPTION_FIELDS
            .iter()
            .filter_map(|field| text_field(metadata, field))
            .join("\n");
        let keywords = text_field(metadata, "data_keywords")
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|keyword| !keyword.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let issued = release_date(metadata, &format!("{RELEASE_DATE_PREFIX}1"))
            .unwrap_or_else(|| self.published.clone());
        let modified = latest_release_key(metadata)
            .and_then(|key| release_date(metadata, &key))
            .unwrap_or_else(|| self.published.clone());

        DatasetMetadata {
            data_url: identifier.to_string(),
            title,
            description,
            landing_page: text_field(metadata, "source_url_1").map(str::to_string),
            published: self.published.clone(),
            issued,
            modified,
            keywords,
            license: LICENSE.to_string(),
            creator: CREATOR.to_string(),
            publisher: PUBLISHER.to_string(),
            transform: Transform {
                columns: spec.mapping.clone(),
            },
        }
    }

    pub fn assemble(
        &self,
        identifier: &str,
        metadata: &Map<String, Value>,
        spec: &OverrideSpec,
    ) -> Result<Value, MetadataError> {
        let described = serde_json::to_value(self.describe(identifier, metadata, spec))?;
        let mut document = Value::Object(self.template.clone());
        merge(&mut document, described);
        Ok(document)
    }
}

fn text_field<'a>(metadata: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

fn release_date(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    let raw = text_field(metadata, key)?;
    match NaiveDate::parse_from_str(raw.trim(), RELEASE_DATE_FORMAT) {
        Ok(date) => {
            let midnight: NaiveDateTime = date.and_hms_opt(0, 0, 0)?;
            Some(midnight.format("%Y-%m-%dT%H:%M:%S").to_string())
        }
        Err(err) => {
            warn!("Ignoring {key} '{raw}': {err}");
            None
        }
    }
}

fn latest_release_key(metadata: &Map<String, Value>) -> Option<String> {
    static NUMBERED: OnceLock<Regex> = OnceLock::new();
    let numbered = NUMBERED.get_or_init(|| Regex::new(r"^.+_(\d+)$").expect("valid pattern"));
    metadata
        .keys()
        .filter(|key| key.starts_with(RELEASE_DATE_PREFIX))
        .filter_map(|key| numbered.captures(key)?.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .map(|number| format!("{RELEASE_DATE_PREFIX}{number}"))
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
