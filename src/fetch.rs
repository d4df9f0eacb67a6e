use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use reqwest::blocking::Client;

use crate::{dataset::Dataset, error::FetchError};

/// Phrase the upstream repository serves in place of a CSV for indicators
/// that have not been published yet.
pub const NO_DATA_MARKER: &str = "no data for this indicator yet";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub trait DatasetSource {
    fn fetch(&self, identifier: &str) -> Result<Option<Dataset>, FetchError>;
}

pub fn is_remote(identifier: &str) -> bool {
    let lowered = identifier.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

pub fn local_path(identifier: &str) -> PathBuf {
    PathBuf::from(identifier.strip_prefix("file://").unwrap_or(identifier))
}

pub struct UrlSource {
    client: Client,
    encoding: &'static Encoding,
}

impl UrlSource {
    pub fn new(encoding: &'static Encoding) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("sdg-data-filler/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to default HTTP client: {err}");
                Client::new()
            });
        Self { client, encoding }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn fetch_bytes(&self, identifier: &str) -> Result<Vec<u8>, FetchError> {
        if !is_remote(identifier) {
            return read_local(&local_path(identifier));
        }
        debug!("GET {identifier}");
        let http_error = |source| FetchError::Http {
            url: identifier.to_string(),
            source,
        };
        let response = self.client.get(identifier).send().map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: identifier.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().map_err(http_error)?.to_vec())
    }

    pub fn fetch_text(&self, identifier: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(identifier)?;
        let (text, _, _) = self.encoding.decode(&bytes);
        Ok(text.into_owned())
    }
}

impl Default for UrlSource {
    fn default() -> Self {
        Self::new(UTF_8)
    }
}

impl DatasetSource for UrlSource {
    fn fetch(&self, identifier: &str) -> Result<Option<Dataset>, FetchError> {
        let bytes = self.fetch_bytes(identifier)?;
        parse_payload(&bytes, self.encoding, identifier)
    }
}

fn read_local(path: &Path) -> Result<Vec<u8>, FetchError> {
    fs::read(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_payload(
    bytes: &[u8],
    encoding: &'static Encoding,
    identifier: &str,
) -> Result<Option<Dataset>, FetchError> {
    if has_no_data_marker(bytes, encoding) {
        debug!("{identifier} reports no data for this indicator");
        return Ok(None);
    }
    let dataset = Dataset::from_csv_bytes(bytes, encoding, identifier)?;
    if dataset.is_empty() {
        return Ok(None);
    }
    Ok(Some(dataset))
}

fn has_no_data_marker(bytes: &[u8], encoding: &'static Encoding) -> bool {
    let (text, _, _) = encoding.decode(bytes);
    text.contains(NO_DATA_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_detection_is_scheme_based() {
        assert!(is_remote("https://raw.githubusercontent.com/a.csv"));
        assert!(is_remote("HTTP://example.org/a.csv"));
        assert!(!is_remote("file:///tmp/a.csv"));
        assert!(!is_remote("data/a.csv"));
        assert_eq!(local_path("file:///tmp/a.csv"), PathBuf::from("/tmp/a.csv"));
    }

    #[test]
    fn no_data_page_is_not_parsed() {
        let page = b"<html><body><p>There is no data for this indicator yet.</p></body></html>";
        assert!(parse_payload(page, UTF_8, "page").unwrap().is_none());
    }

    #[test]
    fn header_only_payload_counts_as_empty() {
        assert!(parse_payload(b"Year,Value\n", UTF_8, "x").unwrap().is_none());
        assert!(parse_payload(b"", UTF_8, "x").unwrap().is_none());
    }

    #[test]
    fn csv_payload_is_parsed() {
        let dataset = parse_payload(b"Year,Value\n2015,1\n", UTF_8, "x")
            .unwrap()
            .unwrap();
        assert_eq!(dataset.row_count(), 1);
    }
}
