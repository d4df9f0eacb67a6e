use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use serde::{Deserialize, Deserializer, de};
use serde_yaml::Value;

use crate::error::ConfigError;

/// Reserved key holding a column's gap-fill value.
pub const FILL_NA: &str = "FILL_NA";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverrideSpec {
    /// Reserved; header renaming is not defined.
    #[serde(default)]
    pub fix_headers: bool,
    #[serde(default = "enabled")]
    pub standardise_cells: bool,
    #[serde(default = "enabled")]
    pub fill_gaps: bool,
    #[serde(default)]
    pub mapping: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub columns: BTreeMap<String, ColumnOverrides>,
}

fn enabled() -> bool {
    true
}

impl OverrideSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnOverrides> {
        self.columns.get(name)
    }
}

impl Default for OverrideSpec {
    fn default() -> Self {
        Self {
            fix_headers: false,
            standardise_cells: true,
            fill_gaps: true,
            mapping: BTreeMap::new(),
            columns: BTreeMap::new(),
        }
    }
}

/// Substitutions for one column, keyed by the observed (non-standard) value.
///
/// The `FILL_NA` entry is split out into [`ColumnOverrides::fill_na`] so it
/// can never act as a substitution key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOverrides {
    pub replacements: BTreeMap<String, String>,
    pub fill_na: Option<String>,
}

impl ColumnOverrides {
    pub fn new<I, K, V>(replacements: I, fill_na: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            replacements: replacements
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
            fill_na: fill_na.map(str::to_string),
        }
    }

    pub fn replacement_for(&self, value: &str) -> Option<&str> {
        self.replacements.get(value).map(String::as_str)
    }
}

impl<'de> Deserialize<'de> for ColumnOverrides {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_yaml::Mapping::deserialize(deserializer)?;
        let mut overrides = ColumnOverrides::default();
        for (key, value) in raw {
            let key = scalar_to_string(&key).ok_or_else(|| {
                de::Error::custom(format!("override keys must be scalars, found {key:?}"))
            })?;
            let value = scalar_to_string(&value).ok_or_else(|| {
                de::Error::custom(format!(
                    "override for '{key}' must be a scalar, found {value:?}"
                ))
            })?;
            if key == FILL_NA {
                // An empty fill would write the gap back out.
                overrides.fill_na = (!value.trim().is_empty()).then_some(value);
            } else {
                overrides.replacements.insert(key, value);
            }
        }
        Ok(overrides)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct OverridesConfig {
    specs: BTreeMap<String, OverrideSpec>,
}

impl OverridesConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn insert(&mut self, identifier: impl Into<String>, spec: OverrideSpec) {
        self.specs.insert(identifier.into(), spec);
    }

    pub fn spec_for(&self, identifier: &str) -> Result<Option<&OverrideSpec>, ConfigError> {
        if identifier.trim().is_empty() {
            return Err(ConfigError::InvalidIdentifier);
        }
        let spec = self.specs.get(identifier);
        if spec.is_none() {
            warn!("{identifier} not in overrides configuration");
        }
        Ok(spec)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
https://example.org/data/indicator_11-7-1.csv:
  fix_headers: false
  standardise_cells: true
  fill_gaps: true
  mapping:
    Sex:
      dimension: sex
  Sex:
    Male: M
    Female: F
    FILL_NA: T
  Year:
    2015: "2015/16"
    FILL_NA: 2015
https://example.org/data/indicator_16-9-1.csv:
  Age:
    FILL_NA: All
"#;

    #[test]
    fn parses_toggles_columns_and_fill_values() {
        let config = OverridesConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.len(), 2);
        let spec = config
            .spec_for("https://example.org/data/indicator_11-7-1.csv")
            .unwrap()
            .unwrap();
        assert!(!spec.fix_headers);
        assert!(spec.standardise_cells && spec.fill_gaps);
        assert_eq!(spec.columns.len(), 2);
        assert!(spec.mapping.contains_key("Sex"));

        let sex = spec.column("Sex").unwrap();
        assert_eq!(sex.replacement_for("Male"), Some("M"));
        assert_eq!(sex.replacement_for(FILL_NA), None);
        assert_eq!(sex.fill_na.as_deref(), Some("T"));

        let year = spec.column("Year").unwrap();
        assert_eq!(year.replacement_for("2015"), Some("2015/16"));
        assert_eq!(year.fill_na.as_deref(), Some("2015"));
    }

    #[test]
    fn toggles_default_when_omitted() {
        let config = OverridesConfig::from_yaml_str(SAMPLE).unwrap();
        let spec = config
            .spec_for("https://example.org/data/indicator_16-9-1.csv")
            .unwrap()
            .unwrap();
        assert!(!spec.fix_headers);
        assert!(spec.standardise_cells);
        assert!(spec.fill_gaps);
        assert!(spec.mapping.is_empty());
    }

    #[test]
    fn unknown_identifier_is_absent_not_an_error() {
        let config = OverridesConfig::from_yaml_str(SAMPLE).unwrap();
        assert!(config.spec_for("https://example.org/other.csv").unwrap().is_none());
        assert!(matches!(
            config.spec_for("  "),
            Err(ConfigError::InvalidIdentifier)
        ));
    }

    #[test]
    fn blank_fill_values_count_as_absent() {
        let yaml = "u:\n  Age:\n    young: Young\n    FILL_NA: ~\n  Sex:\n    FILL_NA: ''\n";
        let config = OverridesConfig::from_yaml_str(yaml).unwrap();
        let spec = config.spec_for("u").unwrap().unwrap();
        assert_eq!(spec.column("Age").unwrap().fill_na, None);
        assert_eq!(spec.column("Age").unwrap().replacement_for("young"), Some("Young"));
        assert_eq!(spec.column("Sex").unwrap().fill_na, None);
    }

    #[test]
    fn nested_override_values_are_rejected() {
        let yaml = "u:\n  Sex:\n    Male: [M, m]\n";
        assert!(matches!(
            OverridesConfig::from_yaml_str(yaml),
            Err(ConfigError::Parse(_))
        ));
    }
}
