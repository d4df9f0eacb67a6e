#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Indicator table with gaps in every non-`Value` column.
pub const SEX_AGE_CSV: &str = "Year,Sex,Age,Value\n\
2015,Male,16 to 24,1.5\n\
2015,Female,,2.5\n\
2016,T,25 to 34,\n\
2016,,All,4\n";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes an overrides file giving each identifier the column overrides
    /// for the [`SEX_AGE_CSV`] layout.
    pub fn write_overrides(&self, identifiers: &[&str]) -> PathBuf {
        self.write("overrides_dict.yaml", &overrides_yaml(identifiers))
    }
}

pub fn overrides_yaml(identifiers: &[&str]) -> String {
    let mut yaml = String::new();
    for identifier in identifiers {
        yaml.push_str(&format!("'{identifier}':\n"));
        yaml.push_str(
            "  fix_headers: false\n  standardise_cells: true\n  fill_gaps: true\n  \
             Year:\n    FILL_NA: 2015\n  \
             Sex:\n    Male: M\n    Female: F\n    FILL_NA: T\n  \
             Age:\n    FILL_NA: All\n",
        );
    }
    yaml
}
