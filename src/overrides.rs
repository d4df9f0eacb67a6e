//! Override engine: sentinel guard, cell standardisation, and gap filling.
//!
//! [`apply_overrides`] runs the enabled steps of an [`OverrideSpec`] in a fixed
//! order:
//!
//! 1. `fix_headers` is reserved and leaves the dataset untouched.
//! 2. `standardise_cells` coerces every non-`Value` cell to its string form
//!    (a missing cell becomes `"nan"`), swaps in the configured substitution,
//!    and pathifies the result.
//! 3. `fill_gaps` turns `"nan"` back into a gap and fills every gap with the
//!    column's `FILL_NA` value.
//!
//! Step 3 consumes the `"nan"` tokens step 2 produces. Each step computes
//! whole new columns from the previous ones; the `Value`/`value` column is
//! never rewritten.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::{
    config::{ColumnOverrides, FILL_NA, OverrideSpec},
    dataset::{Cell, Dataset, is_value_column},
    error::OverrideError,
    pathify::pathify,
};

/// Configuration-only tokens that must never appear as real cell values.
pub const SENTINELS: &[&str] = &[FILL_NA, "OldValue1", "OldValue2", "OldValue3", "to"];

const STRINGIFIED_MISSING: &str = "nan";

pub fn prevent_bad_replacement(dataset: &Dataset) -> Result<(), OverrideError> {
    match SENTINELS.iter().find(|sentinel| dataset.contains_value(sentinel)) {
        Some(sentinel) => Err(OverrideError::UnsafeReplacement {
            sentinel: (*sentinel).to_string(),
        }),
        None => Ok(()),
    }
}

/// Applies `spec` to `dataset`, consuming it.
///
/// The sentinel guard runs on the input and again on the transformed table;
/// a sentinel in either yields [`OverrideError::UnsafeReplacement`].
pub fn apply_overrides(dataset: Dataset, spec: &OverrideSpec) -> Result<Dataset, OverrideError> {
    prevent_bad_replacement(&dataset)?;
    validate_column_specs(&dataset, spec)?;
    warn_unused_entries(&dataset, spec);

    let mut dataset = dataset;
    if spec.standardise_cells {
        dataset = standardise_cell_values(dataset, spec)?;
    }
    if spec.fill_gaps {
        dataset = fill_configured_gaps(dataset, spec)?;
    }
    // A label such as "TO" slugifies into a sentinel.
    prevent_bad_replacement(&dataset)?;
    Ok(dataset)
}

fn validate_column_specs(dataset: &Dataset, spec: &OverrideSpec) -> Result<(), OverrideError> {
    if !spec.standardise_cells && !spec.fill_gaps {
        return Ok(());
    }
    for name in dataset.headers().filter(|name| !is_value_column(name)) {
        let overrides = column_spec(spec, name)?;
        if spec.fill_gaps && overrides.fill_na.is_none() {
            return Err(OverrideError::MissingFillValue {
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

fn warn_unused_entries(dataset: &Dataset, spec: &OverrideSpec) {
    for name in spec.columns.keys() {
        if dataset.column_index(name).is_none() {
            warn!("Override entry for column '{name}' matches no column in the dataset");
        }
    }
}

fn column_spec<'a>(
    spec: &'a OverrideSpec,
    column: &str,
) -> Result<&'a ColumnOverrides, OverrideError> {
    spec.column(column).ok_or_else(|| OverrideError::MissingColumnSpec {
        column: column.to_string(),
    })
}

/// Rewrites every non-`Value` column through its substitution map and
/// [`pathify`].
///
/// Substitution is a single pass over the original values: a replacement is
/// never itself looked up again.
pub fn standardise_cell_values(
    mut dataset: Dataset,
    spec: &OverrideSpec,
) -> Result<Dataset, OverrideError> {
    let mut updates = Vec::new();
    for (idx, column) in dataset.columns().iter().enumerate() {
        if is_value_column(&column.name) {
            continue;
        }
        let overrides = column_spec(spec, &column.name)?;
        let cells = standardise_column(&column.cells, overrides);
        debug!(
            "Standardised column '{}' with {} substitution(s)",
            column.name,
            overrides.replacements.len()
        );
        updates.push((idx, cells));
    }
    for (idx, cells) in updates {
        dataset.replace_cells(idx, cells);
    }
    Ok(dataset)
}

pub fn standardise_column(cells: &[Cell], overrides: &ColumnOverrides) -> Vec<Cell> {
    cells
        .iter()
        .map(|cell| {
            let text = cell.as_deref().unwrap_or(STRINGIFIED_MISSING);
            Some(standardise_value(text, overrides))
        })
        .collect()
}

fn standardise_value(text: &str, overrides: &ColumnOverrides) -> String {
    let replaced = overrides.replacement_for(text).unwrap_or(text);
    pathify(replaced).into_owned()
}

fn fill_configured_gaps(
    mut dataset: Dataset,
    spec: &OverrideSpec,
) -> Result<Dataset, OverrideError> {
    let mut fills = BTreeMap::new();
    let mut updates = Vec::new();
    for (idx, column) in dataset.columns().iter().enumerate() {
        if is_value_column(&column.name) {
            continue;
        }
        let overrides = column_spec(spec, &column.name)?;
        let raw_fill = overrides
            .fill_na
            .as_deref()
            .ok_or_else(|| OverrideError::MissingFillValue {
                column: column.name.clone(),
            })?;
        // Keep the column in one normal form when it was standardised.
        let fill = if spec.standardise_cells {
            standardise_value(raw_fill, overrides)
        } else {
            raw_fill.to_string()
        };
        fills.insert(column.name.clone(), fill);
        updates.push((idx, restore_missing(&column.cells)));
    }
    for (idx, cells) in updates {
        dataset.replace_cells(idx, cells);
    }
    Ok(fill_gaps(dataset, &fills))
}

fn restore_missing(cells: &[Cell]) -> Vec<Cell> {
    cells
        .iter()
        .map(|cell| cell.clone().filter(|text| text != STRINGIFIED_MISSING))
        .collect()
}

/// Fills every gap in each named column with that column's value, verbatim.
///
/// Columns absent from `fills` and the `Value`/`value` column are left as they
/// are; entries naming columns the dataset lacks are ignored.
pub fn fill_gaps(mut dataset: Dataset, fills: &BTreeMap<String, String>) -> Dataset {
    let updates = dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| !is_value_column(&column.name))
        .filter_map(|(idx, column)| {
            let fill = fills.get(&column.name)?;
            if column.missing_count() == 0 {
                return None;
            }
            let cells = column
                .cells
                .iter()
                .map(|cell| Some(cell.clone().unwrap_or_else(|| fill.clone())))
                .collect::<Vec<_>>();
            Some((idx, cells))
        })
        .collect::<Vec<_>>();
    for (idx, cells) in updates {
        dataset.replace_cells(idx, cells);
    }
    dataset
}
