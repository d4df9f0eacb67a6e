use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{error, info};
use serde_json::Value;

use crate::{dataset::Dataset, io_utils};

pub fn write_csv(dataset: &Dataset, out_dir: &Path, filename: &str) -> bool {
    let full_path = out_dir.join(filename);
    match write_replacing(out_dir, &full_path, |output| write_dataset(dataset, output)) {
        Ok(()) => {
            info!(
                "Wrote {} row(s) across {} column(s) to {:?}",
                dataset.row_count(),
                dataset.columns().len(),
                full_path
            );
            true
        }
        Err(err) => {
            error!("Error encountered when attempting csv write to {full_path:?}: {err:#}");
            false
        }
    }
}

pub fn write_dataset<W: Write>(dataset: &Dataset, output: W) -> Result<()> {
    let mut writer = io_utils::csv_writer(output, io_utils::DEFAULT_CSV_DELIMITER);
    writer
        .write_record(dataset.headers())
        .context("Writing output headers")?;
    for idx in 0..dataset.row_count() {
        writer
            .write_record(dataset.row(idx))
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

pub fn write_json(document: &Value, out_dir: &Path, filename: &str) -> bool {
    let full_path = out_dir.join(filename);
    let result = write_replacing(out_dir, &full_path, |output| {
        serde_json::to_writer_pretty(&mut *output, document).context("Writing metadata JSON")?;
        output.flush().context("Flushing metadata file")
    });
    match result {
        Ok(()) => {
            info!("Wrote metadata to {full_path:?}");
            true
        }
        Err(err) => {
            error!("Error encountered when attempting metadata write to {full_path:?}: {err:#}");
            false
        }
    }
}

fn partial_path(full_path: &Path) -> PathBuf {
    let name = full_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    full_path.with_file_name(format!(".{name}.partial"))
}

/// Runs `write` against a partial file in `out_dir`, then renames it over
/// `full_path`. The partial file is removed when any step fails.
fn write_replacing<F>(out_dir: &Path, full_path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Creating output directory {out_dir:?}"))?;
    let partial = partial_path(full_path);
    let result = File::create(&partial)
        .with_context(|| format!("Creating output file {partial:?}"))
        .and_then(|file| {
            let mut output = BufWriter::new(file);
            write(&mut output)?;
            output.flush().context("Flushing output file")
        })
        .and_then(|()| {
            fs::rename(&partial, full_path)
                .with_context(|| format!("Moving output into place at {full_path:?}"))
        });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}
