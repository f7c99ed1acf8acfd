//! Importers for tabular and surface files that produce [`NamedSeries`].
//!
//! Every importer returns an [`ImportReport`]: unusable files give
//! `success == false` plus a message, bad rows are skipped and counted.
//!
//! [`NamedSeries`]: crate::series::NamedSeries
//! [`ImportReport`]: crate::series::ImportReport

pub mod csv;
pub mod parquet;
pub mod surface;
pub mod well_path;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

pub use self::csv::{import_csv, import_csv_str, CsvLayout, CsvOptions};
pub use self::parquet::{export_parquet, import_parquet};
pub use self::surface::{import_surface, read_irap_ascii, read_irap_binary, Surface};
pub use self::well_path::{import_well_path, read_well_path, WellPath};

use crate::series::ImportReport;

/// Open a file, decompressing `.gz` transparently.
pub(crate) fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("open input {}", path.display()))?;
    if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    let mut text = String::new();
    open_input(path)?
        .read_to_string(&mut text)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(text)
}

/// Fold an importer result into a report.
pub(crate) fn report(result: Result<ImportReport>) -> ImportReport {
    result.unwrap_or_else(|err| ImportReport::failed(format!("{err:#}")))
}

/// Pick an importer from the file extension.
pub fn import_file(path: impl AsRef<Path>) -> ImportReport {
    let path = path.as_ref();
    let name = path.to_string_lossy().to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let ext = Path::new(name).extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "parquet" => import_parquet(path),
        "gri" | "irap" | "irapbin" | "surf" => import_surface(path),
        "w" | "rmswell" | "well" => import_well_path(path),
        _ => import_csv(path, &CsvOptions::default()),
    }
}
