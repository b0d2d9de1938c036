//! Accepted views, their ordering and their JSON artifacts.

mod record;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use record::ViewRecord;

use crate::time;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate view name {0}")]
    DuplicateName(String),
}

/// Ordering key for a record's `ti`.
///
/// Strictly parsed timestamps compare chronologically through a canonical
/// rendering. Anything else falls back to its raw text, which only sorts
/// correctly by accident; such records are reported.
pub fn sort_key(ti: &str) -> String {
    match time::parse_strict(ti) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        None => ti.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<ViewRecord>,
    names: HashSet<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ViewRecord) -> Result<(), CatalogError> {
        if !self.names.insert(record.name.clone()) {
            return Err(CatalogError::DuplicateName(record.name));
        }
        self.records.push(record);
        Ok(())
    }

    /// Most recently accepted record.
    pub fn last(&self) -> Option<&ViewRecord> {
        self.records.last()
    }

    /// Records in ascending sample-time order. Ties keep insertion order.
    pub fn into_sorted(self) -> Vec<ViewRecord> {
        let mut keyed: Vec<(String, ViewRecord)> = self
            .records
            .into_iter()
            .map(|r| {
                if time::parse_strict(&r.sample_time).is_none() {
                    log::warn!(
                        "{}: timestamp '{}' sorted lexicographically",
                        r.name,
                        r.sample_time
                    );
                }
                (sort_key(&r.sample_time), r)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, r)| r).collect()
    }

    /// Sort and write the whole catalog as one compact JSON array.
    pub fn write(self, path: &Path) -> Result<usize, CatalogError> {
        let records = self.into_sorted();
        write_json(path, &records)?;
        Ok(records.len())
    }
}

/// Write a single view next to its label as `<label stem>.json`.
pub fn write_sidecar(view: &ViewRecord, label_path: &Path) -> Result<PathBuf, CatalogError> {
    let path = label_path.with_extension("json");
    write_json(&path, view)?;
    Ok(path)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
