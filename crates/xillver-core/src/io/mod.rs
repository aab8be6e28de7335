//! Boundary to the on-disk table container.
//!
//! A table file has three named sections: `PARAMETERS` (one row per axis),
//! `ENERGIES` (one row per energy bin) and `SPECTRA` (one row per grid
//! corner). The loader only relies on the two traits below, so any container
//! that can address rows by index plugs in.
//!
//! The shipped backend is the packed container read by
//! [`PackedTableSource`]. Files under the historical variant names
//! (`xillver-a-Ec5.fits`, ...) must hold that container; FITS tables have to
//! be repacked before use and are rejected as a format error otherwise.

mod packed;

pub use packed::{EnergyRow, PackedTableDocument, PackedTableSource, SpectraLayout, TableHeader};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One row of the `PARAMETERS` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParameterRow {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "NUMBVALS")]
    pub num_values: usize,
    #[serde(rename = "VALUE")]
    pub values: Vec<f32>,
}

impl ParameterRow {
    pub fn new(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            num_values: values.len(),
            values,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableFileError {
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed reading '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode the header of '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("extension {section} is missing")]
    MissingSection { section: &'static str },
    #[error("extension SPECTRA needs {expected} bytes, file holds {actual}")]
    Truncated { expected: u64, actual: u64 },
    #[error("row {row} is out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("row {row} holds {actual} values, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Opens table files by path.
pub trait TableSource {
    fn open(&self, path: &Path) -> Result<Box<dyn TableFile + '_>, TableFileError>;

    /// Probe whether `path` can be opened, without keeping it open.
    fn exists(&self, path: &Path) -> bool {
        self.open(path).is_ok()
    }
}

/// An open table file. Dropping the handle closes it.
pub trait TableFile {
    fn parameters(&mut self) -> Result<Vec<ParameterRow>, TableFileError>;

    /// `(lo, hi)` edges of every energy bin.
    fn energies(&mut self) -> Result<Vec<(f32, f32)>, TableFileError>;

    fn spectrum_count(&mut self) -> Result<usize, TableFileError>;

    /// Read the spectrum stored at zero-based `row` into `out`.
    fn read_spectrum(&mut self, row: usize, out: &mut [f32]) -> Result<(), TableFileError>;
}
