//! Flat text dumps of intermediate spectra, written only when
//! `RELXILL_WRITE_OUTFILES` is set.

use crate::common::config::TableConfig;
use crate::domain::ResultSpectrum;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    #[error("failed writing file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("'{name}' needs {expected} x values for {values} values, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        values: usize,
        actual: usize,
    },
    #[error("spectrum has no inclination bin {index}")]
    MissingInclination { index: usize },
}

/// C-style `%e`: six mantissa digits and a signed two-digit exponent.
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{value:.6e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => formatted,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutfileWriter {
    enabled: bool,
    output_dir: PathBuf,
}

impl OutfileWriter {
    pub fn new(enabled: bool, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &TableConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self::new(config.write_outfiles, output_dir)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Three columns `lo hi value`; `edges` holds one more entry than
    /// `values`. Returns the written path, or `None` when disabled.
    pub fn write_binned_data(
        &self,
        name: &str,
        edges: &[f64],
        values: &[f64],
    ) -> Result<Option<PathBuf>, DiagnosticsError> {
        if !self.enabled {
            return Ok(None);
        }
        if edges.len() != values.len() + 1 {
            return Err(DiagnosticsError::LengthMismatch {
                name: name.to_string(),
                expected: values.len() + 1,
                values: values.len(),
                actual: edges.len(),
            });
        }

        let mut content = String::new();
        for (index, value) in values.iter().enumerate() {
            let _ = writeln!(
                content,
                " {} \t {} \t {} ",
                format_scientific(edges[index]),
                format_scientific(edges[index + 1]),
                format_scientific(*value)
            );
        }
        self.write(name, &content).map(Some)
    }

    /// Two columns `x value`.
    pub fn write_data(
        &self,
        name: &str,
        x: &[f64],
        values: &[f64],
    ) -> Result<Option<PathBuf>, DiagnosticsError> {
        if !self.enabled {
            return Ok(None);
        }
        if x.len() != values.len() {
            return Err(DiagnosticsError::LengthMismatch {
                name: name.to_string(),
                expected: values.len(),
                values: values.len(),
                actual: x.len(),
            });
        }

        let mut content = String::new();
        for (x, value) in x.iter().zip(values) {
            let _ = writeln!(
                content,
                " {} \t {} ",
                format_scientific(*x),
                format_scientific(*value)
            );
        }
        self.write(name, &content).map(Some)
    }

    pub fn save_spectrum(
        &self,
        name: &str,
        spectrum: &ResultSpectrum,
        incl_index: usize,
    ) -> Result<Option<PathBuf>, DiagnosticsError> {
        let flux = spectrum
            .flux_for(incl_index)
            .ok_or(DiagnosticsError::MissingInclination { index: incl_index })?;
        self.write_binned_data(name, &spectrum.energy, flux)
    }

    fn write(&self, name: &str, content: &str) -> Result<PathBuf, DiagnosticsError> {
        let path = self.output_dir.join(name);
        write_file(&path, content)?;
        tracing::debug!(path = %path.display(), "wrote diagnostic file");
        Ok(path)
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), DiagnosticsError> {
    fs::write(path, content).map_err(|source| DiagnosticsError::Write {
        path: path.to_path_buf(),
        source,
    })
}
