//! Packed table container: one JSON header line with the `PARAMETERS`,
//! `ENERGIES` and `SPECTRA` layout, followed by the spectra as fixed-width
//! rows of little-endian `f32`. Reading a spectrum seeks to its row and
//! decodes only that row.

use super::{ParameterRow, TableFile, TableFileError, TableSource};
use crate::common::constants::{SECTION_ENERGIES, SECTION_PARAMETERS, SECTION_SPECTRA};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const VALUE_BYTES: usize = std::mem::size_of::<f32>();
/// Upper bound on the header line; anything longer is not a packed table.
const MAX_HEADER_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnergyRow {
    #[serde(rename = "ENERG_LO")]
    pub lo: f32,
    #[serde(rename = "ENERG_HI")]
    pub hi: f32,
}

/// Shape of the binary `SPECTRA` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpectraLayout {
    #[serde(rename = "NAXIS2")]
    pub rows: usize,
    #[serde(rename = "NBINS")]
    pub bins: usize,
}

impl SpectraLayout {
    fn row_bytes(self) -> usize {
        self.bins * VALUE_BYTES
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct TableHeader {
    #[serde(rename = "PARAMETERS", default)]
    pub parameters: Option<Vec<ParameterRow>>,
    #[serde(rename = "ENERGIES", default)]
    pub energies: Option<Vec<EnergyRow>>,
    #[serde(rename = "SPECTRA", default)]
    pub spectra: Option<SpectraLayout>,
}

/// In-memory table used to write packed files.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackedTableDocument {
    pub parameters: Option<Vec<ParameterRow>>,
    pub energies: Option<Vec<EnergyRow>>,
    /// `None` writes a header without a `SPECTRA` layout.
    pub spectra: Option<Vec<Vec<f32>>>,
}

impl PackedTableDocument {
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let layout = match &self.spectra {
            Some(rows) => {
                let bins = rows.first().map_or(0, Vec::len);
                if rows.iter().any(|row| row.len() != bins) {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "every spectrum row needs the same number of bins",
                    ));
                }
                Some(SpectraLayout {
                    rows: rows.len(),
                    bins,
                })
            }
            None => None,
        };

        let header = TableHeader {
            parameters: self.parameters.clone(),
            energies: self.energies.clone(),
            spectra: layout,
        };
        let mut encoded = serde_json::to_vec(&header).map_err(std::io::Error::other)?;
        encoded.push(b'\n');
        for row in self.spectra.iter().flatten() {
            for value in row {
                encoded.extend_from_slice(&value.to_le_bytes());
            }
        }

        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        file.flush()
    }
}

/// Opens packed table files. `open` decodes the header line only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedTableSource;

impl TableSource for PackedTableSource {
    fn open(&self, path: &Path) -> Result<Box<dyn TableFile + '_>, TableFileError> {
        Ok(Box::new(PackedTableFile::open(path)?))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[derive(Debug)]
pub(crate) struct PackedTableFile {
    path: PathBuf,
    reader: BufReader<File>,
    header: TableHeader,
    data_start: u64,
    data_len: u64,
    bytes_read: usize,
    row_buffer: Vec<u8>,
}

impl PackedTableFile {
    pub(crate) fn open(path: &Path) -> Result<Self, TableFileError> {
        let file = File::open(path).map_err(|source| TableFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let total_len = fs::metadata(path)
            .map_err(|source| read_error(path, source))?
            .len();

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        reader
            .by_ref()
            .take(MAX_HEADER_BYTES)
            .read_until(b'\n', &mut line)
            .map_err(|source| read_error(path, source))?;
        let header = serde_json::from_slice(&line).map_err(|source| TableFileError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let data_start = line.len() as u64;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            header,
            data_start,
            data_len: total_len.saturating_sub(data_start),
            bytes_read: 0,
            row_buffer: Vec::new(),
        })
    }

    /// Spectrum bytes decoded since the file was opened.
    pub(crate) fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    fn layout(&self) -> Result<SpectraLayout, TableFileError> {
        self.header.spectra.ok_or(TableFileError::MissingSection {
            section: SECTION_SPECTRA,
        })
    }
}

impl Drop for PackedTableFile {
    fn drop(&mut self) {
        tracing::trace!(
            path = %self.path.display(),
            bytes_read = self.bytes_read(),
            "closed table file"
        );
    }
}

fn read_error(path: &Path, source: std::io::Error) -> TableFileError {
    TableFileError::Read {
        path: path.to_path_buf(),
        source,
    }
}

impl TableFile for PackedTableFile {
    fn parameters(&mut self) -> Result<Vec<ParameterRow>, TableFileError> {
        self.header
            .parameters
            .clone()
            .ok_or(TableFileError::MissingSection {
                section: SECTION_PARAMETERS,
            })
    }

    fn energies(&mut self) -> Result<Vec<(f32, f32)>, TableFileError> {
        let rows = self
            .header
            .energies
            .as_deref()
            .ok_or(TableFileError::MissingSection {
                section: SECTION_ENERGIES,
            })?;
        Ok(rows.iter().map(|row| (row.lo, row.hi)).collect())
    }

    fn spectrum_count(&mut self) -> Result<usize, TableFileError> {
        let layout = self.layout()?;
        let expected = (layout.rows as u64).saturating_mul(layout.row_bytes() as u64);
        if self.data_len < expected {
            return Err(TableFileError::Truncated {
                expected,
                actual: self.data_len,
            });
        }
        Ok(layout.rows)
    }

    fn read_spectrum(&mut self, row: usize, out: &mut [f32]) -> Result<(), TableFileError> {
        let layout = self.layout()?;
        if row >= layout.rows {
            return Err(TableFileError::RowOutOfRange {
                row,
                rows: layout.rows,
            });
        }
        if layout.bins != out.len() {
            return Err(TableFileError::RowLength {
                row,
                expected: out.len(),
                actual: layout.bins,
            });
        }

        let row_bytes = layout.row_bytes();
        let offset = self.data_start + (row as u64) * (row_bytes as u64);
        self.row_buffer.resize(row_bytes, 0);
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|source| read_error(&self.path, source))?;
        self.reader
            .read_exact(&mut self.row_buffer)
            .map_err(|source| read_error(&self.path, source))?;
        self.bytes_read += row_bytes;

        for (value, bytes) in out.iter_mut().zip(self.row_buffer.chunks_exact(VALUE_BYTES)) {
            *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EnergyRow, PackedTableDocument, PackedTableFile, PackedTableSource};
    use crate::io::{ParameterRow, TableFile, TableFileError, TableSource};
    use std::fs::{self, OpenOptions};
    use tempfile::TempDir;

    fn small_document(rows: usize) -> PackedTableDocument {
        PackedTableDocument {
            parameters: Some(vec![ParameterRow::new("Incl", vec![20.0, 40.0])]),
            energies: Some(vec![
                EnergyRow { lo: 0.1, hi: 0.2 },
                EnergyRow { lo: 0.2, hi: 0.4 },
            ]),
            spectra: Some(
                (0..rows)
                    .map(|row| vec![2.0 * row as f32 + 1.0, 2.0 * row as f32 + 2.0])
                    .collect(),
            ),
        }
    }

    #[test]
    fn rows_are_addressed_by_zero_based_index() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("table.fits");
        small_document(2).write(&path).expect("document should be written");

        let mut file = PackedTableSource.open(&path).expect("table should open");
        assert_eq!(file.spectrum_count().expect("count"), 2);
        assert_eq!(file.energies().expect("energies"), vec![(0.1, 0.2), (0.2, 0.4)]);

        let mut out = [0.0_f32; 2];
        file.read_spectrum(1, &mut out).expect("row should read");
        assert_eq!(out, [3.0, 4.0]);
        file.read_spectrum(0, &mut out).expect("row should read");
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn single_row_reads_decode_only_that_row() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("table.fits");
        small_document(1000).write(&path).expect("document should be written");

        let mut file = PackedTableFile::open(&path).expect("table should open");
        assert_eq!(file.bytes_read(), 0, "opening reads the header only");

        let mut out = [0.0_f32; 2];
        file.read_spectrum(731, &mut out).expect("row should read");
        assert_eq!(out, [1463.0, 1464.0]);
        assert_eq!(file.bytes_read(), 2 * std::mem::size_of::<f32>());
    }

    #[test]
    fn truncated_spectra_block_is_detected() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("table.fits");
        small_document(4).write(&path).expect("document should be written");
        let full_len = fs::metadata(&path).expect("metadata").len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_len(full_len - 8))
            .expect("file should truncate");

        let mut file = PackedTableSource.open(&path).expect("header is intact");
        assert!(matches!(
            file.spectrum_count(),
            Err(TableFileError::Truncated { expected: 32, actual: 24 })
        ));

        let mut out = [0.0_f32; 2];
        file.read_spectrum(2, &mut out).expect("rows before the cut still read");
        assert_eq!(out, [5.0, 6.0]);
        assert!(matches!(
            file.read_spectrum(3, &mut out),
            Err(TableFileError::Read { .. })
        ));
    }

    #[test]
    fn reading_past_the_last_row_fails() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("table.fits");
        small_document(2).write(&path).expect("document should be written");

        let mut file = PackedTableSource.open(&path).expect("table should open");
        let mut out = [0.0_f32; 2];
        let error = file.read_spectrum(2, &mut out).expect_err("row 2 does not exist");
        assert!(matches!(error, TableFileError::RowOutOfRange { row: 2, rows: 2 }));

        let mut short = [0.0_f32; 3];
        let error = file.read_spectrum(0, &mut short).expect_err("length mismatch");
        assert!(matches!(error, TableFileError::RowLength { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn missing_sections_and_files_are_reported() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("table.fits");
        PackedTableDocument::default()
            .write(&path)
            .expect("document should be written");

        let mut file = PackedTableSource.open(&path).expect("table should open");
        assert!(matches!(
            file.parameters(),
            Err(TableFileError::MissingSection { section: "PARAMETERS" })
        ));
        assert!(matches!(
            file.spectrum_count(),
            Err(TableFileError::MissingSection { section: "SPECTRA" })
        ));

        let absent = temp.path().join("absent.fits");
        assert!(!PackedTableSource.exists(&absent));
        assert!(matches!(
            PackedTableSource.open(&absent),
            Err(TableFileError::Open { .. })
        ));
    }

    #[test]
    fn foreign_files_fail_to_decode() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("table.fits");
        fs::write(&path, "SIMPLE  =                    T\n").expect("file should be written");

        assert!(PackedTableSource.exists(&path));
        assert!(matches!(
            PackedTableSource.open(&path),
            Err(TableFileError::Decode { .. })
        ));
    }
}
