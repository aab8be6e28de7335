//! Lazily initialized per-variant tables.
//!
//! The catalog is an explicit context object: every query takes it by
//! `&mut`, so the check-absent / load / store sequence for both the tables and
//! their spectra has a single writer. Share it across threads behind a mutex.

use crate::common::config::TableConfig;
use crate::common::constants::{
    SECTION_ENERGIES, SECTION_PARAMETERS, SECTION_SPECTRA, TABLE_DOWNLOAD_URL,
};
use crate::domain::{ResultSpectrum, TableParams, TableVariant, XillverError, XillverResult};
use crate::io::{PackedTableSource, TableFile, TableFileError, TableSource};
use crate::table::Table;
use std::path::{Path, PathBuf};

const VARIANT_COUNT: usize = TableVariant::ALL.len();

pub struct TableCatalog<S = PackedTableSource> {
    source: S,
    config: TableConfig,
    tables: [Option<Table>; VARIANT_COUNT],
    metadata_loads: usize,
}

impl TableCatalog<PackedTableSource> {
    /// Catalog over packed table files located through the environment.
    pub fn from_env() -> Self {
        Self::new(PackedTableSource, TableConfig::from_env())
    }
}

impl<S: TableSource> TableCatalog<S> {
    pub fn new(source: S, config: TableConfig) -> Self {
        Self {
            source,
            config,
            tables: std::array::from_fn(|_| None),
            metadata_loads: 0,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn table_path(&self, variant: TableVariant) -> PathBuf {
        self.config.table_path(variant)
    }

    /// Whether the backing file of `variant` can be opened. Never loads it.
    pub fn table_exists(&self, variant: TableVariant) -> bool {
        self.source.exists(&self.table_path(variant))
    }

    pub fn cached_table(&self, variant: TableVariant) -> Option<&Table> {
        self.tables[variant.slot()].as_ref()
    }

    /// Number of times table metadata has been parsed since construction.
    pub fn metadata_loads(&self) -> usize {
        self.metadata_loads
    }

    /// The table for `variant`, parsing its metadata on first use only.
    pub fn get_table(&mut self, variant: TableVariant) -> XillverResult<&mut Table> {
        self.source_and_table(variant).map(|(_, table)| table)
    }

    pub fn evaluate(&mut self, params: &TableParams) -> XillverResult<ResultSpectrum> {
        crate::query::evaluate(self, params)
    }

    /// Drop every cached table. The next query re-reads metadata from disk,
    /// which also picks up a changed table directory.
    pub fn teardown(&mut self) {
        let released = self.tables.iter().filter(|table| table.is_some()).count();
        self.tables = std::array::from_fn(|_| None);
        tracing::debug!(released, "released cached reflection tables");
    }

    pub fn set_config(&mut self, config: TableConfig) {
        if config.table_dir != self.config.table_dir {
            self.teardown();
        }
        self.config = config;
    }

    pub(crate) fn source_and_table(
        &mut self,
        variant: TableVariant,
    ) -> XillverResult<(&S, &mut Table)> {
        let path = self.config.table_path(variant);
        let Self {
            source,
            tables,
            metadata_loads,
            ..
        } = self;

        let table = match &mut tables[variant.slot()] {
            Some(table) => table,
            entry @ None => {
                let loaded = load_table(&*source, &path, variant)?;
                *metadata_loads += 1;
                entry.insert(loaded)
            }
        };
        Ok((&*source, table))
    }
}

pub(crate) fn open_table<'s, S>(
    source: &'s S,
    path: &Path,
    variant: TableVariant,
) -> XillverResult<Box<dyn TableFile + 's>>
where
    S: TableSource + ?Sized,
{
    source.open(path).map_err(|error| match error {
        TableFileError::Open { .. } => XillverError::TableNotFound {
            filename: variant.filename(),
            path: path.to_path_buf(),
            download_url: TABLE_DOWNLOAD_URL,
            source: error,
        },
        other => XillverError::table_format(
            path,
            format!("'{}' is not a packed reflection table: {other}", variant.filename()),
        ),
    })
}

fn load_table<S>(source: &S, path: &Path, variant: TableVariant) -> XillverResult<Table>
where
    S: TableSource + ?Sized,
{
    let mut file = open_table(source, path, variant)?;

    let parameters = file
        .parameters()
        .map_err(|error| section_error(path, SECTION_PARAMETERS, error))?;
    let energies = file
        .energies()
        .map_err(|error| section_error(path, SECTION_ENERGIES, error))?;
    let table = Table::from_metadata(variant, path, parameters, energies)?;

    let rows = file
        .spectrum_count()
        .map_err(|error| section_error(path, SECTION_SPECTRA, error))?;
    if rows != table.slot_count() {
        return Err(XillverError::table_format(
            path,
            format!(
                "SPECTRA holds {rows} rows but the parameter grid has {} points",
                table.slot_count()
            ),
        ));
    }

    tracing::info!(
        table = %variant,
        path = %path.display(),
        axes = table.axis_count(),
        energy_bins = table.n_energy(),
        "initialized reflection table"
    );
    table.log_axes();

    Ok(table)
}

fn section_error(path: &Path, section: &str, error: TableFileError) -> XillverError {
    XillverError::table_format(path, format!("reading extension {section} failed: {error}"))
}

#[cfg(test)]
mod tests {
    use super::TableCatalog;
    use crate::common::config::TableConfig;
    use crate::domain::{ModelKind, TableParams, TableVariant, XillverError};
    use crate::io::{EnergyRow, PackedTableDocument, PackedTableSource, ParameterRow};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_standard_table(dir: &Path, spectra: usize) {
        let document = PackedTableDocument {
            parameters: Some(vec![
                ParameterRow::new("Gamma", vec![1.0, 2.0]),
                ParameterRow::new("A_Fe", vec![1.0, 2.0]),
                ParameterRow::new("logXi", vec![0.0, 1.0]),
                ParameterRow::new("Ecut", vec![20.0, 300.0]),
                ParameterRow::new("Incl", vec![30.0, 60.0]),
            ]),
            energies: Some(vec![EnergyRow { lo: 1.0, hi: 2.0 }]),
            spectra: Some((0..spectra).map(|row| vec![row as f32]).collect()),
        };
        document
            .write(&dir.join(TableVariant::Standard.filename()))
            .expect("table should be written");
    }

    #[test]
    fn table_is_parsed_once_per_variant() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_standard_table(temp.path(), 32);
        let mut catalog = TableCatalog::new(PackedTableSource, TableConfig::new(temp.path()));

        assert!(catalog.cached_table(TableVariant::Standard).is_none());
        catalog.get_table(TableVariant::Standard).expect("first load");
        catalog.get_table(TableVariant::Standard).expect("cached load");
        assert_eq!(catalog.metadata_loads(), 1);
        assert!(catalog.cached_table(TableVariant::Standard).is_some());

        catalog.teardown();
        assert!(catalog.cached_table(TableVariant::Standard).is_none());
        catalog.get_table(TableVariant::Standard).expect("reload after teardown");
        assert_eq!(catalog.metadata_loads(), 2);
    }

    #[test]
    fn missing_file_reports_table_not_found() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut catalog = TableCatalog::new(PackedTableSource, TableConfig::new(temp.path()));

        assert!(!catalog.table_exists(TableVariant::NeutronStar));
        let error = catalog
            .evaluate(&TableParams::new(ModelKind::XillverNs))
            .expect_err("no table on disk");
        match error {
            XillverError::TableNotFound { filename, .. } => assert_eq!(filename, "xillverNS-2.fits"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(catalog.metadata_loads(), 0);
    }

    #[test]
    fn undecodable_file_is_a_format_error_not_a_missing_table() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::write(
            temp.path().join(TableVariant::Standard.filename()),
            "SIMPLE  =                    T / not a packed table\n",
        )
        .expect("file should be written");
        let mut catalog = TableCatalog::new(PackedTableSource, TableConfig::new(temp.path()));

        assert!(catalog.table_exists(TableVariant::Standard));
        let error = catalog
            .get_table(TableVariant::Standard)
            .expect_err("file is not a packed table");
        match &error {
            XillverError::TableFormat { detail, .. } => {
                assert!(detail.contains("xillver-a-Ec5.fits"));
                assert!(detail.contains("not a packed reflection table"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(error.placeholder(), "TABLE.FORMAT");
        assert_eq!(catalog.metadata_loads(), 0);
    }

    #[test]
    fn spectrum_row_count_must_match_grid() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_standard_table(temp.path(), 31);
        let mut catalog = TableCatalog::new(PackedTableSource, TableConfig::new(temp.path()));

        assert!(catalog.table_exists(TableVariant::Standard));
        let error = catalog
            .get_table(TableVariant::Standard)
            .expect_err("row count mismatch");
        assert!(matches!(error, XillverError::TableFormat { .. }));
        assert!(catalog.cached_table(TableVariant::Standard).is_none());
    }

    #[test]
    fn changing_table_directory_drops_cached_tables() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_standard_table(temp.path(), 32);
        let mut catalog = TableCatalog::new(PackedTableSource, TableConfig::new(temp.path()));
        catalog.get_table(TableVariant::Standard).expect("load");

        catalog.set_config(TableConfig {
            verbose: true,
            ..TableConfig::new(temp.path())
        });
        assert!(catalog.cached_table(TableVariant::Standard).is_some());

        catalog.set_config(TableConfig::new(temp.path().join("elsewhere")));
        assert!(catalog.cached_table(TableVariant::Standard).is_none());
    }
}
