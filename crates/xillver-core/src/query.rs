use crate::catalog::TableCatalog;
use crate::domain::{ResultSpectrum, TableParams, XillverResult};
use crate::index::resolve;
use crate::interp::interpolate;
use crate::io::TableSource;
use crate::loader::{ReferenceValues, ensure_loaded};

/// Interpolated reflection spectrum for `params`.
///
/// Loads the table of the selected model on first use, reads the spectra of
/// the enclosing grid cell that are not cached yet and blends them.
pub fn evaluate<S: TableSource>(
    catalog: &mut TableCatalog<S>,
    params: &TableParams,
) -> XillverResult<ResultSpectrum> {
    let verbose = catalog.config().verbose;
    let (source, table) = catalog.source_and_table(params.model.table_variant())?;

    let cell = resolve(table, params, verbose);
    ensure_loaded(source, table, &cell, ReferenceValues::from_params(params))?;
    interpolate(table, &cell, params.model.output_mode())
}
