//! Makes the spectra of one grid cell resident, reading only missing corners.

use crate::catalog::open_table;
use crate::common::constants::{DENSITY_TOLERANCE, REFERENCE_LOG_DENSITY};
use crate::domain::{ParamKind, TableParams, XillverError, XillverResult};
use crate::index::GridCell;
use crate::io::{TableFile, TableSource};
use crate::table::{GRID_RANK, GridIndex, Table};

/// Ionization and density a spectrum is renormalized with when the table
/// does not tabulate them itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceValues {
    pub log_xi: f64,
    pub density: f64,
}

impl ReferenceValues {
    pub fn from_params(params: &TableParams) -> Self {
        Self {
            log_xi: params.log_xi,
            density: params.density,
        }
    }
}

/// Undo the fixed ionization/density normalization the table is stored
/// with. Each division is rounded back to single precision.
pub fn renormalize(spectrum: &mut [f32], log_xi: f64, density: f64) {
    let xi_norm = 10_f64.powf(log_xi);
    let density_norm = ((density - REFERENCE_LOG_DENSITY).abs() > DENSITY_TOLERANCE)
        .then(|| 10_f64.powf(density - REFERENCE_LOG_DENSITY));

    for value in spectrum.iter_mut() {
        *value = (f64::from(*value) / xi_norm) as f32;
        if let Some(norm) = density_norm {
            *value = (f64::from(*value) / norm) as f32;
        }
    }
}

/// Every corner of `cell` on the non-inclination axes, combined with every
/// inclination bin. Inclination varies fastest.
pub fn block_corners(table: &Table, cell: &GridCell) -> Vec<GridIndex> {
    let dims = table.dims();
    let mut corners: Vec<GridIndex> = vec![[0; GRID_RANK]];

    for grid_axis in 0..GRID_RANK - 1 {
        let choices: &[usize] = if dims[grid_axis] == 1 { &[0] } else { &[0, 1] };
        corners = corners
            .into_iter()
            .flat_map(|corner| {
                choices.iter().map(move |step| {
                    let mut next = corner;
                    next[grid_axis] = cell.indices[grid_axis] + step;
                    next
                })
            })
            .collect();
    }

    let n_incl = dims[GRID_RANK - 1];
    corners
        .into_iter()
        .flat_map(|corner| {
            (0..n_incl).map(move |incl| {
                let mut next = corner;
                next[GRID_RANK - 1] = incl;
                next
            })
        })
        .collect()
}

/// Load every spectrum of `cell` that is not resident yet and return how
/// many were read. The file is opened on the first missing corner and closed
/// before returning. On a read error the spectra stored so far stay cached.
pub fn ensure_loaded<S>(
    source: &S,
    table: &mut Table,
    cell: &GridCell,
    reference: ReferenceValues,
) -> XillverResult<usize>
where
    S: TableSource + ?Sized,
{
    let path = table.path().to_path_buf();
    let variant = table.variant();

    let mut file: Option<Box<dyn TableFile + '_>> = None;
    let mut buffer = vec![0.0_f32; table.n_energy()];
    let mut loaded = 0;

    for corner in block_corners(table, cell) {
        if table.is_loaded(&corner) {
            continue;
        }

        let handle = match file.as_mut() {
            Some(handle) => handle,
            None => file.insert(open_table(source, &path, variant)?),
        };

        let row = table.flat_index(&corner);
        handle
            .read_spectrum(row, &mut buffer)
            .map_err(|source| XillverError::TableRead {
                path: path.clone(),
                row,
                source,
            })?;

        let log_xi = table
            .axis_value_at(ParamKind::LogXi, &corner)
            .unwrap_or(reference.log_xi);
        let density = table
            .axis_value_at(ParamKind::Density, &corner)
            .unwrap_or(reference.density);
        renormalize(&mut buffer, log_xi, density);

        table.store_spectrum(&corner, &buffer)?;
        loaded += 1;
    }

    if loaded > 0 {
        tracing::debug!(
            table = %variant,
            loaded,
            resident = table.loaded_spectra(),
            "loaded spectra for grid cell {:?}",
            cell.indices
        );
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::{block_corners, renormalize};
    use crate::domain::TableVariant;
    use crate::index::GridCell;
    use crate::io::ParameterRow;
    use crate::table::{GRID_RANK, Table};

    #[test]
    fn reference_ionization_and_density_leave_spectra_unchanged() {
        let original = [1.25_f32, 3.5e-3, 7.0e4];
        let mut spectrum = original;
        renormalize(&mut spectrum, 0.0, 15.0);
        assert_eq!(spectrum, original);

        renormalize(&mut spectrum, 0.0, 15.0 + 5.0e-7);
        assert_eq!(spectrum, original);
    }

    #[test]
    fn ionization_and_density_divide_out() {
        let mut spectrum = [1000.0_f32, 20.0];
        renormalize(&mut spectrum, 2.0, 16.0);
        assert!((spectrum[0] - 1.0).abs() < 1e-6);
        assert!((spectrum[1] - 0.02).abs() < 1e-8);
    }

    #[test]
    fn block_covers_both_neighbours_and_every_inclination() {
        let table = Table::from_metadata(
            TableVariant::Standard,
            "t.json",
            vec![
                ParameterRow::new("Gamma", vec![1.0, 2.0, 3.0]),
                ParameterRow::new("A_Fe", vec![0.5, 1.0]),
                ParameterRow::new("logXi", vec![0.0, 1.0]),
                ParameterRow::new("Ecut", vec![20.0, 300.0]),
                ParameterRow::new("Incl", vec![18.0, 45.0, 87.0]),
            ],
            vec![(0.1, 0.2)],
        )
        .expect("table should validate");

        let cell = GridCell {
            indices: [0, 1, 0, 0, 0, 0],
            fractions: [0.0; GRID_RANK],
        };
        let corners = block_corners(&table, &cell);

        assert_eq!(corners.len(), 16 * 3);
        assert_eq!(corners[0], [0, 1, 0, 0, 0, 0]);
        assert_eq!(corners[2], [0, 1, 0, 0, 0, 2]);
        assert_eq!(corners[47], [0, 2, 1, 1, 1, 2]);
        assert!(corners.iter().all(|corner| corner[0] == 0));
    }
}
