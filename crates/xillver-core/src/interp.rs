//! Multilinear interpolation of resident table spectra.
//!
//! The inner axes of a cell (everything except the leading axis of a
//! six-axis table, and inclination for angle-resolved output) are blended in
//! one pass over the `2^k` corner bitmask. A six-axis table is reduced to two
//! such blends at the lower and upper index of its leading axis followed by
//! one linear blend along that axis. Keep that reduction order: results are
//! compared bit for bit against reference spectra.

use crate::domain::{OutputMode, ResultSpectrum, XillverError, XillverResult};
use crate::index::GridCell;
use crate::table::{GRID_RANK, GridIndex, Table};

const LEADING_AXIS: usize = 0;
const INCLINATION_AXIS: usize = GRID_RANK - 1;

/// Weight of the corner selected by `mask`: bit `b` set takes the upper
/// neighbour on axis `b` (factor `f`), clear takes the lower (`1 - f`).
pub fn corner_weight(fractions: &[f64], mask: usize) -> f64 {
    fractions
        .iter()
        .enumerate()
        .fold(1.0, |weight, (bit, fraction)| {
            if (mask >> bit) & 1 == 1 {
                weight * fraction
            } else {
                weight * (1.0 - fraction)
            }
        })
}

/// All `2^k` corner weights for `k = fractions.len()`, indexed by mask.
pub fn corner_weights(fractions: &[f64]) -> Vec<f64> {
    (0..1_usize << fractions.len())
        .map(|mask| corner_weight(fractions, mask))
        .collect()
}

pub fn interp_lin_1d(fraction: f64, lo: f64, hi: f64) -> f64 {
    (1.0 - fraction) * lo + fraction * hi
}

/// Grid axes blended by the corner bitmask for `mode`.
fn inner_axes(mode: OutputMode) -> Vec<usize> {
    let mut axes: Vec<usize> = (LEADING_AXIS + 1..INCLINATION_AXIS).collect();
    if mode == OutputMode::SingleAngle {
        axes.push(INCLINATION_AXIS);
    }
    axes
}

fn blend_corners(
    table: &Table,
    base: &GridIndex,
    axes: &[usize],
    fractions: &[f64; GRID_RANK],
    out: &mut [f64],
) -> XillverResult<()> {
    let axis_fractions: Vec<f64> = axes.iter().map(|axis| fractions[*axis]).collect();

    out.fill(0.0);
    for (mask, weight) in corner_weights(&axis_fractions).into_iter().enumerate() {
        let mut corner = *base;
        for (bit, axis) in axes.iter().enumerate() {
            corner[*axis] += (mask >> bit) & 1;
        }

        let spectrum = table
            .spectrum(&corner)
            .ok_or_else(|| XillverError::CornerNotLoaded {
                path: table.path().to_path_buf(),
                corner,
            })?;
        for (acc, value) in out.iter_mut().zip(spectrum) {
            *acc += weight * f64::from(*value);
        }
    }

    Ok(())
}

fn blend_cell(
    table: &Table,
    base: &GridIndex,
    axes: &[usize],
    fractions: &[f64; GRID_RANK],
) -> XillverResult<Vec<f64>> {
    let mut flux = vec![0.0; table.n_energy()];
    blend_corners(table, base, axes, fractions, &mut flux)?;

    if table.dims()[LEADING_AXIS] == 1 {
        return Ok(flux);
    }

    let mut upper_base = *base;
    upper_base[LEADING_AXIS] += 1;
    let mut upper = vec![0.0; table.n_energy()];
    blend_corners(table, &upper_base, axes, fractions, &mut upper)?;

    let fraction = fractions[LEADING_AXIS];
    for (lo, hi) in flux.iter_mut().zip(upper) {
        *lo = interp_lin_1d(fraction, *lo, hi);
    }
    Ok(flux)
}

/// Blend the resident spectra around `cell` into a result spectrum: one
/// flux array for [`OutputMode::SingleAngle`], one per tabulated inclination
/// for [`OutputMode::AllAngles`].
pub fn interpolate(table: &Table, cell: &GridCell, mode: OutputMode) -> XillverResult<ResultSpectrum> {
    let axes = inner_axes(mode);
    let incl_values = table.inclination().values();

    let (inclinations, flux) = match mode {
        OutputMode::SingleAngle => {
            let lower = cell.indices[INCLINATION_AXIS];
            let inclination = interp_lin_1d(
                cell.fractions[INCLINATION_AXIS],
                f64::from(incl_values[lower]),
                f64::from(incl_values[lower + 1]),
            );
            let flux = blend_cell(table, &cell.indices, &axes, &cell.fractions)?;
            (vec![inclination], vec![flux])
        }
        OutputMode::AllAngles => {
            let mut flux = Vec::with_capacity(incl_values.len());
            for incl_bin in 0..incl_values.len() {
                let mut base = cell.indices;
                base[INCLINATION_AXIS] = incl_bin;
                flux.push(blend_cell(table, &base, &axes, &cell.fractions)?);
            }
            let inclinations = incl_values.iter().map(|value| f64::from(*value)).collect();
            (inclinations, flux)
        }
    };

    Ok(ResultSpectrum {
        energy: table.energy_edges(),
        inclinations,
        flux,
    })
}
