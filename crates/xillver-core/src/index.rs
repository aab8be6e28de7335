//! Maps a parameter vector onto the enclosing grid cell of a table.

use crate::domain::{OutputMode, ParamKind, TableParams};
use crate::table::{Axis, GRID_RANK, GridIndex, Table};

/// Lower-corner indices and per-axis interpolation fractions, padded to
/// [`GRID_RANK`] like [`GridIndex`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub indices: GridIndex,
    pub fractions: [f64; GRID_RANK],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Below,
    Above,
}

/// Index of the lower neighbour of `value`, clamped to `[0, len - 2]` so an
/// upper neighbour always exists.
pub fn lower_bracket(values: &[f32], value: f32) -> usize {
    debug_assert!(values.len() >= 2);
    let above = values.partition_point(|tabulated| *tabulated <= value);
    above.saturating_sub(1).min(values.len() - 2)
}

/// Clamp `value` into the tabulated range of `axis`. Equality with either
/// bound is inside the range.
pub fn clamp_to_axis(axis: &Axis, value: f32) -> (f32, Option<Boundary>) {
    if value < axis.first() {
        (axis.first(), Some(Boundary::Below))
    } else if value > axis.last() {
        (axis.last(), Some(Boundary::Above))
    } else {
        (value, None)
    }
}

pub fn resolve(table: &Table, params: &TableParams, verbose: bool) -> GridCell {
    let mode = params.model.output_mode();
    let offset = table.grid_offset();

    let mut cell = GridCell {
        indices: [0; GRID_RANK],
        fractions: [0.0; GRID_RANK],
    };

    for (position, axis) in table.axes().iter().enumerate() {
        let grid_axis = offset + position;
        let kind = axis.kind();
        let physical = params.value_for(kind);
        let angle_resolved = kind == ParamKind::Inclination && mode == OutputMode::AllAngles;
        // tables store single precision, compare on the same footing
        let mut requested = physical as f32;
        if requested.is_nan() {
            if !angle_resolved {
                warn_not_a_number(kind, axis.first());
            }
            requested = axis.first();
        }

        let lower = lower_bracket(axis.values(), requested);
        cell.indices[grid_axis] = lower;

        if angle_resolved {
            continue;
        }

        let (value, boundary) = clamp_to_axis(axis, requested);
        if let Some(boundary) = boundary
            && verbose
            && kind != ParamKind::Ecut
        {
            warn_clamped(kind, requested, value, boundary);
        }

        let lo = f64::from(axis.values()[lower]);
        let hi = f64::from(axis.values()[lower + 1]);
        let mut fraction = (f64::from(value) - lo) / (hi - lo);

        if kind == ParamKind::Ecut {
            fraction = pin_cutoff_fraction(axis, physical, fraction);
        }

        cell.fractions[grid_axis] = fraction;
    }

    cell
}

/// The intrinsic cutoff can sit outside the grid after gravitational
/// redshift; the blend still has to stay on the table edge.
fn pin_cutoff_fraction(axis: &Axis, physical: f64, fraction: f64) -> f64 {
    if physical >= f64::from(axis.last()) {
        1.0
    } else if physical <= f64::from(axis.first()) {
        0.0
    } else {
        fraction
    }
}

/// Emitted regardless of the verbose flag: NaN is never a usable input.
fn warn_not_a_number(kind: ParamKind, value: f32) {
    tracing::warn!(
        parameter = %kind,
        "parameter {} is NaN, resetting to lowest table value {:e}",
        kind,
        value
    );
}

fn warn_clamped(kind: ParamKind, requested: f32, value: f32, boundary: Boundary) {
    match boundary {
        Boundary::Below => tracing::warn!(
            parameter = %kind,
            "parameter {}={:e} below lowest table value, resetting to {:e}",
            kind,
            requested,
            value
        ),
        Boundary::Above => tracing::warn!(
            parameter = %kind,
            "parameter {}={:e} above largest table value, resetting to {:e}",
            kind,
            requested,
            value
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{Boundary, clamp_to_axis, lower_bracket, resolve};
    use crate::domain::{ModelKind, TableParams, TableVariant};
    use crate::io::ParameterRow;
    use crate::table::Table;

    fn table() -> Table {
        Table::from_metadata(
            TableVariant::Standard,
            "t.json",
            vec![
                ParameterRow::new("Gamma", vec![1.0, 2.0, 3.0]),
                ParameterRow::new("A_Fe", vec![0.5, 1.0, 5.0]),
                ParameterRow::new("logXi", vec![0.0, 2.0, 4.0]),
                ParameterRow::new("Ecut", vec![20.0, 100.0, 300.0]),
                ParameterRow::new("Incl", vec![20.0, 40.0, 60.0]),
            ],
            vec![(0.1, 0.2)],
        )
        .expect("table should validate")
    }

    fn on_grid(model: ModelKind) -> TableParams {
        let mut params = TableParams::new(model);
        params.gamma = 2.0;
        params.a_fe = 1.0;
        params.log_xi = 2.0;
        params.ecut = 100.0;
        params.incl = 40.0;
        params
    }

    #[test]
    fn lower_bracket_is_clamped_to_valid_cells() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(lower_bracket(&values, 0.5), 0);
        assert_eq!(lower_bracket(&values, 1.0), 0);
        assert_eq!(lower_bracket(&values, 2.5), 1);
        assert_eq!(lower_bracket(&values, 3.0), 2);
        assert_eq!(lower_bracket(&values, 4.0), 2);
        assert_eq!(lower_bracket(&values, 9.0), 2);
    }

    #[test]
    fn on_grid_parameters_have_zero_fractions() {
        let cell = resolve(&table(), &on_grid(ModelKind::Xillver), false);
        assert_eq!(cell.indices, [0, 1, 1, 1, 1, 1]);
        assert!(cell.fractions.iter().all(|fraction| *fraction == 0.0));
    }

    #[test]
    fn midpoint_gamma_gives_half_fraction() {
        let mut params = on_grid(ModelKind::Xillver);
        params.gamma = 1.5;
        let cell = resolve(&table(), &params, false);
        assert_eq!(cell.indices[1], 0);
        assert_eq!(cell.fractions[1], 0.5);
    }

    #[test]
    fn upper_bound_equality_yields_unit_fraction_without_clamping() {
        let table = table();
        let gamma = &table.axes()[0];
        assert_eq!(clamp_to_axis(gamma, 3.0), (3.0, None));
        assert_eq!(clamp_to_axis(gamma, 1.0), (1.0, None));

        let mut params = on_grid(ModelKind::Xillver);
        params.gamma = 3.0;
        let cell = resolve(&table, &params, true);
        assert_eq!(cell.indices[1], 1);
        assert_eq!(cell.fractions[1], 1.0);
    }

    #[test]
    fn out_of_range_inputs_clamp_to_exact_boundaries_repeatably() {
        let table = table();
        let gamma = &table.axes()[0];
        assert_eq!(clamp_to_axis(gamma, 0.2), (1.0, Some(Boundary::Below)));
        assert_eq!(clamp_to_axis(gamma, 7.0), (3.0, Some(Boundary::Above)));

        let mut params = on_grid(ModelKind::Xillver);
        params.gamma = 9.0;
        params.a_fe = 0.01;
        let first = resolve(&table, &params, true);
        let second = resolve(&table, &params, true);

        assert_eq!(first, second);
        assert_eq!((first.indices[1], first.fractions[1]), (1, 1.0));
        assert_eq!((first.indices[2], first.fractions[2]), (0, 0.0));
        assert!(first.fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    }

    #[test]
    fn cutoff_beyond_the_grid_is_pinned_to_the_edge() {
        let table = table();
        let mut params = on_grid(ModelKind::Xillver);

        params.ecut = 1000.0;
        let cell = resolve(&table, &params, false);
        assert_eq!((cell.indices[4], cell.fractions[4]), (1, 1.0));

        params.ecut = 5.0;
        let cell = resolve(&table, &params, false);
        assert_eq!((cell.indices[4], cell.fractions[4]), (0, 0.0));

        params.ecut = 300.0;
        let cell = resolve(&table, &params, false);
        assert_eq!((cell.indices[4], cell.fractions[4]), (1, 1.0));
    }

    #[test]
    fn nan_inputs_fall_back_to_the_lower_bound() {
        let table = table();
        let mut params = on_grid(ModelKind::Xillver);
        params.gamma = f64::NAN;
        params.ecut = f64::NAN;
        params.incl = f64::NAN;

        let cell = resolve(&table, &params, false);
        assert_eq!((cell.indices[1], cell.fractions[1]), (0, 0.0));
        assert_eq!((cell.indices[4], cell.fractions[4]), (0, 0.0));
        assert_eq!((cell.indices[5], cell.fractions[5]), (0, 0.0));
        assert!(cell.fractions.iter().all(|fraction| fraction.is_finite()));

        let mut params = on_grid(ModelKind::Relxill);
        params.incl = f64::NAN;
        let cell = resolve(&table, &params, true);
        assert_eq!(cell.fractions[5], 0.0);
    }

    #[test]
    fn inclination_is_not_interpolated_for_angle_resolved_models() {
        let mut params = on_grid(ModelKind::Relxill);
        params.incl = 50.0;
        let cell = resolve(&table(), &params, true);
        assert_eq!(cell.fractions[5], 0.0);

        let mut params = on_grid(ModelKind::Xillver);
        params.incl = 50.0;
        let cell = resolve(&table(), &params, true);
        assert_eq!((cell.indices[5], cell.fractions[5]), (1, 0.5));
    }
}
