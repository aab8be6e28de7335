//! In-memory reflection table: axis metadata, energy grid and the lazily
//! filled spectrum store.

mod store;

use crate::common::constants::{MAX_AXIS_COUNT, MIN_AXIS_COUNT};
use crate::domain::{ParamKind, TableVariant, XillverError, XillverResult};
use crate::io::ParameterRow;
use std::path::{Path, PathBuf};
use store::SpectrumStore;

/// Rank every table is indexed at. Five-axis tables get a leading axis of
/// length one so both layouts share the same address formula.
pub const GRID_RANK: usize = MAX_AXIS_COUNT;

/// Grid coordinates padded to [`GRID_RANK`]; inclination is the last entry.
pub type GridIndex = [usize; GRID_RANK];

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    kind: ParamKind,
    values: Vec<f32>,
}

impl Axis {
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> f32 {
        self.values[0]
    }

    pub fn last(&self) -> f32 {
        self.values[self.values.len() - 1]
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    variant: TableVariant,
    path: PathBuf,
    axes: Vec<Axis>,
    energy_lo: Vec<f32>,
    energy_hi: Vec<f32>,
    dims: GridIndex,
    store: SpectrumStore,
}

impl Table {
    /// Validate the `PARAMETERS`/`ENERGIES` sections and allocate an empty
    /// store sized by the product of the axis lengths.
    pub fn from_metadata(
        variant: TableVariant,
        path: impl Into<PathBuf>,
        parameters: Vec<ParameterRow>,
        energies: Vec<(f32, f32)>,
    ) -> XillverResult<Self> {
        let path = path.into();

        let axis_count = parameters.len();
        if !(MIN_AXIS_COUNT..=MAX_AXIS_COUNT).contains(&axis_count) {
            return Err(XillverError::table_format(
                &path,
                format!("wrong dimensionality: {axis_count} parameter axes, expected 5 or 6"),
            ));
        }

        let mut axes: Vec<Axis> = Vec::with_capacity(axis_count);
        for row in parameters {
            let axis = parse_axis(&path, row)?;
            if axes.iter().any(|existing| existing.kind == axis.kind) {
                return Err(XillverError::table_format(
                    &path,
                    format!("parameter '{}' is tabulated more than once", axis.kind),
                ));
            }
            axes.push(axis);
        }

        if axes[axis_count - 1].kind != ParamKind::Inclination {
            return Err(XillverError::table_format(
                &path,
                format!(
                    "last parameter must be '{}', found '{}'",
                    ParamKind::Inclination,
                    axes[axis_count - 1].kind
                ),
            ));
        }
        if let Some(axis) = axes[..axis_count - 1]
            .iter()
            .find(|axis| axis.kind == ParamKind::Inclination)
        {
            return Err(XillverError::table_format(
                &path,
                format!("parameter '{}' must only be the last axis", axis.kind),
            ));
        }

        if energies.is_empty() {
            return Err(XillverError::table_format(&path, "energy grid is empty"));
        }

        let mut dims = [1; GRID_RANK];
        let offset = GRID_RANK - axis_count;
        for (position, axis) in axes.iter().enumerate() {
            dims[offset + position] = axis.len();
        }

        let slot_count = dims.iter().try_fold(1_usize, |acc, len| acc.checked_mul(*len));
        let slot_count = slot_count.ok_or_else(|| {
            XillverError::table_format(&path, "number of grid points overflows the index range")
        })?;

        let (energy_lo, energy_hi): (Vec<f32>, Vec<f32>) = energies.into_iter().unzip();
        let store = SpectrumStore::new(slot_count, energy_lo.len())?;

        Ok(Self {
            variant,
            path,
            axes,
            energy_lo,
            energy_hi,
            dims,
            store,
        })
    }

    pub fn variant(&self) -> TableVariant {
        self.variant
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Offset of the first real axis inside a [`GridIndex`].
    pub fn grid_offset(&self) -> usize {
        GRID_RANK - self.axes.len()
    }

    /// Axis stored at padded grid position `grid_axis`, if any.
    pub fn axis_at(&self, grid_axis: usize) -> Option<&Axis> {
        grid_axis
            .checked_sub(self.grid_offset())
            .and_then(|position| self.axes.get(position))
    }

    /// Padded grid position of the axis tabulating `kind`.
    pub fn grid_axis_of(&self, kind: ParamKind) -> Option<usize> {
        self.axes
            .iter()
            .position(|axis| axis.kind == kind)
            .map(|position| position + self.grid_offset())
    }

    pub fn inclination(&self) -> &Axis {
        &self.axes[self.axes.len() - 1]
    }

    pub fn n_incl(&self) -> usize {
        self.inclination().len()
    }

    pub fn n_energy(&self) -> usize {
        self.energy_lo.len()
    }

    pub fn energy_lo(&self) -> &[f32] {
        &self.energy_lo
    }

    pub fn energy_hi(&self) -> &[f32] {
        &self.energy_hi
    }

    /// Bin edges: every lower edge followed by the upper edge of the last bin.
    pub fn energy_edges(&self) -> Vec<f64> {
        self.energy_lo
            .iter()
            .map(|lo| f64::from(*lo))
            .chain(self.energy_hi.last().map(|hi| f64::from(*hi)))
            .collect()
    }

    pub fn dims(&self) -> &GridIndex {
        &self.dims
    }

    pub fn slot_count(&self) -> usize {
        self.store.slot_count()
    }

    pub fn loaded_spectra(&self) -> usize {
        self.store.loaded()
    }

    /// Mixed-radix address of `corner`, first axis most significant.
    pub fn flat_index(&self, corner: &GridIndex) -> usize {
        corner
            .iter()
            .zip(self.dims.iter())
            .fold(0, |acc, (index, len)| acc * len + index)
    }

    pub fn is_loaded(&self, corner: &GridIndex) -> bool {
        self.store.contains(self.flat_index(corner))
    }

    pub fn spectrum(&self, corner: &GridIndex) -> Option<&[f32]> {
        self.store.get(self.flat_index(corner))
    }

    /// Tabulated coordinate of `kind` at `corner`, if the table has that axis.
    pub fn axis_value_at(&self, kind: ParamKind, corner: &GridIndex) -> Option<f64> {
        let grid_axis = self.grid_axis_of(kind)?;
        let axis = self.axis_at(grid_axis)?;
        axis.values.get(corner[grid_axis]).map(|value| f64::from(*value))
    }

    pub(crate) fn store_spectrum(&mut self, corner: &GridIndex, spectrum: &[f32]) -> XillverResult<()> {
        let slot = self.flat_index(corner);
        self.store.insert(slot, spectrum)
    }

    pub(crate) fn log_axes(&self) {
        for (position, axis) in self.axes.iter().enumerate() {
            tracing::debug!(
                table = %self.variant,
                "loaded parameter {} (index={}) - {:02} values from {:.2} to {:.2}",
                axis.kind,
                position,
                axis.len(),
                axis.first(),
                axis.last()
            );
        }
    }
}

fn parse_axis(path: &Path, row: ParameterRow) -> XillverResult<Axis> {
    let kind = ParamKind::from_table_name(&row.name).ok_or_else(|| {
        XillverError::table_format(
            path,
            format!(
                "parameter '{}' is not known; please make sure you downloaded the correct table",
                row.name.trim()
            ),
        )
    })?;

    if row.num_values != row.values.len() {
        return Err(XillverError::table_format(
            path,
            format!(
                "parameter '{kind}' declares {} values but tabulates {}",
                row.num_values,
                row.values.len()
            ),
        ));
    }
    if row.values.len() < 2 {
        return Err(XillverError::table_format(
            path,
            format!("parameter '{kind}' needs at least 2 tabulated values"),
        ));
    }
    if let Some(index) = row
        .values
        .windows(2)
        .position(|pair| !(pair[1] > pair[0]))
    {
        return Err(XillverError::table_format(
            path,
            format!(
                "parameter '{kind}' is not strictly increasing at index {}",
                index + 1
            ),
        ));
    }

    Ok(Axis {
        kind,
        values: row.values,
    })
}
