pub mod errors;

pub use errors::{ErrorCategory, XillverError, XillverResult};

use crate::common::constants::{
    XILLTABLE_CO_FILENAME, XILLTABLE_DENS_FILENAME, XILLTABLE_FILENAME, XILLTABLE_NS_FILENAME,
    XILLTABLE_NTHCOMP_FILENAME,
};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Physical quantity tabulated along one axis of a reflection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamKind {
    Gamma,
    AFe,
    LogXi,
    Ecut,
    KTe,
    Density,
    KTbb,
    ACo,
    FracPlBb,
    Inclination,
}

impl ParamKind {
    pub const ALL: [ParamKind; 10] = [
        Self::Gamma,
        Self::AFe,
        Self::LogXi,
        Self::Ecut,
        Self::KTe,
        Self::Density,
        Self::KTbb,
        Self::ACo,
        Self::FracPlBb,
        Self::Inclination,
    ];

    /// Column name used in the `PARAMETERS` section of a table file.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Gamma => "Gamma",
            Self::AFe => "A_Fe",
            Self::LogXi => "logXi",
            Self::Ecut => "Ecut",
            Self::KTe => "kTe",
            Self::Density => "Dens",
            Self::KTbb => "kTbb",
            Self::ACo => "A_CO",
            Self::FracPlBb => "Frac",
            Self::Inclination => "Incl",
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.table_name() == name)
    }
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Backing dataset a model is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TableVariant {
    Standard,
    Nthcomp,
    Density,
    NeutronStar,
    Co,
}

impl TableVariant {
    pub const ALL: [TableVariant; 5] = [
        Self::Standard,
        Self::Nthcomp,
        Self::Density,
        Self::NeutronStar,
        Self::Co,
    ];

    pub const fn filename(self) -> &'static str {
        match self {
            Self::Standard => XILLTABLE_FILENAME,
            Self::Nthcomp => XILLTABLE_NTHCOMP_FILENAME,
            Self::Density => XILLTABLE_DENS_FILENAME,
            Self::NeutronStar => XILLTABLE_NS_FILENAME,
            Self::Co => XILLTABLE_CO_FILENAME,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Nthcomp => "nthcomp",
            Self::Density => "density",
            Self::NeutronStar => "ns",
            Self::Co => "co",
        }
    }

    pub(crate) const fn slot(self) -> usize {
        self as usize
    }
}

impl Display for TableVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the inclination axis shows up in a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputMode {
    /// Inclination is interpolated like any other axis; one flux array.
    SingleAngle,
    /// Inclination is not interpolated; one flux array per tabulated angle.
    AllAngles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    Xillver,
    XillverDens,
    XillverCp,
    XillverNs,
    XillverCo,
    Relxill,
    RelxillDens,
    RelxillCp,
    RelxillNs,
    RelxillCo,
}

impl ModelKind {
    pub const ALL: [ModelKind; 10] = [
        Self::Xillver,
        Self::XillverDens,
        Self::XillverCp,
        Self::XillverNs,
        Self::XillverCo,
        Self::Relxill,
        Self::RelxillDens,
        Self::RelxillCp,
        Self::RelxillNs,
        Self::RelxillCo,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xillver => "xillver",
            Self::XillverDens => "xillverD",
            Self::XillverCp => "xillverCp",
            Self::XillverNs => "xillverNS",
            Self::XillverCo => "xillverCO",
            Self::Relxill => "relxill",
            Self::RelxillDens => "relxillD",
            Self::RelxillCp => "relxillCp",
            Self::RelxillNs => "relxillNS",
            Self::RelxillCo => "relxillCO",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(name))
    }

    pub const fn table_variant(self) -> TableVariant {
        match self {
            Self::XillverNs | Self::RelxillNs => TableVariant::NeutronStar,
            Self::XillverCo | Self::RelxillCo => TableVariant::Co,
            Self::XillverCp | Self::RelxillCp => TableVariant::Nthcomp,
            Self::XillverDens | Self::RelxillDens => TableVariant::Density,
            Self::Xillver | Self::Relxill => TableVariant::Standard,
        }
    }

    pub const fn output_mode(self) -> OutputMode {
        match self {
            Self::Xillver
            | Self::XillverDens
            | Self::XillverCp
            | Self::XillverNs
            | Self::XillverCo => OutputMode::SingleAngle,
            Self::Relxill
            | Self::RelxillDens
            | Self::RelxillCp
            | Self::RelxillNs
            | Self::RelxillCo => OutputMode::AllAngles,
        }
    }
}

impl Display for ModelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical parameters of one table query.
///
/// `log_xi` and `density` double as the reference values the spectra are
/// renormalized with when the table does not tabulate them. `ecut` is also
/// read for `kTe` axes (the electron temperature of Comptonization tables).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableParams {
    pub gamma: f64,
    pub a_fe: f64,
    pub log_xi: f64,
    pub ecut: f64,
    pub density: f64,
    pub kt_bb: f64,
    pub frac_pl_bb: f64,
    pub a_co: f64,
    pub incl: f64,
    pub model: ModelKind,
}

impl TableParams {
    pub fn new(model: ModelKind) -> Self {
        Self {
            gamma: 2.0,
            a_fe: 1.0,
            log_xi: 0.0,
            ecut: 300.0,
            density: 15.0,
            kt_bb: 1.0,
            frac_pl_bb: 0.0,
            a_co: 1.0,
            incl: 30.0,
            model,
        }
    }

    pub fn value_for(&self, kind: ParamKind) -> f64 {
        match kind {
            ParamKind::Gamma => self.gamma,
            ParamKind::AFe => self.a_fe,
            ParamKind::LogXi => self.log_xi,
            ParamKind::Ecut | ParamKind::KTe => self.ecut,
            ParamKind::Density => self.density,
            ParamKind::KTbb => self.kt_bb,
            ParamKind::ACo => self.a_co,
            ParamKind::FracPlBb => self.frac_pl_bb,
            ParamKind::Inclination => self.incl,
        }
    }
}

/// Interpolated spectrum handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSpectrum {
    /// Bin edges; `energy.len() == n_energy_bins() + 1`.
    pub energy: Vec<f64>,
    pub inclinations: Vec<f64>,
    /// One flux array per entry of `inclinations`.
    pub flux: Vec<Vec<f64>>,
}

impl ResultSpectrum {
    pub fn n_energy_bins(&self) -> usize {
        self.energy.len().saturating_sub(1)
    }

    pub fn n_incl(&self) -> usize {
        self.flux.len()
    }

    pub fn flux_for(&self, incl_index: usize) -> Option<&[f64]> {
        self.flux.get(incl_index).map(Vec::as_slice)
    }
}
