//! Fixed names shared by the table loader and the configuration layer.

pub const XILLTABLE_FILENAME: &str = "xillver-a-Ec5.fits";
pub const XILLTABLE_NTHCOMP_FILENAME: &str = "xillverCp_v3.4.fits";
pub const XILLTABLE_DENS_FILENAME: &str = "xillverD-5.fits";
pub const XILLTABLE_NS_FILENAME: &str = "xillverNS-2.fits";
pub const XILLTABLE_CO_FILENAME: &str = "xillverCO.fits";

pub const TABLE_DOWNLOAD_URL: &str = "https://www.sternwarte.uni-erlangen.de/research/relxill/";

pub const SECTION_PARAMETERS: &str = "PARAMETERS";
pub const SECTION_ENERGIES: &str = "ENERGIES";
pub const SECTION_SPECTRA: &str = "SPECTRA";

pub const ENV_TABLE_PATH: &str = "RELXILL_TABLE_PATH";
pub const ENV_DEBUG: &str = "DEBUG_RELXILL";
pub const ENV_WRITE_OUTFILES: &str = "RELXILL_WRITE_OUTFILES";

pub const DEFAULT_TABLE_DIR: &str = "./";

/// Density (log cm^-3) the tables are calculated at.
pub const REFERENCE_LOG_DENSITY: f64 = 15.0;
pub const DENSITY_TOLERANCE: f64 = 1.0e-6;

pub const MIN_AXIS_COUNT: usize = 5;
pub const MAX_AXIS_COUNT: usize = 6;
