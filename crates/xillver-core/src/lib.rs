//! Lazily loaded reflection-spectrum tables with multilinear interpolation.

pub mod catalog;
pub mod common;
pub mod diagnostics;
pub mod domain;
pub mod index;
pub mod interp;
pub mod io;
pub mod loader;
pub mod query;
pub mod table;

pub use catalog::TableCatalog;
pub use common::config::TableConfig;
pub use domain::{
    ModelKind, OutputMode, ParamKind, ResultSpectrum, TableParams, TableVariant, XillverError,
    XillverResult,
};
pub use query::evaluate;
