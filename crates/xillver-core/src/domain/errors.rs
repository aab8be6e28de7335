use crate::common::config::ConfigError;
use crate::diagnostics::DiagnosticsError;
use crate::io::TableFileError;
use crate::table::GridIndex;
use std::collections::TryReserveError;
use std::path::PathBuf;

pub type XillverResult<T> = Result<T, XillverError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidationError,
    IoSystemError,
    TableFormatError,
    ResourceError,
    InternalError,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::TableFormatError => 4,
            Self::ResourceError => 5,
            Self::InternalError => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::TableFormatError => "TableFormatError",
            Self::ResourceError => "ResourceError",
            Self::InternalError => "InternalError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum XillverError {
    #[error(
        "opening table '{filename}' failed: either the full path '{}' is wrong or the table needs to be downloaded from {download_url} ({source})",
        path.display()
    )]
    TableNotFound {
        filename: &'static str,
        path: PathBuf,
        download_url: &'static str,
        source: TableFileError,
    },
    #[error("table '{}' has an unexpected format: {detail}", path.display())]
    TableFormat { path: PathBuf, detail: String },
    #[error("failed reading table '{}' (row {row}): {source}", path.display())]
    TableRead {
        path: PathBuf,
        row: usize,
        source: TableFileError,
    },
    #[error("failed to reserve storage for {requested} spectrum values: {source}")]
    Allocation {
        requested: usize,
        source: TryReserveError,
    },
    #[error("spectrum at grid corner {corner:?} of table '{}' is not resident", path.display())]
    CornerNotLoaded { path: PathBuf, corner: GridIndex },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),
}

impl XillverError {
    pub fn table_format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::TableFormat {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::TableNotFound { .. } | Self::TableRead { .. } | Self::Diagnostics(_) => {
                ErrorCategory::IoSystemError
            }
            Self::TableFormat { .. } => ErrorCategory::TableFormatError,
            Self::Allocation { .. } => ErrorCategory::ResourceError,
            Self::CornerNotLoaded { .. } => ErrorCategory::InternalError,
            Self::Config(_) => ErrorCategory::InputValidationError,
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::TableNotFound { .. } => "IO.TABLE_NOT_FOUND",
            Self::TableFormat { .. } => "TABLE.FORMAT",
            Self::TableRead { .. } => "IO.TABLE_READ",
            Self::Allocation { .. } => "SYS.ALLOCATION",
            Self::CornerNotLoaded { .. } => "SYS.CACHE",
            Self::Config(_) => "INPUT.CONFIG",
            Self::Diagnostics(_) => "IO.OUTFILE",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}
