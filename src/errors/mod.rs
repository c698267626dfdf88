mod error;

pub use error::{ErrorCode, ExporterError};

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExporterError>;
