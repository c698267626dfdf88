use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric error codes reported as the process exit status.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Configuration errors (100-199)
    ConfigurationGeneral = 100,
    JobNotFound = 101,
    InvalidJob = 102,
    InvalidUrl = 103,
    ImodelNotFound = 104,

    // Database / engine errors (200-299)
    DatabaseGeneral = 200,
    ColumnOutOfRange = 201,
    InvalidElementId = 202,
    InvalidIdList = 203,
    GeometryFailed = 204,

    // File system errors (300-399)
    FileSystem = 300,

    // Download errors (400-499)
    DownloadFailed = 400,
    DownloadAborted = 401,
}

/// Errors raised while exporting query results
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not find the job description at '{0}'")]
    JobNotFound(String),

    #[error("Invalid job description: {0}")]
    InvalidJob(String),

    #[error("Error in parsing url from query: {0}")]
    InvalidUrl(String),

    #[error("Could not find the iModel at location '{0}'")]
    ImodelNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Column index {index} is out of range (column count {count})")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("Invalid element id: {0}")]
    InvalidElementId(String),

    #[error("Id column does not hold a JSON array of element ids: {0}")]
    InvalidIdList(String),

    #[error("Mass properties calculation failed: {0}")]
    Geometry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint download failed: {0}")]
    Download(String),

    #[error("Checkpoint download aborted by progress callback")]
    DownloadAborted,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for ExporterError {
    fn from(error: reqwest::Error) -> Self {
        ExporterError::Download(error.to_string())
    }
}

impl ExporterError {
    /// Error-specific code, when the error carries one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ExporterError::Config(_) => Some(ErrorCode::ConfigurationGeneral),
            ExporterError::JobNotFound(_) => Some(ErrorCode::JobNotFound),
            ExporterError::InvalidJob(_) => Some(ErrorCode::InvalidJob),
            ExporterError::InvalidUrl(_) => Some(ErrorCode::InvalidUrl),
            ExporterError::ImodelNotFound(_) => Some(ErrorCode::ImodelNotFound),
            ExporterError::Database(_) => Some(ErrorCode::DatabaseGeneral),
            ExporterError::ColumnOutOfRange { .. } => Some(ErrorCode::ColumnOutOfRange),
            ExporterError::InvalidElementId(_) => Some(ErrorCode::InvalidElementId),
            ExporterError::InvalidIdList(_) => Some(ErrorCode::InvalidIdList),
            ExporterError::Geometry(_) => Some(ErrorCode::GeometryFailed),
            ExporterError::Io(_) => Some(ErrorCode::FileSystem),
            ExporterError::Download(_) => Some(ErrorCode::DownloadFailed),
            ExporterError::DownloadAborted => Some(ErrorCode::DownloadAborted),
            ExporterError::Unknown(_) => None,
        }
    }

    /// Process exit status for this error: its code, or -1 when it has none.
    pub fn error_number(&self) -> i32 {
        self.code().map(|code| code as i32).unwrap_or(-1)
    }

    /// Short name of the error category, printed before the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ExporterError::Config(_)
            | ExporterError::JobNotFound(_)
            | ExporterError::InvalidJob(_)
            | ExporterError::InvalidUrl(_)
            | ExporterError::ImodelNotFound(_) => "ConfigurationError",
            ExporterError::Database(_)
            | ExporterError::ColumnOutOfRange { .. }
            | ExporterError::InvalidElementId(_)
            | ExporterError::InvalidIdList(_) => "DatabaseError",
            ExporterError::Geometry(_) => "GeometryError",
            ExporterError::Io(_) => "IoError",
            ExporterError::Download(_) | ExporterError::DownloadAborted => "DownloadError",
            ExporterError::Unknown(_) => "UnknownError",
        }
    }

    /// True for errors detected before the database is touched.
    pub fn is_configuration(&self) -> bool {
        matches!(self.code(), Some(code) if (code as i32) < 200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_numbers() {
        assert_eq!(ExporterError::InvalidUrl("x".into()).error_number(), 103);
        assert_eq!(ExporterError::DownloadAborted.error_number(), 401);
        assert_eq!(ExporterError::Unknown("boom".into()).error_number(), -1);
    }

    #[test]
    fn test_configuration_classification() {
        assert!(ExporterError::JobNotFound("job.json".into()).is_configuration());
        assert!(!ExporterError::Geometry("kernel".into()).is_configuration());
        assert!(!ExporterError::Unknown("?".into()).is_configuration());
        assert_eq!(ExporterError::ColumnOutOfRange { index: 4, count: 3 }.kind(), "DatabaseError");
    }
}
