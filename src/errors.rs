use serde::Serialize;

/// All application errors, categorized by domain.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Ingestion ──
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Validation failed at row {row}: {message}")]
    InvalidRow { row: usize, message: String },

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("Parse error at row {row}, column '{column}': {message}")]
    Parse {
        row: usize,
        column: String,
        message: String,
    },

    #[error("Invalid CSV format: {0}")]
    InvalidCsvFormat(String),

    // ── Files ──
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to write file: {0}")]
    FileWrite(String),

    // ── Database ──
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    // ── Data frames ──
    #[error("Data frame error: {0}")]
    DataFrame(String),

    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Serialization ──
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// True for the errors the ingestion layer reports as validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingFields(_) | AppError::InvalidRow { .. } | AppError::InvalidTrade(_)
        )
    }

    /// True for malformed timestamp, numeric or enum cells.
    pub fn is_parse(&self) -> bool {
        matches!(self, AppError::Parse { .. })
    }
}

/// Serializable error response for presentation callers.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::MissingFields(_) => "VALIDATION",
            AppError::InvalidRow { .. } => "VALIDATION",
            AppError::InvalidTrade(_) => "VALIDATION",
            AppError::Parse { .. } => "PARSE",
            AppError::InvalidCsvFormat(_) => "INVALID_CSV_FORMAT",
            AppError::FileNotFound(_) => "FILE_NOT_FOUND",
            AppError::FileRead(_) => "FILE_READ",
            AppError::FileWrite(_) => "FILE_WRITE",
            AppError::Database(_) => "DATABASE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DataFrame(_) => "DATA_FRAME",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::Serialization(_) => "SERIALIZATION",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileRead(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::InvalidCsvFormat(err.to_string())
    }
}

impl From<polars::error::PolarsError> for AppError {
    fn from(err: polars::error::PolarsError) -> Self {
        AppError::DataFrame(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_every_name() {
        let err = AppError::MissingFields(vec!["Open Time".into(), "Close Time".into()]);
        assert_eq!(err.to_string(), "Missing required fields: Open Time, Close Time");
        assert!(err.is_validation());
        assert!(!err.is_parse());
    }

    #[test]
    fn error_serializes_with_code() {
        let err = AppError::Parse {
            row: 3,
            column: "Open Time".into(),
            message: "bad".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "PARSE");
        assert!(json["message"].as_str().unwrap().contains("row 3"));
    }
}
