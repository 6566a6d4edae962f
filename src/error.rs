use thiserror::Error;

/// Everything that can stop an update request from producing chart data.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' is not numeric")]
    NonNumericColumn(String),

    #[error("column '{column}' is not a permitted {role}")]
    ColumnNotAllowed { column: String, role: &'static str },

    #[error("unsupported aggregation '{0}'")]
    InvalidAggregation(String),

    #[error("invalid range for '{column}': {detail}")]
    InvalidRange { column: String, detail: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("x value {value} of '{column}' does not fall on the axis grid")]
    OffGridValue { column: String, value: f64 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data error: {0}")]
    Data(String),
}

impl ExplorerError {
    /// Validation failures the caller can fix by changing the request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ExplorerError::UnknownColumn(_)
                | ExplorerError::NonNumericColumn(_)
                | ExplorerError::ColumnNotAllowed { .. }
                | ExplorerError::InvalidAggregation(_)
                | ExplorerError::InvalidRange { .. }
                | ExplorerError::InvalidRequest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
