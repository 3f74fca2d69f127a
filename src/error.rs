use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Unsupported granularity: {0} (expected country, state or county)")]
    UnsupportedGranularity(String),

    #[error("Data availability error: {0}")]
    DataAvailability(String),

    #[error("Schema mismatch in column '{column}': {detail}")]
    SchemaMismatch { column: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl IntegrationError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        IntegrationError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn schema_mismatch(column: &str, detail: impl Into<String>) -> Self {
        IntegrationError::SchemaMismatch {
            column: column.to_string(),
            detail: detail.into(),
        }
    }

    /// Configuration-class failures abort the run with a descriptive message.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            IntegrationError::Configuration(_)
                | IntegrationError::MissingColumn { .. }
                | IntegrationError::UnsupportedGranularity(_)
        )
    }
}

impl From<polars::error::PolarsError> for IntegrationError {
    fn from(err: polars::error::PolarsError) -> Self {
        IntegrationError::Polars(err.to_string())
    }
}

/// A country/region name that could not be mapped to an ISO code.
///
/// Never fatal: the row keeps the `unresolved` code and simply matches nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unresolved location code for '{name}': {reason}")]
pub struct UnresolvedLocationCode {
    pub name: String,
    pub reason: String,
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
