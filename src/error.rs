//! Error types raised by the calculator and its catalogs

use thiserror::Error;

/// Failure while reading materials from a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed material document '{id}': {source}")]
    Document {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// The two error classes a calculation can end with
#[derive(Error, Debug)]
pub enum CalcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("data source error: {0}")]
    DataSource(#[from] CatalogError),
}

impl CalcError {
    /// HTTP status the surrounding web layer answers with
    pub fn status_code(&self) -> u16 {
        match self {
            CalcError::InvalidRequest(_) => 400,
            CalcError::DataSource(_) => 500,
        }
    }
}
