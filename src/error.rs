use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode or decode draft document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transaction on {match_id} gave up after {attempts} conflicting attempts")]
    Contention { match_id: String, attempts: u32 },

    #[error("draft document {0} does not exist")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("champion catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("champion catalog returned no versions")]
    NoVersions,
}
