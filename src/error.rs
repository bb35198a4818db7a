use thiserror::Error;

#[derive(Error, Debug)]
pub enum BursarError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend returned {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Invalid payment: {0}")]
    Validation(String),

    #[error("Unknown fee structure: {0}")]
    UnknownStructure(i64),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("No cache found. Run `bursar init` first.")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BursarError>;
