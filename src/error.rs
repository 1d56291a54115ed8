use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Dispensary not found in sales data: {0}")]
    MissingDispensary(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("{0}")]
    General(String),
}
