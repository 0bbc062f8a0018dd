use specmatch::SpecMatchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scoring error: {0}")]
    SpecMatch(#[from] SpecMatchError),

    #[error("Data reading error: {0}")]
    DataReading(String),
}
