use thiserror::Error;

pub mod types;
pub mod utils;
pub mod env;
pub mod geocode;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
}
