//! Error types for the Soroban RPC client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SorobanError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("RPC response for {0} has neither result nor error")]
    MissingResult(String),
}

pub type Result<T> = std::result::Result<T, SorobanError>;
