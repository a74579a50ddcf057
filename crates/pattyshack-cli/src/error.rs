use std::io;

use pattyshack_core::gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pattyshack_core::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Supabase is not configured. Run `patty config init` or set PATTYSHACK_SUPABASE_URL and PATTYSHACK_SUPABASE_ANON_KEY."
    )]
    NotConfigured,
}
