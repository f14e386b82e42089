// targetry-core/src/error.rs

use crate::domain::error::ConfigError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TargetryError {
    // --- PROFILE VALIDATION (deterministic, never retried) ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    // --- INFRASTRUCTURE (IO, Parsing, Templates) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<std::io::Error> for TargetryError {
    fn from(err: std::io::Error) -> Self {
        TargetryError::Infrastructure(InfrastructureError::Io(err))
    }
}
