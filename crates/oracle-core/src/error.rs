//! Host-level error model
use crate::stage::StageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("PROGRAM/UNKNOWN: {0}")]
    UnknownProgram(String),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("STAGE/{0}")]
    Stage(#[from] StageError),
}
