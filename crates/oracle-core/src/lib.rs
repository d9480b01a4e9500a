//! Oracle Core: stage contracts, runner and reveal data model
//!
//! Generic two-stage core for oracle programs: an execution stage that turns
//! one external observation into an 8-byte report, and a tally stage that
//! reduces the reports of many nodes into one result.

pub mod context;
pub mod data_model;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod runner;
pub mod stage;

pub use context::HostContext;
pub use data_model::{
    ExecutionReport, ExecutionResult, MarketQuote, PriceFeed, Reveal, RevealSet, TallyResult,
    VmResult,
};
pub use encoding::{decode_u64_le, encode_u64_le, REPORT_LEN};
pub use error::OracleError;
pub use fetch::{CannedFetch, HttpFetch, HttpFetchOptions, HttpResponse};
pub use runner::{OracleProgram, ProgramRunner, StageRecord};
pub use stage::{ExecutionStage, StageError, TallyStage};

/// Oracle core version
pub const ORACLE_VERSION: &str = "1.0.0";
