//! Stage traits: the two contracts every oracle program implements
use crate::context::HostContext;
use crate::data_model::Reveal;
use crate::fetch::HttpFetch;
use async_trait::async_trait;

/// Per-node computation: fetch one external observation and emit one report.
#[async_trait]
pub trait ExecutionStage: Send + Sync {
    /// Unique stage id (ex: "execute.ltv.cmc.v1")
    fn id(&self) -> &'static str;

    /// Execution stages read the network, so they are not deterministic
    /// unless a stage says otherwise.
    fn deterministic(&self) -> bool {
        false
    }

    /// Run the stage over the request payload. Exactly one fetch per call.
    async fn run(
        &self,
        input: &[u8],
        ctx: &HostContext,
        http: &dyn HttpFetch,
    ) -> Result<Vec<u8>, StageError>;
}

/// Aggregation over the reveals of all reporting nodes.
pub trait TallyStage: Send + Sync {
    /// Unique stage id (ex: "tally.median.u64.v1")
    fn id(&self) -> &'static str;

    fn deterministic(&self) -> bool {
        true
    }

    /// Reduce `reveals` to one payload. `input` is the tally side payload.
    fn run(
        &self,
        input: &[u8],
        ctx: &HostContext,
        reveals: &[Reveal],
    ) -> Result<Vec<u8>, StageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Non-200 status or transport failure. `status` is 0 when no response arrived.
    Fetch { status: u16, message: String },
    /// Response body or reveal payload could not be decoded.
    Decode(String),
    /// No in-consensus reveals were left to aggregate.
    EmptyInput,
}

impl StageError {
    pub fn fetch(status: u16, message: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Failure is binary: every error surfaces to the host as exit code 1.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Fetch { status: 0, message } => write!(f, "FETCH/TRANSPORT: {}", message),
            Self::Fetch { status, message } => write!(f, "FETCH/STATUS {}: {}", status, message),
            Self::Decode(msg) => write!(f, "DECODE/PAYLOAD: {}", msg),
            Self::EmptyInput => write!(f, "TALLY/EMPTY: no reveals in consensus"),
        }
    }
}

impl std::error::Error for StageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_codes() {
        assert_eq!(
            StageError::fetch(429, "Rate limit exceeded").to_string(),
            "FETCH/STATUS 429: Rate limit exceeded"
        );
        assert_eq!(
            StageError::fetch(0, "connection refused").to_string(),
            "FETCH/TRANSPORT: connection refused"
        );
        assert!(StageError::EmptyInput.to_string().starts_with("TALLY/EMPTY"));
    }

    #[test]
    fn test_every_error_exits_with_one() {
        for err in [
            StageError::fetch(500, "API Error"),
            StageError::decode("missing price"),
            StageError::EmptyInput,
        ] {
            assert_eq!(err.exit_code(), 1);
        }
    }
}
