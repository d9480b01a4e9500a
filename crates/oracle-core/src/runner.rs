//! Program Runner: invokes the stages of one program and records each call
use crate::context::HostContext;
use crate::data_model::{Reveal, VmResult};
use crate::fetch::HttpFetch;
use crate::stage::{ExecutionStage, StageError, TallyStage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::Instrument;

/// An execution stage and the tally stage that aggregates its reports.
pub struct OracleProgram {
    pub id: String,
    pub execution: Box<dyn ExecutionStage>,
    pub tally: Box<dyn TallyStage>,
}

impl OracleProgram {
    pub fn new(
        id: impl Into<String>,
        execution: Box<dyn ExecutionStage>,
        tally: Box<dyn TallyStage>,
    ) -> Self {
        Self {
            id: id.into(),
            execution,
            tally,
        }
    }
}

/// Audit record of one stage invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage_id: String,
    pub in_hash: String,
    pub out_hash: String,
    pub deterministic: bool,
    pub latency_ms: u64,
    pub exit_code: u8,
    pub finished_at: DateTime<Utc>,
}

pub struct ProgramRunner {
    program: OracleProgram,
}

impl ProgramRunner {
    pub fn new(program: OracleProgram) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &OracleProgram {
        &self.program
    }

    /// Run the execution stage. Errors become exit code 1, never a panic or `Err`.
    pub async fn execute(
        &self,
        input: &[u8],
        ctx: &HostContext,
        http: &dyn HttpFetch,
    ) -> (VmResult, StageRecord) {
        let stage = self.program.execution.as_ref();
        let span = tracing::info_span!(
            "execute",
            program = %self.program.id,
            stage = stage.id(),
            trace_id = %ctx.trace_id,
            node = ctx.node_id.as_deref().unwrap_or("-")
        );

        async {
            self.check_context(ctx);
            let start = Instant::now();
            let outcome = stage.run(input, ctx, http).await;
            let result = self.settle(outcome);
            let record = self.record(stage.id(), stage.deterministic(), input, &result, start);
            (result, record)
        }
        .instrument(span)
        .await
    }

    /// Run the tally stage over the collected reveals.
    pub fn tally(
        &self,
        input: &[u8],
        ctx: &HostContext,
        reveals: &[Reveal],
    ) -> (VmResult, StageRecord) {
        let stage = self.program.tally.as_ref();
        let _span = tracing::info_span!(
            "tally",
            program = %self.program.id,
            stage = stage.id(),
            trace_id = %ctx.trace_id,
            reveals = reveals.len()
        )
        .entered();

        self.check_context(ctx);
        let start = Instant::now();
        let outcome = stage.run(input, ctx, reveals);
        let result = self.settle(outcome);
        let record = self.record(stage.id(), stage.deterministic(), input, &result, start);
        (result, record)
    }

    fn check_context(&self, ctx: &HostContext) {
        if ctx.program_id != self.program.id {
            tracing::warn!(
                host_program = %ctx.program_id,
                "host context names a different program"
            );
        }
    }

    fn settle(&self, outcome: Result<Vec<u8>, StageError>) -> VmResult {
        match outcome {
            Ok(bytes) => VmResult::success(bytes),
            Err(err) => {
                tracing::warn!(error = %err, "stage failed");
                VmResult::failure(&err)
            }
        }
    }

    fn record(
        &self,
        stage_id: &str,
        deterministic: bool,
        input: &[u8],
        result: &VmResult,
        start: Instant,
    ) -> StageRecord {
        StageRecord {
            stage_id: stage_id.to_string(),
            in_hash: hash_bytes(input),
            out_hash: hash_bytes(&result.result),
            deterministic,
            latency_ms: start.elapsed().as_millis() as u64,
            exit_code: result.exit_code,
            finished_at: Utc::now(),
        }
    }
}

fn hash_bytes(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{decode_u64_le, encode_u64_le};
    use crate::fetch::{CannedFetch, HttpFetchOptions, HttpResponse};
    use async_trait::async_trait;

    struct Fixed(u64);

    #[async_trait]
    impl ExecutionStage for Fixed {
        fn id(&self) -> &'static str {
            "execute.fixed.test"
        }

        async fn run(
            &self,
            _input: &[u8],
            _ctx: &HostContext,
            http: &dyn HttpFetch,
        ) -> Result<Vec<u8>, StageError> {
            let resp = http
                .fetch("https://feed.test/price", &HttpFetchOptions::default())
                .await?;
            if !resp.is_ok() {
                return Err(StageError::fetch(resp.status, resp.text()));
            }
            Ok(encode_u64_le(self.0).to_vec())
        }
    }

    struct First;

    impl TallyStage for First {
        fn id(&self) -> &'static str {
            "tally.first.test"
        }

        fn run(
            &self,
            _input: &[u8],
            _ctx: &HostContext,
            reveals: &[Reveal],
        ) -> Result<Vec<u8>, StageError> {
            let first = reveals.first().ok_or(StageError::EmptyInput)?;
            decode_u64_le(&first.result)?;
            Ok(first.result.clone())
        }
    }

    fn runner() -> ProgramRunner {
        ProgramRunner::new(OracleProgram::new("fixed", Box::new(Fixed(7)), Box::new(First)))
    }

    #[tokio::test]
    async fn test_execute_success_and_record() {
        let http = CannedFetch::new();
        let ctx = HostContext::new("fixed");
        let (result, record) = runner().execute(b"", &ctx, &http).await;

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.report(), Some(7));
        assert_eq!(record.stage_id, "execute.fixed.test");
        assert!(!record.deterministic);
        assert!(record.out_hash.starts_with("blake3:"));
    }

    #[tokio::test]
    async fn test_execute_failure_maps_to_exit_one() {
        let http = CannedFetch::new().always(HttpResponse::new(500, "API Error"));
        let ctx = HostContext::new("fixed");
        let (result, record) = runner().execute(b"", &ctx, &http).await;

        assert_eq!(result.exit_code, 1);
        assert!(result.result.is_empty());
        assert_eq!(record.exit_code, 1);
        assert!(result.error.unwrap().contains("500"));
    }

    #[test]
    fn test_tally_errors_and_determinism() {
        let ctx = HostContext::new("fixed");
        let runner = runner();

        let (empty, _) = runner.tally(b"", &ctx, &[]);
        assert_eq!(empty.exit_code, 1);

        let reveals = vec![Reveal::agreeing(9)];
        let (a, rec_a) = runner.tally(b"", &ctx, &reveals);
        let (b, rec_b) = runner.tally(b"", &ctx, &reveals);
        assert_eq!(a, b);
        assert_eq!(rec_a.out_hash, rec_b.out_hash);
        assert!(rec_a.deterministic);
    }
}
