use oracle_core::{decode_u64_le, encode_u64_le, HostContext, Reveal, StageError, TallyStage};

/// Median of the in-consensus reveals.
///
/// With an even count the lower of the two middle values wins, so the
/// result is always one of the reported values.
#[derive(Debug, Default, Clone, Copy)]
pub struct MedianTallyStage;

impl TallyStage for MedianTallyStage {
    fn id(&self) -> &'static str {
        "tally.median.u64.v1"
    }

    fn run(
        &self,
        _input: &[u8],
        _ctx: &HostContext,
        reveals: &[Reveal],
    ) -> Result<Vec<u8>, StageError> {
        let mut values = consensus_values(reveals)?;
        let median = lower_median(&mut values).ok_or(StageError::EmptyInput)?;

        tracing::info!(
            reveals = reveals.len(),
            in_consensus = values.len(),
            median,
            "tally complete"
        );
        Ok(encode_u64_le(median).to_vec())
    }
}

/// Decode every in-consensus reveal. One malformed payload fails the batch.
pub fn consensus_values(reveals: &[Reveal]) -> Result<Vec<u64>, StageError> {
    reveals
        .iter()
        .filter(|r| r.in_consensus)
        .map(|r| decode_u64_le(&r.result))
        .collect()
}

/// Sorts `values` in place and returns the element at `(n - 1) / 2`.
pub fn lower_median(values: &mut [u64]) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    Some(values[(values.len() - 1) / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(reveals: &[Reveal]) -> Result<u64, StageError> {
        let ctx = HostContext::new("test");
        let out = MedianTallyStage.run(b"", &ctx, reveals)?;
        decode_u64_le(&out)
    }

    #[test]
    fn test_odd_count_takes_middle() {
        let reveals: Vec<_> = [72, 71, 73].into_iter().map(Reveal::agreeing).collect();
        assert_eq!(tally(&reveals).unwrap(), 72);

        let reveals: Vec<_> = [72, 90, 73].into_iter().map(Reveal::agreeing).collect();
        assert_eq!(tally(&reveals).unwrap(), 73);
    }

    #[test]
    fn test_even_count_takes_lower_middle() {
        let mut values = vec![73, 72];
        assert_eq!(lower_median(&mut values), Some(72));
        let mut values = vec![4, 1, 3, 2];
        assert_eq!(lower_median(&mut values), Some(2));
    }

    #[test]
    fn test_outliers_out_of_consensus_are_ignored() {
        let reveals = vec![Reveal::agreeing(72), Reveal::outlier(90), Reveal::agreeing(73)];
        assert_eq!(tally(&reveals).unwrap(), 72);
    }

    #[test]
    fn test_empty_and_all_filtered() {
        assert_eq!(tally(&[]), Err(StageError::EmptyInput));
        let reveals = vec![Reveal::outlier(1), Reveal::outlier(2)];
        assert_eq!(tally(&reveals), Err(StageError::EmptyInput));
    }

    #[test]
    fn test_bad_payload_poisons_batch() {
        let mut bad = Reveal::agreeing(0);
        bad.result = vec![1, 2, 3];
        let reveals = vec![Reveal::agreeing(72), bad, Reveal::agreeing(73)];
        assert!(matches!(tally(&reveals), Err(StageError::Decode(_))));
    }

    #[test]
    fn test_bad_payload_out_of_consensus_is_skipped() {
        let mut bad = Reveal::outlier(0);
        bad.result = vec![0xff; 3];
        let reveals = vec![Reveal::agreeing(5), bad];
        assert_eq!(tally(&reveals).unwrap(), 5);
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let reveals: Vec<_> = [u64::MAX, 0, u64::MAX - 1]
            .into_iter()
            .map(Reveal::agreeing)
            .collect();
        assert_eq!(tally(&reveals).unwrap(), u64::MAX - 1);
    }
}
