//! Fixed-width report codec shared by both stages.
use crate::stage::StageError;

/// Every report and reveal payload is exactly this many bytes.
pub const REPORT_LEN: usize = 8;

pub fn encode_u64_le(value: u64) -> [u8; REPORT_LEN] {
    value.to_le_bytes()
}

/// Decode an unsigned little-endian report. Any other length is rejected.
pub fn decode_u64_le(bytes: &[u8]) -> Result<u64, StageError> {
    let raw: [u8; REPORT_LEN] = bytes.try_into().map_err(|_| {
        StageError::Decode(format!(
            "expected {} byte report, got {} bytes",
            REPORT_LEN,
            bytes.len()
        ))
    })?;
    Ok(u64::from_le_bytes(raw))
}
