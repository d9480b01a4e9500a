//! Data Model: MarketQuote, Reveal, VmResult
use crate::encoding::{decode_u64_le, encode_u64_le, REPORT_LEN};
use crate::stage::StageError;
use serde::{Deserialize, Serialize};

/// 24h market snapshot as reported by a price feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub price: f64,
    pub percent_change_24h: f64,
    pub volume_24h: f64,
}

impl MarketQuote {
    pub fn new(price: f64, percent_change_24h: f64, volume_24h: f64) -> Self {
        Self {
            price,
            percent_change_24h,
            volume_24h,
        }
    }

    /// Reject quotes no scoring rule can use.
    pub fn validate(&self) -> Result<(), StageError> {
        let fields = [
            ("price", self.price),
            ("percent_change_24h", self.percent_change_24h),
            ("volume_24h", self.volume_24h),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(StageError::decode(format!("{} is not finite", name)));
            }
        }
        if self.price <= 0.0 {
            return Err(StageError::decode(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

/// One execution-stage report: a scaled price or an integer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionReport(pub u64);

impl ExecutionReport {
    pub fn to_bytes(self) -> [u8; REPORT_LEN] {
        encode_u64_le(self.0)
    }
}

/// One node's execution output plus consensus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reveal {
    pub exit_code: u8,
    pub gas_used: u64,
    pub in_consensus: bool,
    pub result: Vec<u8>,
}

impl Reveal {
    /// A successful, in-consensus reveal of `value`.
    pub fn agreeing(value: u64) -> Self {
        Self {
            exit_code: 0,
            gas_used: 0,
            in_consensus: true,
            result: encode_u64_le(value).to_vec(),
        }
    }

    pub fn outlier(value: u64) -> Self {
        Self {
            in_consensus: false,
            ..Self::agreeing(value)
        }
    }
}

pub type RevealSet = Vec<Reveal>;

/// Outcome handed back to the host by either stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmResult {
    pub exit_code: u8,
    pub result: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VmResult {
    pub fn success(result: Vec<u8>) -> Self {
        Self {
            exit_code: 0,
            result,
            error: None,
        }
    }

    /// Failed stages carry no result payload.
    pub fn failure(err: &StageError) -> Self {
        Self {
            exit_code: err.exit_code(),
            result: Vec::new(),
            error: Some(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// The decoded report, when the payload is a well-formed 8-byte value.
    pub fn report(&self) -> Option<u64> {
        if self.is_success() {
            decode_u64_le(&self.result).ok()
        } else {
            None
        }
    }
}

pub type ExecutionResult = VmResult;
pub type TallyResult = VmResult;

/// Endpoint and credentials of one price-feed provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeed {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl PriceFeed {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Alpha Vantage public endpoint
    pub fn alpha_vantage(api_key: impl Into<String>) -> Self {
        Self::new("https://www.alphavantage.co", api_key)
    }

    /// CoinMarketCap pro endpoint
    pub fn coin_market_cap(api_key: impl Into<String>) -> Self {
        Self::new("https://pro-api.coinmarketcap.com", api_key)
    }

    /// Join `path` onto the base url without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_validation() {
        assert!(MarketQuote::new(50_000.0, 2.5, 1e8).validate().is_ok());
        assert!(MarketQuote::new(0.0, 2.5, 1e8).validate().is_err());
        assert!(MarketQuote::new(-1.0, 2.5, 1e8).validate().is_err());
        assert!(MarketQuote::new(50_000.0, f64::NAN, 1e8).validate().is_err());
        assert!(MarketQuote::new(50_000.0, 1.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_reveal_json_uses_host_field_names() {
        let reveal = Reveal::agreeing(72);
        let json = serde_json::to_value(&reveal).unwrap();
        assert_eq!(json["exitCode"], 0);
        assert_eq!(json["gasUsed"], 0);
        assert_eq!(json["inConsensus"], true);
        assert_eq!(json["result"].as_array().unwrap().len(), 8);

        let back: Reveal = serde_json::from_value(json).unwrap();
        assert_eq!(back, reveal);
    }

    #[test]
    fn test_failure_has_no_payload() {
        let result = VmResult::failure(&StageError::EmptyInput);
        assert_eq!(result.exit_code, 1);
        assert!(result.result.is_empty());
        assert_eq!(result.report(), None);
    }

    #[test]
    fn test_endpoint_join() {
        let feed = PriceFeed::new("http://localhost:9000/", "k");
        assert_eq!(feed.endpoint("/query"), "http://localhost:9000/query");
    }
}
