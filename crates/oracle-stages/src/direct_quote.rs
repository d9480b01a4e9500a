use async_trait::async_trait;
use oracle_core::{
    encode_u64_le, ExecutionStage, HostContext, HttpFetch, HttpFetchOptions, PriceFeed,
    StageError,
};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Fixed-point scale of reported prices (6 decimals).
pub const PRICE_SCALE: f64 = 1_000_000.0;

pub const DEFAULT_SYMBOL: &str = "BRENT";

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: GlobalQuote,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    /// Alpha Vantage sends prices as decimal strings ("85.6400").
    #[serde(rename = "05. price")]
    price: Value,
}

/// Reports the latest quote of one symbol as `round(price * 10^6)`.
pub struct DirectQuoteStage {
    feed: PriceFeed,
}

impl DirectQuoteStage {
    pub fn new(feed: PriceFeed) -> Self {
        Self { feed }
    }

    fn quote_url(&self, symbol: &str) -> Result<Url, StageError> {
        Url::parse_with_params(
            &self.feed.endpoint("query"),
            &[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.feed.api_key.as_str()),
            ],
        )
        .map_err(|e| StageError::fetch(0, format!("bad feed url: {}", e)))
    }
}

#[async_trait]
impl ExecutionStage for DirectQuoteStage {
    fn id(&self) -> &'static str {
        "execute.quote.alphavantage.v1"
    }

    async fn run(
        &self,
        input: &[u8],
        _ctx: &HostContext,
        http: &dyn HttpFetch,
    ) -> Result<Vec<u8>, StageError> {
        let symbol = request_symbol(input)?;
        tracing::info!(symbol = %symbol, "fetching latest quote");

        let url = self.quote_url(&symbol)?;
        let response = http.fetch(url.as_str(), &HttpFetchOptions::default()).await?;
        if !response.is_ok() {
            tracing::error!(
                status = response.status,
                body = %response.text(),
                "quote request rejected"
            );
            return Err(StageError::fetch(response.status, response.text()));
        }

        let price = parse_global_quote(&response.bytes)?;
        let scaled = scale_price(price)?;
        tracing::info!(price, scaled, "reporting quote");

        Ok(encode_u64_le(scaled).to_vec())
    }
}

fn request_symbol(input: &[u8]) -> Result<String, StageError> {
    let text = std::str::from_utf8(input)
        .map_err(|e| StageError::decode(format!("request payload is not UTF-8: {}", e)))?
        .trim();
    if text.is_empty() {
        Ok(DEFAULT_SYMBOL.to_string())
    } else {
        Ok(text.to_uppercase())
    }
}

fn parse_global_quote(body: &[u8]) -> Result<f64, StageError> {
    let parsed: GlobalQuoteResponse =
        serde_json::from_slice(body).map_err(|e| StageError::decode(e.to_string()))?;

    match parsed.global_quote.price {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| StageError::decode(format!("price '{}' is not a number", s))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| StageError::decode("price is not representable")),
        other => Err(StageError::decode(format!("unexpected price value {}", other))),
    }
}

/// `round(price * 10^6)`; non-positive, non-finite and overflowing prices are rejected.
pub fn scale_price(price: f64) -> Result<u64, StageError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(StageError::decode(format!("invalid price {}", price)));
    }
    let scaled = (price * PRICE_SCALE).round();
    if scaled >= u64::MAX as f64 {
        return Err(StageError::decode(format!("price {} overflows the report", price)));
    }
    Ok(scaled as u64)
}
