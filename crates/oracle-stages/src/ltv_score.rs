use crate::scoring::{LtvAssessment, LtvModel};
use async_trait::async_trait;
use oracle_core::{
    ExecutionReport, ExecutionStage, HostContext, HttpFetch, HttpFetchOptions, MarketQuote,
    OracleError, PriceFeed, StageError,
};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_PAIR: &str = "WBTC/USDC";

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

#[derive(Debug, Deserialize)]
struct QuotesLatestResponse {
    data: HashMap<String, AssetQuotes>,
}

#[derive(Debug, Deserialize)]
struct AssetQuotes {
    quote: HashMap<String, MarketQuote>,
}

/// Base asset and quote currency, e.g. WBTC priced in USDC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketPair {
    pub symbol: String,
    pub convert: String,
}

impl MarketPair {
    /// Parse `SYMBOL/CONVERT` (or `SYMBOL-CONVERT`). Empty input means the default pair.
    pub fn parse(input: &[u8]) -> Result<Self, StageError> {
        let text = std::str::from_utf8(input)
            .map_err(|e| StageError::decode(format!("request payload is not UTF-8: {}", e)))?
            .trim();
        let text = if text.is_empty() { DEFAULT_PAIR } else { text };

        let (symbol, convert) = text
            .split_once('/')
            .or_else(|| text.split_once('-'))
            .ok_or_else(|| {
                StageError::decode(format!("'{}' is not a SYMBOL/CONVERT pair", text))
            })?;

        let (symbol, convert) = (symbol.trim(), convert.trim());
        if symbol.is_empty() || convert.is_empty() {
            return Err(StageError::decode(format!("'{}' has an empty side", text)));
        }
        Ok(Self {
            symbol: symbol.to_uppercase(),
            convert: convert.to_uppercase(),
        })
    }
}

impl std::fmt::Display for MarketPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.symbol, self.convert)
    }
}

/// Fetches a 24h quote from CoinMarketCap and reports the scored LTV percentage.
pub struct LtvScoreStage {
    feed: PriceFeed,
    model: LtvModel,
}

impl LtvScoreStage {
    /// Fails when `model` does not pass [`LtvModel::validate`].
    pub fn new(feed: PriceFeed, model: LtvModel) -> Result<Self, OracleError> {
        model.validate()?;
        Ok(Self { feed, model })
    }

    fn quotes_url(&self, pair: &MarketPair) -> Result<Url, StageError> {
        Url::parse_with_params(
            &self.feed.endpoint("v1/cryptocurrency/quotes/latest"),
            &[("symbol", pair.symbol.as_str()), ("convert", pair.convert.as_str())],
        )
        .map_err(|e| StageError::fetch(0, format!("bad feed url: {}", e)))
    }
}

#[async_trait]
impl ExecutionStage for LtvScoreStage {
    fn id(&self) -> &'static str {
        "execute.ltv.coinmarketcap.v1"
    }

    async fn run(
        &self,
        input: &[u8],
        _ctx: &HostContext,
        http: &dyn HttpFetch,
    ) -> Result<Vec<u8>, StageError> {
        let pair = MarketPair::parse(input)?;
        tracing::info!(pair = %pair, "fetching market data");

        let url = self.quotes_url(&pair)?;
        let options =
            HttpFetchOptions::default().with_header(API_KEY_HEADER, self.feed.api_key.as_str());
        let response = http.fetch(url.as_str(), &options).await?;
        if !response.is_ok() {
            tracing::error!(
                status = response.status,
                body = %response.text(),
                "market data request rejected"
            );
            return Err(StageError::fetch(response.status, response.text()));
        }

        let quote = parse_quotes_latest(&response.bytes, &pair)?;
        tracing::info!(
            price = quote.price,
            percent_change_24h = quote.percent_change_24h,
            volume_24h = quote.volume_24h,
            "fetched quote"
        );

        let LtvAssessment { ltv, components } = self.model.assess(&quote)?;
        tracing::info!(
            ltv,
            base = components.base * 100.0,
            volume = components.volume * 100.0,
            volatility = components.volatility * 100.0,
            trend = components.trend * 100.0,
            "calculated dynamic LTV"
        );

        Ok(ExecutionReport(ltv).to_bytes().to_vec())
    }
}

fn parse_quotes_latest(body: &[u8], pair: &MarketPair) -> Result<MarketQuote, StageError> {
    let parsed: QuotesLatestResponse =
        serde_json::from_slice(body).map_err(|e| StageError::decode(e.to_string()))?;

    parsed
        .data
        .get(&pair.symbol)
        .and_then(|asset| asset.quote.get(&pair.convert))
        .copied()
        .ok_or_else(|| StageError::decode(format!("no {} quote in response", pair)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wbtc_usdc() -> MarketPair {
        MarketPair::parse(b"").unwrap()
    }

    #[test]
    fn test_pair_parsing() {
        assert_eq!(wbtc_usdc().to_string(), "WBTC/USDC");
        let dashed = MarketPair::parse(b"eth-usdt").unwrap();
        assert_eq!(dashed.symbol, "ETH");
        assert_eq!(dashed.convert, "USDT");
        assert!(MarketPair::parse(b"WBTC").is_err());
        assert!(MarketPair::parse(b"/USDC").is_err());
    }

    #[test]
    fn test_parse_nested_quote() {
        let body = br#"{"data":{"WBTC":{"quote":{"USDC":{
            "price": 50000.0, "percent_change_24h": 2.5, "volume_24h": 100000000.0
        }}}}}"#;
        let quote = parse_quotes_latest(body, &wbtc_usdc()).unwrap();
        assert_eq!(quote, MarketQuote::new(50_000.0, 2.5, 100_000_000.0));
    }

    #[test]
    fn test_missing_fields_and_wrong_types_rejected() {
        let missing = br#"{"data":{"WBTC":{"quote":{"USDC":{"price": 50000.0}}}}}"#;
        assert!(matches!(
            parse_quotes_latest(missing, &wbtc_usdc()),
            Err(StageError::Decode(_))
        ));

        let wrong_type = br#"{"data":{"WBTC":{"quote":{"USDC":{
            "price": "50000", "percent_change_24h": 2.5, "volume_24h": 1.0
        }}}}}"#;
        assert!(parse_quotes_latest(wrong_type, &wbtc_usdc()).is_err());

        let other_pair = br#"{"data":{"ETH":{"quote":{"USD":{
            "price": 1.0, "percent_change_24h": 0.0, "volume_24h": 1.0
        }}}}}"#;
        assert!(parse_quotes_latest(other_pair, &wbtc_usdc()).is_err());
    }
}
