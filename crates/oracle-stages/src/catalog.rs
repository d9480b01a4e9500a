//! Program catalog: the oracle programs a host can invoke by id
use crate::{DirectQuoteStage, LtvModel, LtvScoreStage, MedianTallyStage};
use oracle_core::{OracleError, OracleProgram, PriceFeed};
use serde::{Deserialize, Serialize};

pub const BRENT_PRICE: &str = "brent-price";
pub const WBTC_LTV: &str = "wbtc-ltv";

/// Feeds and scoring parameters the programs are built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub alpha_vantage: PriceFeed,
    pub coin_market_cap: PriceFeed,
    pub ltv: LtvModel,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            alpha_vantage: PriceFeed::alpha_vantage("demo"),
            coin_market_cap: PriceFeed::coin_market_cap(""),
            ltv: LtvModel::default(),
        }
    }
}

/// Brent crude spot price, scaled by 10^6, median-tallied.
pub fn brent_price_program(feed: PriceFeed) -> OracleProgram {
    OracleProgram::new(
        BRENT_PRICE,
        Box::new(DirectQuoteStage::new(feed)),
        Box::new(MedianTallyStage),
    )
}

/// WBTC/USDC dynamic LTV percentage, median-tallied. Rejects an invalid model.
pub fn wbtc_ltv_program(feed: PriceFeed, model: LtvModel) -> Result<OracleProgram, OracleError> {
    Ok(OracleProgram::new(
        WBTC_LTV,
        Box::new(LtvScoreStage::new(feed, model)?),
        Box::new(MedianTallyStage),
    ))
}

#[derive(Debug, Clone)]
pub struct Catalog {
    settings: CatalogSettings,
}

impl Catalog {
    pub fn new(settings: CatalogSettings) -> Result<Self, OracleError> {
        settings.ltv.validate()?;
        Ok(Self { settings })
    }

    pub fn program_ids(&self) -> &'static [&'static str] {
        &[BRENT_PRICE, WBTC_LTV]
    }

    pub fn build(&self, id: &str) -> Result<OracleProgram, OracleError> {
        match id {
            BRENT_PRICE => Ok(brent_price_program(self.settings.alpha_vantage.clone())),
            WBTC_LTV => wbtc_ltv_program(
                self.settings.coin_market_cap.clone(),
                self.settings.ltv.clone(),
            ),
            other => Err(OracleError::UnknownProgram(other.to_string())),
        }
    }
}
