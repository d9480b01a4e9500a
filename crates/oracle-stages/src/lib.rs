//! Oracle Stages: the price-feed programs run by the oracle host.
//!
//! Every program pairs one execution stage with the median tally.
//!
//! # Flow
//!
//! ```text
//! node 1: fetch quote → score/scale → report ┐
//! node 2: fetch quote → score/scale → report ├→ in-consensus → median → result
//! node n: fetch quote → score/scale → report ┘
//! ```

mod catalog;
mod direct_quote;
mod ltv_score;
mod median_tally;
pub mod scoring;

pub use catalog::{
    brent_price_program, wbtc_ltv_program, Catalog, CatalogSettings, BRENT_PRICE, WBTC_LTV,
};
pub use direct_quote::{scale_price, DirectQuoteStage, PRICE_SCALE};
pub use ltv_score::{LtvScoreStage, MarketPair};
pub use median_tally::{consensus_values, lower_median, MedianTallyStage};
pub use scoring::{LtvAssessment, LtvComponents, LtvModel};
