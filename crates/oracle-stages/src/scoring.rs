//! Loan-to-value scoring
//!
//! Turns a 24h market snapshot into an integer LTV percentage. Starts from a
//! base ratio, loosens it for deep volume and upward momentum, tightens it
//! for volatility (harder on the way down), then rounds and clamps.

use oracle_core::{MarketQuote, OracleError, StageError};
use serde::{Deserialize, Serialize};

/// Parameters of the LTV heuristic. All impacts are fractions of 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LtvModel {
    pub base: f64,
    /// Volume is measured against `price * volume_scale`.
    pub volume_scale: f64,
    pub volume_cap: f64,
    pub downside_divisor: f64,
    pub downside_cap: f64,
    pub upside_divisor: f64,
    pub upside_cap: f64,
    pub trend_divisor: f64,
    pub trend_cap: f64,
    pub min_ltv: u64,
    pub max_ltv: u64,
}

impl Default for LtvModel {
    fn default() -> Self {
        Self {
            base: 0.70,
            volume_scale: 1_000_000.0,
            volume_cap: 0.05,
            downside_divisor: 50.0,
            downside_cap: 0.10,
            upside_divisor: 100.0,
            upside_cap: 0.05,
            trend_divisor: 100.0,
            trend_cap: 0.03,
            min_ltv: 50,
            max_ltv: 80,
        }
    }
}

/// Contribution of each market signal, as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LtvComponents {
    pub base: f64,
    pub volume: f64,
    /// Subtracted from the total.
    pub volatility: f64,
    pub trend: f64,
}

impl LtvComponents {
    pub fn raw_ratio(&self) -> f64 {
        self.base + self.volume - self.volatility + self.trend
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LtvAssessment {
    /// Final percentage, rounded and clamped to the model's band.
    pub ltv: u64,
    pub components: LtvComponents,
}

impl LtvModel {
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.min_ltv > self.max_ltv || self.max_ltv > 100 {
            return Err(OracleError::Config(format!(
                "ltv band [{}, {}] must be ordered and within [0, 100]",
                self.min_ltv, self.max_ltv
            )));
        }
        let divisors = [
            ("volume_scale", self.volume_scale),
            ("downside_divisor", self.downside_divisor),
            ("upside_divisor", self.upside_divisor),
            ("trend_divisor", self.trend_divisor),
        ];
        for (name, value) in divisors {
            if !(value.is_finite() && value > 0.0) {
                return Err(OracleError::Config(format!("{} must be positive", name)));
            }
        }
        let caps = [
            ("base", self.base),
            ("volume_cap", self.volume_cap),
            ("downside_cap", self.downside_cap),
            ("upside_cap", self.upside_cap),
            ("trend_cap", self.trend_cap),
        ];
        for (name, value) in caps {
            if !(value.is_finite() && value >= 0.0) {
                return Err(OracleError::Config(format!("{} must be non-negative", name)));
            }
        }
        Ok(())
    }

    pub fn assess(&self, quote: &MarketQuote) -> Result<LtvAssessment, StageError> {
        quote.validate()?;
        let change = quote.percent_change_24h;

        let volume = (quote.volume_24h / (quote.price * self.volume_scale))
            .min(self.volume_cap)
            .max(0.0);

        let volatility = if change < 0.0 {
            (change.abs() / self.downside_divisor).min(self.downside_cap)
        } else {
            (change / self.upside_divisor).min(self.upside_cap)
        };

        let trend = if change > 0.0 {
            (change / self.trend_divisor).min(self.trend_cap)
        } else {
            0.0
        };

        let components = LtvComponents {
            base: self.base,
            volume,
            volatility,
            trend,
        };

        if self.min_ltv > self.max_ltv {
            return Err(StageError::decode(format!(
                "ltv band [{}, {}] is inverted",
                self.min_ltv, self.max_ltv
            )));
        }
        let ltv = (components.raw_ratio() * 100.0)
            .round()
            .clamp(self.min_ltv as f64, self.max_ltv as f64) as u64;

        Ok(LtvAssessment { ltv, components })
    }
}
