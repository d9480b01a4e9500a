//! Prometheus counters for stage invocations, served on `/metrics`.
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    executions: IntCounterVec,
    tallies: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let executions = IntCounterVec::new(
            Opts::new("oracle_executions_total", "Execution stage invocations"),
            &["program", "exit_code"],
        )?;
        let tallies = IntCounterVec::new(
            Opts::new("oracle_tallies_total", "Tally stage invocations"),
            &["program", "exit_code"],
        )?;
        registry.register(Box::new(executions.clone()))?;
        registry.register(Box::new(tallies.clone()))?;

        Ok(Self {
            registry,
            executions,
            tallies,
        })
    }

    pub fn observe_execution(&self, program: &str, exit_code: u8) {
        self.executions
            .with_label_values(&[program, &exit_code.to_string()])
            .inc();
    }

    pub fn observe_tally(&self, program: &str, exit_code: u8) {
        self.tallies
            .with_label_values(&[program, &exit_code.to_string()])
            .inc();
    }

    /// Render the execution and tally counters in the text exposition format
    /// scraped from `/metrics`.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let families = self.registry.gather();
        let mut exposition = Vec::new();
        TextEncoder::new().encode(&families, &mut exposition)?;
        String::from_utf8(exposition).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_labelled() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_execution("wbtc-ltv", 0);
        metrics.observe_execution("wbtc-ltv", 1);
        metrics.observe_tally("brent-price", 0);

        let text = metrics.encode().unwrap();
        let sample = |name: &str, program: &str, exit_code: &str| {
            text.lines().any(|line| {
                line.starts_with(name)
                    && line.contains(&format!("program=\"{}\"", program))
                    && line.contains(&format!("exit_code=\"{}\"", exit_code))
                    && line.ends_with(" 1")
            })
        };
        assert!(sample("oracle_executions_total{", "wbtc-ltv", "0"));
        assert!(sample("oracle_executions_total{", "wbtc-ltv", "1"));
        assert!(sample("oracle_tallies_total{", "brent-price", "0"));
    }
}
