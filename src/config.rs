use serde::{Deserialize, Serialize};

use crate::error::{QfeverError, QfeverResult};
use crate::model::seirvd::SimulationParameters;

pub const DEFAULT_DATASET: &str = "cleaned_q_fever_dataset.csv";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Accepted input ranges for user-supplied parameters. The engine itself only
/// checks its preconditions; these bounds belong to the input surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRanges {
    pub population: Range,
    pub beta: Range,
    pub sigma: Range,
    pub gamma: Range,
    pub mortality_rate: Range,
    pub vaccination_rate: Range,
    pub diagnostic_rate: Range,
    pub tick_prevalence: Range,
    pub horizon: Range,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            population: Range::new(100.0, 5000.0),
            beta: Range::new(0.05, 0.5),
            sigma: Range::new(0.1, 0.5),
            gamma: Range::new(0.05, 0.3),
            mortality_rate: Range::new(0.0, 0.1),
            vaccination_rate: Range::new(0.0, 0.1),
            diagnostic_rate: Range::new(0.0, 1.0),
            tick_prevalence: Range::new(0.5, 2.0),
            horizon: Range::new(1.0, 520.0),
        }
    }
}

impl ParameterRanges {
    pub fn validate(&self, p: &SimulationParameters) -> QfeverResult<()> {
        let checks = [
            ("population", f64::from(p.population), self.population),
            ("beta", p.beta, self.beta),
            ("sigma", p.sigma, self.sigma),
            ("gamma", p.gamma, self.gamma),
            ("mortality_rate", p.mortality_rate, self.mortality_rate),
            ("vaccination_rate", p.vaccination_rate, self.vaccination_rate),
            ("diagnostic_rate", p.diagnostic_rate, self.diagnostic_rate),
            ("tick_prevalence", p.tick_prevalence, self.tick_prevalence),
            ("horizon", p.horizon as f64, self.horizon),
        ];
        for (name, value, range) in checks {
            if !range.contains(value) {
                return Err(QfeverError::OutOfRange {
                    name,
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dataset_path: String,
}

impl ServerConfig {
    /// Reads `HOST`, `PORT` and `QFEVER_DATASET`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("PORT").and_then(|v| v.parse().ok()).unwrap_or(8000);
        let dataset_path = get("QFEVER_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string());
        Self {
            host,
            port,
            dataset_path,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
