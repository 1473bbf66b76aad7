//! User selections carried explicitly from a request into the scenario runner.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ParameterRanges;
use crate::error::QfeverResult;
use crate::io::dataset::{Dataset, PrevalenceEstimate};
use crate::model::scenario::{Scenario, ScenarioRunner, ScenarioSet};
use crate::model::seirvd::{OutflowPolicy, SimulationParameters};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub region: String,
    pub species: String,
    /// `initial_infected` is replaced by the prevalence-derived seed.
    #[serde(default)]
    pub params: SimulationParameters,
    #[serde(default)]
    pub policy: OutflowPolicy,
    #[serde(default = "all_scenarios")]
    pub scenarios: Vec<Scenario>,
}

fn all_scenarios() -> Vec<Scenario> {
    Scenario::ALL.to_vec()
}

#[derive(Debug, Clone)]
pub struct SessionRun {
    pub prevalence: PrevalenceEstimate,
    pub params: SimulationParameters,
    pub scenarios: ScenarioSet,
}

impl SessionContext {
    pub fn new(region: impl Into<String>, species: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            species: species.into(),
            params: SimulationParameters::default(),
            policy: OutflowPolicy::default(),
            scenarios: all_scenarios(),
        }
    }

    /// Base parameters seeded from the filtered dataset.
    pub fn seeded_params(&self, dataset: &Dataset) -> (PrevalenceEstimate, SimulationParameters) {
        let prevalence = dataset.prevalence(&self.region, &self.species);
        let params = SimulationParameters {
            initial_infected: prevalence.initial_infected(self.params.population),
            ..self.params
        };
        (prevalence, params)
    }

    pub fn run(&self, dataset: &Dataset, ranges: &ParameterRanges) -> QfeverResult<SessionRun> {
        ranges.validate(&self.params)?;
        let (prevalence, params) = self.seeded_params(dataset);
        info!(
            region = %self.region,
            species = %self.species,
            prevalence = prevalence.prevalence,
            initial_infected = params.initial_infected,
            "running scenarios"
        );
        let scenarios = ScenarioRunner::new(params)
            .with_policy(self.policy)
            .compare(&self.scenarios)?;
        Ok(SessionRun {
            prevalence,
            params,
            scenarios,
        })
    }
}
