use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QfeverResult;
use crate::model::seirvd::{OutflowPolicy, SeirvdModel, SimulationParameters};
use crate::model::trajectory::{SimulationResult, Summary};

pub const TICK_CONTROL_BETA_SCALE: f64 = 0.5;
pub const TICK_CONTROL_TICK_SCALE: f64 = 0.8;
pub const VACCINATION_BOOST: f64 = 0.02;

/// Named parameter transforms compared against the base run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    #[serde(rename = "Current")]
    Current,
    /// Acaricide / tick suppression.
    #[serde(rename = "Tick Control")]
    TickControl,
    /// Expanded vaccination campaign.
    #[serde(rename = "Vaccination Boost")]
    VaccinationBoost,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Current,
        Scenario::TickControl,
        Scenario::VaccinationBoost,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Scenario::Current => "Current",
            Scenario::TickControl => "Tick Control",
            Scenario::VaccinationBoost => "Vaccination Boost",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    pub fn apply(self, base: &SimulationParameters) -> SimulationParameters {
        match self {
            Scenario::Current => *base,
            Scenario::TickControl => SimulationParameters {
                beta: base.beta * TICK_CONTROL_BETA_SCALE,
                tick_prevalence: base.tick_prevalence * TICK_CONTROL_TICK_SCALE,
                ..*base
            },
            Scenario::VaccinationBoost => SimulationParameters {
                vaccination_rate: base.vaccination_rate + VACCINATION_BOOST,
                ..*base
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub params: SimulationParameters,
    pub result: SimulationResult,
}

/// Scenario label -> run, in the order the scenarios were requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSet {
    runs: IndexMap<Scenario, ScenarioRun>,
}

impl ScenarioSet {
    pub fn get(&self, scenario: Scenario) -> Option<&ScenarioRun> {
        self.runs.get(&scenario)
    }

    pub fn get_label(&self, label: &str) -> Option<&ScenarioRun> {
        Scenario::from_label(label).and_then(|s| self.get(s))
    }

    pub fn current(&self) -> Option<&ScenarioRun> {
        self.get(Scenario::Current)
    }

    /// Summary statistics of the "Current" run.
    pub fn summary(&self) -> Option<Summary> {
        self.current().and_then(|run| run.result.summary())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Scenario, &ScenarioRun)> {
        self.runs.iter().map(|(s, r)| (*s, r))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

pub struct ScenarioRunner {
    pub base: SimulationParameters,
    pub policy: OutflowPolicy,
}

impl ScenarioRunner {
    pub fn new(base: SimulationParameters) -> Self {
        Self {
            base,
            policy: OutflowPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OutflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(&self, scenario: Scenario) -> QfeverResult<ScenarioRun> {
        let params = scenario.apply(&self.base);
        let model = SeirvdModel::new(params)?.with_policy(self.policy);
        let result = model.simulate(params.horizon);
        debug!(scenario = scenario.label(), steps = result.len(), "scenario run");
        Ok(ScenarioRun { params, result })
    }

    /// Run each scenario independently over the base horizon.
    pub fn compare(&self, scenarios: &[Scenario]) -> QfeverResult<ScenarioSet> {
        let mut runs = IndexMap::with_capacity(scenarios.len());
        for &scenario in scenarios {
            if runs.contains_key(&scenario) {
                continue;
            }
            runs.insert(scenario, self.run(scenario)?);
        }
        Ok(ScenarioSet { runs })
    }

    pub fn compare_all(&self) -> QfeverResult<ScenarioSet> {
        self.compare(&Scenario::ALL)
    }
}
