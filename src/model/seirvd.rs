use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{QfeverError, QfeverResult};
use crate::model::trajectory::SimulationResult;

pub const DEFAULT_HORIZON: usize = 52;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub population: u32,
    pub initial_infected: u32,

    // Rates (per week)
    pub beta: f64,  // infection
    pub sigma: f64, // E -> I progression
    pub gamma: f64, // recovery
    pub mortality_rate: f64,
    pub vaccination_rate: f64,

    // Fraction of infected that get diagnosed (and so can recover); the rest
    // are exposed to mortality.
    pub diagnostic_rate: f64,
    // Vector abundance multiplier applied to beta.
    pub tick_prevalence: f64,

    pub horizon: usize,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            population: 1000,
            initial_infected: 0,
            beta: 0.3,
            sigma: 0.2,
            gamma: 0.1,
            mortality_rate: 0.01,
            vaccination_rate: 0.01,
            diagnostic_rate: 0.7,
            tick_prevalence: 1.0,
            horizon: DEFAULT_HORIZON,
        }
    }
}

impl SimulationParameters {
    pub fn effective_beta(&self) -> f64 {
        self.beta * self.tick_prevalence
    }

    /// Engine preconditions. Slider ranges are checked separately by
    /// [`crate::config::ParameterRanges`].
    pub fn check(&self) -> QfeverResult<()> {
        ensure(self.population > 0, "population must be > 0")?;
        ensure(
            self.initial_infected <= self.population,
            "initial_infected must be <= population",
        )?;
        ensure(self.horizon > 0, "horizon must be > 0")?;
        let rates = [
            ("beta", self.beta),
            ("sigma", self.sigma),
            ("gamma", self.gamma),
            ("mortality_rate", self.mortality_rate),
            ("vaccination_rate", self.vaccination_rate),
            ("tick_prevalence", self.tick_prevalence),
        ];
        for (name, v) in rates {
            if !(v.is_finite() && v >= 0.0) {
                return Err(QfeverError::InvalidParameters(format!(
                    "{name} must be finite and >= 0 (got {v})"
                )));
            }
        }
        ensure(
            (0.0..=1.0).contains(&self.diagnostic_rate),
            "diagnostic_rate must be within [0, 1]",
        )?;
        Ok(())
    }
}

fn ensure(cond: bool, msg: &str) -> QfeverResult<()> {
    if cond {
        Ok(())
    } else {
        Err(QfeverError::InvalidParameters(msg.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    S,
    E,
    I,
    R,
    V,
    D,
}

impl Compartment {
    /// Column order used everywhere a state is flattened.
    pub const ALL: [Compartment; 6] = [
        Compartment::S,
        Compartment::E,
        Compartment::I,
        Compartment::R,
        Compartment::V,
        Compartment::D,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Compartment::S => "S",
            Compartment::E => "E",
            Compartment::I => "I",
            Compartment::R => "R",
            Compartment::V => "V",
            Compartment::D => "D",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Compartment::S => "Susceptible",
            Compartment::E => "Exposed",
            Compartment::I => "Infected",
            Compartment::R => "Recovered",
            Compartment::V => "Vaccinated",
            Compartment::D => "Deceased",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompartmentState {
    pub s: f64,
    pub e: f64,
    pub i: f64,
    pub r: f64,
    pub v: f64,
    pub d: f64,
}

impl CompartmentState {
    /// S0 = population - initial_infected, I0 = initial_infected.
    pub fn initial(params: &SimulationParameters) -> QfeverResult<Self> {
        ensure(
            params.initial_infected <= params.population,
            "initial_infected must be <= population",
        )?;
        Ok(Self::seeded(params))
    }

    // Callers have already run `check`.
    fn seeded(params: &SimulationParameters) -> Self {
        Self {
            s: f64::from(params.population.saturating_sub(params.initial_infected)),
            i: f64::from(params.initial_infected),
            ..Self::default()
        }
    }

    pub fn get(&self, c: Compartment) -> f64 {
        match c {
            Compartment::S => self.s,
            Compartment::E => self.e,
            Compartment::I => self.i,
            Compartment::R => self.r,
            Compartment::V => self.v,
            Compartment::D => self.d,
        }
    }

    /// Values in S, E, I, R, V, D order.
    pub fn to_array(&self) -> [f64; 6] {
        [self.s, self.e, self.i, self.r, self.v, self.d]
    }

    pub fn total(&self) -> f64 {
        self.to_array().iter().sum()
    }

    pub fn has_negative(&self) -> bool {
        self.to_array().iter().any(|v| *v < 0.0)
    }
}

/// Flows of one step, all computed from the same pre-step snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Flows {
    pub new_infected: f64,
    pub new_exposed_out: f64,
    pub new_recovered: f64,
    pub new_mortality: f64,
    pub new_vaccinated: f64,
}

impl Flows {
    pub fn compute(state: &CompartmentState, params: &SimulationParameters) -> Self {
        let n = f64::from(params.population);
        Self {
            new_infected: params.effective_beta() * state.s * state.i / n,
            new_exposed_out: params.sigma * state.e,
            new_recovered: params.gamma * state.i * params.diagnostic_rate,
            new_mortality: params.mortality_rate * state.i * (1.0 - params.diagnostic_rate),
            new_vaccinated: params.vaccination_rate * state.s,
        }
    }

    /// Limit each compartment's combined outflow to its stock. The last flow
    /// of a capped pair takes the remainder so the stock drains to exactly 0.
    fn capped(mut self, state: &CompartmentState) -> Self {
        let (infected, vaccinated) = cap_pair(state.s, self.new_infected, self.new_vaccinated);
        self.new_infected = infected;
        self.new_vaccinated = vaccinated;

        if self.new_exposed_out > state.e {
            self.new_exposed_out = state.e.max(0.0);
        }

        let (recovered, mortality) = cap_pair(state.i, self.new_recovered, self.new_mortality);
        self.new_recovered = recovered;
        self.new_mortality = mortality;
        self
    }
}

fn cap_pair(stock: f64, first: f64, second: f64) -> (f64, f64) {
    let outflow = first + second;
    if outflow <= stock || outflow <= 0.0 {
        return (first, second);
    }
    let stock = stock.max(0.0);
    let first = (first * (stock / outflow)).min(stock);
    (first, stock - first)
}

/// What to do when a step would drain a compartment below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutflowPolicy {
    /// Raw recurrence; compartments may go negative for large rates.
    #[default]
    Unbounded,
    /// Outflows are limited to the current stock. Still conserves the total.
    Capped,
}

/// One synchronous step of the SEIRVD recurrence.
pub fn advance(state: &CompartmentState, params: &SimulationParameters) -> CompartmentState {
    apply_flows(state, Flows::compute(state, params))
}

fn apply_flows(state: &CompartmentState, f: Flows) -> CompartmentState {
    CompartmentState {
        s: state.s - f.new_infected - f.new_vaccinated,
        e: state.e + f.new_infected - f.new_exposed_out,
        i: state.i + f.new_exposed_out - f.new_recovered - f.new_mortality,
        r: state.r + f.new_recovered,
        v: state.v + f.new_vaccinated,
        d: state.d + f.new_mortality,
    }
}

pub struct SeirvdModel {
    pub params: SimulationParameters,
    pub policy: OutflowPolicy,
}

impl SeirvdModel {
    pub fn new(params: SimulationParameters) -> QfeverResult<Self> {
        params.check()?;
        Ok(Self {
            params,
            policy: OutflowPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: OutflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn initial_state(&self) -> CompartmentState {
        CompartmentState::seeded(&self.params)
    }

    pub fn step(&self, state: &CompartmentState) -> CompartmentState {
        let flows = Flows::compute(state, &self.params);
        let flows = match self.policy {
            OutflowPolicy::Unbounded => flows,
            OutflowPolicy::Capped => flows.capped(state),
        };
        apply_flows(state, flows)
    }

    /// Run `horizon` steps. Entry 0 is the state after the first step.
    pub fn simulate(&self, horizon: usize) -> SimulationResult {
        let mut state = self.initial_state();
        let mut out = Vec::with_capacity(horizon);
        let mut warned = false;
        for step in 0..horizon {
            state = self.step(&state);
            if !warned && state.has_negative() {
                warn!(step, ?state, "compartment went negative; rates too large for weekly steps");
                warned = true;
            }
            out.push(state);
        }
        debug!(
            horizon,
            population = self.params.population,
            initial_infected = self.params.initial_infected,
            policy = ?self.policy,
            "simulation finished"
        );
        SimulationResult::new(out)
    }
}

/// Validate `params` with `horizon` in place of `params.horizon`, then run the
/// raw recurrence for `horizon` steps.
pub fn run(params: &SimulationParameters, horizon: usize) -> QfeverResult<SimulationResult> {
    let model = SeirvdModel::new(SimulationParameters { horizon, ..*params })?;
    Ok(model.simulate(horizon))
}
