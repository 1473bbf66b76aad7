pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod session;

pub use error::{QfeverError, QfeverResult};
pub use model::scenario::{Scenario, ScenarioRun, ScenarioRunner, ScenarioSet};
pub use model::seirvd::{
    advance, run, Compartment, CompartmentState, OutflowPolicy, SeirvdModel, SimulationParameters,
};
pub use model::trajectory::{SimulationResult, Summary};
