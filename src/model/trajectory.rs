use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::seirvd::{Compartment, CompartmentState};

/// Recorded states of one run, in step order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationResult {
    states: Vec<CompartmentState>,
}

impl SimulationResult {
    pub fn new(states: Vec<CompartmentState>) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &[CompartmentState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn final_state(&self) -> Option<&CompartmentState> {
        self.states.last()
    }

    pub fn series(&self, c: Compartment) -> Vec<f64> {
        self.states.iter().map(|s| s.get(c)).collect()
    }

    /// Compartment name -> values, row-aligned by step, in S..D order.
    pub fn columns(&self) -> IndexMap<&'static str, Vec<f64>> {
        Compartment::ALL
            .iter()
            .map(|c| (c.name(), self.series(*c)))
            .collect()
    }

    /// Week index for each recorded step, for charting.
    pub fn weeks(&self) -> Vec<usize> {
        (0..self.states.len()).collect()
    }

    /// (step index, value) of the largest I. First occurrence wins on ties.
    pub fn peak_infected(&self) -> Option<(usize, f64)> {
        self.states
            .iter()
            .enumerate()
            .fold(None, |best, (idx, s)| match best {
                Some((_, v)) if v >= s.i => best,
                _ => Some((idx, s.i)),
            })
    }

    pub fn summary(&self) -> Option<Summary> {
        let (peak_week, peak_infected) = self.peak_infected()?;
        let last = self.final_state()?;
        Some(Summary {
            peak_infected,
            peak_week,
            total_recovered: last.r,
            total_vaccinated: last.v,
            total_deaths: last.d,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub peak_infected: f64,
    pub peak_week: usize,
    pub total_recovered: f64,
    pub total_vaccinated: f64,
    pub total_deaths: f64,
}
