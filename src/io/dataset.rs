use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{QfeverError, QfeverResult};

pub const REQUIRED_COLUMNS: [&str; 4] = ["region", "species", "number_examined", "number_positive"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    pub region: Option<String>,
    pub species: Option<String>,
    pub number_examined: Option<f64>,
    pub number_positive: Option<f64>,
}

impl Observation {
    fn matches(&self, region: &str, species: &str) -> bool {
        self.region.as_deref() == Some(region) && self.species.as_deref() == Some(species)
    }
}

/// Serological survey records. Columns beyond [`REQUIRED_COLUMNS`] are ignored.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Observation>,
}

impl Dataset {
    pub fn from_rows(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn from_reader<R: Read>(reader: R) -> QfeverResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for col in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == col) {
                return Err(QfeverError::MissingColumn(col));
            }
        }

        let mut rows = Vec::new();
        for result in rdr.deserialize::<Observation>() {
            rows.push(result?);
        }
        debug!(rows = rows.len(), "dataset loaded");
        Ok(Self { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> QfeverResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Sorted distinct non-empty regions.
    pub fn regions(&self) -> Vec<String> {
        distinct(self.rows.iter().map(|r| r.region.as_deref()))
    }

    /// Sorted distinct non-empty species recorded for `region`.
    pub fn species(&self, region: &str) -> Vec<String> {
        distinct(
            self.rows
                .iter()
                .filter(|r| r.region.as_deref() == Some(region))
                .map(|r| r.species.as_deref()),
        )
    }

    pub fn filter<'a>(
        &'a self,
        region: &'a str,
        species: &'a str,
    ) -> impl Iterator<Item = &'a Observation> + 'a {
        self.rows.iter().filter(move |r| r.matches(region, species))
    }

    pub fn prevalence(&self, region: &str, species: &str) -> PrevalenceEstimate {
        let (examined, positive) = self.filter(region, species).fold((0.0, 0.0), |(e, p), r| {
            (
                e + r.number_examined.unwrap_or(0.0),
                p + r.number_positive.unwrap_or(0.0),
            )
        });
        PrevalenceEstimate::from_totals(examined, positive)
    }
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrevalenceEstimate {
    pub examined: f64,
    pub positive: f64,
    pub prevalence: f64,
}

impl PrevalenceEstimate {
    /// Zero examined gives prevalence 0.
    pub fn from_totals(examined: f64, positive: f64) -> Self {
        let prevalence = if examined > 0.0 { positive / examined } else { 0.0 };
        let estimate = Self {
            examined,
            positive,
            prevalence,
        };
        if estimate.exceeds_examined() {
            warn!(examined, positive, "more positives than examined; seed will be capped at population");
        }
        estimate
    }

    /// Survey rows report more positives than subjects examined.
    pub fn exceeds_examined(&self) -> bool {
        self.positive > self.examined
    }

    /// `floor(prevalence * population)`, never above `population`.
    pub fn initial_infected(&self, population: u32) -> u32 {
        let seed = (self.prevalence * f64::from(population)).floor();
        if seed <= 0.0 {
            0
        } else {
            (seed as u32).min(population)
        }
    }

    pub fn percent(&self) -> String {
        format!("{:.2}%", self.prevalence * 100.0)
    }
}
