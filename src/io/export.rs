use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::QfeverResult;
use crate::model::scenario::ScenarioSet;
use crate::model::seirvd::{Compartment, SimulationParameters};
use crate::model::trajectory::SimulationResult;

/// Write one row per step with columns S,E,I,R,V,D.
pub fn write_trajectory_csv<W: Write>(writer: W, result: &SimulationResult) -> QfeverResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(Compartment::ALL.iter().map(|c| c.name()))?;
    for state in result.states() {
        wtr.write_record(state.to_array().iter().map(|v| format!("{:.6}", v)))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn trajectory_csv_string(result: &SimulationResult) -> QfeverResult<String> {
    let mut buf = Vec::new();
    write_trajectory_csv(&mut buf, result)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn write_trajectory_file(path: impl AsRef<Path>, result: &SimulationResult) -> QfeverResult<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let f = std::fs::File::create(path)?;
    write_trajectory_csv(f, result)?;
    Ok(path.to_path_buf())
}

/// Plain-text record of a comparison run: inputs, per-scenario summaries and
/// the "Current" trajectory.
pub fn write_run_report(
    out_dir: impl AsRef<Path>,
    run_id: &str,
    region: &str,
    species: &str,
    params: &SimulationParameters,
    scenarios: &ScenarioSet,
) -> QfeverResult<PathBuf> {
    std::fs::create_dir_all(out_dir.as_ref())?;
    let path = out_dir.as_ref().join(format!("qfever_{}.txt", run_id));
    let mut f = std::fs::File::create(&path)?;

    writeln!(f, "run_id={}", run_id)?;
    writeln!(f, "region={}", region)?;
    writeln!(f, "species={}", species)?;
    writeln!(f, "population={}", params.population)?;
    writeln!(f, "initial_infected={}", params.initial_infected)?;
    writeln!(f, "beta={:.6}", params.beta)?;
    writeln!(f, "sigma={:.6}", params.sigma)?;
    writeln!(f, "gamma={:.6}", params.gamma)?;
    writeln!(f, "mortality_rate={:.6}", params.mortality_rate)?;
    writeln!(f, "vaccination_rate={:.6}", params.vaccination_rate)?;
    writeln!(f, "diagnostic_rate={:.6}", params.diagnostic_rate)?;
    writeln!(f, "tick_prevalence={:.6}", params.tick_prevalence)?;
    writeln!(f, "horizon={}", params.horizon)?;
    writeln!(f)?;

    writeln!(f, "scenario,peak_infected,peak_week,recovered,vaccinated,deaths")?;
    for (scenario, run) in scenarios.iter() {
        if let Some(s) = run.result.summary() {
            writeln!(
                f,
                "{},{:.6},{},{:.6},{:.6},{:.6}",
                scenario.label(),
                s.peak_infected,
                s.peak_week,
                s.total_recovered,
                s.total_vaccinated,
                s.total_deaths
            )?;
        }
    }
    writeln!(f)?;

    if let Some(current) = scenarios.current() {
        write_trajectory_csv(&mut f, &current.result)?;
    }

    Ok(path)
}
