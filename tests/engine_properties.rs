use proptest::prelude::*;

use qfever::model::seirvd::Flows;
use qfever::{
    advance, run, CompartmentState, OutflowPolicy, QfeverError, Scenario, SeirvdModel,
    SimulationParameters,
};

fn concrete() -> SimulationParameters {
    SimulationParameters {
        population: 1000,
        initial_infected: 10,
        beta: 0.3,
        sigma: 0.2,
        gamma: 0.1,
        mortality_rate: 0.01,
        vaccination_rate: 0.01,
        diagnostic_rate: 0.7,
        tick_prevalence: 1.0,
        horizon: 52,
    }
}

fn params_strategy() -> impl Strategy<Value = SimulationParameters> {
    (
        100u32..5000,
        0.0f64..0.2,
        0.05f64..0.5,
        0.1f64..0.5,
        0.05f64..0.3,
        0.0f64..0.1,
        0.0f64..0.1,
        0.0f64..=1.0,
        0.5f64..2.0,
        1usize..120,
    )
        .prop_map(|(population, seed_frac, beta, sigma, gamma, mu, phi, delta, tick, horizon)| {
            SimulationParameters {
                population,
                initial_infected: (seed_frac * f64::from(population)) as u32,
                beta,
                sigma,
                gamma,
                mortality_rate: mu,
                vaccination_rate: phi,
                diagnostic_rate: delta,
                tick_prevalence: tick,
                horizon,
            }
        })
}

#[test]
fn concrete_scenario_first_step() {
    let p = concrete();
    let res = run(&p, p.horizon).unwrap();
    let s1 = res.states()[0];

    let tol = 1e-9;
    assert!((s1.s - 977.13).abs() < tol, "S1={}", s1.s);
    assert!((s1.e - 2.97).abs() < tol, "E1={}", s1.e);
    assert!((s1.i - 9.27).abs() < tol, "I1={}", s1.i);
    assert!((s1.r - 0.7).abs() < tol, "R1={}", s1.r);
    assert!((s1.v - 9.9).abs() < tol, "V1={}", s1.v);
    assert!((s1.d - 0.03).abs() < tol, "D1={}", s1.d);
}

#[test]
fn concrete_scenario_rises_then_falls() {
    let p = concrete();
    let res = run(&p, p.horizon).unwrap();
    let (peak_idx, peak) = res.peak_infected().unwrap();
    assert!(peak_idx > 0 && peak_idx < p.horizon - 1, "peak at {}", peak_idx);
    assert!(peak > res.states()[0].i);
    assert!(peak > res.final_state().unwrap().i);
}

#[test]
fn initial_state_is_not_recorded() {
    let p = concrete();
    let res = run(&p, 3).unwrap();
    let s0 = CompartmentState::initial(&p).unwrap();
    assert_eq!(res.states()[0], advance(&s0, &p));
}

#[test]
fn full_seed_never_infects() {
    let p = SimulationParameters {
        population: 500,
        initial_infected: 500,
        ..concrete()
    };
    let s0 = CompartmentState::initial(&p).unwrap();
    assert_eq!(s0.s, 0.0);

    let res = run(&p, p.horizon).unwrap();
    for state in res.states() {
        assert_eq!(Flows::compute(state, &p).new_infected, 0.0);
        assert_eq!(state.s, 0.0);
        assert_eq!(state.e, 0.0);
    }
}

#[test]
fn tick_control_pressure_is_forty_percent() {
    let base = concrete();
    let tick = Scenario::TickControl.apply(&base);
    let ratio = tick.effective_beta() / base.effective_beta();
    assert!((ratio - 0.4).abs() < 1e-12);

    // Same snapshot, same S and I: only the pressure differs.
    let res = run(&base, base.horizon).unwrap();
    for state in res.states() {
        let cur = Flows::compute(state, &base).new_infected;
        let tc = Flows::compute(state, &tick).new_infected;
        assert!((tc - 0.4 * cur).abs() <= 1e-9 * cur.abs().max(1.0));
    }
}

#[test]
fn rejects_broken_preconditions() {
    let p = SimulationParameters {
        population: 10,
        initial_infected: 11,
        ..concrete()
    };
    assert!(matches!(run(&p, 5), Err(QfeverError::InvalidParameters(_))));
    assert!(SeirvdModel::new(SimulationParameters {
        diagnostic_rate: 1.5,
        ..concrete()
    })
    .is_err());
}

#[test]
fn run_validates_the_horizon_it_is_given() {
    let p = concrete();
    assert!(matches!(run(&p, 0), Err(QfeverError::InvalidParameters(_))));

    let stale = SimulationParameters { horizon: 0, ..p };
    assert_eq!(run(&stale, 5).unwrap().len(), 5);
}

/// Five-compartment SEIRV recurrence of the original dashboard, kept as a
/// reference for the mu = 0, delta = 1 reduction.
fn seirv_reference(
    population: f64,
    initial_infected: f64,
    beta: f64,
    sigma: f64,
    gamma: f64,
    vaccination_rate: f64,
    steps: usize,
) -> Vec<[f64; 5]> {
    let (mut s, mut e, mut i, mut r, mut v) =
        (population - initial_infected, 0.0, initial_infected, 0.0, 0.0);
    let mut out = Vec::with_capacity(steps);
    for _ in 0..steps {
        let new_infected = beta * s * i / population;
        let new_exposed = sigma * e;
        let new_recovered = gamma * i;
        let new_vaccinated = vaccination_rate * s;

        s -= new_infected + new_vaccinated;
        e += new_infected - new_exposed;
        i += new_exposed - new_recovered;
        r += new_recovered;
        v += new_vaccinated;
        out.push([s, e, i, r, v]);
    }
    out
}

#[test]
fn no_mortality_full_diagnosis_reduces_to_seirv() {
    let p = SimulationParameters {
        mortality_rate: 0.0,
        diagnostic_rate: 1.0,
        ..concrete()
    };
    let res = run(&p, p.horizon).unwrap();
    let reference = seirv_reference(1000.0, 10.0, 0.3, 0.2, 0.1, 0.01, p.horizon);

    let first = res.states()[0];
    assert!((first.i - 9.0).abs() < 1e-12);
    assert!((first.r - 1.0).abs() < 1e-12);

    let tol = 1e-9;
    for (state, expected) in res.states().iter().zip(&reference) {
        assert_eq!(state.d, 0.0);
        let got = [state.s, state.e, state.i, state.r, state.v];
        for (g, x) in got.iter().zip(expected) {
            assert!((g - x).abs() < tol, "{:?} vs {:?}", got, expected);
        }
    }
}

fn aggressive() -> SimulationParameters {
    SimulationParameters {
        population: 100,
        initial_infected: 50,
        beta: 10.0,
        sigma: 1.5,
        gamma: 2.0,
        mortality_rate: 1.0,
        vaccination_rate: 0.5,
        diagnostic_rate: 0.9,
        tick_prevalence: 1.0,
        horizon: 10,
    }
}

#[test]
fn unbounded_policy_goes_negative() {
    let p = aggressive();
    let res = SeirvdModel::new(p).unwrap().simulate(p.horizon);
    assert!(res.states().iter().any(|s| s.has_negative()));
}

#[test]
fn capped_policy_stays_non_negative_and_conserves() {
    let p = aggressive();
    let model = SeirvdModel::new(p)
        .unwrap()
        .with_policy(OutflowPolicy::Capped);
    let res = model.simulate(p.horizon);
    for state in res.states() {
        assert!(!state.has_negative(), "{:?}", state);
        assert!((state.total() - 100.0).abs() < 1e-9);
    }
}

#[test]
fn capped_matches_unbounded_when_nothing_overflows() {
    let p = concrete();
    let raw = SeirvdModel::new(p).unwrap().simulate(p.horizon);
    let capped = SeirvdModel::new(p)
        .unwrap()
        .with_policy(OutflowPolicy::Capped)
        .simulate(p.horizon);
    assert_eq!(raw, capped);
}

proptest! {
    #[test]
    fn runs_are_deterministic(p in params_strategy()) {
        let a = run(&p, p.horizon).unwrap();
        let b = run(&p, p.horizon).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn sequence_length_matches_horizon(p in params_strategy(), horizon in 1usize..200) {
        let res = run(&p, horizon).unwrap();
        prop_assert_eq!(res.len(), horizon);
    }

    #[test]
    fn total_is_conserved_every_step(p in params_strategy()) {
        let res = run(&p, p.horizon).unwrap();
        let mut prev = CompartmentState::initial(&p).unwrap().total();
        for state in res.states() {
            let total = state.total();
            prop_assert!((total - prev).abs() <= 1e-9 * prev.abs().max(1.0));
            prev = total;
        }
    }

    #[test]
    fn no_seed_no_vaccination_stays_susceptible(p in params_strategy()) {
        let p = SimulationParameters { initial_infected: 0, vaccination_rate: 0.0, ..p };
        let res = run(&p, p.horizon).unwrap();
        for state in res.states() {
            prop_assert_eq!(state.i, 0.0);
            prop_assert_eq!(state.e, 0.0);
            prop_assert_eq!(state.s, f64::from(p.population));
        }
    }
}
