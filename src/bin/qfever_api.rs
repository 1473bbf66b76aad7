use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use qfever::config::{ParameterRanges, ServerConfig};
use qfever::io::dataset::{Dataset, PrevalenceEstimate};
use qfever::io::export::trajectory_csv_string;
use qfever::logging::init_logging;
use qfever::session::{SessionContext, SessionRun};
use qfever::{QfeverError, SimulationParameters, Summary};

#[derive(Clone)]
struct AppState {
    dataset: Arc<Dataset>,
    ranges: ParameterRanges,
}

type ApiError = (StatusCode, serde_json::Value);

fn api_error(e: QfeverError) -> ApiError {
    if e.is_input_error() {
        warn!(error = %e, "request rejected");
        (StatusCode::BAD_REQUEST, json!({"return_code": 1, "error": e.to_string()}))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, json!({"return_code": 2, "error": e.to_string()}))
    }
}

fn join_error(e: tokio::task::JoinError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"return_code": 2, "error": format!("join error: {e}")}),
    )
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    #[serde(flatten)]
    session: SessionContext,
    /// Uploaded observations; the server dataset is used when absent.
    dataset_csv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpeciesQuery {
    region: String,
}

#[derive(Debug, Deserialize)]
struct PrevalenceQuery {
    region: String,
    species: String,
    population: Option<u32>,
}

#[derive(Debug, Serialize)]
struct PrevalenceResponse {
    #[serde(flatten)]
    estimate: PrevalenceEstimate,
    population: u32,
    initial_infected: u32,
}

#[derive(Debug, Serialize)]
struct ScenarioSeries {
    params: SimulationParameters,
    series: IndexMap<&'static str, Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    return_code: i32,
    region: String,
    species: String,
    prevalence: PrevalenceEstimate,
    summary: Option<Summary>,
    weeks: Vec<usize>,
    scenarios: IndexMap<&'static str, ScenarioSeries>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ServerConfig::from_env();

    let dataset = match Dataset::from_path(&cfg.dataset_path) {
        Ok(ds) => {
            info!(path = %cfg.dataset_path, rows = ds.rows().len(), "dataset loaded");
            ds
        }
        Err(e) => {
            warn!(path = %cfg.dataset_path, error = %e, "no server dataset; requests must upload one");
            Dataset::default()
        }
    };

    let state = AppState {
        dataset: Arc::new(dataset),
        ranges: ParameterRanges::default(),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/regions", get(regions))
        .route("/species", get(species))
        .route("/prevalence", get(prevalence))
        .route("/run_simulation", post(run_simulation))
        .route("/export", post(export))
        .with_state(state);

    let addr: SocketAddr = cfg
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid HOST/PORT: {}", cfg.bind_addr()))?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind failed on {addr}"))?;
    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

async fn regions(State(st): State<AppState>) -> impl IntoResponse {
    Json(st.dataset.regions())
}

async fn species(State(st): State<AppState>, Query(q): Query<SpeciesQuery>) -> impl IntoResponse {
    Json(st.dataset.species(&q.region))
}

async fn prevalence(State(st): State<AppState>, Query(q): Query<PrevalenceQuery>) -> impl IntoResponse {
    let population = q.population.unwrap_or(SimulationParameters::default().population);
    let estimate = st.dataset.prevalence(&q.region, &q.species);
    Json(PrevalenceResponse {
        estimate,
        population,
        initial_infected: estimate.initial_infected(population),
    })
}

async fn run_simulation(State(st): State<AppState>, Json(req): Json<RunRequest>) -> impl IntoResponse {
    // Simulation is CPU work; keep it off the async workers.
    let join = tokio::task::spawn_blocking(move || run_sync(&st, req));
    match join.await.map_err(join_error) {
        Ok(Ok((session, run))) => (StatusCode::OK, Json(run_response(session, run))).into_response(),
        Ok(Err(e)) | Err(e) => (e.0, Json(e.1)).into_response(),
    }
}

async fn export(State(st): State<AppState>, Json(req): Json<RunRequest>) -> impl IntoResponse {
    let join = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let (_, run) = run_sync(&st, req)?;
        let current = run.scenarios.current().ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                json!({"return_code": 1, "error": "Current scenario was not requested"}),
            )
        })?;
        trajectory_csv_string(&current.result).map_err(api_error)
    });
    match join.await.map_err(join_error) {
        Ok(Ok(body)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"qfever_current.csv\""),
            ],
            body,
        )
            .into_response(),
        Ok(Err(e)) | Err(e) => (e.0, Json(e.1)).into_response(),
    }
}

fn run_sync(st: &AppState, req: RunRequest) -> Result<(SessionContext, SessionRun), ApiError> {
    let uploaded = req
        .dataset_csv
        .as_deref()
        .map(|csv| Dataset::from_reader(csv.as_bytes()))
        .transpose()
        .map_err(api_error)?;
    let dataset = uploaded.as_ref().unwrap_or(st.dataset.as_ref());
    let run = req.session.run(dataset, &st.ranges).map_err(api_error)?;
    Ok((req.session, run))
}

fn run_response(session: SessionContext, run: SessionRun) -> RunResponse {
    let weeks = run
        .scenarios
        .current()
        .map(|c| c.result.weeks())
        .unwrap_or_default();
    let scenarios = run
        .scenarios
        .iter()
        .map(|(scenario, r)| {
            (
                scenario.label(),
                ScenarioSeries {
                    params: r.params,
                    series: r.result.columns(),
                },
            )
        })
        .collect();
    RunResponse {
        return_code: 0,
        region: session.region,
        species: session.species,
        prevalence: run.prevalence,
        summary: run.scenarios.summary(),
        weeks,
        scenarios,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let dataset = Dataset::from_reader(
            "region,species,number_examined,number_positive\nNorth,Goat,100,10\n".as_bytes(),
        )
        .unwrap();
        AppState {
            dataset: Arc::new(dataset),
            ranges: ParameterRanges::default(),
        }
    }

    fn request(body: serde_json::Value) -> RunRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn input_errors_are_bad_request() {
        let (code, body) = api_error(QfeverError::MissingColumn("region"));
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["return_code"], 1);
        assert!(body["error"].as_str().unwrap().contains("region"));
    }

    #[test]
    fn io_errors_are_internal() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let (code, body) = api_error(QfeverError::Io(err));
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["return_code"], 2);
    }

    #[test]
    fn flattened_request_uses_server_dataset() {
        let req = request(json!({
            "region": "North",
            "species": "Goat",
            "params": {"population": 500, "horizon": 4}
        }));
        assert_eq!(req.session.scenarios.len(), 3);
        let (session, run) = run_sync(&state(), req).unwrap();
        assert_eq!(run.params.initial_infected, 50);

        let resp = run_response(session, run);
        assert_eq!(resp.weeks, vec![0, 1, 2, 3]);
        assert_eq!(resp.scenarios["Current"].series["S"].len(), 4);
    }

    #[test]
    fn uploaded_dataset_overrides_server_dataset() {
        let req = request(json!({
            "region": "South",
            "species": "Sheep",
            "scenarios": ["Current"],
            "dataset_csv": "region,species,number_examined,number_positive\nSouth,Sheep,10,5\n"
        }));
        let (_, run) = run_sync(&state(), req).unwrap();
        assert_eq!(run.params.initial_infected, 500);
        assert_eq!(run.scenarios.len(), 1);
    }

    #[test]
    fn bad_upload_and_out_of_range_are_rejected() {
        let req = request(json!({
            "region": "North",
            "species": "Goat",
            "dataset_csv": "region,species\nNorth,Goat\n"
        }));
        let (code, body) = run_sync(&state(), req).unwrap_err();
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["return_code"], 1);

        let req = request(json!({
            "region": "North",
            "species": "Goat",
            "params": {"beta": 5.0}
        }));
        let (code, _) = run_sync(&state(), req).unwrap_err();
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }
}
