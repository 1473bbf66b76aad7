use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

use qfever::config::{ParameterRanges, DEFAULT_DATASET};
use qfever::io::dataset::Dataset;
use qfever::io::export::{write_run_report, write_trajectory_file};
use qfever::logging::init_logging;
use qfever::session::SessionContext;
use qfever::{OutflowPolicy, Scenario, SimulationParameters};

#[derive(Parser, Debug)]
#[command(name = "qfever", about = "Weekly Q fever SEIRVD scenario simulation")]
struct Cli {
    /// Observation CSV with region, species, number_examined, number_positive
    #[arg(long, global = true, default_value = DEFAULT_DATASET)]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List regions present in the dataset
    Regions,
    /// List species recorded for a region
    Species {
        #[arg(long)]
        region: String,
    },
    /// Run the scenario comparison
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    region: String,
    #[arg(long)]
    species: String,

    /// JSON file with base parameters; flags below override it
    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long)]
    population: Option<u32>,
    #[arg(long)]
    beta: Option<f64>,
    #[arg(long)]
    sigma: Option<f64>,
    #[arg(long)]
    gamma: Option<f64>,
    #[arg(long)]
    mortality_rate: Option<f64>,
    #[arg(long)]
    vaccination_rate: Option<f64>,
    #[arg(long)]
    diagnostic_rate: Option<f64>,
    #[arg(long)]
    tick_prevalence: Option<f64>,
    #[arg(long)]
    horizon: Option<usize>,

    #[arg(long, value_enum, default_value_t = PolicyArg::Unbounded)]
    policy: PolicyArg,

    /// Write the "Current" trajectory as CSV
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write a plain-text run report into this directory
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Print the full scenario set as JSON instead of the summary table
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Unbounded,
    Capped,
}

impl From<PolicyArg> for OutflowPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Unbounded => OutflowPolicy::Unbounded,
            PolicyArg::Capped => OutflowPolicy::Capped,
        }
    }
}

impl RunArgs {
    fn parameters(&self) -> anyhow::Result<SimulationParameters> {
        let mut p = match &self.params {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read params file {:?}", path))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse params file {:?}", path))?
            }
            None => SimulationParameters::default(),
        };
        if let Some(v) = self.population { p.population = v; }
        if let Some(v) = self.beta { p.beta = v; }
        if let Some(v) = self.sigma { p.sigma = v; }
        if let Some(v) = self.gamma { p.gamma = v; }
        if let Some(v) = self.mortality_rate { p.mortality_rate = v; }
        if let Some(v) = self.vaccination_rate { p.vaccination_rate = v; }
        if let Some(v) = self.diagnostic_rate { p.diagnostic_rate = v; }
        if let Some(v) = self.tick_prevalence { p.tick_prevalence = v; }
        if let Some(v) = self.horizon { p.horizon = v; }
        Ok(p)
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let dataset = Dataset::from_path(&cli.data)
        .with_context(|| format!("failed to load dataset {:?}", cli.data))?;

    match cli.command {
        Command::Regions => {
            for r in dataset.regions() {
                println!("{r}");
            }
        }
        Command::Species { region } => {
            for s in dataset.species(&region) {
                println!("{s}");
            }
        }
        Command::Run(args) => run(&dataset, args)?,
    }
    Ok(())
}

fn run(dataset: &Dataset, args: RunArgs) -> anyhow::Result<()> {
    let mut ctx = SessionContext::new(&args.region, &args.species);
    ctx.params = args.parameters()?;
    ctx.policy = args.policy.into();

    let run = ctx
        .run(dataset, &ParameterRanges::default())
        .context("simulation rejected")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run.scenarios)?);
    } else {
        println!(
            "Estimated prevalence: {} -> initial infected: {}",
            run.prevalence.percent(),
            run.params.initial_infected
        );
        println!("scenario,peak_infected,peak_week,recovered,vaccinated,deaths");
        for (scenario, r) in run.scenarios.iter() {
            if let Some(s) = r.result.summary() {
                println!(
                    "{},{:.0},{},{:.0},{:.0},{:.0}",
                    scenario.label(),
                    s.peak_infected,
                    s.peak_week,
                    s.total_recovered,
                    s.total_vaccinated,
                    s.total_deaths
                );
            }
        }
    }

    if let Some(out) = &args.out {
        let current = run
            .scenarios
            .get(Scenario::Current)
            .context("no Current scenario to export")?;
        let path = write_trajectory_file(out, &current.result)
            .with_context(|| format!("failed to write {:?}", out))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(dir) = &args.report_dir {
        let run_id = format!("{}-{}", args.region, args.species).replace(' ', "_");
        let path = write_run_report(dir, &run_id, &args.region, &args.species, &run.params, &run.scenarios)
            .context("failed to write run report")?;
        eprintln!("wrote {}", path.display());
    }

    Ok(())
}
