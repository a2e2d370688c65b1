use anyhow::{Context, Result};
use clap::Parser;

use fleet_reservations::api::planner_config_dto::PlannerConfigDto;
use fleet_reservations::domain::planner::planner_config::PlannerConfig;
use fleet_reservations::loader::parser::parse_json_file;
use fleet_reservations::{load_scenario, logger};

#[derive(Parser)]
#[command(name = "fleet_reservations")]
#[command(about = "Plans shared resource reservations and checks routes for conflicts")]
struct Cli {
    /// Scenario file (JSON) with committed reservations, pending requests and traffic.
    #[arg(long, short)]
    scenario: String,

    /// Planner configuration (JSON); overrides the scenario's own settings.
    #[arg(long, short)]
    config: Option<String>,

    /// Number of ranked candidates to report per pending request.
    #[arg(long, default_value = "3")]
    candidates: usize,

    /// Commit the best candidate of every pending request in order.
    #[arg(long)]
    commit: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init();

    let mut scenario = load_scenario(&cli.scenario).with_context(|| format!("loading scenario '{}'", cli.scenario))?;

    if let Some(config_path) = &cli.config {
        let dto: PlannerConfigDto = parse_json_file(config_path).with_context(|| format!("loading planner config '{}'", config_path))?;
        let config = PlannerConfig::from_dto(dto)?;
        log::info!("Using planner config from '{}': {:?}", config_path, config);
        scenario.session.set_config(config);
    }

    for (participant, conflict) in scenario.check_probes() {
        match conflict {
            Some(rival) => log::warn!("Probe of participant {} conflicts with participant {}.", participant, rival),
            None => log::info!("Probe of participant {} is clear.", participant),
        }
    }

    for request in scenario.pending.clone() {
        let candidates = scenario.session.candidates(request, cli.candidates)?;
        if candidates.is_empty() {
            log::warn!("Request {} cannot be placed under the current schedule.", request);
            continue;
        }

        for (rank, patch) in candidates.iter().enumerate() {
            log::info!("Request {} candidate #{}:", request, rank + 1);
            for change in patch.changes() {
                log::info!("    {:?}", change);
            }
        }

        if cli.commit {
            let reservation = scenario.session.commit_admission(request, &candidates[0])?;
            log::info!("Committed reservation {} for request {}.", reservation, request);
        }
    }

    Ok(())
}
