use crate::api::scenario_dto::ScenarioDto;
use crate::domain::scenario::Scenario;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads a scenario file and builds the planning session it describes.
pub fn load_scenario(file_path: &str) -> Result<Scenario> {
    let scenario_dto: ScenarioDto = parse_json_file::<ScenarioDto>(file_path)?;
    log::info!("Scenario file '{}' parsed successfully.", file_path);

    Scenario::from_dto(scenario_dto)
}
