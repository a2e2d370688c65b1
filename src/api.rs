pub mod planner_config_dto;
pub mod scenario_dto;
