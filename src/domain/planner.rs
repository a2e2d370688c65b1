pub mod min_conflict_planner;
pub mod planner;
pub mod planner_config;
pub mod planning_session;
pub mod schedule_operator;
