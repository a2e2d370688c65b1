use thiserror::Error;

use crate::domain::planner::planner::PlannerError;
use crate::domain::reservation::constraint_tracker::TrackerError;
use crate::domain::reservation::timeline::ScheduleError;
use crate::domain::traffic::route::RouteError;
use crate::domain::traffic::route_validator::ValidatorError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build internal domain model: {0}")]
    ModelConstructionError(String),

    #[error("Schedule rejected the change: {0}")]
    ScheduleError(#[from] ScheduleError),

    #[error("Constraint tracking failed: {0}")]
    TrackerError(#[from] TrackerError),

    #[error("Planning failed: {0}")]
    PlannerError(#[from] PlannerError),

    #[error("Invalid route: {0}")]
    RouteError(#[from] RouteError),

    #[error("Route validation failed: {0}")]
    ValidatorError(#[from] ValidatorError),

    #[error("Patch cannot be committed: {0}")]
    InvalidPatch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
