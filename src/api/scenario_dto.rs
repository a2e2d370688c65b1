use serde::{Deserialize, Serialize};

use crate::api::planner_config_dto::PlannerConfigDto;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    #[serde(default)]
    pub requests: Vec<RequestDto>,

    #[serde(default)]
    pub traffic: Option<TrafficDto>,

    #[serde(default)]
    pub planner: Option<PlannerConfigDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequestDto {
    pub participant: u64,

    #[serde(default)]
    pub priority: i32,

    /// In order of preference.
    pub alternatives: Vec<RequestAlternativeDto>,

    /// Present for requests already served by the committed schedule.
    pub reservation: Option<CommittedReservationDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequestAlternativeDto {
    pub resource: String,
    pub earliest_start: Option<i64>,
    pub latest_start: Option<i64>,
    pub duration: Option<i64>,
    pub finish: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommittedReservationDto {
    pub id: Option<u64>,
    pub resource: String,
    pub start: i64,
    pub duration: Option<i64>,
    pub finish: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrafficDto {
    #[serde(default)]
    pub itineraries: Vec<ItineraryDto>,

    /// Routes to check against the committed itineraries.
    #[serde(default)]
    pub probes: Vec<ItineraryDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDto {
    pub participant: u64,
    pub name: String,
    pub footprint_radius: f64,
    pub map: String,

    /// `[time, x, y]` triples ordered by time.
    pub waypoints: Vec<(i64, f64, f64)>,

    #[serde(default)]
    pub holds_indefinitely: bool,
}
