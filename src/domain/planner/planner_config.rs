use crate::api::planner_config_dto::PlannerConfigDto;
use crate::domain::schedule::schedule_patch::{ReservationChange, SchedulePatch};
use crate::error::{Error, Result};

pub const DEFAULT_MAX_EXPANSIONS: usize = 256;

/// How much disruption a single rewrite costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostMetric {
    /// Number of existing reservations the rewrite moved.
    #[default]
    DisplacedReservations,

    /// Sum of absolute start time shifts over all moved reservations.
    TotalDisplacement,
}

impl CostMetric {
    pub fn cost(&self, patch: &SchedulePatch) -> i64 {
        let changes = patch.changes();
        let moved = changes.iter().filter(|change| matches!(change, ReservationChange::Moved { .. }));

        match self {
            CostMetric::DisplacedReservations => moved.count() as i64,
            CostMetric::TotalDisplacement => moved.map(ReservationChange::displacement).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Upper bound of states expanded per plan set.
    pub max_expansions: usize,

    /// Candidates above this accumulated cost are never explored.
    pub max_cost: Option<i64>,

    pub cost_metric: CostMetric,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig { max_expansions: DEFAULT_MAX_EXPANSIONS, max_cost: None, cost_metric: CostMetric::default() }
    }
}

impl PlannerConfig {
    pub fn from_dto(dto: PlannerConfigDto) -> Result<Self> {
        let cost_metric = match dto.cost_metric.as_deref() {
            None | Some("DisplacedReservations") => CostMetric::DisplacedReservations,
            Some("TotalDisplacement") => CostMetric::TotalDisplacement,
            Some(other) => {
                return Err(Error::ModelConstructionError(format!("Unknown cost metric '{}'.", other)));
            }
        };

        if dto.max_expansions == Some(0) {
            return Err(Error::ModelConstructionError("maxExpansions must be at least 1.".to_string()));
        }

        Ok(PlannerConfig { max_expansions: dto.max_expansions.unwrap_or(DEFAULT_MAX_EXPANSIONS), max_cost: dto.max_cost, cost_metric })
    }

    pub fn within_budget(&self, cost: i64) -> bool {
        self.max_cost.is_none_or(|max_cost| cost <= max_cost)
    }
}
