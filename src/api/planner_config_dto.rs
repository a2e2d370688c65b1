use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfigDto {
    pub max_expansions: Option<usize>,
    pub max_cost: Option<i64>,

    /// "DisplacedReservations" or "TotalDisplacement".
    pub cost_metric: Option<String>,
}
