use std::fmt::Debug;

use crate::domain::traffic::schedule_view::{SpacetimeFilter, ViewEntry};
use crate::domain::utils::id::ParticipantId;

/// Number of alternative proposals a rival offers at a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollout {
    pub rival: ParticipantId,
    pub count: usize,
}

/// One node of a negotiation tree, seen from its owning party.
///
/// Views never contain the owner's own itineraries.
pub trait NegotiationTable: Debug + Send + Sync {
    fn owner(&self) -> ParticipantId;

    /// Rivals in a fixed order; selections are indexed the same way.
    fn rollouts(&self) -> Vec<Rollout>;

    /// Itineraries visible when rival `i` uses its alternative `selection[i]`.
    fn query(&self, filter: &SpacetimeFilter, selection: &[usize]) -> Vec<ViewEntry>;
}
