use crate::domain::traffic::negotiation_table::{NegotiationTable, Rollout};
use crate::domain::traffic::route::Route;
use crate::domain::traffic::schedule_view::{ParticipantDescription, ScheduleView, SpacetimeFilter, ViewEntry};
use crate::domain::utils::id::ParticipantId;

/// Schedule view over a plain list of itineraries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleView {
    entries: Vec<ViewEntry>,
}

impl InMemoryScheduleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, participant: ParticipantId, description: ParticipantDescription, route: Route) {
        self.entries.push(ViewEntry { participant, description, route });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ScheduleView for InMemoryScheduleView {
    fn query(&self, filter: &SpacetimeFilter) -> Vec<ViewEntry> {
        self.entries.iter().filter(|entry| filter.matches(&entry.route)).cloned().collect()
    }
}

#[derive(Debug, Clone)]
struct RivalProposals {
    participant: ParticipantId,
    description: ParticipantDescription,
    /// Each alternative is a full itinerary.
    alternatives: Vec<Vec<Route>>,
}

/// Negotiation table whose rivals' alternatives are held in memory, on top
/// of itineraries of non-negotiating participants.
#[derive(Debug, Clone)]
pub struct InMemoryNegotiationTable {
    owner: ParticipantId,
    rivals: Vec<RivalProposals>,
    background: InMemoryScheduleView,
}

impl InMemoryNegotiationTable {
    pub fn new(owner: ParticipantId) -> Self {
        InMemoryNegotiationTable { owner, rivals: Vec::new(), background: InMemoryScheduleView::new() }
    }

    pub fn with_rival(mut self, participant: ParticipantId, description: ParticipantDescription, alternatives: Vec<Vec<Route>>) -> Self {
        self.rivals.push(RivalProposals { participant, description, alternatives });
        self
    }

    /// Itineraries visible in every branch of the table.
    pub fn with_background(mut self, background: InMemoryScheduleView) -> Self {
        self.background = background;
        self
    }
}

impl NegotiationTable for InMemoryNegotiationTable {
    fn owner(&self) -> ParticipantId {
        self.owner
    }

    fn rollouts(&self) -> Vec<Rollout> {
        self.rivals.iter().map(|rival| Rollout { rival: rival.participant, count: rival.alternatives.len() }).collect()
    }

    fn query(&self, filter: &SpacetimeFilter, selection: &[usize]) -> Vec<ViewEntry> {
        let mut entries: Vec<ViewEntry> = self.background.query(filter).into_iter().filter(|entry| entry.participant != self.owner).collect();

        for (rival, index) in self.rivals.iter().zip(selection) {
            let Some(itinerary) = rival.alternatives.get(*index) else {
                log::warn!("Rival {} has no alternative {}, skipping it.", rival.participant, index);
                continue;
            };
            entries.extend(itinerary.iter().filter(|route| filter.matches(route)).map(|route| ViewEntry {
                participant: rival.participant,
                description: rival.description.clone(),
                route: route.clone(),
            }));
        }
        entries
    }
}
