use std::sync::Arc;

use crate::api::scenario_dto::{CommittedReservationDto, ItineraryDto, RequestAlternativeDto, ScenarioDto};
use crate::domain::planner::planner_config::PlannerConfig;
use crate::domain::planner::planning_session::PlanningSession;
use crate::domain::reservation::constraint_tracker::ConstraintTracker;
use crate::domain::reservation::request::{ReservationRequest, TimeRange};
use crate::domain::reservation::reservation::Reservation;
use crate::domain::schedule::schedule_state::{CurrentScheduleState, ScheduleWriter};
use crate::domain::traffic::memory_view::InMemoryScheduleView;
use crate::domain::traffic::route::{Profile, Route, Trajectory, Waypoint};
use crate::domain::traffic::route_validator::{RouteValidator, ScheduleRouteValidator};
use crate::domain::traffic::schedule_view::ParticipantDescription;
use crate::domain::utils::id::{MapName, ParticipantId, RequestId, ReservationId, ResourceName};
use crate::error::{Error, Result};

/// A route some participant wants checked against the committed traffic.
#[derive(Debug, Clone)]
pub struct Probe {
    pub participant: ParticipantId,
    pub profile: Profile,
    pub route: Route,
}

/// Committed reservations, pending requests and traffic loaded from one
/// scenario file.
#[derive(Debug)]
pub struct Scenario {
    pub session: PlanningSession,
    pub pending: Vec<RequestId>,
    pub traffic: Arc<InMemoryScheduleView>,
    pub probes: Vec<Probe>,
}

impl Scenario {
    pub fn from_dto(dto: ScenarioDto) -> Result<Self> {
        let config = dto.planner.map(PlannerConfig::from_dto).transpose()?.unwrap_or_default();
        let tracker = ConstraintTracker::new();
        let mut schedule = CurrentScheduleState::new();
        let mut pending = Vec::new();
        let mut without_id: Vec<(RequestId, ParticipantId, CommittedReservationDto)> = Vec::new();

        for (index, request_dto) in dto.requests.into_iter().enumerate() {
            if request_dto.alternatives.is_empty() {
                return Err(Error::ModelConstructionError(format!("Request #{} has no alternatives.", index)));
            }

            let participant = ParticipantId(request_dto.participant);
            let alternatives = request_dto.alternatives.iter().map(request_from_dto).collect();
            let request = tracker.add_request(participant, alternatives, request_dto.priority);

            match request_dto.reservation {
                Some(committed) => match committed.id {
                    Some(id) => commit(&mut schedule, &tracker, request, reservation_from_dto(ReservationId(id), participant, &committed))?,
                    // Explicit ids are reserved first.
                    None => without_id.push((request, participant, committed)),
                },
                None => pending.push(request),
            }
        }

        for (request, participant, committed) in without_id {
            let id = tracker.allocate_reservation_id();
            commit(&mut schedule, &tracker, request, reservation_from_dto(id, participant, &committed))?;
        }

        let traffic_dto = dto.traffic.unwrap_or_default();
        let mut traffic = InMemoryScheduleView::new();
        for itinerary in &traffic_dto.itineraries {
            let (participant, description, route) = itinerary_from_dto(itinerary)?;
            traffic.insert(participant, description, route);
        }

        let probes = traffic_dto
            .probes
            .iter()
            .map(|probe| itinerary_from_dto(probe).map(|(participant, description, route)| Probe { participant, profile: description.profile, route }))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Scenario holds {} committed reservation(s), {} pending request(s), {} itinerary(s) and {} probe(s).",
            schedule.len(),
            pending.len(),
            traffic.len(),
            probes.len()
        );

        Ok(Scenario { session: PlanningSession::new(schedule, tracker, config), pending, traffic: Arc::new(traffic), probes })
    }

    /// Conflicting participant per probe, in probe order.
    pub fn check_probes(&self) -> Vec<(ParticipantId, Option<ParticipantId>)> {
        self.probes
            .iter()
            .map(|probe| {
                let validator = ScheduleRouteValidator::new(self.traffic.clone(), probe.participant, probe.profile);
                (probe.participant, validator.find_conflict(&probe.route))
            })
            .collect()
    }
}

fn commit(schedule: &mut CurrentScheduleState, tracker: &ConstraintTracker, request: RequestId, reservation: Reservation) -> Result<()> {
    tracker.associate_request_with_reservation(request, &reservation)?;
    schedule.add_reservation(reservation)?;
    Ok(())
}

fn request_from_dto(dto: &RequestAlternativeDto) -> ReservationRequest {
    let window = match (dto.earliest_start, dto.latest_start) {
        (None, None) => None,
        (lower, upper) => Some(TimeRange::new(lower, upper)),
    };
    ReservationRequest::new(ResourceName::new(dto.resource.as_str()), window, dto.duration, dto.finish)
}

fn reservation_from_dto(id: ReservationId, participant: ParticipantId, dto: &CommittedReservationDto) -> Reservation {
    Reservation::new(id, ResourceName::new(dto.resource.as_str()), participant, dto.start, dto.duration, dto.finish)
}

fn itinerary_from_dto(dto: &ItineraryDto) -> Result<(ParticipantId, ParticipantDescription, Route)> {
    let waypoints = dto.waypoints.iter().map(|(time, x, y)| Waypoint::new(*time, *x, *y)).collect();
    let trajectory = Trajectory::new(waypoints, dto.holds_indefinitely)?;

    Ok((
        ParticipantId(dto.participant),
        ParticipantDescription::new(dto.name.as_str(), Profile::new(dto.footprint_radius)),
        Route::new(MapName::new(dto.map.as_str()), trajectory),
    ))
}
