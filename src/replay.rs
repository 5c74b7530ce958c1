//! Scenario replay: seed an in-memory service from a JSON document, open a
//! booking session and feed it a list of host inputs.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::CalendarInput;
use crate::model::*;
use crate::session::{BookingSession, HostEvent, SessionError};
use crate::store::InMemoryReservationService;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Defaults to the local date when absent.
    pub today: Option<Day>,
    pub guest: String,
    pub token: String,
    /// Key of the venue being booked.
    pub venue: String,
    pub venues: Vec<VenueSeed>,
    #[serde(default)]
    pub reservations: Vec<ReservationSeed>,
    /// Key of a reservation to edit.
    pub editing: Option<String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueSeed {
    pub key: String,
    pub name: Option<String>,
    pub max_guests: u32,
    pub price_per_night: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationSeed {
    pub key: String,
    pub venue: String,
    pub guest: String,
    pub start: Day,
    pub end: Day,
    #[serde(default = "one")]
    pub guest_count: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Click(Day),
    NextMonth,
    PreviousMonth,
    Clear,
    Guests(u32),
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub event: HostEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("unknown venue key: {0}")]
    UnknownVenue(String),
    #[error("unknown reservation key: {0}")]
    UnknownReservation(String),
    #[error("reservation {key}: {source}")]
    BadInterval {
        key: String,
        source: InvalidInterval,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub async fn run(
    scenario: Scenario,
    today: Day,
    horizon_months: u32,
) -> Result<Vec<StepRecord>, ReplayError> {
    let service = Arc::new(InMemoryReservationService::default());

    let mut venues: HashMap<String, Venue> = HashMap::new();
    for seed in &scenario.venues {
        let venue = Venue {
            id: VenueId::new(),
            name: seed.name.clone(),
            max_guests: seed.max_guests,
            price_per_night: seed.price_per_night,
        };
        service.add_venue(venue.clone());
        venues.insert(seed.key.clone(), venue);
    }

    let mut reservation_ids: HashMap<String, ReservationId> = HashMap::new();
    for seed in &scenario.reservations {
        let venue = venues
            .get(&seed.venue)
            .ok_or_else(|| ReplayError::UnknownVenue(seed.venue.clone()))?;
        let interval =
            DateInterval::new(seed.start, seed.end).map_err(|source| ReplayError::BadInterval {
                key: seed.key.clone(),
                source,
            })?;
        let id = ReservationId::new();
        service.seed(ReservationRef {
            id,
            venue_id: venue.id,
            guest: GuestIdentity::new(seed.guest.clone()),
            guest_display_name: None,
            interval,
            guest_count: seed.guest_count,
        });
        reservation_ids.insert(seed.key.clone(), id);
    }

    let venue = venues
        .get(&scenario.venue)
        .cloned()
        .ok_or_else(|| ReplayError::UnknownVenue(scenario.venue.clone()))?;
    let editing = scenario
        .editing
        .as_ref()
        .map(|key| {
            reservation_ids
                .get(key)
                .copied()
                .ok_or_else(|| ReplayError::UnknownReservation(key.clone()))
        })
        .transpose()?;

    let today = scenario.today.unwrap_or(today);
    let guest = GuestIdentity::new(scenario.guest.clone());
    let credentials = Credentials::new(guest, scenario.token.clone());
    let mut session = BookingSession::open(
        service,
        credentials,
        venue,
        editing,
        AllowedWindow::new(today, horizon_months),
    )
    .await?;
    info!(steps = scenario.steps.len(), %today, "replaying scenario");

    let mut records = Vec::new();
    for (step, input) in scenario.steps.iter().enumerate() {
        let events = match input {
            Step::Click(day) => session.handle_event(CalendarInput::DayClicked(*day)),
            Step::NextMonth => session.handle_event(CalendarInput::NextMonth),
            Step::PreviousMonth => session.handle_event(CalendarInput::PreviousMonth),
            Step::Clear => session.handle_event(CalendarInput::Clear),
            Step::Guests(count) => match session.set_guest_count(*count) {
                Ok(()) => Vec::new(),
                Err(e) => vec![HostEvent::ValidationError { message: e.to_string() }],
            },
            Step::Confirm => session.confirm().await,
        };
        records.extend(events.into_iter().map(|event| StepRecord { step, event }));
    }
    Ok(records)
}
