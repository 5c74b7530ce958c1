use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::{
    classify, detect, existing_on_venue, month_grid, quote, CalendarInput, CalendarSnapshot,
    ConflictQuery, EngineError, MutationError, MutationReceipt, Quote, ReservationMutator,
    SelectionOutcome, SelectionStateMachine, SubmitRequest,
};
use crate::limits::*;
use crate::model::*;
use crate::observability;
use crate::service::{ReservationService, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// `editing` is not one of the guest's reservations on the session venue.
    #[error("reservation {0} is not the guest's reservation on this venue")]
    NotEditable(ReservationId),
}

/// Everything the host UI needs to react to, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// Partial (`end == None`) or complete range, with its price once complete.
    DateChanged {
        range: SelectionRange,
        quote: Option<Quote>,
    },
    Rejected {
        day: Day,
        class: DayClass,
    },
    ValidationError {
        message: String,
    },
    Conflict {
        verdict: ConflictVerdict,
    },
    NavigateToOwnReservation {
        reservation: ReservationId,
    },
    MonthChanged {
        month: Day,
    },
    NavigationBlocked {
        month: Day,
    },
    MutationSucceeded {
        receipt: MutationReceipt,
    },
    MutationFailed {
        detail: String,
        /// The previous reservation was deleted but the new one not written.
        partial: bool,
    },
}

/// One guest booking one venue: owns the fetched reservation lists, the
/// snapshot built from them and the selection machine, and runs confirm.
pub struct BookingSession<S: ?Sized> {
    service: Arc<S>,
    mutator: ReservationMutator<S>,
    credentials: Credentials,
    venue: Venue,
    editing: Option<ReservationId>,
    guest_count: u32,
    venue_reservations: Vec<ReservationRef>,
    guest_reservations: Vec<ReservationRef>,
    snapshot: CalendarSnapshot,
    machine: SelectionStateMachine,
}

impl<S: ReservationService + ?Sized> BookingSession<S> {
    /// Fetch both reservation lists and build the first snapshot. `editing`
    /// must name one of the guest's reservations on `venue`; its range is
    /// preselected and its guest count carried over.
    pub async fn open(
        service: Arc<S>,
        credentials: Credentials,
        venue: Venue,
        editing: Option<ReservationId>,
        window: AllowedWindow,
    ) -> Result<Self, SessionError> {
        let (venue_reservations, guest_reservations) =
            fetch_lists(&*service, &venue, &credentials).await?;
        let current = match editing {
            Some(id) => Some(
                guest_reservations
                    .iter()
                    .find(|r| r.id == id && r.venue_id == venue.id && r.guest == credentials.guest)
                    .ok_or(SessionError::NotEditable(id))?,
            ),
            None => None,
        };
        let snapshot = CalendarSnapshot::build(
            venue.id,
            credentials.guest.clone(),
            &venue_reservations,
            &guest_reservations,
            editing,
        )?;

        let mut machine = SelectionStateMachine::new(window);
        let mut guest_count = 1;
        if let Some(current) = current {
            machine.preset(current.interval);
            guest_count = current.guest_count;
        }

        info!(
            venue = %venue.id,
            guest = %credentials.guest,
            venue_reservations = venue_reservations.len(),
            guest_reservations = guest_reservations.len(),
            "booking session opened"
        );
        metrics::gauge!(observability::SNAPSHOT_RESERVATIONS).set(venue_reservations.len() as f64);

        Ok(Self {
            mutator: ReservationMutator::new(service.clone()),
            service,
            credentials,
            venue,
            editing,
            guest_count,
            venue_reservations,
            guest_reservations,
            snapshot,
            machine,
        })
    }

    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    pub fn editing(&self) -> Option<ReservationId> {
        self.editing
    }

    pub fn guest_count(&self) -> u32 {
        self.guest_count
    }

    pub fn range(&self) -> SelectionRange {
        self.machine.range()
    }

    pub fn state(&self) -> SelectionState {
        self.machine.state()
    }

    pub fn snapshot(&self) -> &CalendarSnapshot {
        &self.snapshot
    }

    pub fn venue_reservations(&self) -> &[ReservationRef] {
        &self.venue_reservations
    }

    pub fn guest_reservations(&self) -> &[ReservationRef] {
        &self.guest_reservations
    }

    pub fn day_class(&self, day: Day) -> DayClass {
        classify(day, &self.snapshot, &self.machine.range(), self.machine.window())
    }

    /// The currently visible month, classified day by day.
    pub fn month_view(&self) -> Vec<CalendarDay> {
        month_grid(
            self.machine.visible_month(),
            &self.snapshot,
            &self.machine.range(),
            self.machine.window(),
        )
    }

    pub fn quote(&self) -> Option<Quote> {
        self.machine
            .range()
            .as_interval()
            .and_then(|iv| quote(&iv, self.venue.price_per_night))
    }

    pub fn set_guest_count(&mut self, count: u32) -> Result<(), EngineError> {
        let max = self.venue.max_guests.min(MAX_GUESTS_PER_RESERVATION);
        if count == 0 || count > max {
            return Err(EngineError::GuestCount { count, max });
        }
        self.guest_count = count;
        Ok(())
    }

    pub fn handle_event(&mut self, input: CalendarInput) -> Vec<HostEvent> {
        let outcomes = self.machine.handle_event(&self.snapshot, input);
        if let CalendarInput::DayClicked(day) = input {
            let label = outcomes.first().map_or("noop", observability::outcome_label);
            metrics::counter!(observability::CLICKS_TOTAL, "outcome" => label).increment(1);
            debug!(%day, outcome = label, "day clicked");
        }
        outcomes
            .into_iter()
            .map(|outcome| self.to_host_event(outcome))
            .collect()
    }

    fn to_host_event(&self, outcome: SelectionOutcome) -> HostEvent {
        match outcome {
            SelectionOutcome::DateChanged { range } => HostEvent::DateChanged {
                range,
                quote: range
                    .as_interval()
                    .and_then(|iv| quote(&iv, self.venue.price_per_night)),
            },
            SelectionOutcome::Rejected { day, class } => HostEvent::Rejected { day, class },
            SelectionOutcome::ValidationError { error } => HostEvent::ValidationError {
                message: error.to_string(),
            },
            SelectionOutcome::NavigateToOwnReservation { reservation } => {
                HostEvent::NavigateToOwnReservation { reservation }
            }
            SelectionOutcome::MonthChanged { month } => HostEvent::MonthChanged { month },
            SelectionOutcome::NavigationBlocked { month } => HostEvent::NavigationBlocked { month },
        }
    }

    /// Run the detector against the current range without submitting.
    pub fn check(&self) -> Option<ConflictVerdict> {
        let candidate = self.machine.range().as_interval()?;
        Some(self.verdict_for(candidate))
    }

    fn verdict_for(&self, candidate: DateInterval) -> ConflictVerdict {
        detect(&ConflictQuery {
            candidate,
            guest: &self.credentials.guest,
            guest_reservations: &self.guest_reservations,
            venue_reservations: &self.venue_reservations,
            venue_id: self.venue.id,
            editing: self.editing,
        })
    }

    /// Detect conflicts, then run the replace-if-exists write sequence.
    ///
    /// On success the lists are refetched, the selection cleared and the
    /// session leaves edit mode. Once the delete step has started the call
    /// must be awaited to completion.
    pub async fn confirm(&mut self) -> Vec<HostEvent> {
        let Some(interval) = self.machine.range().as_interval() else {
            return vec![HostEvent::ValidationError {
                message: EngineError::IncompleteRange.to_string(),
            }];
        };
        let verdict = self.verdict_for(interval);
        let label = observability::verdict_label(&verdict);
        metrics::counter!(observability::CONFLICTS_TOTAL, "verdict" => label).increment(1);
        if !verdict.is_clear() {
            info!(venue = %self.venue.id, verdict = label, "confirm blocked by conflict");
            return vec![HostEvent::Conflict { verdict }];
        }

        let request = SubmitRequest {
            interval,
            guest_count: self.guest_count,
            venue: &self.venue,
            existing_on_venue: existing_on_venue(
                &self.credentials.guest,
                &self.guest_reservations,
                self.venue.id,
                self.editing,
            ),
            editing: self.editing,
        };

        let result = self.mutator.submit(&self.credentials, request).await;
        match result {
            Ok(receipt) => {
                let mut events = vec![HostEvent::MutationSucceeded {
                    receipt: receipt.clone(),
                }];
                self.editing = None;
                self.invalidate(&receipt.invalidate).await;
                events.extend(self.handle_event(CalendarInput::Clear));
                events
            }
            Err(MutationError::Invalid(error)) => vec![HostEvent::ValidationError {
                message: error.to_string(),
            }],
            Err(error) => {
                let partial = error.is_partial();
                // A duplicate was deleted before the failure; cached lists are
                // stale. An edited reservation that failed to update is kept.
                if error.changed_service() {
                    let invalidation = CacheInvalidation {
                        venue_id: self.venue.id,
                        guest: self.credentials.guest.clone(),
                    };
                    self.invalidate(&invalidation).await;
                }
                vec![HostEvent::MutationFailed {
                    detail: error.to_string(),
                    partial,
                }]
            }
        }
    }

    async fn invalidate(&mut self, invalidation: &CacheInvalidation) {
        debug!(
            venue = %invalidation.venue_id,
            guest = %invalidation.guest,
            "invalidating cached reservations"
        );
        if let Err(e) = self.refresh().await {
            warn!(venue = %self.venue.id, "refresh after mutation failed: {e}");
        }
    }

    /// Refetch both lists and rebuild the snapshot. The selection is kept.
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        let (venue_reservations, guest_reservations) =
            fetch_lists(&*self.service, &self.venue, &self.credentials).await?;
        self.snapshot = CalendarSnapshot::build(
            self.venue.id,
            self.credentials.guest.clone(),
            &venue_reservations,
            &guest_reservations,
            self.editing,
        )?;
        self.venue_reservations = venue_reservations;
        self.guest_reservations = guest_reservations;
        metrics::gauge!(observability::SNAPSHOT_RESERVATIONS)
            .set(self.venue_reservations.len() as f64);
        Ok(())
    }
}

async fn fetch_lists<S: ReservationService + ?Sized>(
    service: &S,
    venue: &Venue,
    credentials: &Credentials,
) -> Result<(Vec<ReservationRef>, Vec<ReservationRef>), ServiceError> {
    futures::try_join!(
        service.fetch_venue_reservations(venue.id),
        service.fetch_guest_reservations(&credentials.guest),
    )
}
