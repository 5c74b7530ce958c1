use crate::model::*;

use super::EngineError;

/// Everything the detector needs at confirm time.
#[derive(Debug, Clone, Copy)]
pub struct ConflictQuery<'a> {
    pub candidate: DateInterval,
    pub guest: &'a GuestIdentity,
    /// The guest's reservations across all venues.
    pub guest_reservations: &'a [ReservationRef],
    /// The active venue's reservations, for the same-venue re-check.
    pub venue_reservations: &'a [ReservationRef],
    pub venue_id: VenueId,
    /// The reservation being edited, ignored everywhere.
    pub editing: Option<ReservationId>,
}

pub(crate) fn validate_candidate(candidate: &DateInterval) -> Result<(), EngineError> {
    if candidate.nights() < 1 {
        return Err(EngineError::SingleDayRange);
    }
    Ok(())
}

/// First matching verdict wins: the guest's stays at other venues, then the
/// venue's own bookings (selection already keeps booked days out, this guards
/// against lists fetched earlier in the session going stale).
///
/// Every comparison uses [`DateInterval::overlaps_stay`], so back-to-back
/// stays never conflict.
pub fn detect(query: &ConflictQuery<'_>) -> ConflictVerdict {
    let skip = |r: &ReservationRef| Some(r.id) == query.editing;

    for r in query.guest_reservations {
        if skip(r) || r.venue_id == query.venue_id || &r.guest != query.guest {
            continue;
        }
        if query.candidate.overlaps_stay(&r.interval) {
            return ConflictVerdict::OverlapsOtherVenue(r.id);
        }
    }

    let mut other_guest = false;
    for r in query.venue_reservations {
        if skip(r) || r.venue_id != query.venue_id {
            continue;
        }
        if !query.candidate.overlaps_stay(&r.interval) {
            continue;
        }
        if &r.guest == query.guest {
            return ConflictVerdict::OwnedByGuest(r.id);
        }
        other_guest = true;
    }
    if other_guest {
        return ConflictVerdict::OverlapsSameVenueOtherGuest;
    }

    ConflictVerdict::Clear
}

/// The guest's current reservation on `venue_id`, other than `editing`.
/// Replace semantics delete it before writing the new one.
pub fn existing_on_venue(
    guest: &GuestIdentity,
    guest_reservations: &[ReservationRef],
    venue_id: VenueId,
    editing: Option<ReservationId>,
) -> Option<ReservationId> {
    guest_reservations
        .iter()
        .filter(|r| &r.guest == guest && r.venue_id == venue_id)
        .map(|r| r.id)
        .find(|id| Some(*id) != editing)
}
