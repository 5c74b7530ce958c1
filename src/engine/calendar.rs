use crate::limits::*;
use crate::model::*;

use super::intervals::IntervalSet;
use super::EngineError;

/// Immutable view of one venue calendar for one guest, rebuilt on every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSnapshot {
    pub venue_id: VenueId,
    pub guest: GuestIdentity,
    /// Every booking on the active venue except the one being edited.
    pub venue: IntervalSet,
    /// The guest's own stays on other venues.
    pub guest_elsewhere: IntervalSet,
    /// Range highlighted by default (the reservation being edited).
    pub default_range: Option<DateInterval>,
}

impl CalendarSnapshot {
    pub fn build(
        venue_id: VenueId,
        guest: GuestIdentity,
        venue_reservations: &[ReservationRef],
        guest_reservations: &[ReservationRef],
        editing: Option<ReservationId>,
    ) -> Result<Self, EngineError> {
        if venue_reservations.len() > MAX_SNAPSHOT_RESERVATIONS
            || guest_reservations.len() > MAX_SNAPSHOT_RESERVATIONS
        {
            return Err(EngineError::LimitExceeded("too many reservations in snapshot"));
        }

        let default_range = editing.and_then(|id| {
            venue_reservations
                .iter()
                .chain(guest_reservations)
                .find(|r| r.id == id)
                .map(|r| r.interval)
        });

        let venue = IntervalSet::from_reservations(
            venue_reservations
                .iter()
                .filter(|r| r.venue_id == venue_id && Some(r.id) != editing)
                .cloned(),
        );
        let guest_elsewhere = IntervalSet::from_intervals(
            guest_reservations
                .iter()
                .filter(|r| r.guest == guest && r.venue_id != venue_id && Some(r.id) != editing)
                .map(|r| r.interval),
        );

        Ok(Self {
            venue_id,
            guest,
            venue,
            guest_elsewhere,
            default_range,
        })
    }
}

/// Classify one day for display and click handling.
///
/// Precedence, highest first: booked elsewhere by this guest, out of window,
/// this guest's own stay here, someone else's stay here, selected or
/// highlighted, today, available.
pub fn classify(
    day: Day,
    snapshot: &CalendarSnapshot,
    range: &SelectionRange,
    window: &AllowedWindow,
) -> DayClass {
    if snapshot.guest_elsewhere.is_covered(day) {
        return DayClass::BookedByOtherVenue;
    }
    if !window.contains(day) {
        return DayClass::OutOfWindow;
    }
    if let Some(owner) = snapshot.venue.owner_of(day) {
        return if owner.guest == snapshot.guest {
            DayClass::BookedByThisGuest
        } else {
            DayClass::BookedByOtherGuest
        };
    }
    if range.contains(day) {
        return DayClass::Selected;
    }
    if snapshot.default_range.is_some_and(|r| r.covers(day)) {
        return DayClass::Highlighted;
    }
    if day == window.earliest {
        return DayClass::Today;
    }
    DayClass::Available
}

/// Classify every day of the month containing `month`.
pub fn month_grid(
    month: Day,
    snapshot: &CalendarSnapshot,
    range: &SelectionRange,
    window: &AllowedWindow,
) -> Vec<CalendarDay> {
    let first = first_of_month(month);
    first
        .iter_days()
        .take_while(|d| first_of_month(*d) == first)
        .map(|day| CalendarDay {
            day,
            class: classify(day, snapshot, range, window),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Day {
        s.parse().unwrap()
    }

    fn iv(start: &str, end: &str) -> DateInterval {
        DateInterval::new(d(start), d(end)).unwrap()
    }

    fn guest() -> GuestIdentity {
        GuestIdentity::from("ana@example.com")
    }

    fn reservation(venue_id: VenueId, start: &str, end: &str, who: &str) -> ReservationRef {
        ReservationRef {
            id: ReservationId::new(),
            venue_id,
            guest: GuestIdentity::from(who),
            guest_display_name: None,
            interval: iv(start, end),
            guest_count: 1,
        }
    }

    fn window() -> AllowedWindow {
        AllowedWindow::new(d("2025-06-01"), 24)
    }

    #[test]
    fn snapshot_splits_lists() {
        let venue = VenueId::new();
        let other = VenueId::new();
        let mine_here = reservation(venue, "2025-06-20", "2025-06-22", "ana@example.com");
        let theirs = reservation(venue, "2025-06-10", "2025-06-15", "bo@example.com");
        let mine_elsewhere = reservation(other, "2025-07-01", "2025-07-03", "ana@example.com");

        let snap = CalendarSnapshot::build(
            venue,
            guest(),
            &[mine_here.clone(), theirs],
            &[mine_here, mine_elsewhere],
            None,
        )
        .unwrap();
        assert_eq!(snap.venue.len(), 2);
        assert_eq!(snap.guest_elsewhere.len(), 1);
        assert!(snap.guest_elsewhere.is_covered(d("2025-07-02")));
        assert!(snap.default_range.is_none());
    }

    #[test]
    fn snapshot_excludes_edited_reservation() {
        let venue = VenueId::new();
        let mine = reservation(venue, "2025-06-20", "2025-06-22", "ana@example.com");
        let snap =
            CalendarSnapshot::build(venue, guest(), &[mine.clone()], &[mine.clone()], Some(mine.id))
                .unwrap();
        assert!(snap.venue.is_empty());
        assert_eq!(snap.default_range, Some(mine.interval));
    }

    #[test]
    fn precedence_order() {
        let venue = VenueId::new();
        let other = VenueId::new();
        let theirs = reservation(venue, "2025-06-10", "2025-06-15", "bo@example.com");
        let mine_here = reservation(venue, "2025-06-20", "2025-06-22", "ana@example.com");
        // Stay elsewhere overlapping someone else's booking here and the past.
        let elsewhere = reservation(other, "2025-05-30", "2025-06-02", "ana@example.com");
        let clash = reservation(other, "2025-06-12", "2025-06-12", "ana@example.com");

        let snap = CalendarSnapshot::build(
            venue,
            guest(),
            &[theirs, mine_here],
            &[elsewhere, clash],
            None,
        )
        .unwrap();
        let range = SelectionRange {
            anchor: Some(d("2025-06-03")),
            end: Some(d("2025-06-05")),
        };
        let w = window();

        // Elsewhere beats out-of-window and other-guest.
        assert_eq!(classify(d("2025-05-31"), &snap, &range, &w), DayClass::BookedByOtherVenue);
        assert_eq!(classify(d("2025-06-12"), &snap, &range, &w), DayClass::BookedByOtherVenue);
        // Elsewhere beats today.
        assert_eq!(classify(d("2025-06-01"), &snap, &range, &w), DayClass::BookedByOtherVenue);
        assert_eq!(classify(d("2025-05-20"), &snap, &range, &w), DayClass::OutOfWindow);
        assert_eq!(classify(d("2025-06-21"), &snap, &range, &w), DayClass::BookedByThisGuest);
        assert_eq!(classify(d("2025-06-11"), &snap, &range, &w), DayClass::BookedByOtherGuest);
        assert_eq!(classify(d("2025-06-04"), &snap, &range, &w), DayClass::Selected);
        assert_eq!(classify(d("2025-06-08"), &snap, &range, &w), DayClass::Available);
        assert_eq!(classify(d("2027-06-02"), &snap, &range, &w), DayClass::OutOfWindow);
    }

    #[test]
    fn today_and_highlight() {
        let venue = VenueId::new();
        let mine = reservation(venue, "2025-06-01", "2025-06-04", "ana@example.com");
        let snap =
            CalendarSnapshot::build(venue, guest(), &[mine.clone()], &[mine.clone()], Some(mine.id))
                .unwrap();
        let w = window();
        let empty = SelectionRange::empty();
        // Highlight outranks today.
        assert_eq!(classify(d("2025-06-01"), &snap, &empty, &w), DayClass::Highlighted);
        assert_eq!(classify(d("2025-06-03"), &snap, &empty, &w), DayClass::Highlighted);
        assert_eq!(classify(d("2025-06-05"), &snap, &empty, &w), DayClass::Available);

        let plain = CalendarSnapshot::build(venue, guest(), &[], &[], None).unwrap();
        assert_eq!(classify(d("2025-06-01"), &plain, &empty, &w), DayClass::Today);
    }

    #[test]
    fn month_grid_covers_month() {
        let snap = CalendarSnapshot::build(VenueId::new(), guest(), &[], &[], None).unwrap();
        let grid = month_grid(d("2025-06-17"), &snap, &SelectionRange::empty(), &window());
        assert_eq!(grid.len(), 30);
        assert_eq!(grid[0].day, d("2025-06-01"));
        assert_eq!(grid[0].class, DayClass::Today);
        assert_eq!(grid[29].day, d("2025-06-30"));

        let feb = month_grid(d("2028-02-10"), &snap, &SelectionRange::empty(), &window());
        assert_eq!(feb.len(), 29);
        assert!(feb.iter().all(|c| c.class == DayClass::OutOfWindow));
    }

    #[test]
    fn selectable_classes() {
        assert!(DayClass::Available.is_selectable());
        assert!(DayClass::Today.is_selectable());
        assert!(DayClass::Highlighted.is_selectable());
        assert!(!DayClass::BookedByThisGuest.is_selectable());
        assert!(!DayClass::OutOfWindow.is_selectable());
    }
}
