use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Calendar day: the only time type. No time-of-day, no zone.
pub type Day = NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(pub Ulid);

impl VenueId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for VenueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub Ulid);

impl ReservationId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque, comparable guest key (account email or similar).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestIdentity(String);

impl GuestIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GuestIdentity {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for GuestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interval end {end} is before start {start}")]
pub struct InvalidInterval {
    pub start: Day,
    pub end: Day,
}

/// Closed interval `[start, end]` of calendar days. Both endpoints are part of
/// the stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: Day,
    pub end: Day,
}

impl DateInterval {
    pub fn new(start: Day, end: Day) -> Result<Self, InvalidInterval> {
        if start > end {
            return Err(InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: Day) -> Self {
        Self { start: day, end: day }
    }

    pub fn covers(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Inclusive intersection: true if any calendar day belongs to both.
    pub fn shares_day(&self, other: &DateInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Stay overlap. The end day is the checkout day, so a stay starting on
    /// another stay's checkout day does not overlap it.
    pub fn overlaps_stay(&self, other: &DateInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_interval(&self, other: &DateInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One reservation as returned by the reservation service. Immutable for the
/// lifetime of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRef {
    pub id: ReservationId,
    pub venue_id: VenueId,
    pub guest: GuestIdentity,
    pub guest_display_name: Option<String>,
    pub interval: DateInterval,
    pub guest_count: u32,
}

/// The slice of venue content the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub name: Option<String>,
    pub max_guests: u32,
    /// Minor currency units.
    pub price_per_night: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub guest: GuestIdentity,
    pub token: String,
}

impl Credentials {
    pub fn new(guest: GuestIdentity, token: impl Into<String>) -> Self {
        Self {
            guest,
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub venue_id: VenueId,
    pub interval: DateInterval,
    pub guest_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionState {
    Empty,
    AnchorOnly,
    RangeComplete,
}

/// Pending range owned by the selection machine. `end` is only ever set
/// together with an `anchor` strictly before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub anchor: Option<Day>,
    pub end: Option<Day>,
}

impl SelectionRange {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        match (self.anchor, self.end) {
            (None, _) => SelectionState::Empty,
            (Some(_), None) => SelectionState::AnchorOnly,
            (Some(_), Some(_)) => SelectionState::RangeComplete,
        }
    }

    /// The complete range, if both ends are chosen.
    pub fn as_interval(&self) -> Option<DateInterval> {
        match (self.anchor, self.end) {
            (Some(start), Some(end)) => Some(DateInterval { start, end }),
            _ => None,
        }
    }

    pub fn contains(&self, day: Day) -> bool {
        match (self.anchor, self.end) {
            (Some(anchor), Some(end)) => anchor <= day && day <= end,
            (Some(anchor), None) => anchor == day,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reservation", rename_all = "snake_case")]
pub enum ConflictVerdict {
    Clear,
    /// The candidate lands on the guest's own stay at this venue.
    OwnedByGuest(ReservationId),
    /// The guest already stays elsewhere on overlapping days.
    OverlapsOtherVenue(ReservationId),
    OverlapsSameVenueOtherGuest,
}

impl ConflictVerdict {
    pub fn is_clear(&self) -> bool {
        matches!(self, ConflictVerdict::Clear)
    }
}

/// Global bound on navigation and selection: `[today, today + horizon]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedWindow {
    pub earliest: Day,
    pub latest: Day,
}

impl AllowedWindow {
    pub fn new(today: Day, horizon_months: u32) -> Self {
        let latest = today
            .checked_add_months(Months::new(horizon_months))
            .unwrap_or(NaiveDate::MAX);
        Self {
            earliest: today,
            latest,
        }
    }

    pub fn contains(&self, day: Day) -> bool {
        self.earliest <= day && day <= self.latest
    }

    pub fn earliest_month(&self) -> Day {
        first_of_month(self.earliest)
    }

    pub fn latest_month(&self) -> Day {
        first_of_month(self.latest)
    }
}

pub fn first_of_month(day: Day) -> Day {
    day.with_day(1).unwrap_or(day)
}

/// Per-day display classification, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClass {
    /// The guest's own stay at another venue.
    BookedByOtherVenue,
    OutOfWindow,
    /// The guest's own stay at this venue; clicking navigates to it.
    BookedByThisGuest,
    BookedByOtherGuest,
    Selected,
    /// Part of the pre-supplied default range (the reservation being edited).
    Highlighted,
    Today,
    Available,
}

impl DayClass {
    /// Whether a click on this day may start or complete a selection.
    pub fn is_selectable(&self) -> bool {
        matches!(
            self,
            DayClass::Selected | DayClass::Highlighted | DayClass::Today | DayClass::Available
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: Day,
    pub class: DayClass,
}

/// Which cached reservation lists the host must refetch after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInvalidation {
    pub venue_id: VenueId,
    pub guest: GuestIdentity,
}

/// Committed change on the reservation service, broadcast per venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationChange {
    Created {
        id: ReservationId,
        venue_id: VenueId,
        interval: DateInterval,
    },
    Updated {
        id: ReservationId,
        venue_id: VenueId,
        interval: DateInterval,
    },
    Deleted {
        id: ReservationId,
        venue_id: VenueId,
    },
}

impl ReservationChange {
    pub fn venue_id(&self) -> VenueId {
        match self {
            ReservationChange::Created { venue_id, .. }
            | ReservationChange::Updated { venue_id, .. }
            | ReservationChange::Deleted { venue_id, .. } => *venue_id,
        }
    }
}
