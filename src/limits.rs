/// How far ahead a guest may navigate and book, in months.
pub const DEFAULT_HORIZON_MONTHS: u32 = 24;
pub const MAX_HORIZON_MONTHS: u32 = 120;

/// Reservation lists larger than this are refused when building a snapshot.
pub const MAX_SNAPSHOT_RESERVATIONS: usize = 50_000;

/// Hard cap on guests per reservation, independent of the venue's own limit.
pub const MAX_GUESTS_PER_RESERVATION: u32 = 64;

pub const MAX_TOKEN_LEN: usize = 4096;
