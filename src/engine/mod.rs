mod calendar;
mod conflict;
mod error;
mod intervals;
mod mutations;
mod pricing;
mod selection;

pub use calendar::{classify, month_grid, CalendarSnapshot};
pub use conflict::{detect, existing_on_venue, ConflictQuery};
pub use error::EngineError;
pub use intervals::{merge_runs, IntervalSet};
pub use mutations::{
    MutationAction, MutationError, MutationReceipt, ReservationMutator, SubmitRequest,
};
pub use pricing::{quote, Quote};
pub use selection::{CalendarInput, SelectionOutcome, SelectionStateMachine};
