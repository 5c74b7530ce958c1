use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::model::*;

use super::calendar::{classify, CalendarSnapshot};
use super::EngineError;

/// Discrete inputs from the host calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "input", content = "day", rename_all = "snake_case")]
pub enum CalendarInput {
    DayClicked(Day),
    PreviousMonth,
    NextMonth,
    Clear,
}

/// What a single input produced, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SelectionOutcome {
    /// Anchor or end moved. `end == None` means only a start day is chosen.
    DateChanged { range: SelectionRange },
    /// Click ignored; `class` says why.
    Rejected { day: Day, class: DayClass },
    ValidationError { error: EngineError },
    NavigateToOwnReservation { reservation: ReservationId },
    MonthChanged { month: Day },
    NavigationBlocked { month: Day },
}

/// Two-click range picker bounded by an [`AllowedWindow`].
///
/// `Empty` → click → `AnchorOnly` → later click → `RangeComplete`. Any click
/// from `RangeComplete` starts over. Booked days never enter the range: a
/// completing click whose span crosses a booking resets the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionStateMachine {
    window: AllowedWindow,
    range: SelectionRange,
    visible_month: Day,
}

impl SelectionStateMachine {
    pub fn new(window: AllowedWindow) -> Self {
        Self {
            window,
            range: SelectionRange::empty(),
            visible_month: window.earliest_month(),
        }
    }

    pub fn window(&self) -> &AllowedWindow {
        &self.window
    }

    pub fn range(&self) -> SelectionRange {
        self.range
    }

    pub fn state(&self) -> SelectionState {
        self.range.state()
    }

    pub fn visible_month(&self) -> Day {
        self.visible_month
    }

    /// Seed a complete range, e.g. the stay being edited. Ranges shorter than
    /// one night are ignored. The visible month jumps to the range start when
    /// it lies inside the window.
    pub fn preset(&mut self, interval: DateInterval) {
        if interval.nights() < 1 {
            return;
        }
        self.range = SelectionRange {
            anchor: Some(interval.start),
            end: Some(interval.end),
        };
        if self.window.contains(interval.start) {
            self.visible_month = first_of_month(interval.start);
        }
    }

    pub fn handle_event(
        &mut self,
        snapshot: &CalendarSnapshot,
        input: CalendarInput,
    ) -> Vec<SelectionOutcome> {
        let mut out = Vec::new();
        match input {
            CalendarInput::DayClicked(day) => self.on_day_clicked(snapshot, day, &mut out),
            CalendarInput::PreviousMonth => self.navigate(false, &mut out),
            CalendarInput::NextMonth => self.navigate(true, &mut out),
            CalendarInput::Clear => self.set_range(SelectionRange::empty(), &mut out),
        }
        out
    }

    fn on_day_clicked(
        &mut self,
        snapshot: &CalendarSnapshot,
        day: Day,
        out: &mut Vec<SelectionOutcome>,
    ) {
        let class = classify(day, snapshot, &self.range, &self.window);
        match class {
            DayClass::BookedByThisGuest => {
                if let Some(owner) = snapshot.venue.owner_of(day) {
                    out.push(SelectionOutcome::NavigateToOwnReservation {
                        reservation: owner.id,
                    });
                    return;
                }
                out.push(SelectionOutcome::Rejected { day, class });
                return;
            }
            c if !c.is_selectable() => {
                out.push(SelectionOutcome::Rejected { day, class });
                return;
            }
            _ => {}
        }

        match (self.range.anchor, self.range.end) {
            (Some(anchor), None) if day == anchor => {
                out.push(SelectionOutcome::ValidationError {
                    error: EngineError::SingleDayRange,
                });
                self.set_range(SelectionRange::empty(), out);
            }
            (Some(anchor), None) if day > anchor => {
                if snapshot.venue.range_is_clear(anchor, day) {
                    self.set_range(
                        SelectionRange {
                            anchor: Some(anchor),
                            end: Some(day),
                        },
                        out,
                    );
                } else {
                    out.push(SelectionOutcome::ValidationError {
                        error: EngineError::RangeIncludesBookedDates,
                    });
                    self.set_range(SelectionRange::empty(), out);
                }
            }
            // Empty, RangeComplete, or a click before the anchor: new anchor.
            _ => self.set_range(
                SelectionRange {
                    anchor: Some(day),
                    end: None,
                },
                out,
            ),
        }
    }

    fn navigate(&mut self, forward: bool, out: &mut Vec<SelectionOutcome>) {
        let next = if forward {
            (self.visible_month < self.window.latest_month())
                .then(|| self.visible_month.checked_add_months(Months::new(1)))
                .flatten()
        } else {
            (self.visible_month > self.window.earliest_month())
                .then(|| self.visible_month.checked_sub_months(Months::new(1)))
                .flatten()
        };
        match next {
            Some(month) => {
                self.visible_month = month;
                out.push(SelectionOutcome::MonthChanged { month });
            }
            None => out.push(SelectionOutcome::NavigationBlocked {
                month: self.visible_month,
            }),
        }
    }

    fn set_range(&mut self, range: SelectionRange, out: &mut Vec<SelectionOutcome>) {
        if self.range != range {
            self.range = range;
            out.push(SelectionOutcome::DateChanged { range });
        }
    }
}
