use crate::model::*;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    interval: DateInterval,
    owner: Option<ReservationRef>,
}

/// Immutable set of closed day intervals.
///
/// Entries are kept sorted by start for owner lookups. Coverage is also
/// merged into disjoint runs (adjacent days joined) so day and range queries
/// are binary searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    entries: Vec<Entry>,
    coverage: Vec<DateInterval>,
}

impl IntervalSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a venue's reservations; `owner_of` resolves to them.
    pub fn from_reservations(reservations: impl IntoIterator<Item = ReservationRef>) -> Self {
        Self::build(
            reservations
                .into_iter()
                .map(|r| Entry {
                    interval: r.interval,
                    owner: Some(r),
                })
                .collect(),
        )
    }

    /// Build from bare intervals (e.g. the guest's stays elsewhere).
    pub fn from_intervals(intervals: impl IntoIterator<Item = DateInterval>) -> Self {
        Self::build(
            intervals
                .into_iter()
                .map(|interval| Entry {
                    interval,
                    owner: None,
                })
                .collect(),
        )
    }

    fn build(mut entries: Vec<Entry>) -> Self {
        entries.sort_by_key(|e| e.interval.start);
        let spans: Vec<DateInterval> = entries.iter().map(|e| e.interval).collect();
        let coverage = merge_runs(&spans);
        Self { entries, coverage }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Disjoint covered runs, sorted.
    pub fn coverage(&self) -> &[DateInterval] {
        &self.coverage
    }

    pub fn reservations(&self) -> impl Iterator<Item = &ReservationRef> {
        self.entries.iter().filter_map(|e| e.owner.as_ref())
    }

    pub fn is_covered(&self, day: Day) -> bool {
        let idx = self.coverage.partition_point(|run| run.start <= day);
        idx > 0 && self.coverage[idx - 1].end >= day
    }

    /// The reservation covering `day`, earliest start first.
    pub fn owner_of(&self, day: Day) -> Option<&ReservationRef> {
        let right_bound = self.entries.partition_point(|e| e.interval.start <= day);
        self.entries[..right_bound]
            .iter()
            .filter(|e| e.interval.end >= day)
            .find_map(|e| e.owner.as_ref())
    }

    /// True iff no day in `[start, end]` is covered.
    pub fn range_is_clear(&self, start: Day, end: Day) -> bool {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        // Runs are disjoint, so their ends are sorted too.
        let idx = self.coverage.partition_point(|run| run.end < start);
        match self.coverage.get(idx) {
            Some(run) => run.start > end,
            None => true,
        }
    }

    /// Reservations sharing at least one day with `query`.
    pub fn overlapping(&self, query: &DateInterval) -> impl Iterator<Item = &ReservationRef> {
        let right_bound = self.entries.partition_point(|e| e.interval.start <= query.end);
        self.entries[..right_bound]
            .iter()
            .filter(move |e| e.interval.end >= query.start)
            .filter_map(|e| e.owner.as_ref())
    }
}

/// Merge intervals sorted by start into disjoint runs. Intervals that touch on
/// consecutive days are joined, since closed day intervals leave no gap there.
pub fn merge_runs(sorted: &[DateInterval]) -> Vec<DateInterval> {
    let mut merged: Vec<DateInterval> = Vec::new();
    for &iv in sorted {
        if let Some(last) = merged.last_mut()
            && (iv.start <= last.end || last.end.succ_opt() == Some(iv.start))
        {
            last.end = last.end.max(iv.end);
            continue;
        }
        merged.push(iv);
    }
    merged
}
