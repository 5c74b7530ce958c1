use serde::Serialize;

/// Locally recoverable rejections. The guest adjusts the input and retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum EngineError {
    #[error("range must span at least two distinct days")]
    SingleDayRange,
    #[error("range includes booked dates")]
    RangeIncludesBookedDates,
    #[error("no complete range selected")]
    IncompleteRange,
    #[error("guest count {count} outside 1..={max}")]
    GuestCount { count: u32, max: u32 },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_host_wording() {
        assert_eq!(
            EngineError::SingleDayRange.to_string(),
            "range must span at least two distinct days"
        );
        assert_eq!(
            EngineError::RangeIncludesBookedDates.to_string(),
            "range includes booked dates"
        );
        assert_eq!(
            EngineError::GuestCount { count: 9, max: 4 }.to_string(),
            "guest count 9 outside 1..=4"
        );
    }
}
