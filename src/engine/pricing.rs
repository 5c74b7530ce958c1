use serde::{Deserialize, Serialize};

use crate::model::DateInterval;

/// Linear per-night price, in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub nights: u32,
    pub price_per_night: u64,
    pub total: u64,
}

/// `None` for ranges under one night or totals that overflow.
pub fn quote(interval: &DateInterval, price_per_night: u64) -> Option<Quote> {
    let nights = u32::try_from(interval.nights()).ok().filter(|n| *n >= 1)?;
    let total = price_per_night.checked_mul(u64::from(nights))?;
    Some(Quote {
        nights,
        price_per_night,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Day;

    fn iv(start: &str, end: &str) -> DateInterval {
        DateInterval::new(start.parse::<Day>().unwrap(), end.parse::<Day>().unwrap()).unwrap()
    }

    #[test]
    fn nights_times_price() {
        let q = quote(&iv("2025-06-01", "2025-06-05"), 12_500).unwrap();
        assert_eq!(q.nights, 4);
        assert_eq!(q.total, 50_000);
    }

    #[test]
    fn across_month_boundary() {
        let q = quote(&iv("2025-01-30", "2025-02-02"), 100).unwrap();
        assert_eq!(q.nights, 3);
        assert_eq!(q.total, 300);
    }

    #[test]
    fn zero_nights_unpriced() {
        assert!(quote(&iv("2025-06-01", "2025-06-01"), 100).is_none());
    }

    #[test]
    fn overflow_unpriced() {
        assert!(quote(&iv("2025-06-01", "2025-06-03"), u64::MAX).is_none());
    }
}
