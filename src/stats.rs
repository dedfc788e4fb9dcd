//! Price-per-m² summary statistics.

use serde::Serialize;

use crate::record::TransactionRecord;

/// Price-per-m² summary over a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub count: usize,
    pub avg: i64,
    pub median: i64,
    pub min: i64,
    pub max: i64,
}

impl StatsSummary {
    /// Summarises the positive `price_m2` values of `records`.
    ///
    /// Returns `None` when there is nothing to summarise.
    pub fn from_records(records: &[TransactionRecord]) -> Option<Self> {
        Self::from_values(records.iter().map(|r| r.price_m2))
    }

    pub fn from_values(values: impl IntoIterator<Item = i64>) -> Option<Self> {
        let mut values: Vec<i64> = values.into_iter().filter(|v| *v > 0).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_unstable();

        let n = values.len();
        let sum: i64 = values.iter().sum();

        Some(StatsSummary {
            count: n,
            avg: (sum as f64 / n as f64).round_ties_even() as i64,
            median: median(&values),
            min: values[0],
            max: values[n - 1],
        })
    }
}

/// Middle value of a sorted, non-empty slice. For an even count this is the
/// floor of the mean of the two middle values.
fn median(sorted: &[i64]) -> i64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]).div_euclid(2)
    }
}
