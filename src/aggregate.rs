use crate::error::ExplorerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of aggregation functions a request may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Avg,
    Max,
    Min,
    Median,
    StddevPop,
    Count,
}

impl Aggregation {
    pub const ALL: [Aggregation; 6] = [
        Aggregation::Avg,
        Aggregation::Max,
        Aggregation::Min,
        Aggregation::Median,
        Aggregation::StddevPop,
        Aggregation::Count,
    ];

    /// SQL function name. Only these strings ever reach query text.
    pub fn sql_name(&self) -> &'static str {
        match self {
            Aggregation::Avg => "avg",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Median => "median",
            Aggregation::StddevPop => "stddev_pop",
            Aggregation::Count => "count",
        }
    }

    /// Reduce the non-null values of one group. `None` when nothing is left to reduce,
    /// except for count which is always defined.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        let n = values.len() as f64;
        match self {
            Aggregation::Count => Some(n),
            _ if values.is_empty() => None,
            Aggregation::Avg => Some(values.iter().sum::<f64>() / n),
            Aggregation::Max => Some(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            Aggregation::Min => Some(values.iter().copied().fold(f64::INFINITY, f64::min)),
            Aggregation::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
            Aggregation::StddevPop => {
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                Some(variance.sqrt())
            }
        }
    }
}

impl FromStr for Aggregation {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aggregation::ALL
            .iter()
            .copied()
            .find(|agg| agg.sql_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ExplorerError::InvalidAggregation(s.to_string()))
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}
