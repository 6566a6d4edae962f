// Facet reconciler: sparse aggregate rows -> one record per x-domain value

use crate::binning::grid_index;
use crate::error::{ExplorerError, Result};
use crate::store::AggregateRow;
use serde::Serialize;

/// Aggregated value and row count at one x position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Measure {
    pub y: f64,
    pub count: u64,
}

impl Measure {
    fn from_row(row: &AggregateRow) -> Self {
        Self {
            y: row.y.unwrap_or(0.0),
            count: row.count,
        }
    }
}

/// One chart position on the dense grid.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesRecord {
    Single { x: f64, measure: Measure },
    /// Facet measures in facet-list order; every facet is present.
    Faceted { x: f64, facets: Vec<(String, Measure)> },
}

impl SeriesRecord {
    pub fn x(&self) -> f64 {
        match self {
            SeriesRecord::Single { x, .. } | SeriesRecord::Faceted { x, .. } => *x,
        }
    }

    /// Measure for `facet`, or the unfaceted measure when `facet` is `None`.
    pub fn measure(&self, facet: Option<&str>) -> Option<Measure> {
        match (self, facet) {
            (SeriesRecord::Single { measure, .. }, None) => Some(*measure),
            (SeriesRecord::Faceted { facets, .. }, Some(name)) => {
                facets.iter().find(|(f, _)| f == name).map(|(_, m)| *m)
            }
            _ => None,
        }
    }
}

fn slot(domain: &[f64], x: f64, column: &str) -> Result<usize> {
    grid_index(domain, x).ok_or_else(|| ExplorerError::OffGridValue {
        column: column.to_string(),
        value: x,
    })
}

/// Spread unfaceted rows over the domain, zero-filling positions without data.
pub fn align_single(rows: &[AggregateRow], domain: &[f64], column: &str) -> Result<Vec<SeriesRecord>> {
    let mut grid: Vec<SeriesRecord> = domain
        .iter()
        .map(|&x| SeriesRecord::Single { x, measure: Measure::default() })
        .collect();

    for row in rows {
        let idx = slot(domain, row.x, column)?;
        if let SeriesRecord::Single { measure, .. } = &mut grid[idx] {
            *measure = Measure::from_row(row);
        }
    }

    Ok(grid)
}

/// Fold faceted rows into the dense grid.
///
/// Rows are sorted by x and each run sharing an x is written into that
/// position's record, keyed by facet. Facets with no row at a position keep
/// the `{y: 0, count: 0}` default, so any number of facets is handled.
pub fn merge_facets(
    mut rows: Vec<AggregateRow>,
    domain: &[f64],
    facets: &[String],
    column: &str,
) -> Result<Vec<SeriesRecord>> {
    // grid[slot][facet position]
    let mut grid = vec![vec![Measure::default(); facets.len()]; domain.len()];

    rows.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut start = 0;
    while start < rows.len() {
        let x = rows[start].x;
        let end = rows[start..]
            .iter()
            .position(|r| r.x != x)
            .map_or(rows.len(), |offset| start + offset);

        let idx = slot(domain, x, column)?;
        for row in &rows[start..end] {
            let label = row.facet.as_ref().map(|c| c.to_string()).unwrap_or_default();
            let position = facets
                .iter()
                .position(|f| *f == label)
                .ok_or_else(|| ExplorerError::Data(format!("facet value '{}' missing from facet list", label)))?;
            grid[idx][position] = Measure::from_row(row);
        }

        start = end;
    }

    Ok(domain
        .iter()
        .zip(grid)
        .map(|(&x, measures)| SeriesRecord::Faceted {
            x,
            facets: facets.iter().cloned().zip(measures).collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;

    fn row(x: f64, facet: Option<&str>, y: f64, count: u64) -> AggregateRow {
        AggregateRow {
            x,
            y: Some(y),
            facet: facet.map(|f| Cell::Text(f.to_string())),
            count,
        }
    }

    fn facets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn m(y: f64, count: u64) -> Measure {
        Measure { y, count }
    }

    #[test]
    fn test_merge_two_facets() {
        let rows = vec![
            row(1.0, Some("A"), 5.0, 2),
            row(1.0, Some("B"), 3.0, 1),
            row(2.0, Some("A"), 7.0, 4),
        ];
        let merged = merge_facets(rows, &[1.0, 2.0], &facets(&["A", "B"]), "x").unwrap();
        assert_eq!(
            merged,
            vec![
                SeriesRecord::Faceted {
                    x: 1.0,
                    facets: vec![("A".to_string(), m(5.0, 2)), ("B".to_string(), m(3.0, 1))],
                },
                SeriesRecord::Faceted {
                    x: 2.0,
                    facets: vec![("A".to_string(), m(7.0, 4)), ("B".to_string(), m(0.0, 0))],
                },
            ]
        );
    }

    #[test]
    fn test_merge_unsorted_with_gaps() {
        // Only the second facet at the first x, a hole in the middle
        let rows = vec![
            row(3.0, Some("Yes"), 9.0, 3),
            row(0.0, Some("No"), 1.0, 1),
            row(3.0, Some("No"), 2.0, 2),
        ];
        let merged = merge_facets(rows, &[0.0, 1.0, 2.0, 3.0], &facets(&["Yes", "No"]), "x").unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0].measure(Some("Yes")), Some(m(0.0, 0)));
        assert_eq!(merged[0].measure(Some("No")), Some(m(1.0, 1)));
        assert_eq!(merged[1].measure(Some("Yes")), Some(m(0.0, 0)));
        assert_eq!(merged[2].measure(Some("No")), Some(m(0.0, 0)));
        assert_eq!(merged[3].measure(Some("Yes")), Some(m(9.0, 3)));
        assert_eq!(merged[3].measure(Some("No")), Some(m(2.0, 2)));
    }

    #[test]
    fn test_merge_three_facets() {
        let rows = vec![
            row(1.0, Some("low"), 1.0, 1),
            row(1.0, Some("mid"), 2.0, 1),
            row(1.0, Some("high"), 3.0, 1),
        ];
        let merged = merge_facets(rows, &[1.0], &facets(&["mid", "low", "high"]), "x").unwrap();
        match &merged[0] {
            SeriesRecord::Faceted { facets, .. } => {
                let order: Vec<&str> = facets.iter().map(|(f, _)| f.as_str()).collect();
                assert_eq!(order, vec!["mid", "low", "high"]);
                assert_eq!(facets[2].1, m(3.0, 1));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_merge_snaps_float_noise() {
        let domain = crate::binning::x_domain(5.0, 6.5, 0.1);
        let rows = vec![row(5.7, Some("A"), 1.0, 1)];
        let merged = merge_facets(rows, &domain, &facets(&["A"]), "CGPA").unwrap();
        assert_eq!(merged[7].measure(Some("A")), Some(m(1.0, 1)));
    }

    #[test]
    fn test_off_grid_rejected() {
        let rows = vec![row(1.5, Some("A"), 1.0, 1)];
        let result = merge_facets(rows, &[1.0, 2.0], &facets(&["A"]), "Projects");
        assert!(matches!(result, Err(ExplorerError::OffGridValue { .. })));
    }

    #[test]
    fn test_unknown_facet_rejected() {
        let rows = vec![row(1.0, Some("C"), 1.0, 1)];
        assert!(merge_facets(rows, &[1.0], &facets(&["A", "B"]), "x").is_err());
    }

    #[test]
    fn test_align_single() {
        let rows = vec![
            AggregateRow { x: 0.0, y: Some(4.0), facet: None, count: 2 },
            AggregateRow { x: 2.0, y: None, facet: None, count: 1 },
        ];
        let aligned = align_single(&rows, &[0.0, 1.0, 2.0], "x").unwrap();
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[0].measure(None), Some(m(4.0, 2)));
        assert_eq!(aligned[1].measure(None), Some(m(0.0, 0)));
        // All-null group keeps its count with a zero value
        assert_eq!(aligned[2].measure(None), Some(m(0.0, 1)));
        assert_eq!(aligned[1].x(), 1.0);
    }
}
