// Trend estimator: ordinary least squares per series

use crate::reconcile::SeriesRecord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Least-squares line through `points`.
    ///
    /// A single point, or points that all share one x, give a flat line at the
    /// mean y. `None` only when there is nothing to fit.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fitted value at every input x, in input order.
pub fn trend_points(points: &[(f64, f64)]) -> Vec<TrendPoint> {
    match LinearFit::fit(points) {
        Some(fit) => points
            .iter()
            .map(|&(x, _)| TrendPoint { x, y: fit.predict(x) })
            .collect(),
        None => Vec::new(),
    }
}

/// Trend lines for a response: one flat series, or one per facet.
#[derive(Debug, Clone, PartialEq)]
pub enum Trendline {
    Single(Vec<TrendPoint>),
    /// Facets in facet-list order; facets without data are left out.
    ByFacet(Vec<(String, Vec<TrendPoint>)>),
}

impl Trendline {
    pub fn empty() -> Self {
        Trendline::Single(Vec::new())
    }
}

/// Non-zero points of one series. Zero-valued positions are grid filler, not data.
fn series_points(records: &[SeriesRecord], facet: Option<&str>) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter_map(|r| r.measure(facet).map(|m| (r.x(), m.y)))
        .filter(|&(_, y)| y != 0.0)
        .collect()
}

/// Fit one line for an unfaceted grid, or one per facet when `facets` is given.
pub fn estimate(records: &[SeriesRecord], facets: Option<&[String]>) -> Trendline {
    let Some(facets) = facets else {
        return Trendline::Single(trend_points(&series_points(records, None)));
    };

    let mut lines = Vec::new();
    for facet in facets {
        let present = records
            .first()
            .map_or(false, |r| r.measure(Some(facet.as_str())).is_some());
        if !present {
            continue;
        }

        let points = series_points(records, Some(facet.as_str()));
        if points.is_empty() {
            continue;
        }
        lines.push((facet.clone(), trend_points(&points)));
    }
    Trendline::ByFacet(lines)
}
