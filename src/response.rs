// Response assembler: the JSON shapes handed back to the dashboard

use crate::error::Result;
use crate::reconcile::SeriesRecord;
use crate::trend::Trendline;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// Chart payload for one update call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateResponse {
    pub data: Vec<SeriesRecord>,
    pub x_domain: Vec<f64>,
    pub y_max: f64,
    pub y_axis_options: Vec<String>,
    pub facet_included: bool,
    pub facet_list: Vec<String>,
    pub trendline: Trendline,
}

impl UpdateResponse {
    /// Response for a filter combination that matched no rows.
    pub fn empty(y_axis_options: Vec<String>) -> Self {
        Self {
            data: Vec::new(),
            x_domain: Vec::new(),
            y_max: 0.0,
            y_axis_options,
            facet_included: false,
            facet_list: Vec::new(),
            trendline: Trendline::empty(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// Records flatten to `{x, y, count}` or `{x, <facet>: {y, count}, ...}`.
impl Serialize for SeriesRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SeriesRecord::Single { x, measure } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("x", x)?;
                map.serialize_entry("y", &measure.y)?;
                map.serialize_entry("count", &measure.count)?;
                map.end()
            }
            SeriesRecord::Faceted { x, facets } => {
                let mut map = serializer.serialize_map(Some(facets.len() + 1))?;
                map.serialize_entry("x", x)?;
                for (facet, measure) in facets {
                    map.serialize_entry(facet, measure)?;
                }
                map.end()
            }
        }
    }
}

// A flat point list when unfaceted, otherwise an object keyed by facet.
impl Serialize for Trendline {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Trendline::Single(points) => points.serialize(serializer),
            Trendline::ByFacet(lines) => {
                let mut map = serializer.serialize_map(Some(lines.len()))?;
                for (facet, points) in lines {
                    map.serialize_entry(facet, points)?;
                }
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscreteFilterOptions {
    pub column: String,
    pub options: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuousFilterOptions {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

/// Everything the dashboard needs to draw its controls before the first update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsResponse {
    pub x_axis: Vec<String>,
    pub y_axis: Vec<String>,
    pub aggregations: Vec<String>,
    pub facets: Vec<String>,
    pub discrete_filters: Vec<DiscreteFilterOptions>,
    pub continuous_filters: Vec<ContinuousFilterOptions>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Measure;
    use crate::trend::TrendPoint;
    use serde_json::json;

    #[test]
    fn test_empty_response_shape() {
        let response = UpdateResponse::empty(vec!["CGPA".to_string()]);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "data": [],
                "x_domain": [],
                "y_max": 0.0,
                "y_axis_options": ["CGPA"],
                "facet_included": false,
                "facet_list": [],
                "trendline": []
            })
        );
    }

    #[test]
    fn test_faceted_record_key_order() {
        let record = SeriesRecord::Faceted {
            x: 1.0,
            facets: vec![
                ("Placed".to_string(), Measure { y: 5.0, count: 2 }),
                ("NotPlaced".to_string(), Measure::default()),
            ],
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"x":1.0,"Placed":{"y":5.0,"count":2},"NotPlaced":{"y":0.0,"count":0}}"#
        );
    }

    #[test]
    fn test_single_record() {
        let record = SeriesRecord::Single { x: 2.5, measure: Measure { y: 1.5, count: 3 } };
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"x":2.5,"y":1.5,"count":3}"#);
    }

    #[test]
    fn test_trendline_by_facet() {
        let trend = Trendline::ByFacet(vec![
            ("Yes".to_string(), vec![TrendPoint { x: 1.0, y: 2.0 }]),
            ("No".to_string(), vec![]),
        ]);
        assert_eq!(
            serde_json::to_string(&trend).unwrap(),
            r#"{"Yes":[{"x":1.0,"y":2.0}],"No":[]}"#
        );
    }
}
