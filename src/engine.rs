use crate::binning;
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::predicate::Predicate;
use crate::reconcile::{align_single, merge_facets};
use crate::request::{resolve_request, UpdateRequest};
use crate::response::{ContinuousFilterOptions, DiscreteFilterOptions, OptionsResponse, UpdateResponse};
use crate::store::DataStore;
use crate::trend;
use tracing::{debug, info, warn};

/// Answers dashboard calls from a read-only store.
///
/// Holds no per-request state; one instance can serve any number of
/// concurrent callers.
#[derive(Debug)]
pub struct Explorer<S> {
    store: S,
    config: ExplorerConfig,
}

impl<S: DataStore> Explorer<S> {
    pub fn new(store: S, config: ExplorerConfig) -> Self {
        Self { store, config }
    }

    /// Run one update: validate, aggregate, bin, reconcile, fit, assemble.
    pub fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let resolved = resolve_request(request, &self.config, self.store.schema())?;
        let query = &resolved.query;
        info!(
            x = %query.x,
            y = %query.y,
            agg = %query.agg,
            facet = query.facet.as_deref().unwrap_or("none"),
            "update request"
        );

        if query.predicate.is_never() {
            info!("an empty option set excludes every row");
            return Ok(UpdateResponse::empty(resolved.y_axis_options));
        }

        let rows = self.store.aggregate(query)?;
        if rows.is_empty() {
            info!("filters matched no rows");
            return Ok(UpdateResponse::empty(resolved.y_axis_options));
        }

        let (x_min, x_max) = self
            .store
            .min_max(&query.x, &query.predicate)?
            .ok_or_else(|| ExplorerError::Data(format!("no bounds for '{}' despite matching rows", query.x)))?;
        let x_domain = binning::x_domain(x_min, x_max, resolved.step);
        debug!(x_min, x_max, bins = x_domain.len(), "built x domain");

        let (data, facet_list) = match &query.facet {
            Some(facet) => {
                let facets = self.facet_list(facet)?;
                (merge_facets(rows, &x_domain, &facets, &query.x)?, facets)
            }
            None => (align_single(&rows, &x_domain, &query.x)?, Vec::new()),
        };

        debug!(sql = %query.max_sql(self.store.relation()), "computing y max");
        let y_max = self.store.grouped_max(query)?.unwrap_or(0.0);

        let trendline = trend::estimate(
            &data,
            resolved.facet_included().then_some(facet_list.as_slice()),
        );

        Ok(UpdateResponse {
            data,
            x_domain,
            y_max,
            facet_included: resolved.facet_included(),
            y_axis_options: resolved.y_axis_options,
            facet_list,
            trendline,
        })
    }

    /// Facet categories over the whole dataset, pinned to descending order.
    fn facet_list(&self, facet: &str) -> Result<Vec<String>> {
        let mut values = self.store.distinct(facet)?;
        values.sort_by(|a, b| b.sort_cmp(a));
        if values.len() != 2 {
            debug!(facet, count = values.len(), "facet is not binary");
        }
        let labels: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        // Facet labels share the record object with the x coordinate
        if labels.iter().any(|label| label == "x") {
            return Err(ExplorerError::Data(format!(
                "facet '{}' has a category named 'x', which collides with the x key",
                facet
            )));
        }
        Ok(labels)
    }

    /// Option lists and filter domains for drawing the dashboard controls.
    pub fn options(&self) -> Result<OptionsResponse> {
        let schema = self.store.schema();

        let mut discrete_filters = Vec::new();
        for name in &self.config.discrete_filters {
            let Ok(column) = schema.resolve(name) else {
                warn!(column = %name, "configured discrete filter is not in the dataset");
                continue;
            };
            let mut values = self.store.distinct(column)?;
            values.sort_by(|a, b| a.sort_cmp(b));
            // Binary choices read better largest-first
            if values.len() == 2 {
                values.reverse();
            }
            discrete_filters.push(DiscreteFilterOptions {
                column: column.to_string(),
                options: values.iter().map(|v| v.to_json()).collect(),
            });
        }

        let everything = Predicate::default();
        let mut continuous_filters = Vec::new();
        for name in &self.config.continuous_filters {
            let column = match schema.resolve_numeric(name) {
                Ok(column) => column,
                Err(e) => {
                    warn!(column = %name, error = %e, "skipping configured continuous filter");
                    continue;
                }
            };
            if let Some((min, max)) = self.store.min_max(column, &everything)? {
                continuous_filters.push(ContinuousFilterOptions {
                    column: column.to_string(),
                    min,
                    max,
                });
            }
        }

        let mut y_axis = self.config.y_axis.clone();
        if let Some(default_x) = self.config.x_axis.first() {
            y_axis.retain(|c| !c.eq_ignore_ascii_case(default_x));
        }

        Ok(OptionsResponse {
            x_axis: self.config.x_axis.clone(),
            y_axis,
            aggregations: self.config.aggregations.clone(),
            facets: self.config.facets.clone(),
            discrete_filters,
            continuous_filters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use crate::reconcile::{Measure, SeriesRecord};
    use crate::trend::Trendline;
    use serde_json::json;

    const CSV: &str = "StudentID,CGPA,Internships,Projects,Workshops/Certifications,AptitudeTestScore,SoftSkillsRating,ExtracurricularActivities,PlacementTraining,SSC_Marks,HSC_Marks,PlacementStatus\n\
                       1,7.5,1,1,1,65,4.4,No,No,61,79,NotPlaced\n\
                       2,8.9,0,3,2,90,4.0,Yes,No,78,82,Placed\n\
                       3,7.3,1,2,2,82,4.8,Yes,No,79,80,NotPlaced\n\
                       4,7.5,1,1,2,85,4.4,Yes,Yes,81,80,Placed\n\
                       5,8.3,1,2,2,86,4.5,Yes,Yes,74,88,Placed\n";

    fn explorer() -> Explorer<Dataset> {
        let ds = Dataset::from_csv_reader(CSV.as_bytes()).unwrap();
        Explorer::new(ds, ExplorerConfig::default())
    }

    fn request(value: serde_json::Value) -> UpdateRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_unfaceted_update() {
        let ex = explorer();
        let resp = ex
            .update(&request(json!({"x": "Projects", "y": "CGPA", "agg": "max", "facet": "None"})))
            .unwrap();
        assert_eq!(resp.x_domain, vec![1.0, 2.0, 3.0]);
        assert_eq!(resp.data.len(), resp.x_domain.len());
        assert_eq!(resp.data[0].measure(None), Some(Measure { y: 7.5, count: 2 }));
        assert_eq!(resp.y_max, 8.9);
        assert!(!resp.facet_included);
        assert!(resp.facet_list.is_empty());
        match &resp.trendline {
            Trendline::Single(points) => assert_eq!(points.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_faceted_update() {
        let ex = explorer();
        let resp = ex
            .update(&request(json!({"x": "Internships", "y": "AptitudeTestScore", "agg": "avg", "facet": "PlacementStatus"})))
            .unwrap();
        assert_eq!(resp.facet_list, vec!["Placed".to_string(), "NotPlaced".to_string()]);
        assert_eq!(resp.x_domain, vec![0.0, 1.0]);
        assert!(resp.facet_included);
        match &resp.data[0] {
            SeriesRecord::Faceted { facets, .. } => {
                assert_eq!(facets[0], ("Placed".to_string(), Measure { y: 90.0, count: 1 }));
                assert_eq!(facets[1], ("NotPlaced".to_string(), Measure::default()));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(resp.data[1].measure(Some("NotPlaced")), Some(Measure { y: 73.5, count: 2 }));
        assert_eq!(resp.y_max, 90.0);
        match &resp.trendline {
            Trendline::ByFacet(lines) => {
                assert_eq!(lines.len(), 2);
                // NotPlaced only has data at x = 1
                assert_eq!(lines[1].1.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_matching_rows() {
        let ex = explorer();
        let resp = ex
            .update(&request(json!({
                "continuous_filters": {"CGPA": [6, 9]},
                "discrete_filters": {"Internships": []},
                "x": "CGPA", "y": "Projects", "agg": "avg", "facet": "PlacementStatus"
            })))
            .unwrap();
        assert_eq!(resp, UpdateResponse::empty(ExplorerConfig::default().y_axis));
    }

    #[test]
    fn test_crossed_range_gives_empty_response() {
        let ex = explorer();
        let resp = ex
            .update(&request(json!({
                "continuous_filters": {"CGPA": [9, 6]},
                "x": "Projects", "y": "CGPA", "agg": "avg"
            })))
            .unwrap();
        assert_eq!(resp, UpdateResponse::empty(ExplorerConfig::default().y_axis));
    }

    #[test]
    fn test_facet_category_named_x_rejected() {
        let csv = CSV.replacen("No,No,61", "No,x,61", 1);
        let ex = Explorer::new(Dataset::from_csv_reader(csv.as_bytes()).unwrap(), ExplorerConfig::default());
        let err = ex
            .update(&request(json!({"x": "Projects", "y": "CGPA", "agg": "avg", "facet": "PlacementTraining"})))
            .unwrap_err();
        assert!(matches!(err, ExplorerError::Data(_)));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_count_update() {
        let ex = explorer();
        let resp = ex
            .update(&request(json!({"x": "Projects", "y": "CGPA", "agg": "count"})))
            .unwrap();
        assert_eq!(resp.y_axis_options, vec!["Projects".to_string()]);
        let counts: Vec<u64> = resp.data.iter().map(|r| r.measure(None).unwrap().count).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        assert_eq!(resp.y_max, 2.0);
    }

    #[test]
    fn test_invalid_request_never_queries() {
        let ex = explorer();
        let err = ex
            .update(&request(json!({"x": "CGPA\" OR 1=1 --", "y": "Projects", "agg": "avg"})))
            .unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_options() {
        let ex = explorer();
        let options = ex.options().unwrap();
        assert!(!options.y_axis.contains(&"AptitudeTestScore".to_string()));
        assert_eq!(options.x_axis.len(), 8);

        let placement = options
            .discrete_filters
            .iter()
            .find(|f| f.column == "PlacementStatus")
            .unwrap();
        assert_eq!(placement.options, vec![json!("Placed"), json!("NotPlaced")]);

        let projects = options.discrete_filters.iter().find(|f| f.column == "Projects").unwrap();
        assert_eq!(projects.options, vec![json!(1.0), json!(2.0), json!(3.0)]);

        let cgpa = options.continuous_filters.iter().find(|f| f.column == "CGPA").unwrap();
        assert_eq!((cgpa.min, cgpa.max), (7.3, 8.9));
    }
}
