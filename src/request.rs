use crate::aggregate::Aggregation;
use crate::config::{contains_column, is_no_facet, ExplorerConfig};
use crate::data::Schema;
use crate::error::{ExplorerError, Result};
use crate::predicate::{FilterSelection, Predicate};
use crate::store::AggregateQuery;
use serde::Deserialize;

/// JSON body of an update call.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub filters: FilterSelection,
    pub x: String,
    pub y: String,
    pub agg: String,
    #[serde(default = "default_facet")]
    pub facet: String,
}

fn default_facet() -> String {
    "None".to_string()
}

impl UpdateRequest {
    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| ExplorerError::InvalidRequest(e.to_string()))
    }
}

/// A request after validation: every identifier is canonical and known.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub query: AggregateQuery,
    /// Request-scoped copy of the y-axis options, possibly narrowed.
    pub y_axis_options: Vec<String>,
    /// Bin width of the x-axis.
    pub step: f64,
}

impl ResolvedRequest {
    pub fn facet_included(&self) -> bool {
        self.query.facet.is_some()
    }
}

/// Validate a request against the configured options and the dataset schema.
pub fn resolve_request(
    request: &UpdateRequest,
    config: &ExplorerConfig,
    schema: &Schema,
) -> Result<ResolvedRequest> {
    if !config.allows_aggregation(&request.agg) {
        return Err(ExplorerError::InvalidAggregation(request.agg.clone()));
    }
    let agg: Aggregation = request.agg.parse()?;

    if !contains_column(&config.x_axis, &request.x) {
        return Err(ExplorerError::ColumnNotAllowed {
            column: request.x.clone(),
            role: "x-axis",
        });
    }
    let x = schema.resolve_numeric(&request.x)?.to_string();

    let mut y_axis_options = config.y_axis.clone();
    let y_requested = if agg == Aggregation::Count {
        // Counting needs no separate y column
        y_axis_options = vec![request.x.clone()];
        request.x.clone()
    } else if request.x.eq_ignore_ascii_case(&request.y) {
        y_axis_options.retain(|o| !o.eq_ignore_ascii_case(&request.x));
        y_axis_options.first().cloned().ok_or_else(|| {
            ExplorerError::InvalidRequest(format!("no y-axis option left besides '{}'", request.x))
        })?
    } else {
        if !contains_column(&y_axis_options, &request.y) {
            return Err(ExplorerError::ColumnNotAllowed {
                column: request.y.clone(),
                role: "y-axis",
            });
        }
        request.y.clone()
    };
    let y = schema.resolve_numeric(&y_requested)?.to_string();

    let facet = if is_no_facet(&request.facet) {
        None
    } else {
        if !contains_column(&config.facets, &request.facet) {
            return Err(ExplorerError::ColumnNotAllowed {
                column: request.facet.clone(),
                role: "facet",
            });
        }
        Some(schema.resolve(&request.facet)?.to_string())
    };

    let predicate = Predicate::build(&request.filters, schema)?;
    let step = config.step_for(&x);

    Ok(ResolvedRequest {
        query: AggregateQuery { x, y, agg, facet, predicate },
        y_axis_options,
        step,
    })
}
