use crate::error::{ExplorerError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Dashboard option lists and axis step sizes.
///
/// Built once at startup and shared by reference; requests that need a
/// customised option list clone it first.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "default_discrete_filters")]
    pub discrete_filters: Vec<String>,
    #[serde(default = "default_continuous_filters")]
    pub continuous_filters: Vec<String>,
    #[serde(default = "default_axis_options")]
    pub x_axis: Vec<String>,
    #[serde(default = "default_axis_options")]
    pub y_axis: Vec<String>,
    #[serde(default = "default_aggregations")]
    pub aggregations: Vec<String>,
    #[serde(default = "default_facets")]
    pub facets: Vec<String>,
    /// Columns scored in tenths, binned with `fine_step`.
    #[serde(default = "default_fine_step_columns")]
    pub fine_step_columns: Vec<String>,
    #[serde(default = "default_fine_step")]
    pub fine_step: f64,
    #[serde(default = "default_step")]
    pub default_step: f64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_discrete_filters() -> Vec<String> {
    strings(&[
        "Internships",
        "Projects",
        "Workshops/Certifications",
        "PlacementStatus",
        "ExtracurricularActivities",
        "PlacementTraining",
    ])
}

fn default_continuous_filters() -> Vec<String> {
    strings(&["CGPA", "AptitudeTestScore", "SoftSkillsRating", "SSC_Marks", "HSC_Marks"])
}

fn default_axis_options() -> Vec<String> {
    strings(&[
        "AptitudeTestScore",
        "CGPA",
        "SSC_marks",
        "HSC_marks",
        "SoftSkillsRating",
        "Internships",
        "Projects",
        "Workshops/Certifications",
    ])
}

fn default_aggregations() -> Vec<String> {
    strings(&["avg", "max", "min", "median", "stddev_pop", "count"])
}

fn default_facets() -> Vec<String> {
    strings(&["None", "PlacementStatus", "ExtracurricularActivities", "PlacementTraining"])
}

fn default_fine_step_columns() -> Vec<String> {
    strings(&["CGPA", "SoftSkillsRating"])
}

fn default_fine_step() -> f64 { 0.1 }
fn default_step() -> f64 { 1.0 }

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            discrete_filters: default_discrete_filters(),
            continuous_filters: default_continuous_filters(),
            x_axis: default_axis_options(),
            y_axis: default_axis_options(),
            aggregations: default_aggregations(),
            facets: default_facets(),
            fine_step_columns: default_fine_step_columns(),
            fine_step: default_fine_step(),
            default_step: default_step(),
        }
    }
}

impl ExplorerConfig {
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> Result<()> {
        for step in [self.fine_step, self.default_step] {
            if !(step.is_finite() && step > 0.0) {
                return Err(ExplorerError::Data(format!("step size {} must be positive", step)));
            }
        }
        if self.x_axis.is_empty() || self.y_axis.is_empty() {
            return Err(ExplorerError::Data("axis option lists must not be empty".to_string()));
        }
        for agg in &self.aggregations {
            agg.parse::<crate::aggregate::Aggregation>()?;
        }
        Ok(())
    }

    /// Bin width of the x-axis for `column`.
    pub fn step_for(&self, column: &str) -> f64 {
        if self.fine_step_columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            self.fine_step
        } else {
            self.default_step
        }
    }

    pub fn allows_aggregation(&self, name: &str) -> bool {
        self.aggregations.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Case-insensitive membership check for option lists.
pub fn contains_column(options: &[String], column: &str) -> bool {
    options.iter().any(|o| o.eq_ignore_ascii_case(column))
}

/// The sentinel facet option meaning "no split series".
pub fn is_no_facet(facet: &str) -> bool {
    facet.trim().is_empty() || facet.eq_ignore_ascii_case("none")
}
