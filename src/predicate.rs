// Predicate builder: filter selections -> validated boolean condition

use crate::data::{Cell, Schema};
use crate::error::{ExplorerError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Slider bounds arrive either as numbers or as numeric strings ("6.00").
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBound {
    Number(f64),
    Text(String),
}

impl RawBound {
    fn value(self) -> std::result::Result<f64, String> {
        match self {
            RawBound::Number(n) => Ok(n),
            RawBound::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("range bound '{}' is not a number", s)),
        }
    }
}

/// Inclusive `[min, max]` range for a continuous column.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "(RawBound, RawBound)")]
pub struct RangeFilter {
    pub min: f64,
    pub max: f64,
}

impl RangeFilter {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl TryFrom<(RawBound, RawBound)> for RangeFilter {
    type Error = String;

    fn try_from((min, max): (RawBound, RawBound)) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            min: min.value()?,
            max: max.value()?,
        })
    }
}

/// The filter part of an update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub continuous_filters: BTreeMap<String, RangeFilter>,
    #[serde(default)]
    pub discrete_filters: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Range {
        column: String,
        index: usize,
        min: f64,
        max: f64,
    },
    In {
        column: String,
        index: usize,
        values: Vec<Cell>,
    },
    /// A discrete filter with nothing ticked.
    Never,
}

/// Conjunction of validated clauses. No clauses means every row matches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Build the predicate for a selection. Every column is resolved against the
    /// schema first, so nothing unvalidated can reach query text.
    pub fn build(selection: &FilterSelection, schema: &Schema) -> Result<Self> {
        let mut clauses = Vec::new();

        for (name, range) in &selection.continuous_filters {
            let column = schema.resolve_numeric(name)?.to_string();
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(ExplorerError::InvalidRange {
                    column,
                    detail: "bounds must be finite".to_string(),
                });
            }
            let index = schema.index_of(&column).ok_or_else(|| ExplorerError::UnknownColumn(column.clone()))?;
            clauses.push(Clause::Range {
                column,
                index,
                min: range.min,
                max: range.max,
            });
        }

        for (name, options) in &selection.discrete_filters {
            let column = schema.resolve(name)?.to_string();
            if options.is_empty() {
                clauses.push(Clause::Never);
                continue;
            }
            let values = options
                .iter()
                .map(|v| {
                    Cell::from_json(v).map_err(|_| {
                        ExplorerError::InvalidRequest(format!("unsupported option {} for '{}'", v, column))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let index = schema.index_of(&column).ok_or_else(|| ExplorerError::UnknownColumn(column.clone()))?;
            clauses.push(Clause::In { column, index, values });
        }

        Ok(Self { clauses })
    }

    pub fn is_always_true(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn is_never(&self) -> bool {
        self.clauses.iter().any(|c| matches!(c, Clause::Never))
    }

    /// Evaluate against one dataset row. Null cells fail every clause.
    pub fn matches(&self, row: &[Cell]) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Range { index, min, max, .. } => match row[*index] {
                Cell::Number(v) => v >= *min && v <= *max,
                _ => false,
            },
            Clause::In { index, values, .. } => {
                let cell = &row[*index];
                !cell.is_null() && values.iter().any(|v| v == cell)
            }
            Clause::Never => false,
        })
    }

    /// Render as a SQL boolean expression.
    pub fn to_sql(&self) -> String {
        if self.is_always_true() {
            return "TRUE".to_string();
        }

        self.clauses
            .iter()
            .map(|clause| match clause {
                Clause::Range { column, min, max, .. } => {
                    let ident = quote_ident(column);
                    format!("({ident} >= {} AND {ident} <= {})", min, max)
                }
                Clause::In { column, values, .. } => {
                    let list: Vec<String> = values.iter().map(sql_literal).collect();
                    format!("{} IN ({})", quote_ident(column), list.join(", "))
                }
                Clause::Never => "FALSE".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a value as a SQL literal.
pub fn sql_literal(cell: &Cell) -> String {
    match cell {
        Cell::Null => "NULL".to_string(),
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}
