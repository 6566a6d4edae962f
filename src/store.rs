// Aggregate query executor: the store interface and its in-memory implementation

use crate::aggregate::Aggregation;
use crate::data::{Cell, Dataset, Schema};
use crate::error::{ExplorerError, Result};
use crate::predicate::{quote_ident, Predicate};
use std::collections::HashMap;

/// A grouped aggregation over validated, canonical column names.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub x: String,
    pub y: String,
    pub agg: Aggregation,
    pub facet: Option<String>,
    pub predicate: Predicate,
}

impl AggregateQuery {
    fn group_by_sql(&self) -> String {
        match &self.facet {
            Some(facet) => format!("{}, {}", quote_ident(&self.x), quote_ident(facet)),
            None => quote_ident(&self.x),
        }
    }

    /// `SELECT x, agg(y), [facet,] count ... GROUP BY x[, facet]`
    pub fn to_sql(&self, relation: &str) -> String {
        let facet_select = match &self.facet {
            Some(facet) => format!("{} AS facet, ", quote_ident(facet)),
            None => String::new(),
        };
        format!(
            "SELECT {x} AS x, {agg}({y}) AS y, {facet_select}COUNT({x}) AS count FROM {rel} WHERE {pred} GROUP BY {group}",
            x = quote_ident(&self.x),
            agg = self.agg.sql_name(),
            y = quote_ident(&self.y),
            rel = quote_ident(relation),
            pred = self.predicate,
            group = self.group_by_sql(),
        )
    }

    /// Maximum of the grouped aggregate, computed over the groups rather than the raw rows.
    pub fn max_sql(&self, relation: &str) -> String {
        format!(
            "SELECT MAX(y) AS y_max FROM (SELECT {agg}({y}) AS y FROM {rel} WHERE {pred} GROUP BY {group})",
            agg = self.agg.sql_name(),
            y = quote_ident(&self.y),
            rel = quote_ident(relation),
            pred = self.predicate,
            group = self.group_by_sql(),
        )
    }
}

/// One group of an aggregate query.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub x: f64,
    /// `None` when every y in the group was null.
    pub y: Option<f64>,
    pub facet: Option<Cell>,
    pub count: u64,
}

/// What the pipeline needs from the underlying relation.
pub trait DataStore {
    fn schema(&self) -> &Schema;

    /// Name used when rendering query text.
    fn relation(&self) -> &str;

    /// Distinct non-null values of a column, in no particular order.
    fn distinct(&self, column: &str) -> Result<Vec<Cell>>;

    /// Min and max of a numeric column over the rows matching `predicate`.
    fn min_max(&self, column: &str, predicate: &Predicate) -> Result<Option<(f64, f64)>>;

    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>>;

    fn grouped_max(&self, query: &AggregateQuery) -> Result<Option<f64>> {
        Ok(self
            .aggregate(query)?
            .iter()
            .filter_map(|row| row.y)
            .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |m| m.max(y)))))
    }
}

fn column_index(schema: &Schema, column: &str) -> Result<usize> {
    schema
        .index_of(column)
        .ok_or_else(|| ExplorerError::UnknownColumn(column.to_string()))
}

struct Group {
    x: f64,
    facet: Option<Cell>,
    values: Vec<f64>,
    count: u64,
}

impl DataStore for Dataset {
    fn schema(&self) -> &Schema {
        Dataset::schema(self)
    }

    fn relation(&self) -> &str {
        self.name()
    }

    fn distinct(&self, column: &str) -> Result<Vec<Cell>> {
        let idx = column_index(self.schema(), column)?;
        let mut values: Vec<Cell> = Vec::new();
        for row in self.rows() {
            let cell = &row[idx];
            if !cell.is_null() && !values.contains(cell) {
                values.push(cell.clone());
            }
        }
        Ok(values)
    }

    fn min_max(&self, column: &str, predicate: &Predicate) -> Result<Option<(f64, f64)>> {
        let idx = column_index(self.schema(), column)?;
        let mut bounds: Option<(f64, f64)> = None;
        for row in self.rows().iter().filter(|r| predicate.matches(r)) {
            if let Some(v) = row[idx].as_f64() {
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(v), max.max(v)),
                    None => (v, v),
                });
            }
        }
        Ok(bounds)
    }

    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        let schema = self.schema();
        let x_idx = column_index(schema, &query.x)?;
        let y_idx = column_index(schema, &query.y)?;
        let facet_idx = match &query.facet {
            Some(f) => Some(column_index(schema, f)?),
            None => None,
        };

        tracing::debug!(sql = %query.to_sql(self.relation()), "running aggregate");

        let mut groups: Vec<Group> = Vec::new();
        let mut lookup: HashMap<(u64, String), usize> = HashMap::new();

        for row in self.rows().iter().filter(|r| query.predicate.matches(r)) {
            // Rows without a numeric x cannot be placed on the axis
            let Some(x) = row[x_idx].as_f64() else { continue };
            let x = x + 0.0; // fold -0.0 into 0.0

            let facet = match facet_idx {
                Some(idx) if row[idx].is_null() => continue,
                Some(idx) => Some(row[idx].clone()),
                None => None,
            };
            let key = (
                x.to_bits(),
                facet.as_ref().map(|c| c.to_string()).unwrap_or_default(),
            );

            let slot = *lookup.entry(key).or_insert_with(|| {
                groups.push(Group { x, facet, values: Vec::new(), count: 0 });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.count += 1;
            if let Some(y) = row[y_idx].as_f64() {
                group.values.push(y);
            }
        }

        let mut rows: Vec<AggregateRow> = groups
            .into_iter()
            .map(|g| AggregateRow {
                x: g.x,
                y: query.agg.apply(&g.values),
                facet: g.facet,
                count: g.count,
            })
            .collect();

        rows.sort_by(|a, b| {
            a.x.total_cmp(&b.x).then_with(|| match (&a.facet, &b.facet) {
                (Some(fa), Some(fb)) => fa.sort_cmp(fb),
                _ => std::cmp::Ordering::Equal,
            })
        });

        Ok(rows)
    }
}
