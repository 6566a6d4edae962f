use crate::error::{ExplorerError, Result};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A single typed value from the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Type a raw CSV field: empty is null, anything that parses as a float is numeric.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Null
        } else if let Ok(n) = trimmed.parse::<f64>() {
            Cell::Number(n)
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Cell::Null),
            Value::Number(n) => n
                .as_f64()
                .map(Cell::Number)
                .ok_or_else(|| ExplorerError::Data(format!("number {} is out of range", n))),
            Value::String(s) => Ok(Cell::parse(s)),
            Value::Bool(b) => Ok(Cell::Text(b.to_string())),
            other => Err(ExplorerError::Data(format!("unsupported value {}", other))),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Total order used wherever distinct values are listed: nulls, then numbers, then text.
    pub fn sort_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::Null, _) => Ordering::Less,
            (_, Cell::Null) => Ordering::Greater,
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Number(_), Cell::Text(_)) => Ordering::Less,
            (Cell::Text(_), Cell::Number(_)) => Ordering::Greater,
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Column names and inferred kinds of a dataset.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<String>,
    kinds: Vec<ColumnKind>,
}

impl Schema {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Find a column, preferring an exact match and falling back to a case-insensitive one.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
    }

    /// Map a caller-supplied name onto the canonical header spelling.
    pub fn resolve(&self, name: &str) -> Result<&str> {
        self.index_of(name)
            .map(|idx| self.columns[idx].as_str())
            .ok_or_else(|| ExplorerError::UnknownColumn(name.to_string()))
    }

    pub fn resolve_numeric(&self, name: &str) -> Result<&str> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| ExplorerError::UnknownColumn(name.to_string()))?;
        if self.kinds[idx] != ColumnKind::Numeric {
            return Err(ExplorerError::NonNumericColumn(self.columns[idx].clone()));
        }
        Ok(&self.columns[idx])
    }
}

/// The read-only relation every request is answered from.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    schema: Schema,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(ExplorerError::Data(format!(
                    "row {} has {} fields, expected {}",
                    i + 1,
                    row.len(),
                    headers.len()
                )));
            }
        }

        let kinds = (0..headers.len())
            .map(|idx| {
                let mut seen_number = false;
                for row in &rows {
                    match &row[idx] {
                        Cell::Number(_) => seen_number = true,
                        Cell::Text(_) => return ColumnKind::Categorical,
                        Cell::Null => {}
                    }
                }
                if seen_number {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Categorical
                }
            })
            .collect();

        Ok(Self {
            name: "data".to_string(),
            schema: Schema { columns: headers, kinds },
            rows,
        })
    }

    /// Load a `.json` array of objects or, for any other extension, a CSV file.
    /// The relation is named after the file stem.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if !is_json {
            return Self::from_csv_path(path);
        }

        let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let dataset = Self::from_json(&value)?;
        Ok(match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => dataset.with_name(stem),
            None => dataset,
        })
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dataset = Self::from_csv_reader(file)?;
        Ok(match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => dataset.with_name(stem),
            None => dataset,
        })
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::parse).collect());
        }

        Self::new(headers, rows)
    }

    /// Create a Dataset from a JSON Array of Objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| ExplorerError::Data("input data must be a JSON array of objects".to_string()))?;

        if array.is_empty() {
            return Err(ExplorerError::Data("input data array is empty".to_string()));
        }

        // Headers come from the first object
        let first_obj = array[0]
            .as_object()
            .ok_or_else(|| ExplorerError::Data("items in array must be objects".to_string()))?;
        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::new();
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| ExplorerError::Data("items in array must be objects".to_string()))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                row.push(match obj.get(header) {
                    Some(v) => Cell::from_json(v)?,
                    None => Cell::Null,
                });
            }
            rows.push(row);
        }

        Self::new(headers, rows)
    }

    /// Relation name used when rendering query text.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
