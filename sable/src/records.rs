//! Materialized record tables
//!
//! Data moves in and out of the external engine as labeled tables: an
//! ordered list of index-label tuples, each with a numeric value. Set
//! membership is a table with value 1.0 per element; variables and
//! equations additionally carry a marginal after a solve.

use serde::Serialize;

/// One record: an index-label tuple with its value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub keys: Vec<String>,
    pub value: f64,
    /// Dual value, present on variable/equation records after a solve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marginal: Option<f64>,
}

impl Row {
    pub fn new(keys: Vec<String>, value: f64) -> Self {
        Self {
            keys,
            value,
            marginal: None,
        }
    }
}

/// A labeled table keyed by domain tuples
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    /// Axis names, one per key column. The value column is implicit.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from `(keys, value)` pairs
    pub fn from_rows<I, K>(columns: Vec<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: IntoIterator<Item = String>,
    {
        Self {
            columns,
            rows: rows
                .into_iter()
                .map(|(keys, value)| Row::new(keys.into_iter().collect(), value))
                .collect(),
        }
    }

    /// Membership table for a set: one key column, value 1.0 per element
    pub fn from_elements<I>(column: impl Into<String>, elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            columns: vec![column.into()],
            rows: elements
                .into_iter()
                .map(|e| Row::new(vec![e.into()], 1.0))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of key columns
    pub fn dimension(&self) -> usize {
        self.columns.len()
    }

    /// Value stored under an exact key tuple
    pub fn value(&self, keys: &[&str]) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.keys.len() == keys.len() && r.keys.iter().zip(keys).all(|(a, b)| a == b))
            .map(|r| r.value)
    }

    /// JSON exchange form, the shape engines serialize tables in
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "columns": self.columns,
            "rows": self.rows,
        })
    }

    /// Distinct labels observed in one key column, in first-seen order
    pub fn distinct_labels(&self, column: usize) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if let Some(label) = row.keys.get(column) {
                if seen.insert(label.clone()) {
                    out.push(label.clone());
                }
            }
        }
        out
    }
}
