//! Numeric specialization: leaf values from a `name,value` table, combined by a reducer.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::domain::{LeafValues, NodeView, RollUp};

#[derive(Error, Debug)]
pub enum NumericError {
    #[error("invalid leaf value at line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    #[error("leaf '{name}' listed twice (line {line})")]
    DuplicateLeaf { name: String, line: usize },

    #[error("no value for leaf '{0}'")]
    MissingLeaf(String),

    #[error("'{0}' has a non-finite value")]
    NonFinite(String),
}

/// How children's values are folded into their parent's value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Reducer {
    #[default]
    Sum,
    Min,
    Max,
    Mean,
    Product,
}

impl Reducer {
    pub fn reduce<I: IntoIterator<Item = f64>>(self, values: I) -> f64 {
        let values = values.into_iter();
        match self {
            Reducer::Sum => values.sum(),
            Reducer::Product => values.product(),
            Reducer::Min => values.fold(f64::INFINITY, f64::min),
            Reducer::Max => values.fold(f64::NEG_INFINITY, f64::max),
            Reducer::Mean => {
                let (total, count) = values.fold((0.0, 0usize), |(t, c), v| (t + v, c + 1));
                if count == 0 {
                    0.0
                } else {
                    total / count as f64
                }
            }
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::Sum => "sum",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Mean => "mean",
            Reducer::Product => "product",
        };
        f.write_str(name)
    }
}

/// Leaf name to value lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafTable {
    values: HashMap<String, f64>,
}

impl LeafTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name,value` lines; blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Result<Self, NumericError> {
        let mut table = Self::new();
        for (i, raw) in content.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((name, value)) = trimmed.split_once(',') else {
                return Err(NumericError::InvalidLine {
                    line,
                    reason: "expected 'name,value'".to_string(),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(NumericError::InvalidLine {
                    line,
                    reason: "empty leaf name".to_string(),
                });
            }
            let value: f64 = value.trim().parse().map_err(|e| NumericError::InvalidLine {
                line,
                reason: format!("'{}': {}", value.trim(), e),
            })?;
            if !value.is_finite() {
                return Err(NumericError::InvalidLine {
                    line,
                    reason: format!("'{}' is not a finite number", value),
                });
            }
            if table.values.insert(name.to_string(), value).is_some() {
                return Err(NumericError::DuplicateLeaf {
                    name: name.to_string(),
                    line,
                });
            }
        }
        Ok(table)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromStr for LeafTable {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for LeafTable {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// `f64` roll-up over a [`LeafTable`].
#[derive(Debug, Clone)]
pub struct NumericRollUp {
    table: LeafTable,
    reducer: Reducer,
    default_leaf_value: Option<f64>,
}

impl NumericRollUp {
    pub fn new(table: LeafTable, reducer: Reducer) -> Self {
        Self {
            table,
            reducer,
            default_leaf_value: None,
        }
    }

    /// Value used for leaves missing from the table instead of failing.
    pub fn with_default(mut self, value: Option<f64>) -> Self {
        self.default_leaf_value = value;
        self
    }
}

impl RollUp for NumericRollUp {
    type Value = f64;
    type Error = NumericError;

    fn compute_leaf_values(&self, leaves: &mut LeafValues<'_, f64>) -> Result<(), NumericError> {
        leaves.try_fill(|name| {
            let value = match self.table.get(name) {
                Some(v) => v,
                None => {
                    trace!("leaf '{}' not in table, default={:?}", name, self.default_leaf_value);
                    self.default_leaf_value
                        .ok_or_else(|| NumericError::MissingLeaf(name.to_string()))?
                }
            };
            if value.is_finite() {
                Ok(value)
            } else {
                Err(NumericError::NonFinite(name.to_string()))
            }
        })
    }

    fn combine_children(&self, parent: &NodeView<'_, f64>) -> Result<f64, NumericError> {
        let value = self.reducer.reduce(parent.child_values().copied());
        if value.is_finite() {
            Ok(value)
        } else {
            Err(NumericError::NonFinite(parent.name().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Reducer::Sum, 6.0)]
    #[case(Reducer::Min, 1.0)]
    #[case(Reducer::Max, 3.0)]
    #[case(Reducer::Mean, 2.0)]
    #[case(Reducer::Product, 6.0)]
    fn given_values_when_reducing_then_expected(#[case] reducer: Reducer, #[case] expected: f64) {
        assert_eq!(reducer.reduce([1.0, 2.0, 3.0]), expected);
    }

    #[test]
    fn given_table_text_when_parsing_then_reads_values() {
        let table = LeafTable::parse("# leaves\nL1, 1.5\n\nL2,-2\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("L1"), Some(1.5));
        assert_eq!(table.get("L2"), Some(-2.0));
    }

    #[rstest]
    #[case("L1")]
    #[case("L1,abc")]
    #[case(",3")]
    fn given_bad_line_when_parsing_then_invalid_line(#[case] content: &str) {
        assert!(matches!(
            LeafTable::parse(content),
            Err(NumericError::InvalidLine { line: 1, .. })
        ));
    }

    #[rstest]
    #[case("A,NaN")]
    #[case("A,inf")]
    #[case("A,-inf")]
    fn given_non_finite_value_when_parsing_then_invalid_line(#[case] content: &str) {
        assert!(matches!(
            LeafTable::parse(content),
            Err(NumericError::InvalidLine { line: 1, .. })
        ));
    }

    #[test]
    fn given_duplicate_leaf_when_parsing_then_errors() {
        assert!(matches!(
            LeafTable::parse("A,1\nA,2\n"),
            Err(NumericError::DuplicateLeaf { line: 2, .. })
        ));
    }

    #[test]
    fn given_reducer_name_when_displaying_then_kebab_case() {
        assert_eq!(Reducer::Mean.to_string(), "mean");
    }
}
