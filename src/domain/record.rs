//! Adjacency records: one `parent,child_1,...,child_N` line each.

use crate::domain::error::{TreeError, TreeResult};

/// Sentinel parent token designating the root record.
pub const DEFAULT_SENTINEL: &str = "None";

/// Parent side of an adjacency record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// The record designates the tree's root
    Root,
    /// A named parent node
    Named(String),
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the source, 0 for records built in code
    pub line: usize,
    pub parent: ParentRef,
    pub children: Vec<String>,
}

impl Record {
    /// Builds a record for a named parent.
    pub fn new<S: Into<String>>(parent: S, children: impl IntoIterator<Item = S>) -> Self {
        Self {
            line: 0,
            parent: ParentRef::Named(parent.into()),
            children: children.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a record designating `name` as root.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            line: 0,
            parent: ParentRef::Root,
            children: vec![name.into()],
        }
    }

    /// Parses one line.
    ///
    /// Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse(line: &str, line_no: usize, sentinel: &str) -> TreeResult<Option<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            return Err(malformed(line_no, "expected a parent and at least one child"));
        }
        if let Some(pos) = fields.iter().position(|f| f.is_empty()) {
            return Err(malformed(line_no, &format!("empty field at position {}", pos + 1)));
        }

        let parent = if fields[0] == sentinel {
            if fields.len() != 2 {
                return Err(malformed(
                    line_no,
                    &format!("root record must name exactly one node, got {}", fields.len() - 1),
                ));
            }
            ParentRef::Root
        } else {
            ParentRef::Named(fields[0].to_string())
        };

        Ok(Some(Self {
            line: line_no,
            parent,
            children: fields[1..].iter().map(|f| f.to_string()).collect(),
        }))
    }
}

fn malformed(line: usize, reason: &str) -> TreeError {
    TreeError::MalformedRecord {
        line,
        reason: reason.to_string(),
    }
}
