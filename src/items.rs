use crate::error::{KfResult, KnapForgeError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Immutable value/weight table, one row per item (= genome column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTable {
    values: Vec<i64>,
    weights: Vec<i64>,
}

impl ItemTable {
    /// Parses a whitespace-separated `<value> <weight>` file. Blank lines are skipped.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KfResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(KnapForgeError::not_found(path));
        }
        let content = fs::read_to_string(path)?;
        let table = Self::parse(&content)
            .map_err(|e| KnapForgeError::Validation(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded {} items from {}", table.len(), path.display());
        Ok(table)
    }

    fn parse(content: &str) -> Result<Self, String> {
        let mut values = Vec::new();
        let mut weights = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(format!(
                    "line {}: expected 2 fields (value weight), found {}",
                    line_no,
                    fields.len()
                ));
            }
            let parse = |s: &str| {
                s.parse::<i64>()
                    .map_err(|_| format!("line {}: '{}' is not an integer", line_no, s))
            };
            values.push(parse(fields[0])?);
            weights.push(parse(fields[1])?);
        }

        if values.is_empty() {
            return Err("no items found".to_string());
        }
        Ok(Self { values, weights })
    }

    pub fn from_pairs(pairs: &[(i64, i64)]) -> KfResult<Self> {
        if pairs.is_empty() {
            return Err(KnapForgeError::Validation("Item table is empty".into()));
        }
        Ok(Self {
            values: pairs.iter().map(|p| p.0).collect(),
            weights: pairs.iter().map(|p| p.1).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn weights(&self) -> &[i64] {
        &self.weights
    }

    pub fn weight_sum(&self) -> i64 {
        self.weights.iter().sum()
    }
}
