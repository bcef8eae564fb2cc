//! @ai:module:intent In-memory columnar data backend addressed by row ids
//! @ai:module:layer domain
//! @ai:module:public_api DataBackend
//! @ai:module:stateless true

use crate::data::column::Column;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// @ai:intent Immutable table shared by every task view built on top of it
///
/// Row ids are unique but need not be contiguous. Tasks never copy the backend;
/// they hold it behind an `Arc` and keep their own row and column selections.
#[derive(Debug, Clone)]
pub struct DataBackend {
    names: Vec<String>,
    columns: Vec<Column>,
    row_ids: Vec<usize>,
    positions: HashMap<usize, usize>,
}

impl DataBackend {
    /// @ai:intent Create a backend from named columns and explicit row ids
    /// @ai:pre all columns have row_ids.len() entries; row ids are unique
    /// @ai:effects pure
    pub fn new(columns: Vec<(String, Column)>, row_ids: Vec<usize>) -> Result<Self> {
        let mut names = Vec::with_capacity(columns.len());
        let mut cols = Vec::with_capacity(columns.len());

        for (name, column) in columns {
            if column.len() != row_ids.len() {
                return Err(Error::InvalidData(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    column.len(),
                    row_ids.len()
                )));
            }
            if names.contains(&name) {
                return Err(Error::InvalidData(format!("duplicate column '{}'", name)));
            }
            names.push(name);
            cols.push(column);
        }

        let mut positions = HashMap::with_capacity(row_ids.len());
        for (pos, &id) in row_ids.iter().enumerate() {
            if positions.insert(id, pos).is_some() {
                return Err(Error::InvalidData(format!("duplicate row id {}", id)));
            }
        }

        Ok(Self {
            names,
            columns: cols,
            row_ids,
            positions,
        })
    }

    /// @ai:intent Create a backend with row ids 1..=n
    /// @ai:effects pure
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let n = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        Self::new(columns, (1..=n).collect())
    }

    pub fn nrow(&self) -> usize {
        self.row_ids.len()
    }

    pub fn ncol(&self) -> usize {
        self.columns.len()
    }

    pub fn colnames(&self) -> &[String] {
        &self.names
    }

    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// @ai:intent Look up a column by name
    /// @ai:effects pure
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// @ai:intent Translate row ids into backend positions
    /// @ai:effects pure
    pub fn positions(&self, rows: &[usize]) -> Result<Vec<usize>> {
        rows.iter()
            .map(|id| self.position(*id))
            .collect()
    }

    pub fn position(&self, row_id: usize) -> Result<usize> {
        self.positions
            .get(&row_id)
            .copied()
            .ok_or(Error::UnknownRow(row_id))
    }

    /// @ai:intent Count missing values per column over the given rows
    /// @ai:effects pure
    pub fn missings(&self, cols: &[String], rows: &[usize]) -> Result<Vec<(String, usize)>> {
        let positions = self.positions(rows)?;
        cols.iter()
            .map(|name| {
                let column = self.column(name)?;
                let count = positions.iter().filter(|&&p| column.is_missing(p)).count();
                Ok((name.clone(), count))
            })
            .collect()
    }

    /// @ai:intent Distinct labels of a column over the given rows, sorted
    /// @ai:effects pure
    pub fn distinct(&self, col: &str, rows: &[usize]) -> Result<Vec<String>> {
        let column = self.column(col)?;
        let positions = self.positions(rows)?;
        let set: BTreeSet<String> = positions.iter().map(|&p| column.label(p)).collect();
        Ok(set.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> DataBackend {
        DataBackend::new(
            vec![
                ("x".to_string(), Column::Numeric(vec![1.0, f64::NAN, 3.0])),
                ("y".to_string(), Column::factor_from_labels(&["a", "b", "a"])),
            ],
            vec![10, 20, 30],
        )
        .unwrap()
    }

    #[test]
    fn test_non_contiguous_row_ids() {
        let b = backend();
        assert_eq!(b.positions(&[30, 10]).unwrap(), vec![2, 0]);
        assert!(matches!(b.position(11), Err(Error::UnknownRow(11))));
    }

    #[test]
    fn test_duplicate_row_ids_rejected() {
        let result = DataBackend::new(
            vec![("x".to_string(), Column::Integer(vec![1, 2]))],
            vec![1, 1],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = DataBackend::from_columns(vec![
            ("x".to_string(), Column::Integer(vec![1, 2])),
            ("y".to_string(), Column::Integer(vec![1])),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missings_and_distinct() {
        let b = backend();
        let missing = b.missings(&["x".to_string()], &[10, 20, 30]).unwrap();
        assert_eq!(missing, vec![("x".to_string(), 1)]);
        assert_eq!(b.distinct("y", &[10, 20, 30]).unwrap(), vec!["a", "b"]);
    }
}
