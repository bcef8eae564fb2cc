//! @ai:module:intent Typed column storage for the data backend
//! @ai:module:layer domain
//! @ai:module:public_api Column, ColumnType
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};

/// @ai:intent Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Integer,
    Logical,
    Factor,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Integer => "integer",
            ColumnType::Logical => "logical",
            ColumnType::Factor => "factor",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent A single column of values, stored by backend position
///
/// Missing values are `NaN` for numeric columns and `None` for factor codes.
/// Integer and logical columns carry no missing values.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Integer(Vec<i64>),
    Logical(Vec<bool>),
    Factor {
        levels: Vec<String>,
        codes: Vec<Option<u32>>,
    },
}

impl Column {
    /// @ai:intent Build a factor column from string labels, levels in first-seen order
    /// @ai:effects pure
    pub fn factor_from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut levels: Vec<String> = Vec::new();
        let codes = labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                if label.is_empty() {
                    return None;
                }
                let code = match levels.iter().position(|l| l == label) {
                    Some(pos) => pos,
                    None => {
                        levels.push(label.to_string());
                        levels.len() - 1
                    }
                };
                Some(code as u32)
            })
            .collect();
        Column::Factor { levels, codes }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Numeric(_) => ColumnType::Numeric,
            Column::Integer(_) => ColumnType::Integer,
            Column::Logical(_) => ColumnType::Logical,
            Column::Factor { .. } => ColumnType::Factor,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Integer(v) => v.len(),
            Column::Logical(v) => v.len(),
            Column::Factor { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// @ai:intent Check whether the value at a backend position is missing
    /// @ai:effects pure
    pub fn is_missing(&self, pos: usize) -> bool {
        match self {
            Column::Numeric(v) => v[pos].is_nan(),
            Column::Integer(_) | Column::Logical(_) => false,
            Column::Factor { codes, .. } => codes[pos].is_none(),
        }
    }

    /// @ai:intent Read a value as f64 (logical as 0/1, factor as its code)
    /// @ai:effects pure
    pub fn as_f64(&self, pos: usize) -> f64 {
        match self {
            Column::Numeric(v) => v[pos],
            Column::Integer(v) => v[pos] as f64,
            Column::Logical(v) => {
                if v[pos] {
                    1.0
                } else {
                    0.0
                }
            }
            Column::Factor { codes, .. } => codes[pos].map(|c| c as f64).unwrap_or(f64::NAN),
        }
    }

    /// @ai:intent Render a value as a label for grouping and stratification
    /// @ai:effects pure
    pub fn label(&self, pos: usize) -> String {
        match self {
            Column::Numeric(v) => v[pos].to_string(),
            Column::Integer(v) => v[pos].to_string(),
            Column::Logical(v) => v[pos].to_string(),
            Column::Factor { levels, codes } => codes[pos]
                .map(|c| levels[c as usize].clone())
                .unwrap_or_default(),
        }
    }

    /// Levels of a factor column, `["FALSE", "TRUE"]` for logicals.
    pub fn levels(&self) -> Option<Vec<String>> {
        match self {
            Column::Factor { levels, .. } => Some(levels.clone()),
            Column::Logical(_) => Some(vec!["FALSE".to_string(), "TRUE".to_string()]),
            _ => None,
        }
    }

    /// @ai:intent Class code at a position for factor and logical columns
    /// @ai:effects pure
    pub fn code(&self, pos: usize) -> Option<u32> {
        match self {
            Column::Factor { codes, .. } => codes[pos],
            Column::Logical(v) => Some(u32::from(v[pos])),
            _ => None,
        }
    }
}
