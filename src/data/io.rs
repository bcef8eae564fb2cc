//! @ai:module:intent CSV loading with per-column type inference
//! @ai:module:layer infrastructure
//! @ai:module:public_api load_csv, read_csv
//! @ai:module:stateless true

use crate::data::backend::DataBackend;
use crate::data::column::Column;
use crate::error::{Error, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// @ai:intent Load a CSV file with a header row into a backend
/// @ai:pre path points to a readable CSV file
/// @ai:effects fs:read
pub fn load_csv(path: &Path, primary_key: Option<&str>) -> Result<DataBackend> {
    let file = std::fs::File::open(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file, primary_key)
}

/// @ai:intent Parse CSV from any reader into a backend
/// @ai:effects io
pub fn read_csv<R: Read>(reader: R, primary_key: Option<&str>) -> Result<DataBackend> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (idx, field) in record.iter().enumerate() {
            if let Some(col) = raw.get_mut(idx) {
                col.push(field.to_string());
            }
        }
    }

    let mut row_ids = None;
    let mut columns = Vec::with_capacity(headers.len());

    for (name, values) in headers.into_iter().zip(raw) {
        if primary_key == Some(name.as_str()) {
            row_ids = Some(parse_row_ids(&name, &values)?);
            continue;
        }
        columns.push((name, infer_column(&values)));
    }

    match (primary_key, row_ids) {
        (Some(key), None) => Err(Error::UnknownColumn(key.to_string())),
        (_, Some(ids)) => DataBackend::new(columns, ids),
        (None, None) => DataBackend::from_columns(columns),
    }
}

fn parse_row_ids(name: &str, values: &[String]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            v.parse::<usize>().map_err(|_| {
                Error::InvalidData(format!("primary key '{}' has non-integer value '{}'", name, v))
            })
        })
        .collect()
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "NA"
}

fn parse_logical(value: &str) -> Option<bool> {
    match value {
        "true" | "TRUE" | "True" => Some(true),
        "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// @ai:intent Pick the narrowest column type that holds every value
/// @ai:effects pure
fn infer_column(values: &[String]) -> Column {
    let any_missing = values.iter().any(|v| is_missing(v));
    let present = || values.iter().filter(|v| !is_missing(v));

    if !any_missing && !values.is_empty() {
        if present().all(|v| parse_logical(v).is_some()) {
            return Column::Logical(values.iter().filter_map(|v| parse_logical(v)).collect());
        }
        if present().all(|v| v.parse::<i64>().is_ok()) {
            return Column::Integer(values.iter().filter_map(|v| v.parse().ok()).collect());
        }
    }

    if present().all(|v| v.parse::<f64>().is_ok()) {
        return Column::Numeric(
            values
                .iter()
                .map(|v| {
                    if is_missing(v) {
                        f64::NAN
                    } else {
                        v.parse().unwrap_or(f64::NAN)
                    }
                })
                .collect(),
        );
    }

    let labels: Vec<&str> = values
        .iter()
        .map(|v| if is_missing(v) { "" } else { v.as_str() })
        .collect();
    Column::factor_from_labels(&labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::ColumnType;
    use std::io::Write;
    use tempfile::TempDir;

    const CSV: &str = "id,age,height,smoker,species\n\
                       5,31,1.80,true,setosa\n\
                       7,45,,false,virginica\n\
                       9,22,1.65,true,setosa\n";

    #[test]
    fn test_infers_column_types() {
        let backend = read_csv(CSV.as_bytes(), None).unwrap();
        assert_eq!(backend.nrow(), 3);
        assert_eq!(backend.column("id").unwrap().column_type(), ColumnType::Integer);
        assert_eq!(backend.column("age").unwrap().column_type(), ColumnType::Integer);
        assert_eq!(backend.column("height").unwrap().column_type(), ColumnType::Numeric);
        assert_eq!(backend.column("smoker").unwrap().column_type(), ColumnType::Logical);
        assert_eq!(backend.column("species").unwrap().column_type(), ColumnType::Factor);
        assert!(backend.column("height").unwrap().is_missing(1));
    }

    #[test]
    fn test_primary_key_supplies_row_ids() {
        let backend = read_csv(CSV.as_bytes(), Some("id")).unwrap();
        assert_eq!(backend.row_ids(), &[5, 7, 9]);
        assert!(!backend.has_column("id"));
    }

    #[test]
    fn test_missing_primary_key_is_error() {
        let result = read_csv(CSV.as_bytes(), Some("nope"));
        assert!(matches!(result, Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn test_load_csv_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let backend = load_csv(&path, None).unwrap();
        assert_eq!(backend.ncol(), 5);
        assert_eq!(backend.row_ids(), &[1, 2, 3]);
    }
}
