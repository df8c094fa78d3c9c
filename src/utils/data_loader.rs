//! Data loading utilities
//!
//! All CSV I/O goes through `polars`; the rest of the crate works on
//! `ndarray` matrices and raw [`Value`] records extracted here.

use crate::config::{ColumnDtype, Schema};
use crate::error::{HousingError, Result};
use crate::validation::Value;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// CSV loader
pub struct DataLoader {
    /// Rows scanned to infer column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 10_000,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| {
            HousingError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let reader = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file);

        reader
            .finish()
            .map_err(|e| HousingError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Load a CSV file, rejecting columns the schema does not declare
    ///
    /// Cells keep their inferred storage type.
    pub fn load_uncast(&self, path: &Path, schema: &Schema) -> Result<DataFrame> {
        let df = self.load_csv(path)?;
        check_columns(&df, schema)?;
        Ok(df)
    }

    /// Load a CSV file and coerce every column to its schema dtype
    ///
    /// Fails when the file holds a column the schema does not declare, or a
    /// cell that does not parse as its column's dtype.
    pub fn load_with_schema(&self, path: &Path, schema: &Schema) -> Result<DataFrame> {
        let df = self.load_uncast(path, schema)?;
        coerce_to_schema(&df, schema)
    }
}

/// CSV writer
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row, creating parent directories
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| HousingError::DataError(e.to_string()))
    }
}

/// Column names of a frame, in order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Error listing every column that is absent from `schema.columns`
pub fn check_columns(df: &DataFrame, schema: &Schema) -> Result<()> {
    let unknown: Vec<String> = column_names(df)
        .into_iter()
        .filter(|name| !schema.column_dtypes.contains_key(name))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(HousingError::SchemaMismatch(
            unknown
                .iter()
                .map(|c| format!("column [{}] is not in the schema", c))
                .collect::<Vec<_>>()
                .join("; "),
        ))
    }
}

/// Cast each declared column to the polars type of its schema dtype
///
/// The cast is strict: a non-null cell that cannot be converted fails.
pub fn coerce_to_schema(df: &DataFrame, schema: &Schema) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| {
            let name = column.name().to_string();
            let series = column.as_materialized_series();
            let target = match schema.dtype(&name) {
                Some(ColumnDtype::Float) | Some(ColumnDtype::Int) => DataType::Float64,
                Some(ColumnDtype::Category) => DataType::String,
                Some(ColumnDtype::Bool) => DataType::Boolean,
                None => return Ok(column.clone()),
            };
            let casted = series.strict_cast(&target).map_err(|e| {
                HousingError::DataError(format!(
                    "column '{}' does not parse as {:?}: {}",
                    name, target, e
                ))
            })?;
            Ok(Column::from(casted))
        })
        .collect::<Result<Vec<Column>>>()?;

    Ok(DataFrame::new(columns)?)
}

fn find_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| HousingError::SchemaMismatch(format!("column [{}] not found", name)))
}

/// Numeric cells of a column; nulls and NaNs become `None`
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = find_series(df, name)?.cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Text cells of a column; nulls become `None`
pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = find_series(df, name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Raw cells of a column, typed by the column's storage type
///
/// Nulls in numeric columns read as `Float(NaN)`; nulls elsewhere as `Missing`.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Value>> {
    let series = find_series(df, name)?;
    let values = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Missing, Value::text))
            .collect(),
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Missing, Value::Bool))
            .collect(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Float(f64::NAN), Value::Int))
            .collect(),
        DataType::UInt64 | DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| Value::Float(v.unwrap_or(f64::NAN)))
            .collect(),
        DataType::Null => vec![Value::Missing; series.len()],
        other => {
            return Err(HousingError::DataError(format!(
                "column '{}' has unsupported type {}",
                name, other
            )))
        }
    };
    Ok(values)
}

/// Row-wise records over the given columns
pub fn records(df: &DataFrame, names: &[&str]) -> Result<Vec<Vec<Value>>> {
    let columns = names
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect())
}

/// Feature records of an uncast frame, in schema feature order
///
/// Numerical columns that were read as text are parsed cell by cell: blanks
/// become `Float(NaN)`, numbers become `Float`, anything else stays `Text`
/// so the validator can reject it.
pub fn schema_records(df: &DataFrame, schema: &Schema) -> Result<Vec<Vec<Value>>> {
    let names = schema.feature_columns();
    let columns = names
        .iter()
        .map(|name| {
            let series = find_series(df, name)?;
            if !schema.is_numerical(name) {
                return column_values(df, name);
            }
            match series.dtype() {
                DataType::String => Ok(series.str()?.into_iter().map(parse_numeric_cell).collect()),
                DataType::Null => Ok(vec![Value::Float(f64::NAN); series.len()]),
                _ => column_values(df, name),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect())
}

fn parse_numeric_cell(cell: Option<&str>) -> Value {
    match cell.map(str::trim) {
        None | Some("") => Value::Float(f64::NAN),
        Some(text) => text
            .parse::<f64>()
            .map_or_else(|_| Value::text(text), Value::Float),
    }
}

/// Extract named numeric columns into a row-major matrix
///
/// Missing cells are an error; transformed tables never contain them.
pub fn to_matrix(df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let col_data = names
        .iter()
        .map(|name| {
            numeric_column(df, name)?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.ok_or_else(|| {
                        HousingError::DataError(format!(
                            "missing value in column '{}' at row {}",
                            name, row
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((df.height(), names.len()), |(r, c)| {
        col_data[c][r]
    }))
}

/// Split a transformed table into features (all but last column) and target (last column)
pub fn split_features_target(df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
    let mut names = column_names(df);
    let target = names.pop().ok_or_else(|| {
        HousingError::DataError("transformed table has no columns".to_string())
    })?;
    if names.is_empty() {
        return Err(HousingError::DataError(
            "transformed table has no feature columns".to_string(),
        ));
    }

    let x = to_matrix(df, &names)?;
    let y = to_matrix(df, &[target])?.column(0).to_owned();
    Ok((x, y))
}

/// Build a frame from a matrix plus an optional trailing target column
pub fn matrix_to_frame(
    x: &Array2<f64>,
    names: &[String],
    target: Option<(&str, &Array1<f64>)>,
) -> Result<DataFrame> {
    if names.len() != x.ncols() {
        return Err(HousingError::ShapeError {
            expected: format!("{} column names", x.ncols()),
            actual: format!("{} column names", names.len()),
        });
    }

    let mut columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(c, name)| Column::new(name.as_str().into(), x.column(c).to_vec()))
        .collect();

    if let Some((name, y)) = target {
        if y.len() != x.nrows() {
            return Err(HousingError::ShapeError {
                expected: format!("target length = {}", x.nrows()),
                actual: format!("target length = {}", y.len()),
            });
        }
        columns.push(Column::new(name.into(), y.to_vec()));
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::housing_schema;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv("a,b,c\n1,2.5,x\n3,,y\n");
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(column_names(&df), vec!["a", "b", "c"]);
        assert_eq!(numeric_column(&df, "b").unwrap(), vec![Some(2.5), None]);
    }

    #[test]
    fn test_unknown_column_is_schema_mismatch() {
        let file = create_test_csv("longitude,color\n1.0,red\n");
        let err = DataLoader::new()
            .load_with_schema(file.path(), &housing_schema())
            .unwrap_err();

        match err {
            HousingError::SchemaMismatch(msg) => {
                assert!(msg.contains("[color]"));
                assert!(!msg.contains("[longitude]"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_values_typing() {
        let file = create_test_csv("n,f,t\n1,1.5,a\n2,,\n");
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        let rows = records(&df, &["n", "f", "t"]).unwrap();
        assert_eq!(rows[0], vec![Value::Int(1), Value::Float(1.5), Value::text("a")]);
        assert!(matches!(rows[1][1], Value::Float(v) if v.is_nan()));
        assert_eq!(rows[1][2], Value::Missing);
    }

    #[test]
    fn test_schema_records_keep_unparsable_text() {
        let body = "longitude,latitude,housing_median_age,total_rooms,total_bedrooms,\
population,households,median_income,ocean_proximity\n\
-122.2,37.9,41,880,129,322,126,8.3,NEAR BAY\n\
-122.2,37.9,41,lots,,322,126,8.3,INLAND\n";
        let file = create_test_csv(body);
        let schema = housing_schema();
        let df = DataLoader::new()
            .load_uncast(file.path(), &schema)
            .unwrap();

        let rows = schema_records(&df, &schema).unwrap();
        assert_eq!(rows[0][3], Value::Float(880.0));
        assert_eq!(rows[1][3], Value::text("lots"));
        assert!(matches!(rows[1][4], Value::Float(v) if v.is_nan()));
        assert_eq!(rows[1][8], Value::text("INLAND"));
    }

    #[test]
    fn test_coercion_rejects_unparsable_cell() {
        let file = create_test_csv("total_rooms,ocean_proximity\n880,INLAND\nlots,INLAND\n");
        let err = DataLoader::new()
            .load_with_schema(file.path(), &housing_schema())
            .unwrap_err();

        match err {
            HousingError::DataError(msg) => assert!(msg.contains("total_rooms")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_matrix_frame_roundtrip() {
        let x = ndarray::array![[1.0, 2.0], [3.0, 4.0]];
        let y = ndarray::array![10.0, 20.0];
        let names = vec!["a".to_string(), "b".to_string()];
        let mut df = matrix_to_frame(&x, &names, Some(("target", &y))).unwrap();

        let file = NamedTempFile::new().unwrap();
        DataSaver::save_csv(&mut df, file.path()).unwrap();
        let loaded = DataLoader::new().load_csv(file.path()).unwrap();

        let (x2, y2) = split_features_target(&loaded).unwrap();
        assert_eq!(x2, x);
        assert_eq!(y2, y);
    }
}
