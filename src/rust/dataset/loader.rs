use std::fs::File;
use std::path::Path;
use std::time::Instant;
use log::{info, warn};
use polars::prelude::*;

use super::{ChurnDataset, CustomerRecord, DatasetColumns};
use crate::features::{AgeGroup, Gender, Geography};
use crate::predictor::ChurnError;

pub const REQUIRED_COLUMNS: [&str; 3] = ["Geography", "Gender", "Exited"];

/// Loads the churn CSV into memory.
///
/// # Arguments
/// * `path` - Path to a CSV file with a header row
///
/// # Returns
/// * `ChurnDataset` with one record per row, or a `DataLoadError` if the file is
///   missing, a required column is absent, or a value cannot be interpreted
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<ChurnDataset, ChurnError> {
    let path = path.as_ref();
    let start = Instant::now();
    let file = File::open(path).map_err(|e| {
        ChurnError::DataLoadError(format!("Failed to open dataset {}: {}", path.display(), e))
    })?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .into_reader_with_file_handle(file)
        .finish()?;

    let dataset = from_dataframe(&df)?;
    info!(
        "Loaded {} customers from {:?} in {:.2?}",
        dataset.len(),
        path,
        start.elapsed()
    );
    Ok(dataset)
}

/// Builds typed records from an in-memory frame.
pub(crate) fn from_dataframe(df: &DataFrame) -> Result<ChurnDataset, ChurnError> {
    for name in REQUIRED_COLUMNS {
        if df.column(name).is_err() {
            return Err(ChurnError::DataLoadError(format!(
                "Dataset is missing required column '{}'",
                name
            )));
        }
    }

    let genders = text_column(df, "Gender")?
        .into_iter()
        .map(|v| v.parse::<Gender>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(as_load_error)?;
    let geographies = text_column(df, "Geography")?
        .into_iter()
        .map(|v| v.parse::<Geography>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(as_load_error)?;
    let exited = flag_column(df, "Exited")?.unwrap_or_default();

    let age_groups = age_group_column(df)?;
    let num_products = int_column(df, "NumOfProducts")?
        .map(|values| {
            values
                .into_iter()
                .map(|v| {
                    u32::try_from(v).map_err(|_| {
                        ChurnError::DataLoadError(format!("NumOfProducts {} is negative", v))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    let engaged = flag_column(df, "EngagedCustomer")?;

    let columns = DatasetColumns {
        age_group: age_groups.is_some(),
        num_products: num_products.is_some(),
        engaged: engaged.is_some(),
    };
    if !columns.age_group {
        warn!("Dataset has no Age or AgeGroup columns; the age group chart is disabled");
    }

    let records = (0..df.height())
        .map(|i| CustomerRecord {
            gender: genders[i],
            geography: geographies[i],
            exited: exited[i],
            age_group: age_groups.as_ref().map(|groups| groups[i]),
            num_products: num_products.as_ref().map(|products| products[i]),
            engaged: engaged.as_ref().map(|flags| flags[i]),
        })
        .collect();

    Ok(ChurnDataset::new(records, columns))
}

fn as_load_error(err: ChurnError) -> ChurnError {
    match err {
        ChurnError::ValidationError(msg) => ChurnError::DataLoadError(msg),
        other => other,
    }
}

fn null_value(name: &str, row: usize) -> ChurnError {
    ChurnError::DataLoadError(format!("Column '{}' has an empty value in row {}", name, row + 1))
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>, ChurnError> {
    let column = df.column(name)?;
    let values = column.as_materialized_series().str()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.map(str::to_string).ok_or_else(|| null_value(name, row)))
        .collect()
}

fn parse_flag_text(name: &str, row: usize, value: &str) -> Result<bool, ChurnError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" => Ok(true),
        "false" | "0" | "0.0" | "no" => Ok(false),
        _ => Err(ChurnError::DataLoadError(format!(
            "Column '{}' row {} has non-boolean value '{}'",
            name,
            row + 1,
            value
        ))),
    }
}

/// Reads a boolean-like column stored as booleans, numbers or text.
/// Returns `None` when the column is absent.
fn flag_column(df: &DataFrame, name: &str) -> Result<Option<Vec<bool>>, ChurnError> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series();

    let flags = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| null_value(name, row)))
            .collect::<Result<Vec<_>, _>>()?,
        DataType::String => series
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| null_value(name, row))
                    .and_then(|text| parse_flag_text(name, row, text))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            let numeric = series.cast(&DataType::Float64)?;
            numeric
                .f64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| v.map(|x| x != 0.0).ok_or_else(|| null_value(name, row)))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(Some(flags))
}

/// Reads an integer column. Returns `None` when the column is absent.
fn int_column(df: &DataFrame, name: &str) -> Result<Option<Vec<i64>>, ChurnError> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let numeric = column.as_materialized_series().cast(&DataType::Int64)?;
    let values = numeric
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| null_value(name, row)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(values))
}

/// Age groups come from `Age` when present, otherwise from the two indicator columns.
fn age_group_column(df: &DataFrame) -> Result<Option<Vec<AgeGroup>>, ChurnError> {
    if let Some(ages) = int_column(df, "Age")? {
        let groups = ages
            .into_iter()
            .map(|age| AgeGroup::from_age(age.max(0) as u32))
            .collect();
        return Ok(Some(groups));
    }

    let adult = flag_column(df, "AgeGroup_Adult")?;
    let senior = flag_column(df, "AgeGroup_Senior")?;
    if adult.is_none() && senior.is_none() {
        return Ok(None);
    }

    let groups = (0..df.height())
        .map(|i| {
            let is_adult = adult.as_ref().map(|flags| flags[i]).unwrap_or(false);
            let is_senior = senior.as_ref().map(|flags| flags[i]).unwrap_or(false);
            AgeGroup::from_indicators(is_adult, is_senior)
        })
        .collect();
    Ok(Some(groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_load_fixture() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/churn_dashboard_data.csv");
        let dataset = load_csv(path).unwrap();
        assert_eq!(dataset.len(), 20);
        assert_eq!(
            dataset.columns(),
            DatasetColumns {
                age_group: true,
                num_products: true,
                engaged: true
            }
        );
        let first = dataset.records()[0];
        assert_eq!(first.gender, Gender::Female);
        assert_eq!(first.geography, Geography::France);
        assert!(first.exited);
        assert_eq!(first.age_group, Some(AgeGroup::Adult));
        assert_eq!(first.num_products, Some(1));
        assert_eq!(first.engaged, Some(false));
    }

    #[test]
    fn test_indicator_columns_without_age() {
        let file = write_csv(&[
            "Geography,Gender,Exited,AgeGroup_Adult,AgeGroup_Senior",
            "France,Male,0,1,0",
            "Spain,Female,1,0,1",
            "Germany,Male,1,0,0",
        ]);
        let dataset = load_csv(file.path()).unwrap();
        let groups: Vec<_> = dataset.records().iter().map(|r| r.age_group).collect();
        assert_eq!(
            groups,
            vec![Some(AgeGroup::Adult), Some(AgeGroup::Senior), Some(AgeGroup::Young)]
        );
        assert!(!dataset.columns().num_products);
        assert!(!dataset.columns().engaged);
    }

    #[test]
    fn test_only_senior_indicator_present() {
        let file = write_csv(&[
            "Geography,Gender,Exited,AgeGroup_Senior",
            "France,Male,0,True",
            "France,Male,0,False",
        ]);
        let dataset = load_csv(file.path()).unwrap();
        assert_eq!(dataset.records()[0].age_group, Some(AgeGroup::Senior));
        assert_eq!(dataset.records()[1].age_group, Some(AgeGroup::Young));
    }

    #[test]
    fn test_minimal_columns() {
        let file = write_csv(&["Geography,Gender,Exited", "France,Male,0", "Spain,Female,1"]);
        let dataset = load_csv(file.path()).unwrap();
        assert_eq!(dataset.columns(), DatasetColumns::default());
        assert_eq!(dataset.geographies(), vec![Geography::France, Geography::Spain]);
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv(&["Geography,Gender", "France,Male"]);
        match load_csv(file.path()) {
            Err(ChurnError::DataLoadError(msg)) => assert!(msg.contains("Exited")),
            other => panic!("expected data load error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_geography_is_a_load_error() {
        let file = write_csv(&["Geography,Gender,Exited", "Italy,Male,0"]);
        assert!(matches!(load_csv(file.path()), Err(ChurnError::DataLoadError(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_csv("/nonexistent/churn_dashboard_data.csv"),
            Err(ChurnError::DataLoadError(_))
        ));
    }
}
