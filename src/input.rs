//! Common routines for handling input data.
use crate::model::{Model, ModelParameters};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod timeline;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec: Vec<T> = csv::Reader::from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;
    ensure!(!vec.is_empty(), "CSV file {} cannot be empty", file_path.display());

    Ok(vec.into_iter())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check whether a percentage value lies in the range [0, 100]
pub fn is_percentage(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Read an f64, checking that it is a percentage between 0 and 100
pub fn deserialise_percentage<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !is_percentage(value) {
        Err(serde::de::Error::custom("Value is not between 0 and 100"))?;
    }

    Ok(value)
}

/// Read an optional f64, checking that, if present, it is a percentage between 0 and 100
pub fn deserialise_optional_percentage<'de, D>(deserialiser: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Deserialize::deserialize(deserialiser)?;
    if value.is_some_and(|value| !is_percentage(value)) {
        Err(serde::de::Error::custom("Value is not between 0 and 100"))?;
    }

    Ok(value)
}

/// Indicates whether the years are consecutive (each one greater than the last by exactly one)
pub fn is_consecutive(years: &[u32]) -> bool {
    years.iter().tuple_windows().all(|(a, b)| a.checked_add(1) == Some(*b))
}

/// Load a model from the specified directory.
///
/// Only `model.toml` is read here. Each scenario's timeline is read and checked when the scenario
/// is built (see [`Model::build_scenario`]).
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The [`Model`] or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    Ok(Model::from_parameters(model_dir.to_path_buf(), parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Deserialize;
    use serde::de::IntoDeserializer;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Test a normal read
    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value\nhello,1\nworld,2\n").unwrap();
        }
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );
    }

    #[test]
    fn test_read_csv_empty() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value").unwrap();
        }
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }

        assert!(read_toml::<Record>(&file_path).is_err());
    }

    /// Deserialise value with `deserialise_percentage()`
    fn deserialise_f64(value: f64) -> Result<f64, serde::de::value::Error> {
        let deserialiser: serde::de::value::F64Deserializer<serde::de::value::Error> =
            value.into_deserializer();
        deserialise_percentage(deserialiser)
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(42.5, true)]
    #[case(100.0, true)]
    #[case(-0.1, false)]
    #[case(100.1, false)]
    #[case(f64::NAN, false)]
    fn test_deserialise_percentage(#[case] value: f64, #[case] valid: bool) {
        assert_eq!(deserialise_f64(value).is_ok(), valid);
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&[2000], true)]
    #[case(&[2000, 2001, 2002], true)]
    #[case(&[2000, 2002], false)]
    #[case(&[2001, 2000], false)]
    #[case(&[2000, 2000], false)]
    fn test_is_consecutive(#[case] years: &[u32], #[case] expected: bool) {
        assert_eq!(is_consecutive(years), expected);
    }
}
