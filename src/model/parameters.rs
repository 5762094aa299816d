//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::id::ScenarioID;
use crate::input::{input_err_msg, read_toml};
use crate::scenario::{InstallationMode, SurvivalOverride};
use crate::units::Irradiance;
use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

define_unit_param_default!(default_irradiance_stc, Irradiance, 1000.0);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Reference irradiance at standard test conditions (W/m²).
    ///
    /// Used to convert between module area and power.
    #[serde(default = "default_irradiance_stc")]
    pub irradiance_stc: Irradiance,
    /// The scenarios to simulate, in order
    pub scenarios: Vec<ScenarioDefinition>,
}

/// The definition of a single scenario in `model.toml`
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScenarioDefinition {
    /// A unique identifier for the scenario
    pub id: ScenarioID,
    /// Path to the scenario's timeline CSV file, relative to the model directory
    pub timeline: PathBuf,
    /// How the quantity installed each year is given in the timeline
    #[serde(default)]
    pub installation: InstallationMode,
    /// A survival curve to use for every generation, in place of per-year reliability inputs
    pub survival_override: Option<SurvivalOverride>,
}

/// Check that the `irradiance_stc` parameter is valid
fn check_irradiance_stc(value: Irradiance) -> Result<()> {
    ensure!(
        value.is_finite() && value > Irradiance::new(0.0),
        "irradiance_stc must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the scenario definitions are valid
fn check_scenarios(scenarios: &[ScenarioDefinition]) -> Result<()> {
    ensure!(!scenarios.is_empty(), "At least one scenario must be defined");

    if let Some(id) = scenarios.iter().map(|scenario| &scenario.id).duplicates().next() {
        bail!("Duplicate scenario ID: {id}");
    }

    for scenario in scenarios {
        ensure!(
            !scenario.id.0.trim().is_empty(),
            "Scenario IDs cannot be blank"
        );

        if let Some(survival_override) = scenario.survival_override {
            ensure!(
                survival_override.shape.is_finite() && survival_override.shape > 0.0,
                "Scenario {}: survival_override shape must be a finite number greater than zero",
                scenario.id
            );
            ensure!(
                survival_override
                    .scale
                    .is_none_or(|scale| scale.is_finite() && scale > 0.0),
                "Scenario {}: survival_override scale must be a finite number greater than zero",
                scenario.id
            );
        }
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_irradiance_stc(self.irradiance_stc)?;
        check_scenarios(&self.scenarios)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn definition(id: &str) -> ScenarioDefinition {
        ScenarioDefinition {
            id: id.into(),
            timeline: PathBuf::from(format!("{id}.csv")),
            installation: InstallationMode::Area,
            survival_override: None,
        }
    }

    #[rstest]
    #[case(1000.0, true)]
    #[case(1e-3, true)]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_irradiance_stc(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(
            check_irradiance_stc(Irradiance::new(value)).is_ok(),
            expected_valid
        );
    }

    #[test]
    fn test_check_scenarios() {
        assert!(check_scenarios(&[definition("a"), definition("b")]).is_ok());
        assert_error!(
            check_scenarios(&[]),
            "At least one scenario must be defined"
        );
        assert_error!(
            check_scenarios(&[definition("a"), definition("b"), definition("a")]),
            "Duplicate scenario ID: a"
        );
        assert_error!(
            check_scenarios(&[definition(" ")]),
            "Scenario IDs cannot be blank"
        );
    }

    #[rstest]
    #[case(5.0, None, true)]
    #[case(5.0, Some(30.0), true)]
    #[case(0.0, None, false)]
    #[case(5.0, Some(0.0), false)]
    #[case(f64::NAN, Some(30.0), false)]
    fn test_check_scenarios_survival_override(
        #[case] shape: f64,
        #[case] scale: Option<f64>,
        #[case] expected_valid: bool,
    ) {
        let scenario = ScenarioDefinition {
            survival_override: Some(SurvivalOverride { shape, scale }),
            ..definition("a")
        };
        assert_eq!(check_scenarios(&[scenario]).is_ok(), expected_valid);
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "[[scenarios]]
id = \"baseline\"
timeline = \"baseline.csv\"

[[scenarios]]
id = \"literature\"
timeline = \"baseline.csv\"
installation = \"capacity\"
survival_override = {{ shape = 5.3759 }}"
            )
            .unwrap();
        }

        let model_params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(model_params.irradiance_stc, Irradiance::new(1000.0));
        assert_eq!(model_params.scenarios.len(), 2);
        assert_eq!(model_params.scenarios[0], definition("baseline"));
        assert_eq!(
            model_params.scenarios[1].installation,
            InstallationMode::Capacity
        );
        assert_eq!(
            model_params.scenarios[1].survival_override,
            Some(SurvivalOverride {
                shape: 5.3759,
                scale: None
            })
        );
    }

    #[test]
    fn test_model_params_from_path_invalid() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "irradiance_stc = -5.0\nscenarios = []").unwrap();
        }

        assert!(ModelParameters::from_path(dir.path()).is_err());
    }
}
