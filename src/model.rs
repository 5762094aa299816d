//! The model represents the static input data provided by the user.
use crate::id::ScenarioID;
use crate::input::input_err_msg;
use crate::input::timeline::read_timeline;
use crate::scenario::Scenario;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::{ModelParameters, ScenarioDefinition};

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Scenario definitions, keyed by ID, in the order given in the model file
    pub scenarios: IndexMap<ScenarioID, ScenarioDefinition>,
}

impl Model {
    /// Create a model from its parameters.
    ///
    /// Scenarios are not constructed until they are needed (see [`Model::build_scenario`]), so
    /// that a problem with one scenario's inputs does not prevent the others from running.
    pub fn from_parameters(model_path: PathBuf, parameters: ModelParameters) -> Self {
        let scenarios = parameters
            .scenarios
            .iter()
            .map(|definition| (definition.id.clone(), definition.clone()))
            .collect();

        Self {
            model_path,
            parameters,
            scenarios,
        }
    }

    /// Iterate over the model's scenario definitions in order
    pub fn iter_scenarios(&self) -> impl Iterator<Item = &ScenarioDefinition> {
        self.scenarios.values()
    }

    /// Read a scenario's timeline and construct the scenario.
    ///
    /// All configuration invariants are checked and all survival curves solved here.
    pub fn build_scenario(&self, definition: &ScenarioDefinition) -> Result<Scenario> {
        let file_path = self.model_path.join(&definition.timeline);
        let rows = read_timeline(&file_path)?;
        Scenario::new(
            definition.id.clone(),
            &rows,
            definition.installation,
            definition.survival_override,
            self.parameters.irradiance_stc,
        )
        .with_context(|| input_err_msg(&file_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::timeline_row;
    use crate::input::timeline::TimelineRow;
    use crate::scenario::InstallationMode;
    use crate::units::Irradiance;
    use rstest::rstest;
    use std::path::Path;
    use tempfile::tempdir;

    /// Write the given rows to a timeline CSV file
    fn write_timeline(file_path: &Path, rows: &[TimelineRow]) {
        let mut writer = csv::Writer::from_path(file_path).unwrap();
        writer
            .write_record([
                "year",
                "installed_area",
                "efficiency",
                "degradation_rate",
                "reliability_t50",
                "reliability_t90",
                "project_lifetime",
                "repair_rate",
                "merchant_tail_rate",
                "collection_rate",
                "resell_share",
                "good_landfill_share",
                "good_stored_share",
                "good_remanufactured_share",
                "good_recycled_share",
                "bad_landfill_share",
                "bad_stored_share",
                "bad_remanufactured_share",
                "bad_recycled_share",
                "remanufacture_yield",
            ])
            .unwrap();
        let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        for row in rows {
            writer
                .write_record([
                    row.year.to_string(),
                    optional(row.installed_area),
                    row.efficiency.to_string(),
                    row.degradation_rate.to_string(),
                    optional(row.reliability_t50),
                    optional(row.reliability_t90),
                    row.project_lifetime.to_string(),
                    row.repair_rate.to_string(),
                    row.merchant_tail_rate.to_string(),
                    row.collection_rate.to_string(),
                    row.resell_share.to_string(),
                    optional(row.good_landfill_share),
                    row.good_stored_share.to_string(),
                    row.good_remanufactured_share.to_string(),
                    row.good_recycled_share.to_string(),
                    optional(row.bad_landfill_share),
                    row.bad_stored_share.to_string(),
                    row.bad_remanufactured_share.to_string(),
                    row.bad_recycled_share.to_string(),
                    row.remanufacture_yield.to_string(),
                ])
                .unwrap();
        }
        writer.flush().unwrap();
    }

    fn definition(id: &str) -> ScenarioDefinition {
        ScenarioDefinition {
            id: id.into(),
            timeline: PathBuf::from(format!("{id}.csv")),
            installation: InstallationMode::Area,
            survival_override: None,
        }
    }

    fn model(model_path: &Path, ids: &[&str]) -> Model {
        let parameters = ModelParameters {
            irradiance_stc: Irradiance::new(1000.0),
            scenarios: ids.iter().map(|id| definition(id)).collect(),
        };
        Model::from_parameters(model_path.to_path_buf(), parameters)
    }

    #[rstest]
    fn test_build_scenario(timeline_row: TimelineRow) {
        let dir = tempdir().unwrap();
        let rows = [
            timeline_row.clone(),
            TimelineRow {
                year: 2021,
                ..timeline_row
            },
        ];
        write_timeline(&dir.path().join("baseline.csv"), &rows);

        let model = model(dir.path(), &["baseline"]);
        let scenario = model
            .build_scenario(&model.scenarios["baseline"])
            .unwrap();
        assert_eq!(scenario.id, ScenarioID::new("baseline"));
        assert_eq!(scenario.first_year(), 2020);
        assert_eq!(scenario.last_year(), 2021);
    }

    #[test]
    fn test_build_scenario_missing_file() {
        let dir = tempdir().unwrap();
        let model = model(dir.path(), &["baseline"]);
        assert!(model.build_scenario(&model.scenarios["baseline"]).is_err());
    }

    #[test]
    fn test_scenario_order() {
        let dir = tempdir().unwrap();
        let model = model(dir.path(), &["b", "a", "c"]);
        let ids: Vec<_> = model
            .iter_scenarios()
            .map(|definition| definition.id.to_string())
            .collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }
}
