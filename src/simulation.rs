//! Functionality for running the simulation.
//!
//! Each scenario is simulated independently: every generation in the horizon is tracked from its
//! installation year to the end of the horizon, then the resulting cohort histories are combined
//! into yearly totals.
use crate::id::{ScenarioID, get_by_id};
use crate::model::{Model, ScenarioDefinition};
use crate::output::DataWriter;
use crate::scenario::Scenario;
use anyhow::{Result, ensure};
use log::{debug, error, info};
use std::path::Path;

pub mod aggregate;
use aggregate::{YearTotals, aggregate};
pub mod cohort;
use cohort::{CohortHistory, track_cohort};
pub mod waterfall;

/// The results of simulating a single scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResults {
    /// The ID of the scenario
    pub scenario_id: ScenarioID,
    /// The history of every cohort, in order of installation year
    pub cohorts: Vec<CohortHistory>,
    /// Totals across all cohorts for every year of the horizon
    pub totals: Vec<YearTotals>,
}

/// Simulate a single scenario.
///
/// Running the same scenario twice gives identical results.
pub fn run_scenario(scenario: &Scenario) -> ScenarioResults {
    let cohorts: Vec<_> = (0..scenario.horizon_len())
        .map(|index| {
            let history = track_cohort(scenario, index);
            debug!(
                "Scenario {}: generation {} (installed {} m², Weibull shape {:.4}, scale {:.4})",
                scenario.id,
                history.generation,
                history.installed,
                history.survival.shape,
                history.survival.scale
            );
            history
        })
        .collect();
    let totals = aggregate(scenario, &cohorts);

    ScenarioResults {
        scenario_id: scenario.id.clone(),
        cohorts,
        totals,
    }
}

/// Select the scenarios to run, either all of them or only the one with the given ID
fn select_scenarios<'a>(
    model: &'a Model,
    scenario_id: Option<&str>,
) -> Result<Vec<&'a ScenarioDefinition>> {
    match scenario_id {
        Some(id) => Ok(vec![get_by_id(&model.scenarios, id)?]),
        None => Ok(model.iter_scenarios().collect()),
    }
}

/// Run the simulation.
///
/// Scenarios are run in the order they are defined. If a scenario cannot be built, the error is
/// logged and the remaining scenarios are still run. An error listing the failed scenarios is
/// returned at the end.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. cohort states) to file
/// * `scenario_id` - If given, only run the scenario with this ID
///
/// # Returns
///
/// The IDs of the scenarios which were run successfully.
pub fn run(
    model: &Model,
    output_path: &Path,
    debug_model: bool,
    scenario_id: Option<&str>,
) -> Result<Vec<String>> {
    let definitions = select_scenarios(model, scenario_id)?;
    let mut writer = DataWriter::create(output_path, debug_model)?;

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for definition in definitions {
        info!("Running scenario: {}", definition.id);
        let scenario = match model.build_scenario(definition) {
            Ok(scenario) => scenario,
            Err(err) => {
                error!("Scenario {} failed: {err:?}", definition.id);
                failed.push(definition.id.to_string());
                continue;
            }
        };

        let results = run_scenario(&scenario);
        writer.write_results(&results)?;
        info!(
            "Scenario {} complete ({} to {})",
            scenario.id,
            scenario.first_year(),
            scenario.last_year()
        );
        succeeded.push(definition.id.to_string());
    }

    writer.flush()?;
    ensure!(
        failed.is_empty(),
        "The following scenarios failed: {}",
        failed.join(", ")
    );

    Ok(succeeded)
}

/// Build every scenario in the model without running it.
///
/// All scenarios are checked, even if an earlier one fails.
pub fn validate(model: &Model) -> Result<()> {
    let mut failed = Vec::new();
    for definition in model.iter_scenarios() {
        match model.build_scenario(definition) {
            Ok(_) => info!("Scenario {} is valid", definition.id),
            Err(err) => {
                error!("Scenario {} is invalid: {err:?}", definition.id);
                failed.push(definition.id.to_string());
            }
        }
    }

    ensure!(
        failed.is_empty(),
        "The following scenarios are invalid: {}",
        failed.join(", ")
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::scenario;
    use crate::model::ModelParameters;
    use crate::scenario::InstallationMode;
    use crate::units::Irradiance;
    use rstest::rstest;
    use std::path::PathBuf;

    fn model_with_scenarios(ids: &[&str]) -> Model {
        let parameters = ModelParameters {
            irradiance_stc: Irradiance::new(1000.0),
            scenarios: ids
                .iter()
                .map(|id| ScenarioDefinition {
                    id: (*id).into(),
                    timeline: PathBuf::from(format!("{id}.csv")),
                    installation: InstallationMode::Area,
                    survival_override: None,
                })
                .collect(),
        };
        Model::from_parameters(PathBuf::from("nonexistent"), parameters)
    }

    #[rstest]
    fn test_run_scenario(scenario: Scenario) {
        let results = run_scenario(&scenario);
        assert_eq!(results.scenario_id, scenario.id);
        assert_eq!(results.cohorts.len(), scenario.horizon_len());
        assert_eq!(results.totals.len(), scenario.horizon_len());
        assert_eq!(results.totals[0].year, scenario.first_year());
        assert_eq!(
            results.totals.last().unwrap().year,
            scenario.last_year()
        );
    }

    #[rstest]
    fn test_run_scenario_idempotent(scenario: Scenario) {
        assert_eq!(run_scenario(&scenario), run_scenario(&scenario));
    }

    #[test]
    fn test_select_scenarios() {
        let model = model_with_scenarios(&["a", "b"]);
        assert_eq!(select_scenarios(&model, None).unwrap().len(), 2);

        let selected = select_scenarios(&model, Some("b")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id.to_string(), "b");

        assert!(select_scenarios(&model, Some("c")).is_err());
    }

    #[test]
    fn test_validate_missing_timelines() {
        let model = model_with_scenarios(&["a", "b"]);
        assert_eq!(
            validate(&model).unwrap_err().to_string(),
            "The following scenarios are invalid: a, b"
        );
    }
}
