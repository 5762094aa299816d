//! The module responsible for writing output data to disk.
use crate::id::ScenarioID;
use crate::simulation::ScenarioResults;
use crate::simulation::aggregate::YearTotals;
use crate::simulation::cohort::CohortHistory;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "pvflow_results";

/// The output file name for yearly totals
const YEARLY_TOTALS_FILE_NAME: &str = "yearly_totals.csv";

/// The output file name for the states of individual cohorts
const COHORT_STATES_FILE_NAME: &str = "debug_cohort_states.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data.
///
/// # Arguments
///
/// * `output_dir` - The output directory to create
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// `true` if the output dir contained existing data that was deleted, `false` if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the yearly totals CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct YearlyTotalsRow {
    scenario_id: ScenarioID,
    year: u32,
    installed: f64,
    active: f64,
    power: f64,
    failed: f64,
    repaired: f64,
    failed_unrepaired: f64,
    retired: f64,
    merchant_tail: f64,
    resold: f64,
    retired_net: f64,
    degradation_retired: f64,
    good_collected: f64,
    good_uncollected: f64,
    good_landfilled: f64,
    good_stored: f64,
    good_remanufactured_yield: f64,
    good_remanufactured_non_yield: f64,
    good_recycled: f64,
    bad_collected: f64,
    bad_uncollected: f64,
    bad_landfilled: f64,
    bad_stored: f64,
    bad_remanufactured_yield: f64,
    bad_remanufactured_non_yield: f64,
    bad_recycled: f64,
    landfilled_uncollected: f64,
}

impl YearlyTotalsRow {
    /// Create a new [`YearlyTotalsRow`]
    fn new(scenario_id: &ScenarioID, totals: &YearTotals) -> Self {
        let (good, bad) = (&totals.good, &totals.bad);
        Self {
            scenario_id: scenario_id.clone(),
            year: totals.year,
            installed: totals.installed.value(),
            active: totals.active.value(),
            power: totals.power.value(),
            failed: totals.failed.value(),
            repaired: totals.repaired.value(),
            failed_unrepaired: totals.failed_unrepaired.value(),
            retired: totals.retired.value(),
            merchant_tail: totals.merchant_tail.value(),
            resold: totals.resold.value(),
            retired_net: totals.retired_net.value(),
            degradation_retired: totals.degradation_retired.value(),
            good_collected: good.collected.value(),
            good_uncollected: good.uncollected.value(),
            good_landfilled: good.landfilled.value(),
            good_stored: good.stored.value(),
            good_remanufactured_yield: good.remanufactured_yield.value(),
            good_remanufactured_non_yield: good.remanufactured_non_yield.value(),
            good_recycled: good.recycled.value(),
            bad_collected: bad.collected.value(),
            bad_uncollected: bad.uncollected.value(),
            bad_landfilled: bad.landfilled.value(),
            bad_stored: bad.stored.value(),
            bad_remanufactured_yield: bad.remanufactured_yield.value(),
            bad_remanufactured_non_yield: bad.remanufactured_non_yield.value(),
            bad_recycled: bad.recycled.value(),
            landfilled_uncollected: totals.landfilled_uncollected().value(),
        }
    }
}

/// Cohort-related data in a row of the cohort states CSV file.
///
/// This will be written along with the [`CohortState`](crate::simulation::cohort::CohortState)
/// itself.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CohortRow {
    scenario_id: ScenarioID,
    generation: u32,
    weibull_shape: f64,
    weibull_scale: f64,
}

impl CohortRow {
    /// Create a new [`CohortRow`]
    fn new(scenario_id: &ScenarioID, history: &CohortHistory) -> Self {
        Self {
            scenario_id: scenario_id.clone(),
            generation: history.generation,
            weibull_shape: history.survival.shape,
            weibull_scale: history.survival.scale,
        }
    }
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    cohort_states_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let file_path = output_path.join(COHORT_STATES_FILE_NAME);
        Ok(Self {
            cohort_states_writer: csv::Writer::from_path(file_path)?,
        })
    }

    /// Write the state of every cohort at every age
    fn write_cohort_states(
        &mut self,
        scenario_id: &ScenarioID,
        cohorts: &[CohortHistory],
    ) -> Result<()> {
        for history in cohorts {
            for state in &history.states {
                let cohort_row = CohortRow::new(scenario_id, history);
                self.cohort_states_writer.serialize((cohort_row, state))?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.cohort_states_writer.flush()?;

        Ok(())
    }
}

/// An object for writing simulation results to file
pub struct DataWriter {
    yearly_totals_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        let file_path = output_path.join(YEARLY_TOTALS_FILE_NAME);
        Ok(Self {
            yearly_totals_writer: csv::Writer::from_path(file_path)?,
            debug_writer,
        })
    }

    /// Write the results of a single scenario
    pub fn write_results(&mut self, results: &ScenarioResults) -> Result<()> {
        for totals in &results.totals {
            let row = YearlyTotalsRow::new(&results.scenario_id, totals);
            self.yearly_totals_writer.serialize(row)?;
        }

        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_cohort_states(&results.scenario_id, &results.cohorts)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.yearly_totals_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}
