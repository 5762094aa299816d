//! Code for reading scenario timeline CSV files.
//!
//! A timeline has one row per calendar year of the simulation horizon, holding the quantity
//! installed that year along with the technology and policy inputs in force for that year.
use super::{deserialise_optional_percentage, deserialise_percentage, read_csv};
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// A single row of a timeline CSV file, before validation.
///
/// Percentages are given in the range 0-100.
#[derive(PartialEq, Debug, Clone, Default, Deserialize)]
pub struct TimelineRow {
    /// The calendar year
    pub year: u32,
    /// Module area installed this year (m²)
    pub installed_area: Option<f64>,
    /// Capacity installed this year (MW)
    pub installed_capacity: Option<f64>,
    /// Module mass installed this year (kg)
    pub installed_mass: Option<f64>,
    /// Areal density of modules installed this year (kg/m²)
    pub module_mass_per_area: Option<f64>,
    /// Module efficiency (%)
    #[serde(deserialize_with = "deserialise_percentage")]
    pub efficiency: f64,
    /// Yearly power degradation rate (%)
    #[serde(deserialize_with = "deserialise_percentage")]
    pub degradation_rate: f64,
    /// Fraction of nameplate power below which modules are retired early (%)
    #[serde(default, deserialize_with = "deserialise_optional_percentage")]
    pub degradation_limit: Option<f64>,
    /// Weibull shape parameter, if supplied directly
    pub weibull_shape: Option<f64>,
    /// Weibull scale parameter, if supplied directly
    pub weibull_scale: Option<f64>,
    /// Age at which 50% of modules have failed
    pub reliability_t50: Option<f64>,
    /// Age at which 90% of modules have failed
    pub reliability_t90: Option<f64>,
    /// Project lifetime in years
    pub project_lifetime: u32,
    /// Percentage of failed modules which are repaired
    #[serde(deserialize_with = "deserialise_percentage")]
    pub repair_rate: f64,
    /// Percentage of modules kept in service past their project lifetime
    #[serde(deserialize_with = "deserialise_percentage")]
    pub merchant_tail_rate: f64,
    /// Percentage of end-of-life material which is collected
    #[serde(deserialize_with = "deserialise_percentage")]
    pub collection_rate: f64,
    /// Percentage of collected good-status material which is resold
    #[serde(deserialize_with = "deserialise_percentage")]
    pub resell_share: f64,
    /// Percentage of collected good-status material which is landfilled
    #[serde(default, deserialize_with = "deserialise_optional_percentage")]
    pub good_landfill_share: Option<f64>,
    /// Percentage of collected good-status material which is stored
    #[serde(deserialize_with = "deserialise_percentage")]
    pub good_stored_share: f64,
    /// Percentage of collected good-status material which is re-manufactured
    #[serde(deserialize_with = "deserialise_percentage")]
    pub good_remanufactured_share: f64,
    /// Percentage of collected good-status material which is recycled
    #[serde(deserialize_with = "deserialise_percentage")]
    pub good_recycled_share: f64,
    /// Percentage of collected bad-status material which is landfilled
    #[serde(default, deserialize_with = "deserialise_optional_percentage")]
    pub bad_landfill_share: Option<f64>,
    /// Percentage of collected bad-status material which is stored
    #[serde(deserialize_with = "deserialise_percentage")]
    pub bad_stored_share: f64,
    /// Percentage of collected bad-status material which is re-manufactured
    #[serde(deserialize_with = "deserialise_percentage")]
    pub bad_remanufactured_share: f64,
    /// Percentage of collected bad-status material which is recycled
    #[serde(deserialize_with = "deserialise_percentage")]
    pub bad_recycled_share: f64,
    /// Percentage of re-manufactured material which is recovered as usable product
    #[serde(deserialize_with = "deserialise_percentage")]
    pub remanufacture_yield: f64,
}

/// Read a timeline CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the timeline CSV file
///
/// # Returns
///
/// The rows of the file, in the order given.
pub fn read_timeline(file_path: &Path) -> Result<Vec<TimelineRow>> {
    Ok(read_csv(file_path)?.collect())
}
