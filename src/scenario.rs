//! Scenarios: validated, typed per-year inputs for a single simulation run.
//!
//! A [`Scenario`] is built once from the raw rows of a timeline file. All configuration invariants
//! (percentage ranges, end-of-life path shares summing to 100%, resolvable survival curves) are
//! checked at construction, so the engine itself never encounters invalid configuration.
use crate::id::ScenarioID;
use crate::input::{is_consecutive, is_percentage};
use crate::input::timeline::TimelineRow;
use crate::reliability::WeibullParams;
use crate::units::{Area, Dimensionless, Irradiance, Mass, MassPerArea, Power};
use anyhow::{Context, Result, bail, ensure};
use float_cmp::approx_eq;
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::fmt;

/// Tolerance used when checking that path shares sum to 100%
const PERCENT_SUM_TOLERANCE: f64 = 1e-9;

/// How the quantity installed each year is specified in the timeline
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum InstallationMode {
    /// Module area is given directly (`installed_area`)
    #[default]
    #[string = "area"]
    Area,
    /// Installed capacity is given in MW (`installed_capacity`) and converted to area using
    /// efficiency and the reference irradiance
    #[string = "capacity"]
    Capacity,
    /// Installed mass is given (`installed_mass`) and converted to area using the areal density of
    /// modules (`module_mass_per_area`)
    #[string = "mass"]
    Mass,
}

/// A single survival curve applied to every generation, overriding per-year reliability inputs.
///
/// Used to reproduce literature scenarios with a fixed Weibull shape.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
pub struct SurvivalOverride {
    /// The Weibull shape parameter
    pub shape: f64,
    /// The Weibull scale parameter. If omitted, each generation's project lifetime is used as the
    /// reference scale.
    pub scale: Option<f64>,
}

/// The end-of-life path groups, used for error reporting
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PathGroup {
    /// Material retired at the end of its project lifetime
    GoodStatus,
    /// Material removed from service due to unrepaired failure
    BadStatus,
}

impl fmt::Display for PathGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodStatus => write!(f, "good-status"),
            Self::BadStatus => write!(f, "bad-status"),
        }
    }
}

/// Shares of collected good-status material going to each path.
///
/// These sum to exactly one.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct GoodPathShares {
    /// Resold and returned to active service
    pub resell: Dimensionless,
    /// Landfilled after collection
    pub landfill: Dimensionless,
    /// Stored
    pub stored: Dimensionless,
    /// Re-manufactured
    pub remanufactured: Dimensionless,
    /// Recycled
    pub recycled: Dimensionless,
}

/// Shares of collected bad-status material going to each path.
///
/// These sum to exactly one. Failed material cannot be resold.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct BadPathShares {
    /// Landfilled after collection
    pub landfill: Dimensionless,
    /// Stored
    pub stored: Dimensionless,
    /// Re-manufactured
    pub remanufactured: Dimensionless,
    /// Recycled
    pub recycled: Dimensionless,
}

/// Validated inputs for a single calendar year.
///
/// Some fields describe the generation installed this year (installed quantity, efficiency,
/// degradation, survival curve and project lifetime) and others are policy in force during this
/// year for all generations (repair, merchant tail, collection and path shares).
#[derive(Debug, PartialEq, Clone)]
pub struct YearPolicy {
    /// The calendar year
    pub year: u32,
    /// Module area installed this year
    pub installed: Area,
    /// Efficiency of modules installed this year
    pub efficiency: Dimensionless,
    /// Yearly power degradation rate of modules installed this year
    pub degradation_rate: Dimensionless,
    /// Fraction of nameplate power below which modules installed this year are retired early
    pub degradation_limit: Option<Dimensionless>,
    /// Survival curve for modules installed this year
    pub survival: WeibullParams,
    /// Project lifetime of modules installed this year
    pub project_lifetime: u32,
    /// Fraction of failures repaired this year
    pub repair_rate: Dimensionless,
    /// Fraction of modules reaching project lifetime this year which stay in service
    pub merchant_tail_rate: Dimensionless,
    /// Fraction of end-of-life material collected this year
    pub collection_rate: Dimensionless,
    /// Path shares for collected good-status material
    pub good_paths: GoodPathShares,
    /// Path shares for collected bad-status material
    pub bad_paths: BadPathShares,
    /// Fraction of re-manufactured material recovered as usable product
    pub remanufacture_yield: Dimensionless,
}

/// A validated scenario, ready to be simulated
#[derive(Debug, PartialEq, Clone)]
pub struct Scenario {
    /// The scenario's ID
    pub id: ScenarioID,
    /// Reference irradiance used to convert area to power
    pub irradiance: Irradiance,
    /// Inputs for each year of the horizon, in consecutive order
    pub timeline: Vec<YearPolicy>,
}

impl Scenario {
    /// Build a scenario from the rows of a timeline file.
    ///
    /// # Arguments
    ///
    /// * `id` - The scenario ID
    /// * `rows` - Raw timeline rows, one per consecutive year
    /// * `installation` - How the installed quantity is given
    /// * `survival_override` - A survival curve to use for all generations, if any
    /// * `irradiance` - Reference irradiance for area/power conversions
    pub fn new(
        id: ScenarioID,
        rows: &[TimelineRow],
        installation: InstallationMode,
        survival_override: Option<SurvivalOverride>,
        irradiance: Irradiance,
    ) -> Result<Self> {
        ensure!(!rows.is_empty(), "Timeline for scenario {id} is empty");
        ensure!(
            irradiance.is_finite() && irradiance > Irradiance::new(0.0),
            "Irradiance must be a finite number greater than zero"
        );
        let years: Vec<u32> = rows.iter().map(|row| row.year).collect();
        ensure!(
            is_consecutive(&years),
            "Timeline years for scenario {id} must be consecutive and in order"
        );

        let timeline = rows
            .iter()
            .map(|row| {
                YearPolicy::from_row(row, installation, survival_override, irradiance)
                    .with_context(|| format!("Invalid inputs for year {}", row.year))
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid configuration for scenario {id}"))?;

        Ok(Self {
            id,
            irradiance,
            timeline,
        })
    }

    /// The first year of the simulation horizon
    pub fn first_year(&self) -> u32 {
        self.timeline[0].year
    }

    /// The final year of the simulation horizon
    pub fn last_year(&self) -> u32 {
        self.timeline[self.timeline.len() - 1].year
    }

    /// The number of years in the simulation horizon
    pub fn horizon_len(&self) -> usize {
        self.timeline.len()
    }

    /// The inputs for the given calendar year, if within the horizon
    pub fn policy(&self, year: u32) -> Option<&YearPolicy> {
        let index = year.checked_sub(self.first_year())?;
        self.timeline.get(usize::try_from(index).ok()?)
    }
}

impl YearPolicy {
    /// Validate a timeline row and convert it into typed inputs
    fn from_row(
        row: &TimelineRow,
        installation: InstallationMode,
        survival_override: Option<SurvivalOverride>,
        irradiance: Irradiance,
    ) -> Result<Self> {
        check_percentages(row)?;
        ensure!(
            row.efficiency > 0.0,
            "Efficiency must be greater than zero"
        );
        ensure!(
            row.project_lifetime > 0,
            "Project lifetime must be greater than zero"
        );
        let efficiency = Dimensionless::from_percent(row.efficiency);

        Ok(Self {
            year: row.year,
            installed: installed_area(row, installation, efficiency, irradiance)?,
            efficiency,
            degradation_rate: Dimensionless::from_percent(row.degradation_rate),
            degradation_limit: row.degradation_limit.map(Dimensionless::from_percent),
            survival: resolve_survival(row, survival_override)
                .with_context(|| format!("Invalid reliability inputs for generation {}", row.year))?,
            project_lifetime: row.project_lifetime,
            repair_rate: Dimensionless::from_percent(row.repair_rate),
            merchant_tail_rate: Dimensionless::from_percent(row.merchant_tail_rate),
            collection_rate: Dimensionless::from_percent(row.collection_rate),
            good_paths: GoodPathShares::from_row(row)?,
            bad_paths: BadPathShares::from_row(row)?,
            remanufacture_yield: Dimensionless::from_percent(row.remanufacture_yield),
        })
    }

    /// Power generated per unit area for modules of this generation at the given age
    pub fn degradation_factor(&self, age: u32) -> Dimensionless {
        (Dimensionless::new(1.0) - self.degradation_rate).powf(f64::from(age))
    }
}

/// Check that every percentage input in a row lies in the range [0, 100]
fn check_percentages(row: &TimelineRow) -> Result<()> {
    let required = [
        ("efficiency", row.efficiency),
        ("degradation_rate", row.degradation_rate),
        ("repair_rate", row.repair_rate),
        ("merchant_tail_rate", row.merchant_tail_rate),
        ("collection_rate", row.collection_rate),
        ("resell_share", row.resell_share),
        ("good_stored_share", row.good_stored_share),
        ("good_remanufactured_share", row.good_remanufactured_share),
        ("good_recycled_share", row.good_recycled_share),
        ("bad_stored_share", row.bad_stored_share),
        ("bad_remanufactured_share", row.bad_remanufactured_share),
        ("bad_recycled_share", row.bad_recycled_share),
        ("remanufacture_yield", row.remanufacture_yield),
    ];
    let optional = [
        ("degradation_limit", row.degradation_limit),
        ("good_landfill_share", row.good_landfill_share),
        ("bad_landfill_share", row.bad_landfill_share),
    ];

    let present = optional
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)));
    for (name, value) in required.into_iter().chain(present) {
        ensure!(
            is_percentage(value),
            "{name} must be a percentage between 0 and 100 (got {value})"
        );
    }

    Ok(())
}

/// Calculate the area installed in a year according to the installation mode
fn installed_area(
    row: &TimelineRow,
    installation: InstallationMode,
    efficiency: Dimensionless,
    irradiance: Irradiance,
) -> Result<Area> {
    let require = |value: Option<f64>, name: &str| -> Result<f64> {
        let value = value.with_context(|| format!("{name} must be provided"))?;
        ensure!(
            value.is_finite() && value >= 0.0,
            "{name} must be a finite, non-negative number"
        );
        Ok(value)
    };

    let area = match installation {
        InstallationMode::Area => Area::new(require(row.installed_area, "installed_area")?),
        InstallationMode::Capacity => {
            let power = Power::from_megawatts(require(row.installed_capacity, "installed_capacity")?);
            power / irradiance / efficiency
        }
        InstallationMode::Mass => {
            let mass = Mass::new(require(row.installed_mass, "installed_mass")?);
            let density = require(row.module_mass_per_area, "module_mass_per_area")?;
            ensure!(density > 0.0, "module_mass_per_area must be greater than zero");
            mass / MassPerArea::new(density)
        }
    };

    Ok(area)
}

/// Determine the survival curve for the generation installed in this row's year.
///
/// In order of precedence: a scenario-wide override, shape parameters given directly, or a solve
/// from the `t50` and `t90` reliability keypoints.
fn resolve_survival(
    row: &TimelineRow,
    survival_override: Option<SurvivalOverride>,
) -> Result<WeibullParams> {
    if let Some(survival_override) = survival_override {
        let scale = survival_override
            .scale
            .unwrap_or_else(|| f64::from(row.project_lifetime));
        return WeibullParams::new(survival_override.shape, scale);
    }

    match (
        row.weibull_shape,
        row.weibull_scale,
        row.reliability_t50,
        row.reliability_t90,
    ) {
        (Some(shape), Some(scale), _, _) => WeibullParams::new(shape, scale),
        (Some(_), None, _, _) | (None, Some(_), _, _) => {
            bail!("weibull_shape and weibull_scale must be provided together")
        }
        (None, None, Some(t50), Some(t90)) => WeibullParams::from_t50_t90(t50, t90),
        (None, None, _, _) => bail!(
            "Either weibull_shape and weibull_scale or reliability_t50 and reliability_t90 must \
            be provided"
        ),
    }
}

/// Resolve the landfill share for a path group.
///
/// The shares of the other (explicit) paths must not exceed 100% in total. The landfill share is
/// always set to the remainder, so that all shares sum to exactly 100%. If the user supplied a
/// landfill share which disagrees with the remainder, or did not supply one, a warning is
/// emitted.
///
/// # Arguments
///
/// * `year` - The year the shares apply to (for messages)
/// * `group` - The path group (for messages)
/// * `landfill` - The landfill share supplied by the user, if any (%)
/// * `others` - The shares of all other paths in the group (%)
///
/// # Returns
///
/// The resolved landfill share as a percentage.
pub fn resolve_landfill_share(
    year: u32,
    group: PathGroup,
    landfill: Option<f64>,
    others: &[f64],
) -> Result<f64> {
    let explicit: f64 = others.iter().sum();
    ensure!(
        explicit <= 100.0 + PERCENT_SUM_TOLERANCE,
        "Year {year}: {group} path shares (excluding landfill) sum to {explicit}%, which exceeds \
        100%"
    );

    let remainder = (100.0 - explicit).max(0.0);
    if let Some(message) = landfill_correction(year, group, landfill, explicit) {
        warn!("{message}");
    }

    Ok(remainder)
}

/// The warning to emit when the landfill share is set to the remainder, if it differs from the
/// share given by the user (or none was given).
///
/// `explicit` is the sum of the other shares in the group, which must not exceed 100%.
fn landfill_correction(
    year: u32,
    group: PathGroup,
    landfill: Option<f64>,
    explicit: f64,
) -> Option<String> {
    let remainder = (100.0 - explicit).max(0.0);
    match landfill {
        None => Some(format!(
            "Year {year}: {group} landfill share not provided; setting it to the remaining \
            {remainder}%"
        )),
        Some(landfill) if !approx_eq!(f64, landfill, remainder, epsilon = PERCENT_SUM_TOLERANCE) => {
            Some(format!(
                "Year {year}: {group} path shares sum to {}% rather than 100%; landfill share \
                changed from {landfill}% to {remainder}%",
                explicit + landfill
            ))
        }
        Some(_) => None,
    }
}

impl GoodPathShares {
    fn from_row(row: &TimelineRow) -> Result<Self> {
        let landfill = resolve_landfill_share(
            row.year,
            PathGroup::GoodStatus,
            row.good_landfill_share,
            &[
                row.resell_share,
                row.good_stored_share,
                row.good_remanufactured_share,
                row.good_recycled_share,
            ],
        )?;

        Ok(Self {
            resell: Dimensionless::from_percent(row.resell_share),
            landfill: Dimensionless::from_percent(landfill),
            stored: Dimensionless::from_percent(row.good_stored_share),
            remanufactured: Dimensionless::from_percent(row.good_remanufactured_share),
            recycled: Dimensionless::from_percent(row.good_recycled_share),
        })
    }
}

impl BadPathShares {
    fn from_row(row: &TimelineRow) -> Result<Self> {
        let landfill = resolve_landfill_share(
            row.year,
            PathGroup::BadStatus,
            row.bad_landfill_share,
            &[
                row.bad_stored_share,
                row.bad_remanufactured_share,
                row.bad_recycled_share,
            ],
        )?;

        Ok(Self {
            landfill: Dimensionless::from_percent(landfill),
            stored: Dimensionless::from_percent(row.bad_stored_share),
            remanufactured: Dimensionless::from_percent(row.bad_remanufactured_share),
            recycled: Dimensionless::from_percent(row.bad_recycled_share),
        })
    }
}
