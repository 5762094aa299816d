//! Combines the histories of every cohort in a scenario into calendar-year totals.
//!
//! Each cohort flow (failures, retirements and so on) is first collected into a generation × year
//! matrix, which is then reduced to yearly totals by summing over generations. The end-of-life
//! waterfalls are applied once per year to the summed material, as path shares are policy for the
//! calendar year rather than properties of a cohort.
use super::cohort::{CohortHistory, CohortState};
use super::waterfall::{PathwayFlows, route_bad_status, route_good_status};
use crate::scenario::Scenario;
use crate::units::{Area, Power};
use indexmap::IndexMap;
use strum::{EnumIter, IntoEnumIterator};

/// A per-cohort quantity which is accumulated in a generation × year matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CohortFlow {
    /// Area in service
    Active,
    /// Area failing
    Failed,
    /// Failed area which was repaired
    Repaired,
    /// Failed area which was not repaired
    FailedUnrepaired,
    /// Area retired at project lifetime, excluding merchant tail
    Retired,
    /// Area kept in service past project lifetime
    MerchantTail,
    /// Retired area which was resold
    Resold,
    /// Area retired early due to power degradation
    DegradationRetired,
}

impl CohortFlow {
    /// The quantity of this flow in the given cohort state
    pub fn quantity(self, state: &CohortState) -> Area {
        match self {
            Self::Active => state.active,
            Self::Failed => state.failed,
            Self::Repaired => state.repaired,
            Self::FailedUnrepaired => state.failed_unrepaired,
            Self::Retired => state.retired,
            Self::MerchantTail => state.merchant_tail,
            Self::Resold => state.resold,
            Self::DegradationRetired => state.degradation_retired,
        }
    }
}

/// A generation × observation year table for a single flow.
///
/// Only the upper triangle is populated, as a cohort has no state before it is installed.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationMatrix {
    first_year: u32,
    /// One row per generation, indexed by age
    rows: Vec<Vec<Area>>,
}

impl GenerationMatrix {
    /// Build a matrix for `flow` from the histories of every cohort in a scenario.
    ///
    /// `histories` must be in order of installation year, starting at `first_year`.
    pub fn from_histories(flow: CohortFlow, first_year: u32, histories: &[CohortHistory]) -> Self {
        let rows = histories
            .iter()
            .map(|history| {
                history
                    .states
                    .iter()
                    .map(|state| flow.quantity(state))
                    .collect()
            })
            .collect();

        Self { first_year, rows }
    }

    /// The quantity for the given generation in the given observation year.
    ///
    /// Returns `None` if the generation is outside the horizon or was not yet installed.
    pub fn get(&self, generation: u32, year: u32) -> Option<Area> {
        let row = self
            .rows
            .get(usize::try_from(generation.checked_sub(self.first_year)?).ok()?)?;
        let age = year.checked_sub(generation)?;
        row.get(usize::try_from(age).ok()?).copied()
    }

    /// The total across all generations in the given observation year
    pub fn year_total(&self, year: u32) -> Area {
        (self.first_year..=year)
            .filter_map(|generation| self.get(generation, year))
            .sum()
    }
}

/// Totals across all generations for a single calendar year
#[derive(Debug, Clone, PartialEq)]
pub struct YearTotals {
    /// The calendar year
    pub year: u32,
    /// Area installed this year
    pub installed: Area,
    /// Area in service at the end of the year
    pub active: Area,
    /// Power generated by the area in service
    pub power: Power,
    /// Area failing this year
    pub failed: Area,
    /// Failed area which was repaired
    pub repaired: Area,
    /// Failed area which was not repaired
    pub failed_unrepaired: Area,
    /// Area reaching project lifetime this year, excluding merchant tail
    pub retired: Area,
    /// Area reaching project lifetime this year and kept in service
    pub merchant_tail: Area,
    /// Retired area which was resold and returned to service
    pub resold: Area,
    /// Retired area net of resale
    pub retired_net: Area,
    /// Area retired early due to power degradation, disposed of without collection
    pub degradation_retired: Area,
    /// Routing of good-status material
    pub good: PathwayFlows,
    /// Routing of bad-status material
    pub bad: PathwayFlows,
}

impl YearTotals {
    /// All material landfilled without collection this year
    pub fn landfilled_uncollected(&self) -> Area {
        self.good.uncollected + self.bad.uncollected + self.degradation_retired
    }

    /// All material leaving active service this year
    pub fn removed(&self) -> Area {
        self.failed_unrepaired + self.retired_net + self.degradation_retired
    }
}

/// Combine the histories of every cohort in a scenario into yearly totals.
///
/// # Arguments
///
/// * `scenario` - The scenario which was simulated
/// * `histories` - One history per generation, in order of installation year
///
/// # Returns
///
/// Totals for every year of the scenario's horizon, in order.
pub fn aggregate(scenario: &Scenario, histories: &[CohortHistory]) -> Vec<YearTotals> {
    let first_year = scenario.first_year();
    let matrices: IndexMap<_, _> = CohortFlow::iter()
        .map(|flow| {
            (
                flow,
                GenerationMatrix::from_histories(flow, first_year, histories),
            )
        })
        .collect();
    let total = |flow: CohortFlow, year: u32| matrices[&flow].year_total(year);

    scenario
        .timeline
        .iter()
        .map(|policy| {
            let year = policy.year;
            let retired = total(CohortFlow::Retired, year);
            let resold = total(CohortFlow::Resold, year);
            let failed_unrepaired = total(CohortFlow::FailedUnrepaired, year);
            let power = histories
                .iter()
                .filter_map(|history| history.state_in_year(year))
                .map(|state| state.power)
                .sum();

            YearTotals {
                year,
                installed: policy.installed,
                active: total(CohortFlow::Active, year),
                power,
                failed: total(CohortFlow::Failed, year),
                repaired: total(CohortFlow::Repaired, year),
                failed_unrepaired,
                retired,
                merchant_tail: total(CohortFlow::MerchantTail, year),
                resold,
                retired_net: (retired - resold).clamp_non_negative(),
                degradation_retired: total(CohortFlow::DegradationRetired, year),
                good: route_good_status(retired, resold, policy),
                bad: route_bad_status(failed_unrepaired, policy),
            }
        })
        .collect()
}
