//! Tracks the attrition of a single installation cohort (generation) as it ages.
//!
//! A cohort's state at each age is produced by a pure step function from its state at the previous
//! age. Within a year, the order of events is:
//!
//! 1. random failures, a share of which are repaired and return to service;
//! 2. the nameplate-degradation check, which retires all remaining modules of the cohort if their
//!    power has degraded below the configured limit before the end of their project lifetime;
//! 3. project-lifetime retirement, in the year the cohort reaches its project lifetime, keeping a
//!    merchant-tail share in service and returning resold modules to service.
use super::waterfall::resale_fraction;
use crate::reliability::WeibullParams;
use crate::scenario::{Scenario, YearPolicy};
use crate::units::{Area, Dimensionless, Irradiance, Power};
use serde::Serialize;

/// The state of a cohort in a single observation year
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CohortState {
    /// Age of the cohort in years
    pub age: u32,
    /// The observation (calendar) year
    pub year: u32,
    /// Area still in service at the end of the year
    pub active: Area,
    /// Power generated by the active area
    pub power: Power,
    /// Area which failed during the year
    pub failed: Area,
    /// Area which failed and was repaired, remaining in service
    pub repaired: Area,
    /// Area which failed and was not repaired (input to the bad-status waterfall)
    pub failed_unrepaired: Area,
    /// Area reaching project lifetime and not kept on as merchant tail
    pub retired: Area,
    /// Area reaching project lifetime and kept on as merchant tail
    pub merchant_tail: Area,
    /// Share of the retired area which was resold and returned to service
    pub resold: Area,
    /// Area retired because its power degraded below the nameplate limit. This area is disposed
    /// of without collection.
    pub degradation_retired: Area,
}

impl CohortState {
    /// Retired area net of resale (input to the good-status waterfall)
    pub fn retired_net(&self) -> Area {
        (self.retired - self.resold).clamp_non_negative()
    }

    /// Area leaving active service during the year
    pub fn removed(&self) -> Area {
        self.failed_unrepaired + self.retired_net() + self.degradation_retired
    }
}

/// The full history of a single cohort, from its installation year to the end of the horizon
#[derive(Debug, Clone, PartialEq)]
pub struct CohortHistory {
    /// The installation year
    pub generation: u32,
    /// The area installed
    pub installed: Area,
    /// The cohort's survival curve
    pub survival: WeibullParams,
    /// The cohort's state at each age, starting at age zero
    pub states: Vec<CohortState>,
}

impl CohortHistory {
    /// The cohort's state in the given observation year, if it was installed by then
    pub fn state_in_year(&self, year: u32) -> Option<&CohortState> {
        let age = year.checked_sub(self.generation)?;
        self.states.get(usize::try_from(age).ok()?)
    }
}

/// The state of a cohort in its installation year.
///
/// No attrition takes place at age zero.
pub fn initial_state(generation: &YearPolicy, irradiance: Irradiance) -> CohortState {
    CohortState {
        age: 0,
        year: generation.year,
        active: generation.installed,
        power: generation.installed * generation.efficiency * irradiance,
        ..Default::default()
    }
}

/// Advance a cohort by one year.
///
/// # Arguments
///
/// * `previous` - The cohort's state in the previous year
/// * `generation` - Inputs for the cohort's installation year
/// * `observation` - Inputs for the year being simulated
/// * `irradiance` - Reference irradiance for calculating power
///
/// # Returns
///
/// The cohort's state in the observation year.
pub fn step(
    previous: &CohortState,
    generation: &YearPolicy,
    observation: &YearPolicy,
    irradiance: Irradiance,
) -> CohortState {
    let age = previous.age + 1;
    let mut state = CohortState {
        age,
        year: previous.year + 1,
        ..Default::default()
    };
    debug_assert_eq!(state.year, observation.year);

    // Failures are a share of the *original* installed area, limited to what is still in service
    let failure_fraction = generation.survival.yearly_failure_fraction(age);
    state.failed = (generation.installed * Dimensionless::new(failure_fraction))
        .min(previous.active)
        .clamp_non_negative();
    state.repaired = state.failed * observation.repair_rate;
    state.failed_unrepaired = (state.failed - state.repaired).clamp_non_negative();
    let mut active = (previous.active - state.failed_unrepaired).clamp_non_negative();

    let degradation_factor = generation.degradation_factor(age);
    if age < generation.project_lifetime
        && generation
            .degradation_limit
            .is_some_and(|limit| degradation_factor < limit)
    {
        state.degradation_retired = active;
        active = Area::new(0.0);
    }

    if age == generation.project_lifetime {
        state.merchant_tail = active * observation.merchant_tail_rate;
        state.retired = (active - state.merchant_tail).clamp_non_negative();
        state.resold = state.retired * resale_fraction(observation);
        active = state.merchant_tail + state.resold;
    }

    state.active = active;
    state.power = active * generation.efficiency * irradiance * degradation_factor;
    state
}

/// Simulate a single cohort from its installation year to the end of the scenario's horizon.
///
/// # Arguments
///
/// * `scenario` - The scenario being simulated
/// * `generation_index` - Index into the scenario's timeline of the cohort's installation year
pub fn track_cohort(scenario: &Scenario, generation_index: usize) -> CohortHistory {
    let generation = &scenario.timeline[generation_index];
    let mut states = Vec::with_capacity(scenario.horizon_len() - generation_index);
    let mut previous = initial_state(generation, scenario.irradiance);
    states.push(previous);
    for observation in &scenario.timeline[generation_index + 1..] {
        previous = step(&previous, generation, observation, scenario.irradiance);
        states.push(previous);
    }

    CohortHistory {
        generation: generation.year,
        installed: generation.installed,
        survival: generation.survival,
        states,
    }
}
