//! Fixtures for tests

use crate::input::timeline::TimelineRow;
use crate::scenario::{InstallationMode, Scenario};
use crate::units::Irradiance;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A valid timeline row for 2020 with a t50/t90 survival curve
#[fixture]
pub fn timeline_row() -> TimelineRow {
    TimelineRow {
        year: 2020,
        installed_area: Some(1000.0),
        efficiency: 20.0,
        degradation_rate: 0.5,
        reliability_t50: Some(25.0),
        reliability_t90: Some(35.0),
        project_lifetime: 30,
        repair_rate: 10.0,
        merchant_tail_rate: 20.0,
        collection_rate: 80.0,
        resell_share: 10.0,
        good_landfill_share: Some(30.0),
        good_stored_share: 20.0,
        good_remanufactured_share: 20.0,
        good_recycled_share: 20.0,
        bad_landfill_share: Some(40.0),
        bad_stored_share: 10.0,
        bad_remanufactured_share: 10.0,
        bad_recycled_share: 40.0,
        remanufacture_yield: 75.0,
        ..Default::default()
    }
}

/// Timeline rows covering 2000 to 2060, with installations in every year up to 2030.
///
/// Survival is shortened (t50 = 12, t90 = 18) and project lifetimes kept short so that all the
/// engine's pathways are exercised within the horizon.
#[fixture]
pub fn timeline_rows(timeline_row: TimelineRow) -> Vec<TimelineRow> {
    (2000..=2060)
        .map(|year| TimelineRow {
            year,
            installed_area: Some(if year <= 2030 {
                f64::from(year - 1999) * 100.0
            } else {
                0.0
            }),
            reliability_t50: Some(12.0),
            reliability_t90: Some(18.0),
            project_lifetime: 15,
            ..timeline_row.clone()
        })
        .collect()
}

/// A scenario built from [`timeline_rows`]
#[fixture]
pub fn scenario(timeline_rows: Vec<TimelineRow>) -> Scenario {
    Scenario::new(
        "scenario1".into(),
        &timeline_rows,
        InstallationMode::Area,
        None,
        Irradiance::new(1000.0),
    )
    .unwrap()
}
