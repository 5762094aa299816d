//! Routes material leaving active service through the end-of-life pathways.
//!
//! There are two structurally parallel waterfalls, both applied to the material from all
//! generations in a given calendar year, using that year's policy:
//!
//! * the **good-status** waterfall, for material retired at the end of its project lifetime (net
//!   of any material resold back into service); and
//! * the **bad-status** waterfall, for failed material which was not repaired.
//!
//! In each, the collection rate first splits the material into collected and uncollected
//! (landfilled without collection) portions. Collected material is then split between landfill,
//! storage, re-manufacturing and recycling according to the year's path shares, and
//! re-manufactured material is further split according to the re-manufacturing yield.
use crate::scenario::YearPolicy;
use crate::units::{Area, Dimensionless};

/// The quantities of material routed to each end-of-life path in a year
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathwayFlows {
    /// Material collected for processing (excluding resold material)
    pub collected: Area,
    /// Material landfilled without being collected
    pub uncollected: Area,
    /// Collected material which is landfilled
    pub landfilled: Area,
    /// Collected material which is stored
    pub stored: Area,
    /// Re-manufactured material recovered as usable product
    pub remanufactured_yield: Area,
    /// Re-manufactured material lost in the process
    pub remanufactured_non_yield: Area,
    /// Collected material which is recycled
    pub recycled: Area,
}

impl PathwayFlows {
    /// The total quantity of material routed by the waterfall
    pub fn total(&self) -> Area {
        self.uncollected
            + self.landfilled
            + self.stored
            + self.remanufactured_yield
            + self.remanufactured_non_yield
            + self.recycled
    }
}

/// The fraction of good-status material retired in the given year which is resold.
///
/// Resale requires collection, so this is the product of the collection rate and the resale
/// share. The cohort tracker returns resold material to active service.
pub fn resale_fraction(policy: &YearPolicy) -> Dimensionless {
    policy.collection_rate * policy.good_paths.resell
}

/// Split collected material between the collected paths
fn split_collected(
    collected: Area,
    uncollected: Area,
    shares: [Dimensionless; 4],
    remanufacture_yield: Dimensionless,
) -> PathwayFlows {
    let [landfill, stored, remanufactured, recycled] = shares;
    let remanufactured = collected * remanufactured;
    let remanufactured_yield = remanufactured * remanufacture_yield;

    PathwayFlows {
        collected,
        uncollected,
        landfilled: collected * landfill,
        stored: collected * stored,
        remanufactured_yield,
        remanufactured_non_yield: (remanufactured - remanufactured_yield).clamp_non_negative(),
        recycled: collected * recycled,
    }
}

/// Route good-status material through the end-of-life pathways.
///
/// The path shares are shares of all collected material, including that which was resold. As
/// resold material has already been removed, the remaining shares are re-scaled so that they apply
/// to the collected material left over after resale.
///
/// # Arguments
///
/// * `retired` - Material reaching project lifetime this year, not kept on as merchant tail
/// * `resold` - The portion of `retired` which was resold
/// * `policy` - Policy for the year
pub fn route_good_status(retired: Area, resold: Area, policy: &YearPolicy) -> PathwayFlows {
    let one = Dimensionless::new(1.0);
    let collection_rate = policy.collection_rate;
    let uncollected = retired * (one - collection_rate);
    let collected = (retired * collection_rate - resold).clamp_non_negative();

    let shares = &policy.good_paths;
    let remaining = one - shares.resell;
    let rescale = |share: Dimensionless| {
        if remaining.value() > 0.0 {
            share / remaining
        } else {
            Dimensionless::new(0.0)
        }
    };

    split_collected(
        collected,
        uncollected,
        [
            rescale(shares.landfill),
            rescale(shares.stored),
            rescale(shares.remanufactured),
            rescale(shares.recycled),
        ],
        policy.remanufacture_yield,
    )
}

/// Route bad-status material through the end-of-life pathways.
///
/// # Arguments
///
/// * `failed_unrepaired` - Failed material which was not repaired this year
/// * `policy` - Policy for the year
pub fn route_bad_status(failed_unrepaired: Area, policy: &YearPolicy) -> PathwayFlows {
    let one = Dimensionless::new(1.0);
    let collection_rate = policy.collection_rate;
    let shares = &policy.bad_paths;

    split_collected(
        failed_unrepaired * collection_rate,
        failed_unrepaired * (one - collection_rate),
        [
            shares.landfill,
            shares.stored,
            shares.remanufactured,
            shares.recycled,
        ],
        policy.remanufacture_yield,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::timeline_row;
    use crate::input::timeline::TimelineRow;
    use crate::scenario::{InstallationMode, Scenario};
    use crate::units::Irradiance;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn policy_from_row(row: TimelineRow) -> YearPolicy {
        Scenario::new(
            "test".into(),
            &[row],
            InstallationMode::Area,
            None,
            Irradiance::new(1000.0),
        )
        .unwrap()
        .timeline
        .remove(0)
    }

    #[rstest]
    fn test_route_good_status(timeline_row: TimelineRow) {
        // Collection 80%, resell 10%, landfill 30%, stored 20%, re-manufactured 20% (yield 75%),
        // recycled 20%
        let policy = policy_from_row(timeline_row);
        let retired = Area::new(100.0);
        let resold = retired * resale_fraction(&policy);
        assert_approx_eq!(f64, resold.value(), 8.0, epsilon = 1e-9);

        let flows = route_good_status(retired, resold, &policy);
        assert_approx_eq!(f64, flows.uncollected.value(), 20.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.collected.value(), 72.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.landfilled.value(), 24.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.stored.value(), 16.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.remanufactured_yield.value(), 12.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.remanufactured_non_yield.value(), 4.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.recycled.value(), 16.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.total().value(), (retired - resold).value(), epsilon = 1e-9);
    }

    #[rstest]
    fn test_route_good_status_all_resold(timeline_row: TimelineRow) {
        let policy = policy_from_row(TimelineRow {
            collection_rate: 100.0,
            resell_share: 100.0,
            good_landfill_share: None,
            good_stored_share: 0.0,
            good_remanufactured_share: 0.0,
            good_recycled_share: 0.0,
            ..timeline_row
        });
        let retired = Area::new(50.0);
        let flows = route_good_status(retired, retired * resale_fraction(&policy), &policy);
        assert_eq!(flows, PathwayFlows::default());
    }

    #[rstest]
    fn test_route_bad_status(timeline_row: TimelineRow) {
        // Collection 80%, landfill 40%, stored 10%, re-manufactured 10% (yield 75%), recycled 40%
        let policy = policy_from_row(timeline_row);
        let flows = route_bad_status(Area::new(100.0), &policy);
        assert_approx_eq!(f64, flows.uncollected.value(), 20.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.collected.value(), 80.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.landfilled.value(), 32.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.stored.value(), 8.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.remanufactured_yield.value(), 6.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.remanufactured_non_yield.value(), 2.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.recycled.value(), 32.0, epsilon = 1e-9);
        assert_approx_eq!(f64, flows.total().value(), 100.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_zero_collection(timeline_row: TimelineRow) {
        let policy = policy_from_row(TimelineRow {
            collection_rate: 0.0,
            ..timeline_row
        });
        let retired = Area::new(100.0);
        let resold = retired * resale_fraction(&policy);
        assert_eq!(resold, Area::new(0.0));

        for flows in [
            route_good_status(retired, resold, &policy),
            route_bad_status(retired, &policy),
        ] {
            assert_eq!(flows.uncollected, retired);
            assert_eq!(flows.collected, Area::new(0.0));
            assert_eq!(flows.stored, Area::new(0.0));
            assert_eq!(flows.recycled, Area::new(0.0));
            assert_eq!(flows.remanufactured_yield, Area::new(0.0));
            assert_eq!(flows.remanufactured_non_yield, Area::new(0.0));
            assert_eq!(flows.landfilled, Area::new(0.0));
        }
    }
}
