use super::rates::{divide_or_zero, non_negative, unit_rate};
use super::types::{
    AMORTIZATION_CAP_MONTHS, CostBreakdown, CostBucket, CostMode, FundAllocation, FundWeights,
};

/// Allocations within this distance of the contribution are treated as matching.
const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Length of the zillmerisation window for a contract of `contract_months`.
pub fn amortization_months(contract_months: u32, cap: u32) -> u32 {
    cap.min(contract_months).max(1)
}

/// Resolves actual-currency charges into upfront and ongoing buckets.
///
/// Effective-percentage contracts have no buckets until the run is finished;
/// see [`split_effective_cost`].
pub fn actual_cost_breakdown(
    acquisition_cost: f64,
    admin_monthly: f64,
    contract_months: u32,
) -> CostBreakdown {
    let contract_months = contract_months.max(1);
    let acquisition = non_negative(acquisition_cost);
    let admin = non_negative(admin_monthly);
    let window = amortization_months(contract_months, AMORTIZATION_CAP_MONTHS);

    CostBreakdown {
        upfront: CostBucket {
            total: acquisition,
            months: window,
            per_month: acquisition / window as f64,
        },
        ongoing: CostBucket {
            total: admin * contract_months as f64,
            months: contract_months,
            per_month: admin,
        },
    }
}

/// Upfront/ongoing shares used to report a realised effective cost.
pub fn effective_split_shares(contract_months: u32) -> (f64, f64) {
    if contract_months > AMORTIZATION_CAP_MONTHS {
        (0.7, 0.3)
    } else {
        (0.6, 0.4)
    }
}

/// Splits the realised effective-percentage cost into reporting buckets.
pub fn split_effective_cost(total_cost: f64, contract_months: u32) -> CostBreakdown {
    let contract_months = contract_months.max(1);
    let total = non_negative(total_cost);
    let (upfront_share, ongoing_share) = effective_split_shares(contract_months);
    let window = amortization_months(contract_months, AMORTIZATION_CAP_MONTHS);

    let upfront_total = total * upfront_share;
    let ongoing_per_month = total * ongoing_share / contract_months as f64;
    CostBreakdown {
        upfront: CostBucket {
            total: upfront_total,
            months: window,
            per_month: upfront_total / window as f64,
        },
        ongoing: CostBucket {
            total: ongoing_per_month * contract_months as f64,
            months: contract_months,
            per_month: ongoing_per_month,
        },
    }
}

/// Breakdown for a finished run. `realised_effective_cost` is only read for
/// effective-percentage contracts.
pub fn cost_breakdown(
    mode: &CostMode,
    contract_months: u32,
    realised_effective_cost: f64,
) -> CostBreakdown {
    match *mode {
        CostMode::Actual {
            acquisition_cost,
            admin_monthly,
        } => actual_cost_breakdown(acquisition_cost, admin_monthly, contract_months),
        CostMode::Effective { .. } => split_effective_cost(realised_effective_cost, contract_months),
    }
}

/// Resolves the ongoing and initial-charge rates used by the simulation.
///
/// A single entry keeps its raw rates. Several entries are weighted by
/// allocated amount, falling back to a plain mean when nothing is allocated.
/// With no entries the caller's defaults apply.
pub fn weighted_fund_rates(
    funds: &[FundAllocation],
    default_ongoing_rate: f64,
    default_initial_charge_rate: f64,
    contribution: f64,
) -> FundWeights {
    let default_initial = unit_rate(default_initial_charge_rate);
    let initial_of = |fund: &FundAllocation| {
        fund.initial_charge_rate.map(unit_rate).unwrap_or(default_initial)
    };

    let allocated_total: f64 = funds.iter().map(|f| non_negative(f.amount)).sum();
    let allocation_mismatch = !funds.is_empty()
        && (allocated_total - non_negative(contribution)).abs() > ALLOCATION_TOLERANCE;

    let (ongoing_rate, initial_charge_rate) = match funds {
        [] => (unit_rate(default_ongoing_rate), default_initial),
        [single] => (unit_rate(single.ongoing_cost_rate), initial_of(single)),
        many if allocated_total > 0.0 => {
            let ongoing = many
                .iter()
                .map(|f| non_negative(f.amount) * unit_rate(f.ongoing_cost_rate))
                .sum::<f64>();
            let initial = many
                .iter()
                .map(|f| non_negative(f.amount) * initial_of(f))
                .sum::<f64>();
            (
                divide_or_zero(ongoing, allocated_total),
                divide_or_zero(initial, allocated_total),
            )
        }
        many => {
            let count = many.len() as f64;
            (
                many.iter().map(|f| unit_rate(f.ongoing_cost_rate)).sum::<f64>() / count,
                many.iter().map(initial_of).sum::<f64>() / count,
            )
        }
    };

    if allocation_mismatch {
        log::warn!(
            "fund allocation total {allocated_total:.2} differs from contribution {:.2}",
            non_negative(contribution)
        );
    }

    FundWeights {
        ongoing_rate: unit_rate(ongoing_rate),
        initial_charge_rate: unit_rate(initial_charge_rate),
        allocated_total,
        allocation_mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn fund(name: &str, amount: f64, ongoing: f64, initial: Option<f64>) -> FundAllocation {
        FundAllocation {
            name: name.to_string(),
            amount,
            ongoing_cost_rate: ongoing,
            initial_charge_rate: initial,
            identifier: None,
        }
    }

    #[test]
    fn acquisition_cost_is_zillmerised_over_sixty_months() {
        let breakdown = actual_cost_breakdown(2_000.0, 5.0, 300);
        assert_eq!(breakdown.upfront.months, 60);
        assert_approx(breakdown.upfront.per_month, 2_000.0 / 60.0);
        assert!((breakdown.upfront.per_month - 33.33).abs() < 0.01);
        assert_eq!(breakdown.ongoing.months, 300);
        assert_approx(breakdown.ongoing.total, 1_500.0);
    }

    #[test]
    fn short_contracts_amortise_over_their_whole_term() {
        let breakdown = actual_cost_breakdown(1_200.0, 0.0, 24);
        assert_eq!(breakdown.upfront.months, 24);
        assert_approx(breakdown.upfront.per_month, 50.0);
    }

    #[test]
    fn amortization_months_never_reaches_zero() {
        assert_eq!(amortization_months(0, 60), 1);
        assert_eq!(amortization_months(12, 0), 1);
        assert_eq!(amortization_months(600, 60), 60);
    }

    #[test]
    fn negative_charges_clamp_to_zero() {
        let breakdown = actual_cost_breakdown(-500.0, f64::NAN, 120);
        assert_approx(breakdown.upfront.total, 0.0);
        assert_approx(breakdown.upfront.per_month, 0.0);
        assert_approx(breakdown.ongoing.per_month, 0.0);
    }

    #[test]
    fn effective_split_depends_on_five_year_cutoff() {
        assert_eq!(effective_split_shares(48), (0.6, 0.4));
        assert_eq!(effective_split_shares(60), (0.6, 0.4));
        assert_eq!(effective_split_shares(120), (0.7, 0.3));

        let short = split_effective_cost(1_000.0, 48);
        assert_approx(short.upfront.total, 600.0);
        assert_approx(short.ongoing.total, 400.0);
        assert_eq!(short.upfront.months, 48);

        let long = split_effective_cost(1_000.0, 120);
        assert_approx(long.upfront.total, 700.0);
        assert_approx(long.ongoing.total, 300.0);
        assert_approx(long.upfront.per_month, 700.0 / 60.0);
        assert_approx(long.ongoing.per_month, 2.5);
    }

    #[test]
    fn equal_allocation_averages_ongoing_rates() {
        let funds = [
            fund("World", 100.0, 0.003, None),
            fund("Emerging", 100.0, 0.005, None),
        ];
        let weights = weighted_fund_rates(&funds, 0.0, 0.0, 200.0);
        assert_approx(weights.ongoing_rate, 0.004);
        assert!(!weights.allocation_mismatch);
    }

    #[test]
    fn weights_follow_allocation_amounts() {
        let funds = [
            fund("A", 300.0, 0.002, Some(0.05)),
            fund("B", 100.0, 0.010, None),
        ];
        let weights = weighted_fund_rates(&funds, 0.0, 0.01, 400.0);
        assert_approx(weights.ongoing_rate, (300.0 * 0.002 + 100.0 * 0.010) / 400.0);
        assert_approx(weights.initial_charge_rate, (300.0 * 0.05 + 100.0 * 0.01) / 400.0);
    }

    #[test]
    fn single_fund_keeps_raw_rates() {
        let funds = [fund("Only", 37.0, 0.0073, Some(0.025))];
        let weights = weighted_fund_rates(&funds, 0.02, 0.05, 37.0);
        assert_eq!(weights.ongoing_rate, 0.0073);
        assert_eq!(weights.initial_charge_rate, 0.025);
    }

    #[test]
    fn empty_allocation_uses_defaults() {
        let weights = weighted_fund_rates(&[], 0.006, 0.03, 150.0);
        assert_approx(weights.ongoing_rate, 0.006);
        assert_approx(weights.initial_charge_rate, 0.03);
        assert!(!weights.allocation_mismatch);
    }

    #[test]
    fn unallocated_funds_fall_back_to_plain_mean() {
        let funds = [fund("A", 0.0, 0.002, None), fund("B", 0.0, 0.006, None)];
        let weights = weighted_fund_rates(&funds, 0.0, 0.0, 0.0);
        assert_approx(weights.ongoing_rate, 0.004);
    }

    #[test]
    fn mismatched_allocation_is_flagged_not_rejected() {
        let funds = [fund("A", 80.0, 0.002, None), fund("B", 50.0, 0.004, None)];
        let weights = weighted_fund_rates(&funds, 0.0, 0.0, 100.0);
        assert!(weights.allocation_mismatch);
        assert_approx(weights.allocated_total, 130.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_weighted_rates_stay_in_unit_interval(
            a_amount in -1_000i32..10_000,
            b_amount in -1_000i32..10_000,
            a_rate_bp in -500i32..20_000,
            b_rate_bp in -500i32..20_000,
        ) {
            let funds = [
                fund("A", a_amount as f64, a_rate_bp as f64 / 10_000.0, Some(b_rate_bp as f64 / 10_000.0)),
                fund("B", b_amount as f64, b_rate_bp as f64 / 10_000.0, None),
            ];
            let weights = weighted_fund_rates(&funds, 0.01, 0.02, 500.0);
            prop_assert!((0.0..=1.0).contains(&weights.ongoing_rate));
            prop_assert!((0.0..=1.0).contains(&weights.initial_charge_rate));
        }

        #[test]
        fn prop_breakdown_buckets_are_consistent(
            acquisition in 0u32..50_000,
            admin in 0u32..100,
            months in 1u32..1_000,
        ) {
            let breakdown = actual_cost_breakdown(acquisition as f64, admin as f64, months);
            prop_assert!(breakdown.upfront.months == months.min(60));
            prop_assert!(breakdown.upfront.per_month >= 0.0);
            prop_assert!((breakdown.ongoing.total - breakdown.ongoing.per_month * months as f64).abs() < 1e-6);
        }
    }
}
