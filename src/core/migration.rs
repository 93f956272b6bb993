use super::projection::{PayoutContext, TrackSetup, settle_track, simulate_track};
use super::rates::{finite_or_zero, monthly_rate_from_annual, non_negative};
use super::tax::{PayoutFacts, assess_payout};
use super::types::{
    Contribution, MAX_TERM_YEARS, MigrationParameters, MigrationResult, TrackKind, age_in,
};

/// Compares keeping an existing wrapped contract with surrendering it and
/// moving the proceeds, plus the same monthly contribution, into the direct
/// track for the remaining term.
pub fn compute_migration(params: &MigrationParameters) -> MigrationResult {
    let remaining_years = params.remaining_years.clamp(1, MAX_TERM_YEARS);
    let elapsed_years = params.elapsed_years.min(MAX_TERM_YEARS);
    let months = remaining_years * 12;
    let monthly_return = monthly_rate_from_annual(params.annual_return);
    let current_age = age_in(params.birth_year, params.current_year);
    let contribution = Contribution::Recurring {
        monthly: params.monthly_contribution,
    };

    let keep_setup = TrackSetup::wrapped(
        &params.contract_costs,
        contribution,
        months,
        params.fund_cost_rate,
    )
    .with_existing_balance(params.contract_value, params.paid_in);
    let keep_run = simulate_track(&keep_setup, months, monthly_return);
    let keep = settle_track(
        &keep_run,
        PayoutContext {
            duration_years: elapsed_years + remaining_years,
            payout_age: current_age + remaining_years,
            personal_tax_rate: params.personal_tax_rate,
            exempt: params.legacy_tax_exempt,
        },
    );

    let surrender_value = finite_or_zero(params.contract_value);
    let surrender_fee = non_negative(params.surrender_fee).min(surrender_value.max(0.0));
    let surrender_tax = assess_payout(&PayoutFacts {
        track: TrackKind::Wrapped,
        balance: surrender_value - surrender_fee,
        contributions: params.paid_in,
        duration_years: elapsed_years,
        payout_age: current_age,
        personal_tax_rate: params.personal_tax_rate,
        exempt: params.legacy_tax_exempt,
    });
    let reinvested = (surrender_value - surrender_fee - surrender_tax.tax).max(0.0);

    let switch_setup = TrackSetup::direct(
        contribution,
        params.fund_cost_rate,
        params.direct_initial_charge_rate,
        params.direct_platform_rate,
    )
    .with_direct_deposit(reinvested);
    let switch_run = simulate_track(&switch_setup, months, monthly_return);
    let switch = settle_track(
        &switch_run,
        PayoutContext {
            duration_years: remaining_years,
            payout_age: current_age + remaining_years,
            personal_tax_rate: params.personal_tax_rate,
            exempt: false,
        },
    );

    let advantage = switch.net_balance - keep.net_balance;
    log::debug!(
        "migration over {remaining_years} years: keep {:.2}, switch {:.2}",
        keep.net_balance,
        switch.net_balance
    );

    MigrationResult {
        keep,
        switch,
        surrender_value,
        surrender_fee,
        surrender_tax,
        reinvested,
        advantage,
        switching_pays_off: advantage > 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CostMode, TaxRegime};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_params() -> MigrationParameters {
        MigrationParameters {
            birth_year: 1975,
            current_year: 2025,
            elapsed_years: 8,
            remaining_years: 15,
            contract_value: 30_000.0,
            paid_in: 24_000.0,
            monthly_contribution: 150.0,
            annual_return: 0.05,
            contract_costs: CostMode::Effective { annual_rate: 0.018 },
            surrender_fee: 300.0,
            fund_cost_rate: 0.005,
            direct_platform_rate: 0.0,
            direct_initial_charge_rate: 0.0,
            personal_tax_rate: 0.25,
            legacy_tax_exempt: false,
        }
    }

    fn neutral_params() -> MigrationParameters {
        let mut params = sample_params();
        params.annual_return = 0.0;
        params.contract_costs = CostMode::Effective { annual_rate: 0.0 };
        params.surrender_fee = 0.0;
        params.fund_cost_rate = 0.0;
        params.contract_value = 24_000.0;
        params
    }

    #[test]
    fn neutral_inputs_make_both_paths_equal() {
        let result = compute_migration(&neutral_params());
        let expected = 24_000.0 + 150.0 * 180.0;
        assert_approx(result.keep.gross_balance, expected);
        assert_approx(result.switch.gross_balance, expected);
        assert_approx(result.surrender_tax.tax, 0.0);
        assert_approx(result.advantage, 0.0);
        assert!(!result.switching_pays_off);
    }

    #[test]
    fn keep_track_carries_paid_in_contributions() {
        let result = compute_migration(&sample_params());
        assert_approx(result.keep.total_contributions, 24_000.0 + 150.0 * 180.0);
        assert_eq!(result.keep.tax.regime, TaxRegime::PartialIncome);
    }

    #[test]
    fn surrender_gain_is_taxed_before_reinvesting() {
        let result = compute_migration(&sample_params());
        // Eight years in: flat regime on (30_000 - 300) - 24_000.
        assert_eq!(result.surrender_tax.regime, TaxRegime::FlatCapitalGains);
        assert_approx(result.surrender_tax.tax, 5_700.0 * 0.25);
        assert_approx(result.reinvested, 29_700.0 - 1_425.0);
        assert_approx(result.surrender_fee, 300.0);
    }

    #[test]
    fn legacy_exemption_spares_surrender_and_payout() {
        let mut params = sample_params();
        params.legacy_tax_exempt = true;
        let result = compute_migration(&params);
        assert_eq!(result.surrender_tax.regime, TaxRegime::Exempt);
        assert_approx(result.reinvested, 29_700.0);
        assert_approx(result.keep.net_balance, result.keep.gross_balance);
        assert_eq!(result.switch.tax.regime, TaxRegime::FlatCapitalGains);
    }

    #[test]
    fn switch_track_pays_initial_charge_on_proceeds() {
        let mut params = neutral_params();
        params.direct_initial_charge_rate = 0.02;
        params.monthly_contribution = 0.0;
        let result = compute_migration(&params);
        assert_approx(result.switch.costs.initial_charge, 480.0);
        assert_approx(result.switch.gross_balance, 23_520.0);
        assert!(result.advantage < 0.0);
    }

    #[test]
    fn expensive_contract_makes_switching_pay_off() {
        let mut params = sample_params();
        params.contract_costs = CostMode::Effective { annual_rate: 0.035 };
        params.legacy_tax_exempt = false;
        let result = compute_migration(&params);
        assert!(result.switching_pays_off);
        assert!(result.advantage > 0.0);
    }

    #[test]
    fn oversized_year_counts_are_clamped() {
        let mut params = sample_params();
        params.elapsed_years = u32::MAX;
        params.remaining_years = u32::MAX;
        let result = compute_migration(&params);

        // 80 + 80 years held, payout at 130 once the age is capped.
        assert_eq!(result.keep.tax.regime, TaxRegime::PartialIncome);
        assert_eq!(result.surrender_tax.regime, TaxRegime::FlatCapitalGains);
        assert_approx(
            result.keep.total_contributions,
            24_000.0 + 150.0 * 80.0 * 12.0,
        );
        assert!(result.advantage.is_finite());
    }

    #[test]
    fn surrender_fee_cannot_exceed_contract_value() {
        let mut params = neutral_params();
        params.contract_value = 100.0;
        params.surrender_fee = 500.0;
        let result = compute_migration(&params);
        assert_approx(result.surrender_fee, 100.0);
        assert_approx(result.reinvested, 0.0);
    }
}
