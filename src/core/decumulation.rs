use std::collections::BTreeMap;

use super::annuity::sustainable_annual_withdrawal;
use super::rates::{finite_or_zero, non_negative};
use super::types::{
    DecumulationParameters, DecumulationPhase, DecumulationRow, DecumulationSummary, MAX_AGE,
};

fn planned_withdrawal(
    params: &DecumulationParameters,
    year: u32,
    overrides: Option<&BTreeMap<u32, f64>>,
) -> f64 {
    let flat = non_negative(params.annual_withdrawal);
    if !params.detail_mode {
        return flat;
    }
    overrides
        .and_then(|per_year| per_year.get(&year))
        .map(|amount| non_negative(*amount))
        .unwrap_or(flat)
}

/// Year-by-year drawdown from `start_age` to `end_age`.
///
/// Year 0 only grows the capital. Every later year withdraws first and grows
/// the remainder; the year reaching `end_age` liquidates whatever is left.
/// The run stops early once the capital is exhausted. Overrides are keyed by
/// year index and only honoured in detail mode. Returns are floored at -100%
/// and ages clamped to `MAX_AGE`.
pub fn simulate_decumulation(
    params: &DecumulationParameters,
    overrides: Option<&BTreeMap<u32, f64>>,
) -> Vec<DecumulationRow> {
    let rate = finite_or_zero(params.annual_return).max(-1.0);
    let mut balance = non_negative(params.start_capital);
    let start_age = params.start_age.min(MAX_AGE);
    let end_age = params.end_age.min(MAX_AGE);

    if start_age >= end_age {
        return vec![DecumulationRow {
            year: 0,
            age: start_age,
            phase: DecumulationPhase::TerminalLiquidation,
            start_balance: balance,
            withdrawal: balance,
            growth: 0.0,
            end_balance: 0.0,
        }];
    }

    let span = end_age - start_age;
    let mut rows = Vec::with_capacity(span as usize + 1);

    let growth = balance * rate;
    rows.push(DecumulationRow {
        year: 0,
        age: start_age,
        phase: DecumulationPhase::GrowingNoWithdrawal,
        start_balance: balance,
        withdrawal: 0.0,
        growth,
        end_balance: balance + growth,
    });
    balance += growth;

    for year in 1..=span {
        if balance <= 0.0 {
            break;
        }
        let age = start_age + year;
        let start_balance = balance;

        if age == end_age {
            rows.push(DecumulationRow {
                year,
                age,
                phase: DecumulationPhase::TerminalLiquidation,
                start_balance,
                withdrawal: start_balance,
                growth: 0.0,
                end_balance: 0.0,
            });
            break;
        }

        let withdrawal = planned_withdrawal(params, year, overrides).min(start_balance);
        let remainder = start_balance - withdrawal;
        let growth = remainder * rate;
        balance = (remainder + growth).max(0.0);
        rows.push(DecumulationRow {
            year,
            age,
            phase: DecumulationPhase::Withdrawing,
            start_balance,
            withdrawal,
            growth,
            end_balance: balance,
        });
    }

    rows
}

pub fn summarize_decumulation(
    params: &DecumulationParameters,
    rows: &[DecumulationRow],
) -> DecumulationSummary {
    let total_withdrawn = rows.iter().map(|row| row.withdrawal).sum();
    let final_balance = rows.last().map(|row| row.end_balance).unwrap_or(0.0);
    let reached_end = rows
        .last()
        .is_some_and(|row| row.phase == DecumulationPhase::TerminalLiquidation);

    // Year 0 only grows, so withdrawals start from the grown balance one year later.
    let withdrawal_years = params.end_age.min(MAX_AGE).saturating_sub(params.start_age);
    let grown_capital = rows.first().map(|row| row.end_balance).unwrap_or(0.0);

    DecumulationSummary {
        total_withdrawn,
        final_balance,
        years_simulated: rows.len() as u32,
        depleted_early: !reached_end,
        sustainable_annual_withdrawal: sustainable_annual_withdrawal(
            grown_capital,
            params.annual_return,
            withdrawal_years,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{any, prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_params() -> DecumulationParameters {
        DecumulationParameters {
            start_capital: 100_000.0,
            annual_return: 0.05,
            annual_withdrawal: 5_000.0,
            start_age: 65,
            end_age: 85,
            detail_mode: false,
        }
    }

    #[test]
    fn first_year_grows_without_withdrawal() {
        let rows = simulate_decumulation(&sample_params(), None);
        let first = rows[0];
        assert_eq!(first.phase, DecumulationPhase::GrowingNoWithdrawal);
        assert_eq!(first.age, 65);
        assert_approx(first.withdrawal, 0.0);
        assert_approx(first.end_balance, 105_000.0);
    }

    #[test]
    fn later_years_withdraw_then_grow() {
        let rows = simulate_decumulation(&sample_params(), None);
        let second = rows[1];
        assert_eq!(second.phase, DecumulationPhase::Withdrawing);
        assert_approx(second.start_balance, 105_000.0);
        assert_approx(second.withdrawal, 5_000.0);
        assert_approx(second.growth, 5_000.0);
        assert_approx(second.end_balance, 105_000.0);
    }

    #[test]
    fn final_year_liquidates_everything() {
        let rows = simulate_decumulation(&sample_params(), None);
        assert_eq!(rows.len(), 21);
        let last = rows[20];
        assert_eq!(last.age, 85);
        assert_eq!(last.phase, DecumulationPhase::TerminalLiquidation);
        assert_approx(last.withdrawal, last.start_balance);
        assert_approx(last.end_balance, 0.0);
        assert_approx(last.start_balance, 105_000.0);
    }

    #[test]
    fn withdrawal_is_capped_and_run_stops_when_exhausted() {
        let mut params = sample_params();
        params.annual_withdrawal = 40_000.0;
        let rows = simulate_decumulation(&params, None);
        let summary = summarize_decumulation(&params, &rows);
        assert!(rows.len() < 21);
        assert!(summary.depleted_early);
        let last = rows.last().copied().expect("rows");
        assert_approx(last.end_balance, 0.0);
        assert!(last.withdrawal <= last.start_balance + EPS);
        for row in &rows {
            assert!(row.withdrawal <= row.start_balance + EPS);
        }
    }

    #[test]
    fn overrides_apply_only_in_detail_mode() {
        let overrides = BTreeMap::from([(1, 20_000.0), (2, 0.0)]);
        let params = sample_params();
        let ignored = simulate_decumulation(&params, Some(&overrides));
        assert_approx(ignored[1].withdrawal, 5_000.0);
        assert_approx(ignored[2].withdrawal, 5_000.0);

        let mut detailed = params.clone();
        detailed.detail_mode = true;
        let rows = simulate_decumulation(&detailed, Some(&overrides));
        assert_approx(rows[1].withdrawal, 20_000.0);
        assert_approx(rows[2].withdrawal, 0.0);
        assert_approx(rows[3].withdrawal, 5_000.0);
    }

    #[test]
    fn detail_mode_without_overrides_uses_flat_amount() {
        let mut params = sample_params();
        params.detail_mode = true;
        let rows = simulate_decumulation(&params, None);
        assert_approx(rows[5].withdrawal, 5_000.0);
    }

    #[test]
    fn start_at_or_after_end_collapses_to_liquidation() {
        let mut params = sample_params();
        params.start_age = 85;
        let rows = simulate_decumulation(&params, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].phase, DecumulationPhase::TerminalLiquidation);
        assert_approx(rows[0].withdrawal, 100_000.0);
        assert_approx(rows[0].end_balance, 0.0);

        params.start_age = 90;
        assert_eq!(simulate_decumulation(&params, None).len(), 1);
    }

    #[test]
    fn returns_below_total_loss_never_go_negative() {
        let mut params = sample_params();
        params.annual_return = -1.5;
        let rows = simulate_decumulation(&params, None);
        assert_eq!(rows.len(), 1);
        assert_approx(rows[0].growth, -100_000.0);
        assert_approx(rows[0].end_balance, 0.0);

        let summary = summarize_decumulation(&params, &rows);
        assert!(summary.depleted_early);
        assert!(summary.sustainable_annual_withdrawal >= 0.0);
    }

    #[test]
    fn end_age_is_clamped_to_max_age() {
        let mut params = sample_params();
        params.end_age = u32::MAX;
        let rows = simulate_decumulation(&params, None);
        assert_eq!(rows.len() as u32, MAX_AGE - 65 + 1);
        assert_eq!(rows.last().map(|row| row.age), Some(MAX_AGE));
    }

    #[test]
    fn summary_reports_totals_and_sustainable_level() {
        let params = sample_params();
        let rows = simulate_decumulation(&params, None);
        let summary = summarize_decumulation(&params, &rows);
        assert!(!summary.depleted_early);
        assert_eq!(summary.years_simulated, 21);
        assert_approx(summary.final_balance, 0.0);
        assert_approx(summary.total_withdrawn, 19.0 * 5_000.0 + 105_000.0);
        assert!(summary.sustainable_annual_withdrawal > 5_000.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_drawdown_never_overdraws(
            capital in 0u32..2_000_000,
            withdrawal in 0u32..200_000,
            return_bp in -2_000i32..1_500,
            start_age in 50u32..80,
            span in 0u32..40,
            detail in any::<bool>(),
        ) {
            let params = DecumulationParameters {
                start_capital: capital as f64,
                annual_return: return_bp as f64 / 10_000.0,
                annual_withdrawal: withdrawal as f64,
                start_age,
                end_age: start_age + span,
                detail_mode: detail,
            };
            let rows = simulate_decumulation(&params, None);
            prop_assert!(!rows.is_empty());
            prop_assert!(rows.len() as u32 <= span + 1);
            for row in &rows {
                prop_assert!(row.withdrawal >= 0.0);
                prop_assert!(row.withdrawal <= row.start_balance + 1e-9);
                prop_assert!(row.end_balance >= 0.0);
            }
        }
    }
}
