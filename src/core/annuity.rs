use super::rates::{divide_or_zero, finite_or_zero, monthly_rate_from_annual, non_negative};
use super::types::{GapParameters, GapResult, MAX_AGE, age_in};

/// Capital that funds `payment` per period for `periods` periods.
pub fn present_value_of_annuity(payment: f64, rate: f64, periods: u32) -> f64 {
    let n = periods as f64;
    if rate > 0.0 {
        payment * (1.0 - (1.0 + rate).powf(-n)) / rate
    } else {
        payment * n
    }
}

/// Level payment that accumulates `target` after `periods` periods.
pub fn sinking_fund_payment(target: f64, rate: f64, periods: u32) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    if rate > 0.0 {
        divide_or_zero(target * rate, (1.0 + rate).powf(periods as f64) - 1.0)
    } else {
        target / periods as f64
    }
}

/// Compounds `present` for `years` years; returns below -100% are floored there.
pub fn future_value(present: f64, annual_rate: f64, years: u32) -> f64 {
    let growth = 1.0 + finite_or_zero(annual_rate).max(-1.0);
    present * growth.powf(years as f64)
}

/// Fraction of capital that can be withdrawn each year so that it runs out
/// exactly after `years_remaining` years.
pub(crate) fn annuity_withdrawal_rate(annual_return: f64, years_remaining: u32) -> f64 {
    let years = years_remaining.max(1) as f64;
    if annual_return.abs() < 1e-9 {
        return 1.0 / years;
    }

    if annual_return <= -0.99 {
        return 1.0;
    }

    let denom = 1.0 - (1.0 + annual_return).powf(-years);
    if denom.abs() <= 1e-12 {
        1.0 / years
    } else {
        (annual_return / denom).max(0.0)
    }
}

/// Level annual withdrawal, taken at the start of each year, that exhausts
/// `capital` over `years` years.
pub fn sustainable_annual_withdrawal(capital: f64, annual_return: f64, years: u32) -> f64 {
    let annual_return = finite_or_zero(annual_return);
    let end_of_year = non_negative(capital) * annuity_withdrawal_rate(annual_return, years);
    if annual_return > -0.99 {
        end_of_year / (1.0 + annual_return)
    } else {
        end_of_year
    }
}

/// Sizes the capital and monthly savings needed to close a retirement
/// income gap that must be covered until the horizon age.
pub fn compute_gap(params: &GapParameters) -> GapResult {
    let current_age = age_in(params.birth_year, params.current_year);
    let retirement_age = params.retirement_age.min(MAX_AGE);
    let horizon_age = params.horizon_age.min(MAX_AGE);
    let years_to_retirement = retirement_age.saturating_sub(current_age);
    let covered_income =
        non_negative(params.pension_monthly) + non_negative(params.other_income_monthly);
    let monthly_gap = finite_or_zero(params.desired_monthly_income) - covered_income;

    if monthly_gap <= 0.0 {
        return GapResult {
            current_age,
            years_to_retirement,
            gap_already_covered: true,
            ..GapResult::default()
        };
    }

    let annual_return = finite_or_zero(params.annual_return);
    let monthly_rate = monthly_rate_from_annual(annual_return);
    let payout_months = (horizon_age.saturating_sub(retirement_age) * 12).max(1);
    let saving_months = (years_to_retirement * 12).max(1);

    let capital_required = present_value_of_annuity(monthly_gap, monthly_rate, payout_months);
    let existing_capital_future_value = future_value(
        non_negative(params.existing_capital),
        annual_return,
        years_to_retirement,
    );
    let additional_capital_required = (capital_required - existing_capital_future_value).max(0.0);
    let monthly_savings_required =
        sinking_fund_payment(additional_capital_required, monthly_rate, saving_months);

    log::debug!(
        "gap {monthly_gap:.2}/month needs {capital_required:.2} at {}, saving {monthly_savings_required:.2}/month",
        retirement_age
    );

    GapResult {
        current_age,
        years_to_retirement,
        monthly_gap,
        capital_required,
        existing_capital_future_value,
        additional_capital_required,
        monthly_savings_required,
        gap_already_covered: false,
    }
}
