/// Replaces NaN and infinities with zero so downstream arithmetic stays defined.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

pub fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}

/// Clamps a fractional rate into `[0, 1]`.
pub fn unit_rate(value: f64) -> f64 {
    non_negative(value).min(1.0)
}

/// Converts an annual nominal return into the equivalent compounded monthly rate.
///
/// `(1 + annual)^(1/12) - 1`. Returns at or below -100% collapse to -100% per month.
pub fn monthly_rate_from_annual(annual: f64) -> f64 {
    let annual = finite_or_zero(annual);
    if annual <= -1.0 {
        return -1.0;
    }
    (1.0 + annual).powf(1.0 / 12.0) - 1.0
}

/// Annual cost rates accrue pro rata each month.
pub fn monthly_cost_rate(annual: f64) -> f64 {
    unit_rate(annual) / 12.0
}

pub fn divide_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < 1e-12 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn monthly_rate_compounds_back_to_annual() {
        let monthly = monthly_rate_from_annual(0.06);
        assert!(((1.0 + monthly).powi(12) - 1.06).abs() < EPS);
        assert!(monthly < 0.06 / 12.0);
    }

    #[test]
    fn monthly_rate_handles_zero_and_garbage() {
        assert_eq!(monthly_rate_from_annual(0.0), 0.0);
        assert_eq!(monthly_rate_from_annual(f64::NAN), 0.0);
        assert_eq!(monthly_rate_from_annual(-2.0), -1.0);
    }

    #[test]
    fn cost_rates_clamp_into_unit_interval() {
        assert_eq!(monthly_cost_rate(-0.01), 0.0);
        assert!((monthly_cost_rate(0.012) - 0.001).abs() < EPS);
        assert!((monthly_cost_rate(5.0) - 1.0 / 12.0).abs() < EPS);
    }

    #[test]
    fn divide_or_zero_guards_zero_denominator() {
        assert_eq!(divide_or_zero(10.0, 0.0), 0.0);
        assert_eq!(divide_or_zero(10.0, 4.0), 2.5);
    }
}
