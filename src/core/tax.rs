use super::rates::{non_negative, unit_rate};
use super::types::{TaxAssessment, TaxRegime, TrackKind};

/// Minimum holding period for the partial-income regime.
pub const PARTIAL_INCOME_MIN_YEARS: u32 = 12;
/// Minimum payout age for the partial-income regime.
pub const PARTIAL_INCOME_MIN_AGE: u32 = 62;
/// Half of the gain is income, of which 15% is exempt again: 0.5 × 0.85.
pub const PARTIAL_INCOME_SHARE: f64 = 0.5 * 0.85;
pub const FLAT_CAPITAL_GAINS_RATE: f64 = 0.25;
pub const DEFAULT_PERSONAL_TAX_RATE: f64 = 0.20;

/// Facts the tax decision depends on, gathered at payout time.
#[derive(Debug, Clone, Copy)]
pub struct PayoutFacts {
    pub track: TrackKind,
    pub balance: f64,
    pub contributions: f64,
    pub duration_years: u32,
    pub payout_age: u32,
    pub personal_tax_rate: f64,
    pub exempt: bool,
}

pub fn realized_gain(balance: f64, contributions: f64) -> f64 {
    non_negative(balance - contributions)
}

pub fn qualifies_for_partial_income(track: TrackKind, duration_years: u32, payout_age: u32) -> bool {
    track == TrackKind::Wrapped
        && duration_years >= PARTIAL_INCOME_MIN_YEARS
        && payout_age >= PARTIAL_INCOME_MIN_AGE
}

pub fn select_regime(facts: &PayoutFacts) -> TaxRegime {
    if facts.exempt {
        TaxRegime::Exempt
    } else if qualifies_for_partial_income(facts.track, facts.duration_years, facts.payout_age) {
        TaxRegime::PartialIncome
    } else {
        TaxRegime::FlatCapitalGains
    }
}

pub fn assess_payout(facts: &PayoutFacts) -> TaxAssessment {
    let gain = realized_gain(facts.balance, facts.contributions);
    let regime = select_regime(facts);
    let (taxable_gain, rate) = match regime {
        TaxRegime::Exempt => (0.0, 0.0),
        TaxRegime::PartialIncome => (
            gain * PARTIAL_INCOME_SHARE,
            unit_rate(facts.personal_tax_rate),
        ),
        TaxRegime::FlatCapitalGains => (gain, FLAT_CAPITAL_GAINS_RATE),
    };

    TaxAssessment {
        regime,
        gain,
        taxable_gain,
        rate,
        tax: taxable_gain * rate,
    }
}

/// Balance left after paying tax on the realised gain. Balances below the
/// contributions carry no tax and pass through unchanged.
pub fn net_of_tax(facts: &PayoutFacts) -> (f64, TaxAssessment) {
    let assessment = assess_payout(facts);
    (facts.balance - assessment.tax, assessment)
}
