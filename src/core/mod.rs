mod annuity;
mod costs;
mod decumulation;
mod migration;
mod projection;
mod rates;
mod tax;
mod types;

pub use annuity::{
    compute_gap, present_value_of_annuity, sinking_fund_payment, sustainable_annual_withdrawal,
};
pub use costs::{
    actual_cost_breakdown, amortization_months, cost_breakdown, effective_split_shares,
    split_effective_cost, weighted_fund_rates,
};
pub use decumulation::{simulate_decumulation, summarize_decumulation};
pub use migration::compute_migration;
pub use projection::{build_yearly_series, compute_projection};
pub use rates::monthly_rate_from_annual;
pub use tax::{
    DEFAULT_PERSONAL_TAX_RATE, FLAT_CAPITAL_GAINS_RATE, PARTIAL_INCOME_MIN_AGE,
    PARTIAL_INCOME_MIN_YEARS, PARTIAL_INCOME_SHARE, PayoutFacts, assess_payout,
};
pub use types::{
    AMORTIZATION_CAP_MONTHS, Contribution, ContractParameters, CostBreakdown, CostBucket,
    CostMode, CostTotals, DEFAULT_HORIZON_AGE, DecumulationParameters, DecumulationPhase,
    DecumulationRow, DecumulationSummary, FundAllocation, FundWeights, GapParameters, GapResult,
    MAX_AGE, MAX_TERM_YEARS, MigrationParameters, MigrationResult, ProjectionResult, SeriesMode, TaxAssessment, TaxRegime,
    TrackKind, TrackResult, YearlyPoint,
};
