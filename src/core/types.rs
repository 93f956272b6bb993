use serde::{Deserialize, Serialize};

/// Upper bound on the acquisition-cost amortisation window.
pub const AMORTIZATION_CAP_MONTHS: u32 = 60;

/// Age at which the gap scenario assumes retirement capital is exhausted.
pub const DEFAULT_HORIZON_AGE: u32 = 90;

/// Longest contract or remaining term the engine projects.
pub const MAX_TERM_YEARS: u32 = 80;

/// Ages are clamped to this ceiling before any year or month arithmetic.
pub const MAX_AGE: u32 = 120;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackKind {
    Wrapped,
    Direct,
}

/// How the wrapped contract expresses its charges.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum CostMode {
    /// Itemised currency amounts: an acquisition cost that is zillmerised over
    /// the first months and a fixed monthly administration fee.
    #[serde(rename = "actual-currency", rename_all = "camelCase")]
    Actual {
        acquisition_cost: f64,
        admin_monthly: f64,
    },
    /// A single annual percentage drag applied to the running balance.
    #[serde(rename = "effective-percentage", rename_all = "camelCase")]
    Effective { annual_rate: f64 },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Contribution {
    Recurring { monthly: f64 },
    #[serde(rename_all = "camelCase")]
    LumpSum { amount: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundAllocation {
    pub name: String,
    pub amount: f64,
    pub ongoing_cost_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_charge_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// Inputs for the recurring and lump-sum comparisons. Rates are fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractParameters {
    pub term_years: u32,
    pub contribution: Contribution,
    pub annual_return: f64,
    pub birth_year: i32,
    pub current_year: i32,
    pub wrapped_costs: CostMode,
    /// Ongoing fund cost used when no fund allocation is supplied.
    pub fund_cost_rate: f64,
    pub direct_platform_rate: f64,
    /// Initial charge used when no fund allocation is supplied, and for
    /// allocation entries that carry no initial charge of their own.
    pub direct_initial_charge_rate: f64,
    pub personal_tax_rate: f64,
    pub wrapped_tax_exempt: bool,
    pub direct_tax_exempt: bool,
}

impl ContractParameters {
    /// Term in years, clamped to `1..=MAX_TERM_YEARS`.
    pub fn bounded_term_years(&self) -> u32 {
        self.term_years.clamp(1, MAX_TERM_YEARS)
    }

    pub fn term_months(&self) -> u32 {
        self.bounded_term_years() * 12
    }

    pub fn current_age(&self) -> u32 {
        age_in(self.birth_year, self.current_year)
    }

    pub fn payout_age(&self) -> u32 {
        self.current_age() + self.bounded_term_years()
    }
}

pub(crate) fn age_in(birth_year: i32, current_year: i32) -> u32 {
    current_year.saturating_sub(birth_year).clamp(0, MAX_AGE as i32) as u32
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBucket {
    pub total: f64,
    pub months: u32,
    pub per_month: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub upfront: CostBucket,
    pub ongoing: CostBucket,
}

/// Realised costs per category over a whole run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotals {
    pub acquisition: f64,
    pub administration: f64,
    pub effective: f64,
    pub fund: f64,
    pub initial_charge: f64,
    pub platform: f64,
}

impl CostTotals {
    pub fn total(&self) -> f64 {
        self.acquisition
            + self.administration
            + self.effective
            + self.fund
            + self.initial_charge
            + self.platform
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundWeights {
    pub ongoing_rate: f64,
    pub initial_charge_rate: f64,
    pub allocated_total: f64,
    pub allocation_mismatch: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxRegime {
    PartialIncome,
    FlatCapitalGains,
    Exempt,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxAssessment {
    pub regime: TaxRegime,
    pub gain: f64,
    pub taxable_gain: f64,
    pub rate: f64,
    pub tax: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    pub gross_balance: f64,
    pub net_balance: f64,
    pub total_contributions: f64,
    pub costs: CostTotals,
    pub total_costs: f64,
    pub tax: TaxAssessment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesMode {
    Gross,
    Net,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPoint {
    pub year: u32,
    pub age: u32,
    pub wrapped: f64,
    pub direct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub term_months: u32,
    pub current_age: u32,
    pub payout_age: u32,
    pub monthly_return: f64,
    pub wrapped: TrackResult,
    pub direct: TrackResult,
    pub wrapped_cost_breakdown: CostBreakdown,
    pub fund_weights: FundWeights,
    pub yearly: Vec<YearlyPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapParameters {
    pub birth_year: i32,
    pub current_year: i32,
    pub retirement_age: u32,
    pub desired_monthly_income: f64,
    pub pension_monthly: f64,
    pub other_income_monthly: f64,
    pub existing_capital: f64,
    pub annual_return: f64,
    pub horizon_age: u32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapResult {
    pub current_age: u32,
    pub years_to_retirement: u32,
    pub monthly_gap: f64,
    pub capital_required: f64,
    pub existing_capital_future_value: f64,
    pub additional_capital_required: f64,
    pub monthly_savings_required: f64,
    pub gap_already_covered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecumulationParameters {
    pub start_capital: f64,
    pub annual_return: f64,
    pub annual_withdrawal: f64,
    pub start_age: u32,
    pub end_age: u32,
    pub detail_mode: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecumulationPhase {
    GrowingNoWithdrawal,
    Withdrawing,
    TerminalLiquidation,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecumulationRow {
    pub year: u32,
    pub age: u32,
    pub phase: DecumulationPhase,
    pub start_balance: f64,
    pub withdrawal: f64,
    pub growth: f64,
    pub end_balance: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecumulationSummary {
    pub total_withdrawn: f64,
    pub final_balance: f64,
    pub years_simulated: u32,
    pub depleted_early: bool,
    pub sustainable_annual_withdrawal: f64,
}

/// Inputs for judging whether an existing wrapped contract should be kept or
/// surrendered into a direct investment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationParameters {
    pub birth_year: i32,
    pub current_year: i32,
    pub elapsed_years: u32,
    pub remaining_years: u32,
    pub contract_value: f64,
    pub paid_in: f64,
    pub monthly_contribution: f64,
    pub annual_return: f64,
    pub contract_costs: CostMode,
    pub surrender_fee: f64,
    pub fund_cost_rate: f64,
    pub direct_platform_rate: f64,
    pub direct_initial_charge_rate: f64,
    pub personal_tax_rate: f64,
    /// Legacy contracts whose payout is free of income tax.
    pub legacy_tax_exempt: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub keep: TrackResult,
    pub switch: TrackResult,
    pub surrender_value: f64,
    pub surrender_fee: f64,
    pub surrender_tax: TaxAssessment,
    pub reinvested: f64,
    pub advantage: f64,
    pub switching_pays_off: bool,
}
