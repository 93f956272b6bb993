use super::costs::{amortization_months, cost_breakdown, weighted_fund_rates};
use super::rates::{
    finite_or_zero, monthly_cost_rate, monthly_rate_from_annual, non_negative, unit_rate,
};
use super::tax::{PayoutFacts, net_of_tax};
use super::types::{
    AMORTIZATION_CAP_MONTHS, Contribution, ContractParameters, CostMode, CostTotals,
    FundAllocation, FundWeights, ProjectionResult, SeriesMode, TrackKind, TrackResult,
    YearlyPoint,
};

/// Per-month charges that distinguish one track from another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TrackCharges {
    /// Acquisition cost deducted from contributions during the amortisation
    /// window, plus a fixed administration fee every month.
    Zillmerized {
        amortized_per_month: f64,
        window_months: u32,
        admin_monthly: f64,
    },
    /// Annual percentage drag on the running balance.
    Effective { monthly_rate: f64 },
    /// Initial charge on every contribution plus a platform fee on the balance.
    Direct {
        initial_charge_rate: f64,
        monthly_platform_rate: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TrackSetup {
    pub kind: TrackKind,
    pub opening_balance: f64,
    pub opening_contributions: f64,
    pub opening_costs: CostTotals,
    pub monthly_contribution: f64,
    pub monthly_fund_rate: f64,
    pub charges: TrackCharges,
}

impl TrackSetup {
    pub(crate) fn wrapped(
        costs: &CostMode,
        contribution: Contribution,
        contract_months: u32,
        fund_rate: f64,
    ) -> Self {
        let window_months = amortization_months(contract_months, AMORTIZATION_CAP_MONTHS);
        let monthly_fund_rate = monthly_cost_rate(fund_rate);

        match (*costs, contribution) {
            (
                CostMode::Actual {
                    acquisition_cost,
                    admin_monthly,
                },
                Contribution::Recurring { monthly },
            ) => Self {
                kind: TrackKind::Wrapped,
                opening_balance: 0.0,
                opening_contributions: 0.0,
                opening_costs: CostTotals::default(),
                monthly_contribution: non_negative(monthly),
                monthly_fund_rate,
                charges: TrackCharges::Zillmerized {
                    amortized_per_month: non_negative(acquisition_cost) / window_months as f64,
                    window_months,
                    admin_monthly: non_negative(admin_monthly),
                },
            },
            (
                CostMode::Actual {
                    acquisition_cost,
                    admin_monthly,
                },
                Contribution::LumpSum { amount },
            ) => {
                let amount = non_negative(amount);
                let acquisition = non_negative(acquisition_cost);
                Self {
                    kind: TrackKind::Wrapped,
                    opening_balance: amount - acquisition,
                    opening_contributions: amount,
                    opening_costs: CostTotals {
                        acquisition,
                        ..CostTotals::default()
                    },
                    monthly_contribution: 0.0,
                    monthly_fund_rate,
                    charges: TrackCharges::Zillmerized {
                        amortized_per_month: 0.0,
                        window_months,
                        admin_monthly: non_negative(admin_monthly),
                    },
                }
            }
            (CostMode::Effective { annual_rate }, contribution) => {
                let (opening, monthly) = match contribution {
                    Contribution::Recurring { monthly } => (0.0, non_negative(monthly)),
                    Contribution::LumpSum { amount } => (non_negative(amount), 0.0),
                };
                Self {
                    kind: TrackKind::Wrapped,
                    opening_balance: opening,
                    opening_contributions: opening,
                    opening_costs: CostTotals::default(),
                    monthly_contribution: monthly,
                    monthly_fund_rate,
                    charges: TrackCharges::Effective {
                        monthly_rate: monthly_cost_rate(annual_rate),
                    },
                }
            }
        }
    }

    pub(crate) fn direct(
        contribution: Contribution,
        fund_rate: f64,
        initial_charge_rate: f64,
        platform_rate: f64,
    ) -> Self {
        let initial_charge_rate = unit_rate(initial_charge_rate);
        let charges = TrackCharges::Direct {
            initial_charge_rate,
            monthly_platform_rate: monthly_cost_rate(platform_rate),
        };
        let setup = Self {
            kind: TrackKind::Direct,
            opening_balance: 0.0,
            opening_contributions: 0.0,
            opening_costs: CostTotals::default(),
            monthly_contribution: 0.0,
            monthly_fund_rate: monthly_cost_rate(fund_rate),
            charges,
        };

        match contribution {
            Contribution::Recurring { monthly } => Self {
                monthly_contribution: non_negative(monthly),
                ..setup
            },
            Contribution::LumpSum { amount } => setup.with_direct_deposit(amount),
        }
    }

    /// Adds a one-off deposit that pays the track's initial charge up front.
    pub(crate) fn with_direct_deposit(mut self, amount: f64) -> Self {
        let amount = non_negative(amount);
        let rate = match self.charges {
            TrackCharges::Direct {
                initial_charge_rate,
                ..
            } => initial_charge_rate,
            _ => 0.0,
        };
        let charge = amount * rate;
        self.opening_balance += amount - charge;
        self.opening_contributions += amount;
        self.opening_costs.initial_charge += charge;
        self
    }

    /// Starts the track from an already existing balance and paid-in total.
    pub(crate) fn with_existing_balance(mut self, balance: f64, contributions: f64) -> Self {
        self.opening_balance += finite_or_zero(balance);
        self.opening_contributions += non_negative(contributions);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Checkpoint {
    pub year: u32,
    pub balance: f64,
    pub contributions: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrackRun {
    pub kind: TrackKind,
    pub balance: f64,
    pub contributions: f64,
    pub costs: CostTotals,
    pub checkpoints: Vec<Checkpoint>,
}

/// Steps one track through exactly `months` months.
///
/// Costs are read from the start-of-month balance, then the balance grows and
/// the net contribution is added. Negative balances are carried as-is.
pub(crate) fn simulate_track(setup: &TrackSetup, months: u32, monthly_return: f64) -> TrackRun {
    let mut balance = setup.opening_balance;
    let mut contributions = setup.opening_contributions;
    let mut costs = setup.opening_costs;
    let contribution = setup.monthly_contribution;
    let mut checkpoints = Vec::with_capacity((months / 12) as usize);

    for month in 1..=months {
        let fund_cost = balance * setup.monthly_fund_rate;
        let (net_contribution, balance_charge) = match setup.charges {
            TrackCharges::Zillmerized {
                amortized_per_month,
                window_months,
                admin_monthly,
            } => {
                let amortized = if month <= window_months {
                    amortized_per_month
                } else {
                    0.0
                };
                costs.acquisition += amortized;
                costs.administration += admin_monthly;
                (contribution - amortized, admin_monthly)
            }
            TrackCharges::Effective { monthly_rate } => {
                let effective_cost = balance * monthly_rate;
                costs.effective += effective_cost;
                (contribution, effective_cost)
            }
            TrackCharges::Direct {
                initial_charge_rate,
                monthly_platform_rate,
            } => {
                let initial_charge = contribution * initial_charge_rate;
                let platform_cost = balance * monthly_platform_rate;
                costs.initial_charge += initial_charge;
                costs.platform += platform_cost;
                (contribution - initial_charge, platform_cost)
            }
        };

        costs.fund += fund_cost;
        contributions += contribution;
        balance = balance * (1.0 + monthly_return) + net_contribution - fund_cost - balance_charge;

        if month % 12 == 0 {
            checkpoints.push(Checkpoint {
                year: month / 12,
                balance,
                contributions,
            });
        }
    }

    TrackRun {
        kind: setup.kind,
        balance,
        contributions,
        costs,
        checkpoints,
    }
}

/// Tax circumstances shared by both tracks of a comparison.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PayoutContext {
    pub duration_years: u32,
    pub payout_age: u32,
    pub personal_tax_rate: f64,
    pub exempt: bool,
}

pub(crate) fn settle_track(run: &TrackRun, context: PayoutContext) -> TrackResult {
    let (net_balance, tax) = net_of_tax(&PayoutFacts {
        track: run.kind,
        balance: run.balance,
        contributions: run.contributions,
        duration_years: context.duration_years,
        payout_age: context.payout_age,
        personal_tax_rate: context.personal_tax_rate,
        exempt: context.exempt,
    });

    TrackResult {
        gross_balance: run.balance,
        net_balance,
        total_contributions: run.contributions,
        costs: run.costs,
        total_costs: run.costs.total(),
        tax,
    }
}

fn contribution_amount(contribution: Contribution) -> f64 {
    match contribution {
        Contribution::Recurring { monthly } => non_negative(monthly),
        Contribution::LumpSum { amount } => non_negative(amount),
    }
}

struct ComparisonRuns {
    wrapped: TrackRun,
    direct: TrackRun,
}

fn run_comparison(
    params: &ContractParameters,
    funds: &[FundAllocation],
) -> (ComparisonRuns, FundWeights) {
    let months = params.term_months();
    let monthly_return = monthly_rate_from_annual(params.annual_return);
    let weights = weighted_fund_rates(
        funds,
        params.fund_cost_rate,
        params.direct_initial_charge_rate,
        contribution_amount(params.contribution),
    );

    let wrapped_setup = TrackSetup::wrapped(
        &params.wrapped_costs,
        params.contribution,
        months,
        weights.ongoing_rate,
    );
    let direct_setup = TrackSetup::direct(
        params.contribution,
        weights.ongoing_rate,
        weights.initial_charge_rate,
        params.direct_platform_rate,
    );

    let runs = ComparisonRuns {
        wrapped: simulate_track(&wrapped_setup, months, monthly_return),
        direct: simulate_track(&direct_setup, months, monthly_return),
    };
    (runs, weights)
}

fn payout_context(params: &ContractParameters, years: u32, kind: TrackKind) -> PayoutContext {
    PayoutContext {
        duration_years: years,
        payout_age: params.current_age() + years,
        personal_tax_rate: params.personal_tax_rate,
        exempt: match kind {
            TrackKind::Wrapped => params.wrapped_tax_exempt,
            TrackKind::Direct => params.direct_tax_exempt,
        },
    }
}

fn checkpoint_value(
    params: &ContractParameters,
    kind: TrackKind,
    checkpoint: &Checkpoint,
    mode: SeriesMode,
) -> f64 {
    match mode {
        SeriesMode::Gross => checkpoint.balance,
        SeriesMode::Net => {
            let context = payout_context(params, checkpoint.year, kind);
            let (net, _) = net_of_tax(&PayoutFacts {
                track: kind,
                balance: checkpoint.balance,
                contributions: checkpoint.contributions,
                duration_years: context.duration_years,
                payout_age: context.payout_age,
                personal_tax_rate: context.personal_tax_rate,
                exempt: context.exempt,
            });
            net
        }
    }
}

fn yearly_points(
    params: &ContractParameters,
    runs: &ComparisonRuns,
    mode: SeriesMode,
) -> Vec<YearlyPoint> {
    let current_age = params.current_age();
    runs.wrapped
        .checkpoints
        .iter()
        .zip(&runs.direct.checkpoints)
        .map(|(wrapped, direct)| YearlyPoint {
            year: wrapped.year,
            age: current_age + wrapped.year,
            wrapped: checkpoint_value(params, TrackKind::Wrapped, wrapped, mode),
            direct: checkpoint_value(params, TrackKind::Direct, direct, mode),
        })
        .collect()
}

/// End-of-term comparison of both tracks, with cost and tax breakdowns and
/// the gross yearly series.
pub fn compute_projection(
    params: &ContractParameters,
    funds: &[FundAllocation],
) -> ProjectionResult {
    let months = params.term_months();
    let years = params.bounded_term_years();
    let (runs, fund_weights) = run_comparison(params, funds);

    let wrapped = settle_track(&runs.wrapped, payout_context(params, years, TrackKind::Wrapped));
    let direct = settle_track(&runs.direct, payout_context(params, years, TrackKind::Direct));
    let wrapped_cost_breakdown =
        cost_breakdown(&params.wrapped_costs, months, runs.wrapped.costs.effective);

    log::debug!(
        "projection over {months} months: wrapped net {:.2}, direct net {:.2}",
        wrapped.net_balance,
        direct.net_balance
    );

    ProjectionResult {
        term_months: months,
        current_age: params.current_age(),
        payout_age: params.payout_age(),
        monthly_return: monthly_rate_from_annual(params.annual_return),
        wrapped,
        direct,
        wrapped_cost_breakdown,
        fund_weights,
        yearly: yearly_points(params, &runs, SeriesMode::Gross),
    }
}

/// Year-end values of both tracks for charting. Net values assume payout at
/// that year end. Recomputed on every call.
pub fn build_yearly_series(
    params: &ContractParameters,
    funds: &[FundAllocation],
    mode: SeriesMode,
) -> Vec<YearlyPoint> {
    let (runs, _) = run_comparison(params, funds);
    yearly_points(params, &runs, mode)
}
