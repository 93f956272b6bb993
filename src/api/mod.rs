use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Datelike;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    Contribution, ContractParameters, CostMode, DEFAULT_HORIZON_AGE, DecumulationParameters,
    DecumulationRow, DecumulationSummary, FundAllocation, GapParameters, MAX_AGE, MAX_TERM_YEARS,
    MigrationParameters, SeriesMode, YearlyPoint, build_yearly_series, compute_gap, compute_migration,
    compute_projection, simulate_decumulation, summarize_decumulation,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(String),

    #[error("invalid --fund '{entry}': expected name:amount:ongoing-rate[:initial-charge-rate]")]
    FundSpec { entry: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError::Invalid(msg.into())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCostMode {
    ActualCurrency,
    EffectivePercentage,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliContributionKind {
    Recurring,
    LumpSum,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliSeriesMode {
    Gross,
    Net,
}

impl From<CliSeriesMode> for SeriesMode {
    fn from(value: CliSeriesMode) -> Self {
        match value {
            CliSeriesMode::Gross => SeriesMode::Gross,
            CliSeriesMode::Net => SeriesMode::Net,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCostMode {
    #[serde(alias = "actual", alias = "actualCurrency", alias = "actual_currency")]
    ActualCurrency,
    #[serde(
        alias = "effective",
        alias = "effectivePercentage",
        alias = "effective_percentage"
    )]
    EffectivePercentage,
}

impl From<ApiCostMode> for CliCostMode {
    fn from(value: ApiCostMode) -> Self {
        match value {
            ApiCostMode::ActualCurrency => CliCostMode::ActualCurrency,
            ApiCostMode::EffectivePercentage => CliCostMode::EffectivePercentage,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiContributionKind {
    #[serde(alias = "monthly")]
    Recurring,
    #[serde(alias = "lumpSum", alias = "lump_sum", alias = "single")]
    LumpSum,
}

impl From<ApiContributionKind> for CliContributionKind {
    fn from(value: ApiContributionKind) -> Self {
        match value {
            ApiContributionKind::Recurring => CliContributionKind::Recurring,
            ApiContributionKind::LumpSum => CliContributionKind::LumpSum,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum ApiSeriesMode {
    Gross,
    Net,
}

impl From<ApiSeriesMode> for SeriesMode {
    fn from(value: ApiSeriesMode) -> Self {
        match value {
            ApiSeriesMode::Gross => SeriesMode::Gross,
            ApiSeriesMode::Net => SeriesMode::Net,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "savings-compare",
    about = "Compare an insurance-wrapped fund contract with a direct fund investment"
)]
struct Cli {
    #[arg(long, default_value_t = 25, help = "Contract term in whole years")]
    term_years: u32,
    #[arg(long, value_enum, default_value_t = CliContributionKind::Recurring)]
    contribution_kind: CliContributionKind,
    #[arg(long, default_value_t = 200.0)]
    monthly_contribution: f64,
    #[arg(long, default_value_t = 0.0, help = "Single deposit for --contribution-kind=lump-sum")]
    lump_sum: f64,
    #[arg(long, default_value_t = 6.0, help = "Expected annual return in percent, e.g. 6")]
    annual_return: f64,
    #[arg(long, default_value_t = 1985)]
    birth_year: i32,
    #[arg(long, help = "Calendar year the contract starts; defaults to the current year")]
    current_year: Option<i32>,
    #[arg(
        long,
        value_enum,
        default_value_t = CliCostMode::ActualCurrency,
        help = "How the wrapped contract states its costs"
    )]
    cost_mode: CliCostMode,
    #[arg(
        long,
        default_value_t = 2_000.0,
        help = "Acquisition cost, zillmerised over the first 60 months"
    )]
    acquisition_cost: f64,
    #[arg(long, default_value_t = 4.0, help = "Monthly administration fee")]
    admin_monthly: f64,
    #[arg(
        long,
        default_value_t = 1.5,
        help = "Effective annual cost in percent, used when --cost-mode=effective-percentage"
    )]
    effective_cost_rate: f64,
    #[arg(
        long,
        default_value_t = 0.3,
        help = "Ongoing fund cost in percent when no --fund is given"
    )]
    fund_cost_rate: f64,
    #[arg(long, default_value_t = 0.0, help = "Direct-track platform fee in percent")]
    platform_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Direct-track initial charge in percent of every contribution"
    )]
    initial_charge_rate: f64,
    #[arg(
        long,
        default_value_t = 20.0,
        help = "Personal income-tax rate in percent for the partial-income regime"
    )]
    personal_tax_rate: f64,
    #[arg(long)]
    wrapped_tax_exempt: bool,
    #[arg(long)]
    direct_tax_exempt: bool,
    #[arg(
        long = "fund",
        help = "Fund allocation as name:amount:ongoing-rate[:initial-charge-rate], repeatable"
    )]
    funds: Vec<String>,
    #[arg(long, value_enum, help = "Print the yearly series instead of the projection")]
    series: Option<CliSeriesMode>,
}

fn default_cli_for_api() -> Cli {
    Cli {
        term_years: 25,
        contribution_kind: CliContributionKind::Recurring,
        monthly_contribution: 200.0,
        lump_sum: 0.0,
        annual_return: 6.0,
        birth_year: 1985,
        current_year: None,
        cost_mode: CliCostMode::ActualCurrency,
        acquisition_cost: 2_000.0,
        admin_monthly: 4.0,
        effective_cost_rate: 1.5,
        fund_cost_rate: 0.3,
        platform_rate: 0.0,
        initial_charge_rate: 0.0,
        personal_tax_rate: 20.0,
        wrapped_tax_exempt: false,
        direct_tax_exempt: false,
        funds: Vec::new(),
        series: None,
    }
}

fn clock_year() -> i32 {
    chrono::Local::now().year()
}

fn check_percent(name: &str, value: f64) -> Result<(), ApiError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid(format!("{name} must be between 0 and 100")));
    }
    Ok(())
}

fn check_amount(name: &str, value: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{name} must be >= 0")));
    }
    Ok(())
}

fn check_return(name: &str, value: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value <= -100.0 {
        return Err(invalid(format!("{name} must be > -100")));
    }
    Ok(())
}

fn check_birth_year(birth_year: i32, current_year: i32) -> Result<(), ApiError> {
    if birth_year > current_year {
        return Err(invalid("--birth-year must be <= --current-year"));
    }
    if current_year.abs_diff(birth_year) > MAX_AGE {
        return Err(invalid(format!("--birth-year implies an age above {MAX_AGE}")));
    }
    Ok(())
}

fn check_age(name: &str, value: u32) -> Result<(), ApiError> {
    if value > MAX_AGE {
        return Err(invalid(format!("{name} must be <= {MAX_AGE}")));
    }
    Ok(())
}

fn parse_fund_spec(entry: &str) -> Result<FundAllocation, ApiError> {
    let spec_error = || ApiError::FundSpec {
        entry: entry.to_string(),
    };
    let parts = entry.split(':').map(str::trim).collect::<Vec<_>>();
    let (name, amount, ongoing, initial) = match parts.as_slice() {
        [name, amount, ongoing] => (*name, *amount, *ongoing, None),
        [name, amount, ongoing, initial] => (*name, *amount, *ongoing, Some(*initial)),
        _ => return Err(spec_error()),
    };
    if name.is_empty() {
        return Err(spec_error());
    }

    let amount = amount.parse::<f64>().map_err(|_| spec_error())?;
    let ongoing = ongoing.parse::<f64>().map_err(|_| spec_error())?;
    let initial = initial
        .map(|v| v.parse::<f64>().map_err(|_| spec_error()))
        .transpose()?;

    fund_from_percentages(name.to_string(), amount, ongoing, initial, None)
}

fn fund_from_percentages(
    name: String,
    amount: f64,
    ongoing_rate: f64,
    initial_charge_rate: Option<f64>,
    identifier: Option<String>,
) -> Result<FundAllocation, ApiError> {
    check_amount(&format!("fund '{name}' amount"), amount)?;
    check_percent(&format!("fund '{name}' ongoing rate"), ongoing_rate)?;
    if let Some(rate) = initial_charge_rate {
        check_percent(&format!("fund '{name}' initial charge"), rate)?;
    }

    Ok(FundAllocation {
        name,
        amount,
        ongoing_cost_rate: ongoing_rate / 100.0,
        initial_charge_rate: initial_charge_rate.map(|rate| rate / 100.0),
        identifier,
    })
}

fn build_contract(cli: &Cli) -> Result<ContractParameters, ApiError> {
    if cli.term_years == 0 || cli.term_years > MAX_TERM_YEARS {
        return Err(invalid(format!(
            "--term-years must be between 1 and {MAX_TERM_YEARS}"
        )));
    }

    let current_year = cli.current_year.unwrap_or_else(clock_year);
    check_birth_year(cli.birth_year, current_year)?;
    check_return("--annual-return", cli.annual_return)?;
    check_amount("--monthly-contribution", cli.monthly_contribution)?;
    check_amount("--lump-sum", cli.lump_sum)?;
    check_amount("--acquisition-cost", cli.acquisition_cost)?;
    check_amount("--admin-monthly", cli.admin_monthly)?;

    for (name, rate) in [
        ("--effective-cost-rate", cli.effective_cost_rate),
        ("--fund-cost-rate", cli.fund_cost_rate),
        ("--platform-rate", cli.platform_rate),
        ("--initial-charge-rate", cli.initial_charge_rate),
        ("--personal-tax-rate", cli.personal_tax_rate),
    ] {
        check_percent(name, rate)?;
    }

    let contribution = match cli.contribution_kind {
        CliContributionKind::Recurring => Contribution::Recurring {
            monthly: cli.monthly_contribution,
        },
        CliContributionKind::LumpSum => {
            if cli.lump_sum <= 0.0 {
                return Err(invalid(
                    "--lump-sum must be > 0 when --contribution-kind=lump-sum",
                ));
            }
            Contribution::LumpSum {
                amount: cli.lump_sum,
            }
        }
    };

    let wrapped_costs = match cli.cost_mode {
        CliCostMode::ActualCurrency => CostMode::Actual {
            acquisition_cost: cli.acquisition_cost,
            admin_monthly: cli.admin_monthly,
        },
        CliCostMode::EffectivePercentage => CostMode::Effective {
            annual_rate: cli.effective_cost_rate / 100.0,
        },
    };

    Ok(ContractParameters {
        term_years: cli.term_years,
        contribution,
        annual_return: cli.annual_return / 100.0,
        birth_year: cli.birth_year,
        current_year,
        wrapped_costs,
        fund_cost_rate: cli.fund_cost_rate / 100.0,
        direct_platform_rate: cli.platform_rate / 100.0,
        direct_initial_charge_rate: cli.initial_charge_rate / 100.0,
        personal_tax_rate: cli.personal_tax_rate / 100.0,
        wrapped_tax_exempt: cli.wrapped_tax_exempt,
        direct_tax_exempt: cli.direct_tax_exempt,
    })
}

/// Parses the process arguments, runs one projection and renders it as JSON.
pub fn run_cli() -> Result<String, ApiError> {
    let cli = Cli::parse();
    render_cli(&cli)
}

fn render_cli(cli: &Cli) -> Result<String, ApiError> {
    let params = build_contract(cli)?;
    let funds = cli
        .funds
        .iter()
        .map(|entry| parse_fund_spec(entry))
        .collect::<Result<Vec<_>, _>>()?;

    let rendered = match cli.series {
        Some(mode) => {
            serde_json::to_string_pretty(&build_yearly_series(&params, &funds, mode.into()))?
        }
        None => serde_json::to_string_pretty(&compute_projection(&params, &funds))?,
    };
    Ok(rendered)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FundPayload {
    name: Option<String>,
    amount: f64,
    ongoing_cost_rate: f64,
    initial_charge_rate: Option<f64>,
    identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    term_years: Option<u32>,
    contribution_kind: Option<ApiContributionKind>,
    monthly_contribution: Option<f64>,
    lump_sum: Option<f64>,
    annual_return: Option<f64>,
    birth_year: Option<i32>,
    current_year: Option<i32>,
    cost_mode: Option<ApiCostMode>,
    acquisition_cost: Option<f64>,
    admin_monthly: Option<f64>,
    effective_cost_rate: Option<f64>,
    fund_cost_rate: Option<f64>,
    platform_rate: Option<f64>,
    initial_charge_rate: Option<f64>,
    personal_tax_rate: Option<f64>,
    wrapped_tax_exempt: Option<bool>,
    direct_tax_exempt: Option<bool>,
    funds: Vec<FundPayload>,
    mode: Option<ApiSeriesMode>,
}

#[derive(Debug)]
struct ProjectionRequest {
    params: ContractParameters,
    funds: Vec<FundAllocation>,
    mode: SeriesMode,
}

fn projection_request_from_payload(
    payload: ProjectionPayload,
) -> Result<ProjectionRequest, ApiError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.term_years {
        cli.term_years = v;
    }
    if let Some(v) = payload.contribution_kind {
        cli.contribution_kind = v.into();
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.lump_sum {
        cli.lump_sum = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.birth_year {
        cli.birth_year = v;
    }
    if let Some(v) = payload.current_year {
        cli.current_year = Some(v);
    }
    if let Some(v) = payload.cost_mode {
        cli.cost_mode = v.into();
    }
    if let Some(v) = payload.acquisition_cost {
        cli.acquisition_cost = v;
    }
    if let Some(v) = payload.admin_monthly {
        cli.admin_monthly = v;
    }
    if let Some(v) = payload.effective_cost_rate {
        cli.effective_cost_rate = v;
    }
    if let Some(v) = payload.fund_cost_rate {
        cli.fund_cost_rate = v;
    }
    if let Some(v) = payload.platform_rate {
        cli.platform_rate = v;
    }
    if let Some(v) = payload.initial_charge_rate {
        cli.initial_charge_rate = v;
    }
    if let Some(v) = payload.personal_tax_rate {
        cli.personal_tax_rate = v;
    }
    if let Some(v) = payload.wrapped_tax_exempt {
        cli.wrapped_tax_exempt = v;
    }
    if let Some(v) = payload.direct_tax_exempt {
        cli.direct_tax_exempt = v;
    }

    let params = build_contract(&cli)?;
    let funds = payload
        .funds
        .into_iter()
        .enumerate()
        .map(|(idx, fund)| {
            fund_from_percentages(
                fund.name.unwrap_or_else(|| format!("Fund {}", idx + 1)),
                fund.amount,
                fund.ongoing_cost_rate,
                fund.initial_charge_rate,
                fund.identifier,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProjectionRequest {
        params,
        funds,
        mode: payload.mode.map(Into::into).unwrap_or(SeriesMode::Gross),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GapPayload {
    birth_year: Option<i32>,
    current_year: Option<i32>,
    retirement_age: Option<u32>,
    desired_monthly_income: Option<f64>,
    pension_monthly: Option<f64>,
    other_income_monthly: Option<f64>,
    existing_capital: Option<f64>,
    annual_return: Option<f64>,
    horizon_age: Option<u32>,
}

fn gap_params_from_payload(payload: GapPayload) -> Result<GapParameters, ApiError> {
    let current_year = payload.current_year.unwrap_or_else(clock_year);
    let birth_year = payload.birth_year.unwrap_or(1985);
    check_birth_year(birth_year, current_year)?;

    let retirement_age = payload.retirement_age.unwrap_or(67);
    let horizon_age = payload.horizon_age.unwrap_or(DEFAULT_HORIZON_AGE);
    check_age("retirementAge", retirement_age)?;
    check_age("horizonAge", horizon_age)?;
    if horizon_age <= retirement_age {
        return Err(invalid("horizonAge must be > retirementAge"));
    }

    let params = GapParameters {
        birth_year,
        current_year,
        retirement_age,
        desired_monthly_income: payload.desired_monthly_income.unwrap_or(3_000.0),
        pension_monthly: payload.pension_monthly.unwrap_or(1_800.0),
        other_income_monthly: payload.other_income_monthly.unwrap_or(0.0),
        existing_capital: payload.existing_capital.unwrap_or(0.0),
        annual_return: payload.annual_return.unwrap_or(5.0),
        horizon_age,
    };
    check_amount("desiredMonthlyIncome", params.desired_monthly_income)?;
    check_amount("pensionMonthly", params.pension_monthly)?;
    check_amount("otherIncomeMonthly", params.other_income_monthly)?;
    check_amount("existingCapital", params.existing_capital)?;
    check_return("annualReturn", params.annual_return)?;

    Ok(GapParameters {
        annual_return: params.annual_return / 100.0,
        ..params
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DecumulationPayload {
    start_capital: Option<f64>,
    annual_return: Option<f64>,
    annual_withdrawal: Option<f64>,
    start_age: Option<u32>,
    end_age: Option<u32>,
    detail_mode: Option<bool>,
    overrides: BTreeMap<u32, f64>,
}

#[derive(Debug)]
struct DecumulationRequest {
    params: DecumulationParameters,
    overrides: BTreeMap<u32, f64>,
}

fn decumulation_request_from_payload(
    payload: DecumulationPayload,
) -> Result<DecumulationRequest, ApiError> {
    let params = DecumulationParameters {
        start_capital: payload.start_capital.unwrap_or(250_000.0),
        annual_return: payload.annual_return.unwrap_or(4.0),
        annual_withdrawal: payload.annual_withdrawal.unwrap_or(12_000.0),
        start_age: payload.start_age.unwrap_or(67),
        end_age: payload.end_age.unwrap_or(DEFAULT_HORIZON_AGE),
        detail_mode: payload.detail_mode.unwrap_or(false),
    };
    check_amount("startCapital", params.start_capital)?;
    check_amount("annualWithdrawal", params.annual_withdrawal)?;
    check_return("annualReturn", params.annual_return)?;
    check_age("startAge", params.start_age)?;
    check_age("endAge", params.end_age)?;
    for (year, amount) in &payload.overrides {
        check_amount(&format!("overrides[{year}]"), *amount)?;
    }

    Ok(DecumulationRequest {
        params: DecumulationParameters {
            annual_return: params.annual_return / 100.0,
            ..params
        },
        overrides: payload.overrides,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MigrationPayload {
    birth_year: Option<i32>,
    current_year: Option<i32>,
    elapsed_years: Option<u32>,
    remaining_years: Option<u32>,
    contract_value: Option<f64>,
    paid_in: Option<f64>,
    monthly_contribution: Option<f64>,
    annual_return: Option<f64>,
    cost_mode: Option<ApiCostMode>,
    acquisition_cost: Option<f64>,
    admin_monthly: Option<f64>,
    effective_cost_rate: Option<f64>,
    surrender_fee: Option<f64>,
    fund_cost_rate: Option<f64>,
    platform_rate: Option<f64>,
    initial_charge_rate: Option<f64>,
    personal_tax_rate: Option<f64>,
    legacy_tax_exempt: Option<bool>,
}

fn migration_params_from_payload(
    payload: MigrationPayload,
) -> Result<MigrationParameters, ApiError> {
    let current_year = payload.current_year.unwrap_or_else(clock_year);
    let birth_year = payload.birth_year.unwrap_or(1975);
    check_birth_year(birth_year, current_year)?;

    let remaining_years = payload.remaining_years.unwrap_or(15);
    if remaining_years == 0 || remaining_years > MAX_TERM_YEARS {
        return Err(invalid(format!(
            "remainingYears must be between 1 and {MAX_TERM_YEARS}"
        )));
    }
    let elapsed_years = payload.elapsed_years.unwrap_or(8);
    if elapsed_years > MAX_TERM_YEARS {
        return Err(invalid(format!("elapsedYears must be <= {MAX_TERM_YEARS}")));
    }

    let acquisition_cost = payload.acquisition_cost.unwrap_or(0.0);
    let admin_monthly = payload.admin_monthly.unwrap_or(4.0);
    let effective_cost_rate = payload.effective_cost_rate.unwrap_or(1.8);
    let contract_value = payload.contract_value.unwrap_or(30_000.0);
    let paid_in = payload.paid_in.unwrap_or(24_000.0);
    let monthly_contribution = payload.monthly_contribution.unwrap_or(150.0);
    let surrender_fee = payload.surrender_fee.unwrap_or(0.0);
    let annual_return = payload.annual_return.unwrap_or(6.0);
    let fund_cost_rate = payload.fund_cost_rate.unwrap_or(0.3);
    let platform_rate = payload.platform_rate.unwrap_or(0.0);
    let initial_charge_rate = payload.initial_charge_rate.unwrap_or(0.0);
    let personal_tax_rate = payload.personal_tax_rate.unwrap_or(20.0);

    for (name, amount) in [
        ("acquisitionCost", acquisition_cost),
        ("adminMonthly", admin_monthly),
        ("contractValue", contract_value),
        ("paidIn", paid_in),
        ("monthlyContribution", monthly_contribution),
        ("surrenderFee", surrender_fee),
    ] {
        check_amount(name, amount)?;
    }
    for (name, rate) in [
        ("effectiveCostRate", effective_cost_rate),
        ("fundCostRate", fund_cost_rate),
        ("platformRate", platform_rate),
        ("initialChargeRate", initial_charge_rate),
        ("personalTaxRate", personal_tax_rate),
    ] {
        check_percent(name, rate)?;
    }
    check_return("annualReturn", annual_return)?;

    let contract_costs = match payload.cost_mode.map(CliCostMode::from) {
        Some(CliCostMode::ActualCurrency) => CostMode::Actual {
            acquisition_cost,
            admin_monthly,
        },
        Some(CliCostMode::EffectivePercentage) | None => CostMode::Effective {
            annual_rate: effective_cost_rate / 100.0,
        },
    };

    Ok(MigrationParameters {
        birth_year,
        current_year,
        elapsed_years,
        remaining_years,
        contract_value,
        paid_in,
        monthly_contribution,
        annual_return: annual_return / 100.0,
        contract_costs,
        surrender_fee,
        fund_cost_rate: fund_cost_rate / 100.0,
        direct_platform_rate: platform_rate / 100.0,
        direct_initial_charge_rate: initial_charge_rate / 100.0,
        personal_tax_rate: personal_tax_rate / 100.0,
        legacy_tax_exempt: payload.legacy_tax_exempt.unwrap_or(false),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesResponse {
    mode: ApiSeriesMode,
    points: Vec<YearlyPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecumulationResponse {
    rows: Vec<DecumulationRow>,
    summary: DecumulationSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn router() -> Router {
    Router::new()
        .route("/api/projection", post(projection_handler))
        .route("/api/series", post(series_handler))
        .route("/api/gap", post(gap_handler))
        .route("/api/decumulation", post(decumulation_handler))
        .route("/api/migration", post(migration_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("savings-compare HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/projection");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    match projection_request_from_payload(payload) {
        Ok(request) => {
            log::debug!("projection request for {} years", request.params.term_years);
            json_response(
                StatusCode::OK,
                compute_projection(&request.params, &request.funds),
            )
        }
        Err(err) => bad_request(err),
    }
}

async fn series_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    match projection_request_from_payload(payload) {
        Ok(request) => json_response(
            StatusCode::OK,
            SeriesResponse {
                mode: match request.mode {
                    SeriesMode::Gross => ApiSeriesMode::Gross,
                    SeriesMode::Net => ApiSeriesMode::Net,
                },
                points: build_yearly_series(&request.params, &request.funds, request.mode),
            },
        ),
        Err(err) => bad_request(err),
    }
}

async fn gap_handler(Json(payload): Json<GapPayload>) -> Response {
    match gap_params_from_payload(payload) {
        Ok(params) => json_response(StatusCode::OK, compute_gap(&params)),
        Err(err) => bad_request(err),
    }
}

async fn decumulation_handler(Json(payload): Json<DecumulationPayload>) -> Response {
    match decumulation_request_from_payload(payload) {
        Ok(request) => {
            let rows = simulate_decumulation(&request.params, Some(&request.overrides));
            let summary = summarize_decumulation(&request.params, &rows);
            json_response(StatusCode::OK, DecumulationResponse { rows, summary })
        }
        Err(err) => bad_request(err),
    }
}

async fn migration_handler(Json(payload): Json<MigrationPayload>) -> Response {
    match migration_params_from_payload(payload) {
        Ok(params) => json_response(StatusCode::OK, compute_migration(&params)),
        Err(err) => bad_request(err),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn bad_request(err: ApiError) -> Response {
    log::debug!("rejected request: {err}");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
