use chrono::NaiveDate;

use super::error::EngineError;
use super::types::{LoanCategory, LoanRecord, RepaymentMethod};

const DAYS_PER_MONTH: f64 = 30.44;

/// Longest term the engine accepts (100 years). Longer terms make a record
/// incomplete so schedules stay bounded.
pub const MAX_TERM_MONTHS: u32 = 1200;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoanField {
    /// Stated (original) loan amount.
    LoanAmount,
    /// Remaining principal, or the original amount when no remainder was entered.
    Principal,
    AnnualRate,
    /// Duration in months, either entered or derived from the dates, at most
    /// [`MAX_TERM_MONTHS`].
    Term,
    /// End date or a duration; start date is not needed.
    Maturity,
    /// Needed only when an end date alone has to be turned into months.
    ValuationDate,
    InstallmentAmount,
    RepaymentMethod,
}

impl LoanField {
    pub fn name(self) -> &'static str {
        match self {
            LoanField::LoanAmount => "loanAmount",
            LoanField::Principal => "remainingPrincipal",
            LoanField::AnnualRate => "annualRatePercent",
            LoanField::Term => "termMonths",
            LoanField::Maturity => "endDate",
            LoanField::ValuationDate => "asOf",
            LoanField::InstallmentAmount => "installmentAmount",
            LoanField::RepaymentMethod => "repaymentMethod",
        }
    }

    pub fn is_present(self, loan: &LoanRecord) -> bool {
        match self {
            LoanField::LoanAmount => positive(loan.loan_amount).is_some(),
            LoanField::Principal => {
                positive(loan.remaining_principal).is_some() || positive(loan.loan_amount).is_some()
            }
            LoanField::AnnualRate => loan
                .annual_rate_percent
                .is_some_and(|r| r.is_finite() && r >= 0.0),
            LoanField::Term => (1..=MAX_TERM_MONTHS).contains(&term_months(loan)),
            LoanField::Maturity => {
                let months = term_months(loan);
                months <= MAX_TERM_MONTHS && (loan.end_date.is_some() || months > 0)
            }
            LoanField::ValuationDate => loan.end_date.is_none() || term_months(loan) > 0,
            LoanField::InstallmentAmount => positive(loan.installment_amount).is_some(),
            LoanField::RepaymentMethod => loan.repayment_method.is_some(),
        }
    }
}

const INSTALLMENT_FIELDS: &[LoanField] = &[
    LoanField::LoanAmount,
    LoanField::InstallmentAmount,
    LoanField::Term,
];
const AMORTIZING_FIELDS: &[LoanField] = &[
    LoanField::Principal,
    LoanField::AnnualRate,
    LoanField::Term,
];
const INTEREST_FIRST_FIELDS: &[LoanField] = &[
    LoanField::LoanAmount,
    LoanField::AnnualRate,
    LoanField::Maturity,
    LoanField::ValuationDate,
];
const LUMP_SUM_FIELDS: &[LoanField] = &[
    LoanField::LoanAmount,
    LoanField::AnnualRate,
    LoanField::Term,
];
const METHOD_ONLY: &[LoanField] = &[LoanField::RepaymentMethod];

/// The single completeness rule table.
pub fn required_fields(
    category: LoanCategory,
    method: Option<RepaymentMethod>,
) -> &'static [LoanField] {
    if category == LoanCategory::CarInstallment {
        return INSTALLMENT_FIELDS;
    }
    match method {
        Some(RepaymentMethod::EqualPayment | RepaymentMethod::EqualPrincipal) => AMORTIZING_FIELDS,
        Some(RepaymentMethod::InterestFirst) => INTEREST_FIRST_FIELDS,
        Some(RepaymentMethod::LumpSum) => LUMP_SUM_FIELDS,
        None => METHOD_ONLY,
    }
}

pub fn missing_fields(loan: &LoanRecord) -> Vec<LoanField> {
    required_fields(loan.category, loan.repayment_method)
        .iter()
        .copied()
        .filter(|field| !field.is_present(loan))
        .collect()
}

pub fn is_complete(loan: &LoanRecord) -> bool {
    required_fields(loan.category, loan.repayment_method)
        .iter()
        .all(|field| field.is_present(loan))
}

pub fn check_complete(loan: &LoanRecord) -> Result<(), EngineError> {
    match missing_fields(loan).first() {
        Some(field) => Err(EngineError::MissingField(field.name())),
        None => Ok(()),
    }
}

/// Whole months between two dates, floor of elapsed days / 30.44.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days();
    if days <= 0 {
        return 0;
    }
    (days as f64 / DAYS_PER_MONTH).floor() as u32
}

/// Term in months; the date pair wins over an entered duration, and an end
/// date alone is measured from the record's `as_of` date.
pub fn term_months(loan: &LoanRecord) -> u32 {
    if let (Some(start), Some(end)) = (loan.start_date, loan.end_date) {
        return months_between(start, end);
    }
    match (loan.term_months.filter(|m| *m > 0), loan.as_of, loan.end_date) {
        (Some(months), _, _) => months,
        (None, Some(as_of), Some(end)) => months_between(as_of, end),
        _ => 0,
    }
}

/// Principal-bearing amount: the stated loan amount for bullet-style
/// methods and installment car loans, otherwise the remaining principal
/// with the original amount as fallback.
pub fn principal_amount(loan: &LoanRecord) -> f64 {
    if loan.category == LoanCategory::CarInstallment {
        return positive(loan.loan_amount).unwrap_or(0.0);
    }
    match loan.repayment_method {
        Some(RepaymentMethod::InterestFirst | RepaymentMethod::LumpSum) => {
            positive(loan.loan_amount).unwrap_or(0.0)
        }
        _ => positive(loan.remaining_principal)
            .or_else(|| positive(loan.loan_amount))
            .unwrap_or(0.0),
    }
}

pub fn annual_rate_percent(loan: &LoanRecord) -> f64 {
    loan.annual_rate_percent
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(0.0)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}
