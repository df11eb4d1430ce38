use serde::{Deserialize, Serialize};

use super::amortization::{payment_breakdown, payment_for, total_interest};
use super::error::EngineError;
use super::loan::{check_complete, principal_amount};
use super::types::{
    BatchPrepaymentResult, ConversionForm, ConversionResult, LoanCategory, LoanPrepaymentResult,
    LoanRecord, PrepaymentQuote, PrepaymentSelection, RepaymentMethod,
};

/// Reference basis for estimating commercial payments the user never
/// entered. The estimate is an approximation, not the real schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionAssumptions {
    pub reference_annual_rate_percent: f64,
    pub reference_term_months: u32,
}

impl Default for ConversionAssumptions {
    fn default() -> Self {
        Self {
            reference_annual_rate_percent: 4.9,
            reference_term_months: 360,
        }
    }
}

pub fn convert_to_housing_fund(
    form: &ConversionForm,
    assumptions: &ConversionAssumptions,
) -> Result<ConversionResult, EngineError> {
    let source = form
        .source
        .as_ref()
        .ok_or(EngineError::MissingField("source"))?;
    let conversion_amount = form
        .conversion_amount
        .ok_or(EngineError::MissingField("conversionAmount"))?;
    let target_rate = form
        .target_annual_rate_percent
        .ok_or(EngineError::MissingField("targetAnnualRatePercent"))?;
    let target_term = form
        .target_term_months
        .filter(|months| *months > 0)
        .ok_or(EngineError::MissingField("targetTermMonths"))?;
    let target_method = form
        .target_method
        .ok_or(EngineError::MissingField("targetMethod"))?;
    let fee_rate = form.fee_rate.ok_or(EngineError::MissingField("feeRate"))?;

    check_complete(source)?;
    require_positive("conversionAmount", conversion_amount)?;
    require_rate("targetAnnualRatePercent", target_rate)?;
    require_rate("feeRate", fee_rate)?;

    let source_principal = principal_amount(source);
    if conversion_amount > source_principal {
        return Err(EngineError::ConversionExceedsPrincipal {
            amount: conversion_amount,
            principal: source_principal,
        });
    }

    let reference_rate = source
        .annual_rate_percent
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(assumptions.reference_annual_rate_percent);
    let reference_payment = |principal: f64| {
        payment_for(
            principal,
            reference_rate,
            assumptions.reference_term_months,
            RepaymentMethod::EqualPayment,
        )
    };

    let new_payment = payment_for(conversion_amount, target_rate, target_term, target_method);
    let remaining_commercial_payment = reference_payment(source_principal - conversion_amount);
    let combined_payment = new_payment + remaining_commercial_payment;
    let estimated_original_payment = reference_payment(source_principal);
    let conversion_fee = conversion_amount * fee_rate;
    let total_savings =
        (estimated_original_payment - combined_payment) * target_term as f64 - conversion_fee;

    Ok(ConversionResult {
        source_principal,
        conversion_amount,
        new_payment,
        remaining_commercial_payment,
        combined_payment,
        estimated_original_payment,
        payment_delta: combined_payment - estimated_original_payment,
        conversion_fee,
        total_savings,
    })
}

/// Fee for one early repayment. Amounts above the remaining balance are
/// rejected, never clamped.
pub fn prepayment_quote(
    remaining_principal: f64,
    prepayment_amount: f64,
    fee_rate: f64,
) -> Result<PrepaymentQuote, EngineError> {
    require_positive("remainingPrincipal", remaining_principal)?;
    require_positive("prepaymentAmount", prepayment_amount)?;
    require_rate("feeRate", fee_rate)?;
    if prepayment_amount > remaining_principal {
        return Err(EngineError::PrepaymentExceedsPrincipal {
            amount: prepayment_amount,
            remaining: remaining_principal,
        });
    }

    Ok(PrepaymentQuote {
        prepayment_amount,
        fee: prepayment_amount * fee_rate,
        remaining_after: remaining_principal - prepayment_amount,
    })
}

pub fn batch_prepayment(
    selections: &[PrepaymentSelection],
    fee_rate: f64,
) -> Result<BatchPrepaymentResult, EngineError> {
    let quotes = selections
        .iter()
        .map(|s| prepayment_quote(s.remaining_principal, s.prepayment_amount, fee_rate))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BatchPrepaymentResult {
        total_prepayment: quotes.iter().map(|q| q.prepayment_amount).sum(),
        total_fee: quotes.iter().map(|q| q.fee).sum(),
        quotes,
    })
}

/// Prepay part of one loan and keep its term: the payment shrinks and the
/// interest difference is the saving. A car installment shrinks in
/// proportion to the amount still owed.
pub fn prepay_loan(
    loan: &LoanRecord,
    prepayment_amount: f64,
    fee_rate: f64,
) -> Result<LoanPrepaymentResult, EngineError> {
    check_complete(loan)?;
    let remaining = principal_amount(loan);
    let quote = prepayment_quote(remaining, prepayment_amount, fee_rate)?;

    let mut reduced = loan.clone();
    if loan.category == LoanCategory::CarInstallment {
        let share = quote.remaining_after / remaining;
        reduced.loan_amount = Some(quote.remaining_after);
        reduced.installment_amount = loan.installment_amount.map(|i| i * share);
    } else if loan.repayment_method.is_some_and(RepaymentMethod::is_amortizing) {
        reduced.remaining_principal = Some(quote.remaining_after);
    } else {
        reduced.loan_amount = Some(quote.remaining_after);
    }

    let before = payment_breakdown(loan);
    let after = payment_breakdown(&reduced);
    let total_interest_after = if quote.remaining_after > 0.0 {
        total_interest(&reduced)
    } else {
        0.0
    };
    let monthly_payment_after = if quote.remaining_after > 0.0 {
        after.monthly_payment
    } else {
        0.0
    };
    let interest_saved = before.total_interest - total_interest_after;

    Ok(LoanPrepaymentResult {
        quote,
        monthly_payment_before: before.monthly_payment,
        monthly_payment_after,
        total_interest_before: before.total_interest,
        total_interest_after,
        interest_saved,
        net_savings: interest_saved - quote.fee,
    })
}

fn require_positive(field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidAmount { field, value })
    }
}

fn require_rate(field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidAmount { field, value })
    }
}
