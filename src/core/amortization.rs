use super::error::EngineError;
use super::loan::{annual_rate_percent, check_complete, is_complete, principal_amount, term_months};
use super::types::{LoanCategory, LoanRecord, PaymentBreakdown, RepaymentMethod, ScheduleRow};

pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    non_negative(annual_rate_percent) / 100.0 / 12.0
}

/// Periodic payment for raw loan terms. The result is always finite and
/// non-negative.
pub fn payment_for(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
    method: RepaymentMethod,
) -> f64 {
    let principal = non_negative(principal);
    let r = monthly_rate(annual_rate_percent);
    let payment = match method {
        RepaymentMethod::EqualPayment => annuity_payment(principal, r, term_months),
        RepaymentMethod::EqualPrincipal => {
            if term_months == 0 {
                0.0
            } else {
                // First period only; later payments shrink with the balance.
                principal / term_months as f64 + principal * r
            }
        }
        RepaymentMethod::InterestFirst => principal * r,
        RepaymentMethod::LumpSum => 0.0,
    };
    non_negative(payment)
}

fn annuity_payment(principal: f64, r: f64, n: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    if r <= 0.0 {
        return principal / n as f64;
    }
    let growth = (1.0 + r).powf(n as f64);
    if !growth.is_finite() {
        return principal * r;
    }
    principal * r * growth / (growth - 1.0)
}

/// Monthly figure shown for one loan. Incomplete inputs are defaulted to 0
/// rather than rejected; use [`try_monthly_payment`] to surface them.
pub fn monthly_payment(loan: &LoanRecord) -> f64 {
    if loan.category == LoanCategory::CarInstallment {
        return non_negative(loan.installment_amount.unwrap_or(0.0));
    }
    let Some(method) = loan.repayment_method else {
        return 0.0;
    };
    payment_for(
        principal_amount(loan),
        annual_rate_percent(loan),
        term_months(loan),
        method,
    )
}

pub fn try_monthly_payment(loan: &LoanRecord) -> Result<f64, EngineError> {
    check_complete(loan)?;
    Ok(monthly_payment(loan))
}

pub fn total_interest(loan: &LoanRecord) -> f64 {
    let principal = principal_amount(loan);
    let n = term_months(loan);
    if loan.category == LoanCategory::CarInstallment {
        return non_negative(monthly_payment(loan) * n as f64 - principal);
    }
    let r = monthly_rate(annual_rate_percent(loan));
    let interest = match loan.repayment_method {
        Some(RepaymentMethod::EqualPayment) => monthly_payment(loan) * n as f64 - principal,
        Some(RepaymentMethod::EqualPrincipal) => principal * r * (n as f64 + 1.0) / 2.0,
        Some(RepaymentMethod::InterestFirst | RepaymentMethod::LumpSum) => principal * r * n as f64,
        None => 0.0,
    };
    non_negative(interest)
}

pub fn payment_breakdown(loan: &LoanRecord) -> PaymentBreakdown {
    let principal = principal_amount(loan);
    let n = term_months(loan);
    let monthly = monthly_payment(loan);
    let interest_total = total_interest(loan);

    let (first_interest, first_principal, due_at_maturity) = if loan.category
        == LoanCategory::CarInstallment
    {
        let principal_part = if n == 0 { 0.0 } else { principal / n as f64 };
        (non_negative(monthly - principal_part), principal_part.min(monthly), 0.0)
    } else {
        let r = monthly_rate(annual_rate_percent(loan));
        match loan.repayment_method {
            Some(RepaymentMethod::EqualPayment | RepaymentMethod::EqualPrincipal) => {
                let interest = principal * r;
                (interest, non_negative(monthly - interest), 0.0)
            }
            Some(RepaymentMethod::InterestFirst) => (monthly, 0.0, principal),
            Some(RepaymentMethod::LumpSum) => (0.0, 0.0, principal + interest_total),
            None => (0.0, 0.0, 0.0),
        }
    };

    PaymentBreakdown {
        monthly_payment: monthly,
        first_period_interest: first_interest,
        first_period_principal: first_principal,
        due_at_maturity,
        total_interest: interest_total,
        term_months: n,
    }
}

/// Period-by-period rows over the full term. Incomplete loans have no schedule.
pub fn repayment_schedule(loan: &LoanRecord) -> Vec<ScheduleRow> {
    if !is_complete(loan) {
        return Vec::new();
    }
    let n = term_months(loan);
    let principal = principal_amount(loan);
    let mut rows = Vec::with_capacity(n as usize);
    let mut balance = principal;

    if loan.category == LoanCategory::CarInstallment {
        let installment = monthly_payment(loan);
        let principal_part = principal / n as f64;
        for period in 1..=n {
            let principal_paid = if period == n {
                balance
            } else {
                principal_part.min(balance)
            };
            balance = non_negative(balance - principal_paid);
            rows.push(ScheduleRow {
                period,
                payment: installment,
                principal: principal_paid,
                interest: non_negative(installment - principal_paid),
                remaining_balance: balance,
            });
        }
        return rows;
    }

    let Some(method) = loan.repayment_method else {
        return rows;
    };
    let r = monthly_rate(annual_rate_percent(loan));
    let level_payment = monthly_payment(loan);
    let level_principal = principal / n as f64;

    for period in 1..=n {
        let interest = balance * r;
        let last = period == n;
        let (payment, principal_paid, interest_paid) = match method {
            RepaymentMethod::EqualPayment => {
                let principal_paid = if last {
                    balance
                } else {
                    (level_payment - interest).clamp(0.0, balance)
                };
                (principal_paid + interest, principal_paid, interest)
            }
            RepaymentMethod::EqualPrincipal => {
                let principal_paid = if last {
                    balance
                } else {
                    level_principal.min(balance)
                };
                (principal_paid + interest, principal_paid, interest)
            }
            RepaymentMethod::InterestFirst => {
                let principal_paid = if last { balance } else { 0.0 };
                (principal_paid + interest, principal_paid, interest)
            }
            RepaymentMethod::LumpSum => {
                if last {
                    let accrued = principal * r * n as f64;
                    (principal + accrued, principal, accrued)
                } else {
                    (0.0, 0.0, 0.0)
                }
            }
        };
        balance = non_negative(balance - principal_paid);
        rows.push(ScheduleRow {
            period,
            payment,
            principal: principal_paid,
            interest: interest_paid,
            remaining_balance: balance,
        });
    }
    rows
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
