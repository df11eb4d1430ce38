use tracing::debug;

use super::amortization::monthly_payment;
use super::loan::{is_complete, missing_fields, principal_amount, term_months};
use super::types::{
    CategorySummary, HouseholdSummary, KeySummary, LoanCategory, LoanRecord, PortfolioSummary,
};

/// Totals over the complete loans of a list. Incomplete records are
/// dropped here on purpose and never reported as errors.
pub fn aggregate(loans: &[LoanRecord]) -> PortfolioSummary {
    let mut summary = PortfolioSummary::default();
    for loan in loans {
        if !is_complete(loan) {
            debug!(
                loan_id = %loan.id,
                category = ?loan.category,
                missing = ?missing_fields(loan),
                "excluding incomplete loan from aggregate"
            );
            continue;
        }
        summary.count += 1;
        summary.total_principal += principal_amount(loan);
        summary.total_monthly_payment += monthly_payment(loan);
        summary.max_remaining_months = summary.max_remaining_months.max(term_months(loan));
    }
    summary
}

/// One summary per category that has at least one loan in the list, in
/// [`LoanCategory::ALL`] order.
pub fn aggregate_by_category(loans: &[LoanRecord]) -> Vec<CategorySummary> {
    LoanCategory::ALL
        .iter()
        .filter_map(|&category| {
            let subset = loans
                .iter()
                .filter(|loan| loan.category == category)
                .cloned()
                .collect::<Vec<_>>();
            if subset.is_empty() {
                return None;
            }
            Some(CategorySummary {
                category,
                summary: aggregate(&subset),
            })
        })
        .collect()
}

pub fn aggregate_household<'a, I>(lists: I) -> HouseholdSummary
where
    I: IntoIterator<Item = (&'a str, &'a [LoanRecord])>,
{
    let mut household = HouseholdSummary::default();
    for (key, loans) in lists {
        let summary = aggregate(loans);
        household.total = merge(household.total, summary);
        household.by_key.push(KeySummary {
            key: key.to_string(),
            summary,
        });
    }
    household
}

fn merge(a: PortfolioSummary, b: PortfolioSummary) -> PortfolioSummary {
    PortfolioSummary {
        count: a.count + b.count,
        total_principal: a.total_principal + b.total_principal,
        total_monthly_payment: a.total_monthly_payment + b.total_monthly_payment,
        max_remaining_months: a.max_remaining_months.max(b.max_remaining_months),
    }
}

/// Display rounding. Sums are kept unrounded until this point.
pub fn round_currency(value: f64, digits: i32) -> f64 {
    let factor = 10_f64.powi(digits);
    (value * factor).round() / factor
}
