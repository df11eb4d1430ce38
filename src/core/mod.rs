mod amortization;
mod conversion;
mod error;
mod loan;
mod portfolio;
mod timeline;
mod types;

pub use amortization::{
    monthly_payment, monthly_rate, payment_breakdown, payment_for, repayment_schedule,
    total_interest, try_monthly_payment,
};
pub use conversion::{
    ConversionAssumptions, batch_prepayment, convert_to_housing_fund, prepay_loan,
    prepayment_quote,
};
pub use error::EngineError;
pub use loan::{
    LoanField, MAX_TERM_MONTHS, check_complete, is_complete, missing_fields, months_between,
    principal_amount, required_fields, term_months,
};
pub use portfolio::{aggregate, aggregate_by_category, aggregate_household, round_currency};
pub use timeline::{
    FinancingEvent, SeriesFormula, TIMELINE_END_AGE, TIMELINE_START_AGE, TIMELINE_YEARS,
    TimelineFormula, default_timeline, project, project_with,
};
pub use types::{
    BatchPrepaymentResult, CashFlowTimeline, CashFlowYearEntry, CategorySummary,
    ConversionForm, ConversionResult, FinancingYearEntry, HouseholdSummary, KeySummary,
    LoanCategory, LoanPrepaymentResult, LoanRecord, PaymentBreakdown, PortfolioSummary,
    PrepaymentQuote, PrepaymentSelection, RepaymentMethod, ScheduleRow, TimelineYear,
    WithdrawalYearEntry,
};
