use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanCategory {
    Mortgage,
    #[serde(alias = "carInstallment", alias = "car_installment")]
    CarInstallment,
    #[serde(alias = "carBankLoan", alias = "car_bank_loan")]
    CarBankLoan,
    Consumer,
    Business,
    Private,
    #[serde(alias = "creditCard", alias = "credit_card")]
    CreditCard,
}

impl LoanCategory {
    pub const ALL: [LoanCategory; 7] = [
        LoanCategory::Mortgage,
        LoanCategory::CarInstallment,
        LoanCategory::CarBankLoan,
        LoanCategory::Consumer,
        LoanCategory::Business,
        LoanCategory::Private,
        LoanCategory::CreditCard,
    ];

    /// Persistence key the owning form stores this category's list under.
    /// Both car variants share one list.
    pub fn storage_key(self) -> &'static str {
        match self {
            LoanCategory::Mortgage => "mortgage-loans",
            LoanCategory::CarInstallment | LoanCategory::CarBankLoan => "car-loans",
            LoanCategory::Consumer => "consumer-loans",
            LoanCategory::Business => "business-loans",
            LoanCategory::Private => "private-loans",
            LoanCategory::CreditCard => "credit-card-loans",
        }
    }

    pub fn is_known_storage_key(key: &str) -> bool {
        Self::ALL.iter().any(|c| c.storage_key() == key)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepaymentMethod {
    #[serde(alias = "equalPayment", alias = "equal_payment")]
    EqualPayment,
    #[serde(alias = "equalPrincipal", alias = "equal_principal")]
    EqualPrincipal,
    #[serde(alias = "interestFirst", alias = "interest_first")]
    InterestFirst,
    #[serde(alias = "lumpSum", alias = "lump_sum")]
    LumpSum,
}

impl RepaymentMethod {
    pub fn is_amortizing(self) -> bool {
        matches!(
            self,
            RepaymentMethod::EqualPayment | RepaymentMethod::EqualPrincipal
        )
    }
}

/// One debt instrument as entered in a loan form. Every user-entered field
/// is optional; completeness is decided by the engine, not the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub category: LoanCategory,
    pub name: Option<String>,
    pub loan_amount: Option<f64>,
    pub remaining_principal: Option<f64>,
    pub annual_rate_percent: Option<f64>,
    pub term_months: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub repayment_method: Option<RepaymentMethod>,
    pub installment_amount: Option<f64>,
    /// Valuation date the remaining term is measured from when only an end
    /// date is known. Supplied by the caller; the engine never reads a clock.
    pub as_of: Option<NaiveDate>,
}

impl LoanRecord {
    pub fn new(category: LoanCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            name: None,
            loan_amount: None,
            remaining_principal: None,
            annual_rate_percent: None,
            term_months: None,
            start_date: None,
            end_date: None,
            repayment_method: None,
            installment_amount: None,
            as_of: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_loan_amount(mut self, amount: f64) -> Self {
        self.loan_amount = Some(amount);
        self
    }

    pub fn with_remaining_principal(mut self, amount: f64) -> Self {
        self.remaining_principal = Some(amount);
        self
    }

    pub fn with_rate(mut self, annual_rate_percent: f64) -> Self {
        self.annual_rate_percent = Some(annual_rate_percent);
        self
    }

    pub fn with_term_months(mut self, months: u32) -> Self {
        self.term_months = Some(months);
        self
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_method(mut self, method: RepaymentMethod) -> Self {
        self.repayment_method = Some(method);
        self
    }

    pub fn with_installment(mut self, amount: f64) -> Self {
        self.installment_amount = Some(amount);
        self
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    pub monthly_payment: f64,
    pub first_period_interest: f64,
    pub first_period_principal: f64,
    pub due_at_maturity: f64,
    pub total_interest: f64,
    pub term_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    pub period: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub count: usize,
    pub total_principal: f64,
    pub total_monthly_payment: f64,
    pub max_remaining_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: LoanCategory,
    pub summary: PortfolioSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySummary {
    pub key: String,
    pub summary: PortfolioSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdSummary {
    pub total: PortfolioSummary,
    pub by_key: Vec<KeySummary>,
}

/// Inputs of the commercial-to-housing-fund what-if, exactly as the form
/// holds them. Fee rate is a fraction (0.01 is 1%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionForm {
    pub source: Option<LoanRecord>,
    pub conversion_amount: Option<f64>,
    pub target_annual_rate_percent: Option<f64>,
    pub target_term_months: Option<u32>,
    pub target_method: Option<RepaymentMethod>,
    pub fee_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub source_principal: f64,
    pub conversion_amount: f64,
    pub new_payment: f64,
    pub remaining_commercial_payment: f64,
    pub combined_payment: f64,
    pub estimated_original_payment: f64,
    pub payment_delta: f64,
    pub conversion_fee: f64,
    pub total_savings: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepaymentQuote {
    pub prepayment_amount: f64,
    pub fee: f64,
    pub remaining_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepaymentSelection {
    pub loan_id: Option<Uuid>,
    pub remaining_principal: f64,
    pub prepayment_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPrepaymentResult {
    pub total_prepayment: f64,
    pub total_fee: f64,
    pub quotes: Vec<PrepaymentQuote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPrepaymentResult {
    pub quote: PrepaymentQuote,
    pub monthly_payment_before: f64,
    pub monthly_payment_after: f64,
    pub total_interest_before: f64,
    pub total_interest_after: f64,
    pub interest_saved: f64,
    pub net_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowYearEntry {
    pub age: u32,
    pub year_label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalYearEntry {
    pub age: u32,
    pub year_label: String,
    pub amount: f64,
    pub liquid_asset: f64,
    pub property_sale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingYearEntry {
    pub age: u32,
    pub year_label: String,
    pub amount: f64,
    pub is_loan_year: bool,
    pub is_repayment_year: bool,
    pub loan_amount: f64,
    pub repayment_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowTimeline {
    pub surplus: Vec<CashFlowYearEntry>,
    pub disposable_wealth: Vec<CashFlowYearEntry>,
    pub required_savings: Vec<CashFlowYearEntry>,
    pub withdrawal: Vec<WithdrawalYearEntry>,
    pub financing: Vec<FinancingYearEntry>,
}

/// Every series at a single age, for drill-down views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineYear {
    pub age: u32,
    pub year_label: String,
    pub surplus: f64,
    pub disposable_wealth: f64,
    pub required_savings: f64,
    pub withdrawal: WithdrawalYearEntry,
    pub financing: FinancingYearEntry,
}
