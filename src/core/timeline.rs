use std::sync::OnceLock;

use super::types::{
    CashFlowTimeline, CashFlowYearEntry, FinancingYearEntry, TimelineYear, WithdrawalYearEntry,
};

pub const TIMELINE_START_AGE: u32 = 30;
pub const TIMELINE_END_AGE: u32 = 85;
pub const TIMELINE_YEARS: usize = (TIMELINE_END_AGE - TIMELINE_START_AGE + 1) as usize;

/// Rising-then-falling envelope with a fixed age-keyed perturbation
/// `((age * k1 + k2) mod modulus - offset) * jitter_scale`. Zero outside
/// `start_age..=end_age`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesFormula {
    pub start_age: u32,
    pub peak_age: u32,
    pub end_age: u32,
    pub base: f64,
    pub amplitude: f64,
    pub k1: u64,
    pub k2: u64,
    pub modulus: u64,
    pub offset: u64,
    pub jitter_scale: f64,
}

impl SeriesFormula {
    pub fn evaluate(&self, age: u32) -> f64 {
        if age < self.start_age || age > self.end_age {
            return 0.0;
        }
        let shape = if age <= self.peak_age {
            ramp(
                age.saturating_sub(self.start_age),
                self.peak_age.saturating_sub(self.start_age),
            )
        } else {
            ramp(
                self.end_age.saturating_sub(age),
                self.end_age.saturating_sub(self.peak_age),
            )
        };
        let envelope = self.base + self.amplitude * shape;
        (envelope + self.perturbation(age)).max(0.0).round()
    }

    fn perturbation(&self, age: u32) -> f64 {
        let modulus = self.modulus.max(1);
        let step = (age as u64).wrapping_mul(self.k1).wrapping_add(self.k2) % modulus;
        (step as f64 - self.offset as f64) * self.jitter_scale
    }
}

fn ramp(position: u32, span: u32) -> f64 {
    if span == 0 {
        1.0
    } else {
        position as f64 / span as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinancingEvent {
    pub loan_age: u32,
    pub term_years: u32,
    pub total_amount: f64,
}

impl FinancingEvent {
    pub fn annual_repayment(&self) -> f64 {
        if self.term_years == 0 {
            return 0.0;
        }
        self.total_amount / self.term_years as f64
    }

    /// Repayment runs for `term_years` starting the year after the loan.
    pub fn is_repayment_year(&self, age: u32) -> bool {
        age > self.loan_age && age <= self.loan_age + self.term_years
    }
}

/// Every constant the projection depends on. The output does not read any
/// user-entered income, expense or asset figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineFormula {
    pub base_year: i32,
    pub working_surplus: SeriesFormula,
    pub retirement_deficit: SeriesFormula,
    pub disposable_wealth: SeriesFormula,
    pub required_savings: SeriesFormula,
    pub withdrawal: SeriesFormula,
    pub property_sale_age: u32,
    pub property_sale_amount: f64,
    pub financing: FinancingEvent,
}

impl Default for TimelineFormula {
    fn default() -> Self {
        Self {
            base_year: 2025,
            working_surplus: SeriesFormula {
                start_age: 30,
                peak_age: 45,
                end_age: 60,
                base: 20_000.0,
                amplitude: 100_000.0,
                k1: 37,
                k2: 11,
                modulus: 17,
                offset: 8,
                jitter_scale: 1_500.0,
            },
            retirement_deficit: SeriesFormula {
                start_age: 61,
                peak_age: 75,
                end_age: 85,
                base: 15_000.0,
                amplitude: 45_000.0,
                k1: 29,
                k2: 7,
                modulus: 13,
                offset: 6,
                jitter_scale: 1_200.0,
            },
            disposable_wealth: SeriesFormula {
                start_age: 30,
                peak_age: 62,
                end_age: 85,
                base: 250_000.0,
                amplitude: 2_800_000.0,
                k1: 41,
                k2: 3,
                modulus: 19,
                offset: 9,
                jitter_scale: 25_000.0,
            },
            required_savings: SeriesFormula {
                start_age: 30,
                peak_age: 50,
                end_age: 60,
                base: 10_000.0,
                amplitude: 60_000.0,
                k1: 23,
                k2: 5,
                modulus: 11,
                offset: 5,
                jitter_scale: 1_000.0,
            },
            withdrawal: SeriesFormula {
                start_age: 61,
                peak_age: 72,
                end_age: 85,
                base: 30_000.0,
                amplitude: 150_000.0,
                k1: 31,
                k2: 13,
                modulus: 15,
                offset: 7,
                jitter_scale: 2_000.0,
            },
            property_sale_age: 72,
            property_sale_amount: 1_500_000.0,
            financing: FinancingEvent {
                loan_age: 35,
                term_years: 20,
                total_amount: 1_200_000.0,
            },
        }
    }
}

impl TimelineFormula {
    fn year_label(&self, age: u32) -> String {
        (self.base_year + (age - TIMELINE_START_AGE) as i32).to_string()
    }

    fn surplus(&self, age: u32) -> f64 {
        self.working_surplus.evaluate(age) - self.retirement_deficit.evaluate(age)
    }

    fn withdrawal_entry(&self, age: u32) -> WithdrawalYearEntry {
        let liquid_asset = self.withdrawal.evaluate(age);
        let property_sale = (age == self.property_sale_age).then_some(self.property_sale_amount);
        WithdrawalYearEntry {
            age,
            year_label: self.year_label(age),
            amount: liquid_asset + property_sale.unwrap_or(0.0),
            liquid_asset,
            property_sale,
        }
    }

    fn financing_entry(&self, age: u32) -> FinancingYearEntry {
        let event = &self.financing;
        let is_loan_year = age == event.loan_age;
        let is_repayment_year = event.is_repayment_year(age);
        let repayment_amount = if is_repayment_year {
            event.annual_repayment()
        } else {
            0.0
        };
        FinancingYearEntry {
            age,
            year_label: self.year_label(age),
            amount: repayment_amount,
            is_loan_year,
            is_repayment_year,
            loan_amount: if is_loan_year { event.total_amount } else { 0.0 },
            repayment_amount,
        }
    }

    fn entry(&self, age: u32, amount: f64) -> CashFlowYearEntry {
        CashFlowYearEntry {
            age,
            year_label: self.year_label(age),
            amount,
        }
    }
}

pub fn project() -> CashFlowTimeline {
    project_with(&TimelineFormula::default())
}

pub fn project_with(formula: &TimelineFormula) -> CashFlowTimeline {
    let ages = TIMELINE_START_AGE..=TIMELINE_END_AGE;
    CashFlowTimeline {
        surplus: ages
            .clone()
            .map(|age| formula.entry(age, formula.surplus(age)))
            .collect(),
        disposable_wealth: ages
            .clone()
            .map(|age| formula.entry(age, formula.disposable_wealth.evaluate(age)))
            .collect(),
        required_savings: ages
            .clone()
            .map(|age| formula.entry(age, formula.required_savings.evaluate(age)))
            .collect(),
        withdrawal: ages
            .clone()
            .map(|age| formula.withdrawal_entry(age))
            .collect(),
        financing: ages.map(|age| formula.financing_entry(age)).collect(),
    }
}

/// Projection for the default formula, computed once per process.
pub fn default_timeline() -> &'static CashFlowTimeline {
    static TIMELINE: OnceLock<CashFlowTimeline> = OnceLock::new();
    TIMELINE.get_or_init(project)
}

impl CashFlowTimeline {
    fn index_of(age: u32) -> Option<usize> {
        if (TIMELINE_START_AGE..=TIMELINE_END_AGE).contains(&age) {
            Some((age - TIMELINE_START_AGE) as usize)
        } else {
            None
        }
    }

    pub fn year(&self, age: u32) -> Option<TimelineYear> {
        let idx = Self::index_of(age)?;
        let surplus = self.surplus.get(idx)?;
        Some(TimelineYear {
            age,
            year_label: surplus.year_label.clone(),
            surplus: surplus.amount,
            disposable_wealth: self.disposable_wealth.get(idx)?.amount,
            required_savings: self.required_savings.get(idx)?.amount,
            withdrawal: self.withdrawal.get(idx)?.clone(),
            financing: self.financing.get(idx)?.clone(),
        })
    }

    /// Largest withdrawals strictly after `age`, biggest first; ties go to
    /// the earlier age.
    pub fn top_withdrawal_years_after(&self, age: u32, limit: usize) -> Vec<WithdrawalYearEntry> {
        let mut years = self
            .withdrawal
            .iter()
            .filter(|entry| entry.age > age && entry.amount > 0.0)
            .cloned()
            .collect::<Vec<_>>();
        years.sort_by(|a, b| b.amount.total_cmp(&a.amount).then(a.age.cmp(&b.age)));
        years.truncate(limit);
        years
    }
}
