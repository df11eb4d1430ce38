use clap::Parser;
use serde::Serialize;

use debtplan::api::{AppState, run_http_server};
use debtplan::config::{Cli, Command, PaymentArgs, TimelineArgs, init_tracing};
use debtplan::core::{
    CashFlowTimeline, LoanCategory, LoanRecord, TimelineYear, WithdrawalYearEntry,
    default_timeline, payment_breakdown,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter);

    match cli.command {
        Command::Serve(args) => {
            if let Err(e) = run_http_server(args.socket_addr(), AppState::default()).await {
                tracing::error!("server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Payment(args) => print_json(&payment(args)),
        Command::Timeline(args) => match timeline(&args) {
            Some(output) => print_json(&output),
            None => {
                tracing::error!(age = ?args.age, "age is outside the projection horizon");
                std::process::exit(1);
            }
        },
    }
}

fn payment(args: PaymentArgs) -> debtplan::core::PaymentBreakdown {
    let loan = LoanRecord::new(LoanCategory::Mortgage)
        .with_loan_amount(args.principal)
        .with_rate(args.rate)
        .with_term_months(args.months)
        .with_method(args.method.into());
    payment_breakdown(&loan)
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum TimelineOutput {
    Full(&'static CashFlowTimeline),
    Year(TimelineYear),
    TopWithdrawals(Vec<WithdrawalYearEntry>),
}

/// `None` when the requested age lies outside the projection.
fn timeline(args: &TimelineArgs) -> Option<TimelineOutput> {
    let timeline = default_timeline();
    if let Some(after) = args.withdrawals_after {
        return Some(TimelineOutput::TopWithdrawals(
            timeline.top_withdrawal_years_after(after, args.limit),
        ));
    }
    match args.age {
        Some(age) => timeline.year(age).map(TimelineOutput::Year),
        None => Some(TimelineOutput::Full(timeline)),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("failed to serialize output: {e}");
            std::process::exit(1);
        }
    }
}
