use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::core::RepaymentMethod;

pub const DEFAULT_LOG_FILTER: &str = "debtplan=info";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliRepaymentMethod {
    EqualPayment,
    EqualPrincipal,
    InterestFirst,
    LumpSum,
}

impl From<CliRepaymentMethod> for RepaymentMethod {
    fn from(value: CliRepaymentMethod) -> Self {
        match value {
            CliRepaymentMethod::EqualPayment => RepaymentMethod::EqualPayment,
            CliRepaymentMethod::EqualPrincipal => RepaymentMethod::EqualPrincipal,
            CliRepaymentMethod::InterestFirst => RepaymentMethod::InterestFirst,
            CliRepaymentMethod::LumpSum => RepaymentMethod::LumpSum,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "debtplan",
    about = "Household debt and cash-flow projection engine (loan payments, portfolio totals, what-ifs, 30-85 timeline)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "DEBTPLAN_LOG",
        default_value = DEFAULT_LOG_FILTER,
        help = "tracing filter directive; RUST_LOG takes precedence when set"
    )]
    pub log_filter: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the JSON HTTP API.
    Serve(ServeArgs),
    /// Print the payment breakdown of one loan.
    Payment(PaymentArgs),
    /// Print the cash-flow projection, or one age of it.
    Timeline(TimelineArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "DEBTPLAN_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    #[arg(long, env = "DEBTPLAN_PORT", default_value_t = 8080)]
    pub port: u16,
}

impl ServeArgs {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PaymentArgs {
    #[arg(long, help = "Loan principal in currency units")]
    pub principal: f64,
    #[arg(long, help = "Nominal annual rate in percent, e.g. 4.5")]
    pub rate: f64,
    #[arg(long, help = "Term in months")]
    pub months: u32,
    #[arg(long, value_enum, default_value_t = CliRepaymentMethod::EqualPayment)]
    pub method: CliRepaymentMethod,
}

#[derive(Args, Debug, Clone)]
pub struct TimelineArgs {
    #[arg(long, help = "Only print the entries for this age")]
    pub age: Option<u32>,
    #[arg(long, help = "Print the largest withdrawal years after this age instead")]
    pub withdrawals_after: Option<u32>,
    #[arg(long, default_value_t = 3)]
    pub limit: usize,
}

pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
