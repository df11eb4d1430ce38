use thiserror::Error;

/// Explicit rejections from the what-if and validating calculators.
/// Incomplete loans inside an aggregate are filtered, not reported here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("required field missing: {0}")]
    MissingField(&'static str),

    #[error("{field} must be a positive, finite amount (got {value})")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("prepayment amount {amount} exceeds remaining principal {remaining}")]
    PrepaymentExceedsPrincipal { amount: f64, remaining: f64 },

    #[error("conversion amount {amount} exceeds source principal {principal}")]
    ConversionExceedsPrincipal { amount: f64, principal: f64 },
}
