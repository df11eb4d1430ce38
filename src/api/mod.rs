use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{
    CategorySummary, ConversionAssumptions, ConversionForm, EngineError, LoanCategory,
    LoanRecord, PaymentBreakdown, PortfolioSummary, PrepaymentSelection, ScheduleRow, aggregate,
    aggregate_by_category, aggregate_household, batch_prepayment, convert_to_housing_fund,
    default_timeline, missing_fields, payment_breakdown, prepay_loan, prepayment_quote,
    repayment_schedule,
};
use crate::store::{InMemoryLoanStore, LoanStore};

const DEFAULT_TOP_WITHDRAWALS: usize = 3;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn LoanStore>,
    assumptions: ConversionAssumptions,
}

impl AppState {
    pub fn new(store: Arc<dyn LoanStore>, assumptions: ConversionAssumptions) -> Self {
        Self { store, assumptions }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            Arc::new(InMemoryLoanStore::new()),
            ConversionAssumptions::default(),
        )
    }
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("unknown loan list key: {0}")]
    UnknownKey(String),
    #[error("age {0} is outside the projection horizon")]
    AgeOutOfRange(u32),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Engine(e) => {
                warn!(error = %e, "rejected calculation request");
                StatusCode::BAD_REQUEST
            }
            ApiError::UnknownKey(_) | ApiError::AgeOutOfRange(_) => StatusCode::NOT_FOUND,
        };
        error_response(status, &self.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PrepaymentPayload {
    remaining_principal: Option<f64>,
    prepayment_amount: Option<f64>,
    fee_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoanPrepaymentPayload {
    loan: Option<LoanRecord>,
    prepayment_amount: Option<f64>,
    fee_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BatchPrepaymentPayload {
    selections: Vec<PrepaymentSelection>,
    fee_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WithdrawalQuery {
    after: Option<u32>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentResponse {
    loan_id: Uuid,
    complete: bool,
    missing_fields: Vec<&'static str>,
    breakdown: PaymentBreakdown,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    loan_id: Uuid,
    rows: Vec<ScheduleRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioResponse {
    summary: PortfolioSummary,
    by_category: Vec<CategorySummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoansResponse {
    key: String,
    loans: Vec<LoanRecord>,
    summary: PortfolioSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/payment", post(payment_handler))
        .route("/api/schedule", post(schedule_handler))
        .route("/api/portfolio", post(portfolio_handler))
        .route(
            "/api/loans/:key",
            get(loans_get_handler).put(loans_put_handler),
        )
        .route("/api/household", get(household_handler))
        .route("/api/conversion", post(conversion_handler))
        .route("/api/prepayment", post(prepayment_handler))
        .route("/api/prepayment/loan", post(loan_prepayment_handler))
        .route("/api/prepayment/batch", post(batch_prepayment_handler))
        .route("/api/timeline", get(timeline_handler))
        .route("/api/timeline/:age", get(timeline_year_handler))
        .route("/api/withdrawals/top", get(top_withdrawals_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("debt planning API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn payment_handler(Json(loan): Json<LoanRecord>) -> Response {
    let missing = missing_fields(&loan);
    json_response(
        StatusCode::OK,
        PaymentResponse {
            loan_id: loan.id,
            complete: missing.is_empty(),
            missing_fields: missing.iter().map(|f| f.name()).collect(),
            breakdown: payment_breakdown(&loan),
        },
    )
}

async fn schedule_handler(Json(loan): Json<LoanRecord>) -> Response {
    json_response(
        StatusCode::OK,
        ScheduleResponse {
            loan_id: loan.id,
            rows: repayment_schedule(&loan),
        },
    )
}

async fn portfolio_handler(Json(loans): Json<Vec<LoanRecord>>) -> Response {
    json_response(StatusCode::OK, portfolio_response(&loans))
}

fn portfolio_response(loans: &[LoanRecord]) -> PortfolioResponse {
    PortfolioResponse {
        summary: aggregate(loans),
        by_category: aggregate_by_category(loans),
    }
}

async fn loans_get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let key = known_key(key)?;
    let loans = state.store.load(&key);
    let summary = aggregate(&loans);
    Ok(json_response(
        StatusCode::OK,
        LoansResponse { key, loans, summary },
    ))
}

async fn loans_put_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(loans): Json<Vec<LoanRecord>>,
) -> Result<Response, ApiError> {
    let key = known_key(key)?;
    let summary = aggregate(&loans);
    state.store.save(&key, loans.clone());
    Ok(json_response(
        StatusCode::OK,
        LoansResponse { key, loans, summary },
    ))
}

fn known_key(key: String) -> Result<String, ApiError> {
    if LoanCategory::is_known_storage_key(&key) {
        Ok(key)
    } else {
        Err(ApiError::UnknownKey(key))
    }
}

async fn household_handler(State(state): State<AppState>) -> Response {
    let lists = state.store.snapshot();
    let household = aggregate_household(
        lists
            .iter()
            .map(|(key, loans)| (key.as_str(), loans.as_slice())),
    );
    json_response(StatusCode::OK, household)
}

async fn conversion_handler(
    State(state): State<AppState>,
    Json(form): Json<ConversionForm>,
) -> Result<Response, ApiError> {
    let result = convert_to_housing_fund(&form, &state.assumptions)?;
    Ok(json_response(StatusCode::OK, result))
}

async fn prepayment_handler(Json(payload): Json<PrepaymentPayload>) -> Result<Response, ApiError> {
    let remaining = payload
        .remaining_principal
        .ok_or(EngineError::MissingField("remainingPrincipal"))?;
    let amount = payload
        .prepayment_amount
        .ok_or(EngineError::MissingField("prepaymentAmount"))?;
    let fee_rate = payload.fee_rate.unwrap_or(0.0);
    let quote = prepayment_quote(remaining, amount, fee_rate)?;
    Ok(json_response(StatusCode::OK, quote))
}

async fn loan_prepayment_handler(
    Json(payload): Json<LoanPrepaymentPayload>,
) -> Result<Response, ApiError> {
    let loan = payload.loan.ok_or(EngineError::MissingField("loan"))?;
    let amount = payload
        .prepayment_amount
        .ok_or(EngineError::MissingField("prepaymentAmount"))?;
    let result = prepay_loan(&loan, amount, payload.fee_rate.unwrap_or(0.0))?;
    Ok(json_response(StatusCode::OK, result))
}

async fn batch_prepayment_handler(
    Json(payload): Json<BatchPrepaymentPayload>,
) -> Result<Response, ApiError> {
    let result = batch_prepayment(&payload.selections, payload.fee_rate.unwrap_or(0.0))?;
    Ok(json_response(StatusCode::OK, result))
}

async fn timeline_handler() -> Response {
    json_response(StatusCode::OK, default_timeline())
}

async fn timeline_year_handler(Path(age): Path<u32>) -> Result<Response, ApiError> {
    let year = default_timeline()
        .year(age)
        .ok_or(ApiError::AgeOutOfRange(age))?;
    Ok(json_response(StatusCode::OK, year))
}

async fn top_withdrawals_handler(Query(query): Query<WithdrawalQuery>) -> Response {
    let after = query.after.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_TOP_WITHDRAWALS);
    json_response(
        StatusCode::OK,
        default_timeline().top_withdrawal_years_after(after, limit),
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .expect("valid request");
        let response = app.oneshot(request).await.expect("router responds");
        let status = response.status();
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, json)
    }

    fn app() -> Router {
        router(AppState::default())
    }

    #[tokio::test]
    async fn payment_endpoint_parses_web_keys() {
        let body = r#"{
          "category": "mortgage",
          "remainingPrincipal": 2000000,
          "annualRatePercent": 4.5,
          "termMonths": 360,
          "repaymentMethod": "equalPayment"
        }"#;
        let (status, json) = send(app(), "POST", "/api/payment", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["complete"], true);
        let payment = json["breakdown"]["monthlyPayment"].as_f64().expect("number");
        assert!((payment - 10_133.0).abs() <= 1.0);
        assert!(json["loanId"].is_string());
    }

    #[tokio::test]
    async fn payment_endpoint_reports_missing_fields() {
        let body = r#"{ "category": "private", "loanAmount": 1000, "repaymentMethod": "lump-sum" }"#;
        let (status, json) = send(app(), "POST", "/api/payment", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["complete"], false);
        assert_eq!(
            json["missingFields"],
            serde_json::json!(["annualRatePercent", "termMonths"])
        );
    }

    #[tokio::test]
    async fn portfolio_endpoint_skips_incomplete_loans() {
        let body = r#"[
          { "category": "private", "loanAmount": 100000, "annualRatePercent": 8,
            "termMonths": 12, "repaymentMethod": "interest-first" },
          { "category": "consumer", "loanAmount": 5000, "termMonths": 12,
            "repaymentMethod": "equal-payment" }
        ]"#;
        let (status, json) = send(app(), "POST", "/api/portfolio", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"]["count"], 1);
        assert_approx(
            json["summary"]["totalPrincipal"].as_f64().expect("number"),
            100_000.0,
        );
        assert_eq!(json["byCategory"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn stored_loans_feed_household_summary() {
        let app = app();
        let body = r#"[
          { "category": "mortgage", "loanAmount": 240000, "annualRatePercent": 0,
            "termMonths": 240, "repaymentMethod": "equal-payment" }
        ]"#;
        let (status, json) = send(app.clone(), "PUT", "/api/loans/mortgage-loans", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"]["count"], 1);

        let (status, json) = send(app.clone(), "GET", "/api/loans/mortgage-loans", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["loans"].as_array().map(Vec::len), Some(1));

        let (status, json) = send(app.clone(), "GET", "/api/household", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(
            json["total"]["totalMonthlyPayment"].as_f64().expect("number"),
            1_000.0,
        );

        let (status, _) = send(app, "GET", "/api/loans/not-a-key", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn prepayment_endpoint_rejects_excess_amount() {
        let body = r#"{ "remainingPrincipal": 1000, "prepaymentAmount": 1000.5, "feeRate": 0.01 }"#;
        let (status, json) = send(app(), "POST", "/api/prepayment", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["error"]
                .as_str()
                .expect("message")
                .contains("exceeds remaining principal")
        );

        let body = r#"{ "remainingPrincipal": 1000, "prepaymentAmount": 1000, "feeRate": 0.01 }"#;
        let (status, json) = send(app(), "POST", "/api/prepayment", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(json["fee"].as_f64().expect("number"), 10.0);
    }

    #[tokio::test]
    async fn schedule_endpoint_returns_one_row_per_month() {
        let body = r#"{ "category": "consumer", "loanAmount": 12000, "annualRatePercent": 0,
                        "termMonths": 12, "repaymentMethod": "equal-principal" }"#;
        let (status, json) = send(app(), "POST", "/api/schedule", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let rows = json["rows"].as_array().expect("rows");
        assert_eq!(rows.len(), 12);
        assert_approx(rows[0]["payment"].as_f64().expect("number"), 1_000.0);
        assert_approx(rows[11]["remainingBalance"].as_f64().expect("number"), 0.0);

        let body = r#"{ "category": "consumer", "loanAmount": 12000, "annualRatePercent": 0,
                        "termMonths": 4294967295, "repaymentMethod": "equal-principal" }"#;
        let (status, json) = send(app(), "POST", "/api/schedule", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rows"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn loan_prepayment_endpoint_reports_interest_saved() {
        let body = r#"{
          "loan": { "category": "private", "loanAmount": 100000, "annualRatePercent": 12,
                    "termMonths": 12, "repaymentMethod": "interest-first" },
          "prepaymentAmount": 40000
        }"#;
        let (status, json) = send(app(), "POST", "/api/prepayment/loan", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(json["monthlyPaymentBefore"].as_f64().expect("number"), 1_000.0);
        assert_approx(json["monthlyPaymentAfter"].as_f64().expect("number"), 600.0);
        assert_approx(json["interestSaved"].as_f64().expect("number"), 4_800.0);

        let (status, json) = send(app(), "POST", "/api/prepayment/loan", Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "required field missing: loan");
    }

    #[tokio::test]
    async fn batch_prepayment_endpoint_sums_selections() {
        let body = r#"{
          "feeRate": 0.01,
          "selections": [
            { "remainingPrincipal": 50000, "prepaymentAmount": 10000 },
            { "remainingPrincipal": 80000, "prepaymentAmount": 30000 }
          ]
        }"#;
        let (status, json) = send(app(), "POST", "/api/prepayment/batch", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(json["totalPrepayment"].as_f64().expect("number"), 40_000.0);
        assert_approx(json["totalFee"].as_f64().expect("number"), 400.0);
    }

    #[tokio::test]
    async fn conversion_endpoint_requires_complete_form() {
        let body = r#"{ "conversionAmount": 300000 }"#;
        let (status, json) = send(app(), "POST", "/api/conversion", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "required field missing: source");

        let body = r#"{
          "source": { "category": "mortgage", "remainingPrincipal": 900000,
                      "annualRatePercent": 4.9, "termMonths": 300,
                      "repaymentMethod": "equal-payment" },
          "conversionAmount": 300000,
          "targetAnnualRatePercent": 3.1,
          "targetTermMonths": 300,
          "targetMethod": "equal-payment",
          "feeRate": 0
        }"#;
        let (status, json) = send(app(), "POST", "/api/conversion", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["paymentDelta"].as_f64().expect("number") < 0.0);
    }

    #[tokio::test]
    async fn timeline_endpoints_serve_fixed_horizon() {
        let (status, json) = send(app(), "GET", "/api/timeline", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["surplus"].as_array().map(Vec::len), Some(56));
        assert!(json["disposableWealth"].is_array());

        let (status, json) = send(app(), "GET", "/api/timeline/72", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(
            json["withdrawal"]["propertySale"].as_f64().expect("number"),
            1_500_000.0,
        );

        let (status, _) = send(app(), "GET", "/api/timeline/90", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(app(), "GET", "/api/withdrawals/top?after=65&limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["age"], 72);
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let (status, json) = send(app(), "GET", "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Not found");
    }

    #[test]
    fn outputs_round_trip_through_json() {
        let timeline = default_timeline();
        let json = serde_json::to_string(timeline).expect("serialize");
        let back: crate::core::CashFlowTimeline = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(&back, timeline);

        let response = portfolio_response(&[]);
        let json = serde_json::to_string(&response).expect("serialize");
        assert!(json.contains("\"totalMonthlyPayment\":0.0"));
        assert!(json.contains("\"maxRemainingMonths\":0"));
    }
}
