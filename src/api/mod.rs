mod sanitize;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{GraphData, RateConfig, project, project_from_today};

pub use sanitize::{RawField, sanitize_amount, sanitize_percent};

const DEFAULT_WITHDRAWAL_PERCENT: &str = "4";
const DEFAULT_INFLATION_PERCENT: &str = "3.5";
const DEFAULT_GROWTH_PERCENT: &str = "7.5";
const DEFAULT_INCOME_PERCENT: &str = "5";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("start date must be YYYY-MM-DD, got {value:?}")]
    InvalidStartDate {
        value: String,
        source: chrono::ParseError,
    },
    #[error("failed to encode projection: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "abound",
    about = "Projects when passive income from savings will cover monthly spend"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the projection API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run a single projection and print it.
    Project(ProjectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, default_value = "0", help = "Monthly spend, e.g. $2,500")]
    pub spend: String,
    #[arg(long, default_value = "0", help = "Monthly take-home income")]
    pub active_income: String,
    #[arg(long, default_value = "0", help = "Invested assets today")]
    pub total_assets: String,
    #[arg(
        long,
        default_value = DEFAULT_WITHDRAWAL_PERCENT,
        help = "Annual safe withdrawal rate in percent"
    )]
    pub withdrawal_rate: String,
    #[arg(
        long,
        default_value = DEFAULT_INFLATION_PERCENT,
        help = "Annual inflation in percent"
    )]
    pub inflation_rate: String,
    #[arg(
        long,
        default_value = DEFAULT_GROWTH_PERCENT,
        help = "Annual investment growth in percent"
    )]
    pub growth_rate: String,
    #[arg(
        long,
        default_value = DEFAULT_INCOME_PERCENT,
        help = "Annual pay rise in percent"
    )]
    pub income_rate: String,
    #[arg(long, help = "First projected month as YYYY-MM-DD; defaults to today")]
    pub start_date: Option<String>,
    #[arg(long, help = "Print a one-line verdict instead of the full JSON")]
    pub summary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRequest {
    pub spend: f64,
    pub active_income: f64,
    pub total_assets: f64,
    pub rates: RateConfig,
    pub start_date: Option<NaiveDate>,
}

impl ProjectionRequest {
    pub fn run(&self) -> GraphData {
        match self.start_date {
            Some(start) => project(
                self.spend,
                self.active_income,
                self.total_assets,
                &self.rates,
                start,
            ),
            None => project_from_today(
                self.spend,
                self.active_income,
                self.total_assets,
                &self.rates,
            ),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    spend: Option<RawField>,
    active_income: Option<RawField>,
    total_assets: Option<RawField>,
    withdrawal_rate: Option<RawField>,
    inflation_rate: Option<RawField>,
    growth_rate: Option<RawField>,
    income_rate: Option<RawField>,
    start_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    #[serde(flatten)]
    graph: GraphData,
    rates: RateConfig,
    retirement_date: Option<NaiveDate>,
    months_to_retirement: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn build_request(args: &ProjectArgs) -> Result<ProjectionRequest, ApiError> {
    let start_date = match args.start_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<NaiveDate>().map_err(|source| {
            ApiError::InvalidStartDate {
                value: raw.to_string(),
                source,
            }
        })?),
    };

    Ok(ProjectionRequest {
        spend: sanitize_amount(&args.spend),
        active_income: sanitize_amount(&args.active_income),
        total_assets: sanitize_amount(&args.total_assets),
        rates: RateConfig {
            withdrawal: sanitize_percent(&args.withdrawal_rate),
            inflation: sanitize_percent(&args.inflation_rate),
            growth: sanitize_percent(&args.growth_rate),
            income: sanitize_percent(&args.income_rate),
        },
        start_date,
    })
}

/// Runs the `project` subcommand and returns what should be printed.
pub fn render_projection(args: &ProjectArgs) -> Result<String, ApiError> {
    let request = build_request(args)?;
    let graph = request.run();
    if args.summary {
        return Ok(describe(&graph));
    }
    let response = build_project_response(request.rates, graph);
    Ok(serde_json::to_string_pretty(&response)?)
}

pub fn describe(graph: &GraphData) -> String {
    let start = &graph.graph_points[0];
    if graph.can_retire_now {
        return format!(
            "Passive income of ${:.2}/month already covers spend of ${:.2}/month.",
            start.passive_income, start.spend
        );
    }
    match (graph.retirement_date(), graph.months_to_retirement()) {
        (Some(date), Some(months)) => {
            let value = graph.intersection_point.map_or(0.0, |p| p.y);
            format!(
                "Passive income overtakes spend on {date} at about ${value:.2}/month, {} years and {} months after {}.",
                months / 12,
                months % 12,
                start.date
            )
        }
        (None, Some(months)) => format!(
            "Passive income overtakes spend within {months} months of {}.",
            start.date
        ),
        _ => format!(
            "Passive income does not overtake spend within {} years of {}.",
            crate::core::MAX_MONTHS / 12,
            start.date
        ),
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection API listening");
    info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let graph = request.run();
    tracing::debug!(
        points = graph.graph_points.len(),
        on_course = graph.on_course_to_retire,
        "projection served"
    );
    json_response(StatusCode::OK, build_project_response(request.rates, graph))
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
fn api_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ProjectionRequest, ApiError> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.spend {
        args.spend = v.into_raw();
    }
    if let Some(v) = payload.active_income {
        args.active_income = v.into_raw();
    }
    if let Some(v) = payload.total_assets {
        args.total_assets = v.into_raw();
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v.into_raw();
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v.into_raw();
    }
    if let Some(v) = payload.growth_rate {
        args.growth_rate = v.into_raw();
    }
    if let Some(v) = payload.income_rate {
        args.income_rate = v.into_raw();
    }
    if payload.start_date.is_some() {
        args.start_date = payload.start_date;
    }

    build_request(&args)
}

fn default_args_for_api() -> ProjectArgs {
    ProjectArgs {
        spend: "0".to_string(),
        active_income: "0".to_string(),
        total_assets: "0".to_string(),
        withdrawal_rate: DEFAULT_WITHDRAWAL_PERCENT.to_string(),
        inflation_rate: DEFAULT_INFLATION_PERCENT.to_string(),
        growth_rate: DEFAULT_GROWTH_PERCENT.to_string(),
        income_rate: DEFAULT_INCOME_PERCENT.to_string(),
        start_date: None,
        summary: false,
    }
}

fn build_project_response(rates: RateConfig, graph: GraphData) -> ProjectResponse {
    ProjectResponse {
        retirement_date: graph.retirement_date(),
        months_to_retirement: graph.months_to_retirement(),
        rates,
        graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ProjectArgs {
        let mut args = default_args_for_api();
        args.spend = "$2,500".to_string();
        args.active_income = "3500".to_string();
        args.total_assets = "20000".to_string();
        args.start_date = Some("2025-01-01".to_string());
        args
    }

    #[test]
    fn cli_defaults_match_standard_rates() {
        let cli = Cli::try_parse_from(["abound", "project", "--spend", "2500"])
            .expect("cli should parse");
        let Command::Project(args) = cli.command else {
            panic!("expected project subcommand");
        };

        let request = build_request(&args).expect("valid request");
        assert_approx(request.spend, 2500.0);
        assert_approx(request.active_income, 0.0);
        assert_approx(request.rates.withdrawal, RateConfig::STANDARD_WITHDRAWAL);
        assert_approx(request.rates.inflation, RateConfig::STANDARD_INFLATION);
        assert_approx(request.rates.growth, RateConfig::STANDARD_GROWTH);
        assert_approx(request.rates.income, RateConfig::STANDARD_INCOME);
        assert_eq!(request.start_date, None);
    }

    #[test]
    fn cli_parses_serve_port() {
        let cli = Cli::try_parse_from(["abound", "serve", "--port", "9000"])
            .expect("cli should parse");
        assert!(matches!(cli.command, Command::Serve { port: 9000 }));
    }

    #[test]
    fn api_defaults_match_standard_rates() {
        let request = api_request_from_json("{}").expect("empty payload is valid");
        assert_eq!(request.rates, RateConfig::standard());
        assert_approx(request.spend, 0.0);
    }

    #[test]
    fn build_request_sanitizes_form_values() {
        let mut args = sample_args();
        args.total_assets = "lots".to_string();
        args.growth_rate = "6%".to_string();

        let request = build_request(&args).expect("valid request");
        assert_approx(request.spend, 2500.0);
        assert_approx(request.total_assets, 0.0);
        assert_approx(request.rates.growth, 0.06);
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    #[test]
    fn build_request_rejects_malformed_start_date() {
        let mut args = sample_args();
        args.start_date = Some("01/02/2025".to_string());

        let err = build_request(&args).expect_err("must reject date");
        assert!(matches!(err, ApiError::InvalidStartDate { .. }));
        assert!(err.to_string().contains("01/02/2025"));
    }

    #[test]
    fn blank_start_date_means_today() {
        let mut args = sample_args();
        args.start_date = Some("  ".to_string());
        let request = build_request(&args).expect("valid request");
        assert_eq!(request.start_date, None);
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
            "spend": "$2,500",
            "activeIncome": 3500,
            "totalAssets": "250000",
            "withdrawalRate": 3.5,
            "inflationRate": "2",
            "growthRate": "",
            "incomeRate": null,
            "startDate": "2025-06-01"
        }"#;

        let request = api_request_from_json(json).expect("json should parse");
        assert_approx(request.spend, 2500.0);
        assert_approx(request.active_income, 3500.0);
        assert_approx(request.total_assets, 250_000.0);
        assert_approx(request.rates.withdrawal, 0.035);
        assert_approx(request.rates.inflation, 0.02);
        assert_approx(request.rates.growth, 0.0);
        assert_approx(request.rates.income, RateConfig::STANDARD_INCOME);
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2025, 6, 1));
    }

    #[test]
    fn api_request_from_query_string_parses_web_keys() {
        let uri: Uri = "http://localhost/api/project?spend=%242%2C500&totalAssets=900000&growthRate=6&startDate=2025-06-01"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<ProjectPayload>::try_from_uri(&uri).expect("query parses");

        let request = api_request_from_payload(payload).expect("valid request");
        assert_approx(request.spend, 2500.0);
        assert_approx(request.total_assets, 900_000.0);
        assert_approx(request.rates.growth, 0.06);
        assert_approx(request.rates.withdrawal, RateConfig::STANDARD_WITHDRAWAL);
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let request = build_request(&sample_args()).expect("valid request");
        let response = build_project_response(request.rates, request.run());

        let json = serde_json::to_string(&response).expect("response should serialize");
        for key in [
            "\"graphPoints\"",
            "\"onCourseToRetire\"",
            "\"canRetireNow\"",
            "\"intersectionPoint\"",
            "\"activeIncome\"",
            "\"totalAssets\"",
            "\"passiveIncome\"",
            "\"retirementDate\"",
            "\"monthsToRetirement\"",
            "\"withdrawal\"",
        ] {
            assert!(json.contains(key), "missing {key} in response");
        }
        assert!(json.contains("\"date\":\"2025-01-01\""));
    }

    #[test]
    fn describe_covers_each_outcome() {
        let mut args = sample_args();

        args.total_assets = "1000000".to_string();
        let retired = build_request(&args).expect("valid request").run();
        assert!(describe(&retired).contains("already covers"));

        args.total_assets = "20000".to_string();
        let on_course = build_request(&args).expect("valid request").run();
        assert!(on_course.on_course_to_retire);
        assert!(describe(&on_course).contains("overtakes spend on"));

        args.spend = "10000".to_string();
        args.active_income = "0".to_string();
        args.total_assets = "0".to_string();
        let hopeless = build_request(&args).expect("valid request").run();
        assert!(describe(&hopeless).contains("does not overtake spend within 100 years"));
    }

    #[test]
    fn render_projection_prints_json_or_summary() {
        let mut args = sample_args();
        let json = render_projection(&args).expect("renders");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["canRetireNow"], serde_json::Value::Bool(false));
        assert_eq!(value["graphPoints"][0]["date"], "2025-01-01");

        args.summary = true;
        let summary = render_projection(&args).expect("renders");
        assert!(summary.starts_with("Passive income"));
    }

    #[tokio::test]
    async fn handler_rejects_bad_start_date_with_bad_request() {
        let payload = ProjectPayload {
            start_date: Some("tomorrow".to_string()),
            ..ProjectPayload::default()
        };
        let response = project_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
    }

    #[tokio::test]
    async fn handler_returns_projection() {
        let payload = ProjectPayload {
            spend: Some(RawField::Number(2500.0)),
            active_income: Some(RawField::Text("3500".to_string())),
            total_assets: Some(RawField::Number(250_000.0)),
            start_date: Some("2025-01-01".to_string()),
            ..ProjectPayload::default()
        };
        let response = project_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
