use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::analysis::filter::{CandidateFilter, StatusFilter};
use crate::analysis::report::ElectionReport;
use crate::analysis::{
    CandidateAnalysis, CandidateProfile, PartyPerformance, PartyStats, ProvinceAnalysis,
    RegionAnalysis, SeatAnalysis, SeatBuckets, SeatCategory,
};
use crate::config::Config;
use crate::ingest::load_years;
use crate::model::{
    CandidateId, ElectionYear, MultiYearData, PartyId, ProvinceId, RegionId, SeatAllocation,
};
use crate::trend::{analyze_trends, TrendReport};

#[derive(Clone)]
struct ApiState {
    config: Arc<Config>,
    data: Arc<MultiYearData>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct YearInfo {
    year: u16,
    label: String,
    description: String,
    seat_allocation: SeatAllocation,
    candidates: usize,
    constituencies: usize,
    current: bool,
}

#[derive(Debug, Serialize)]
struct OverviewResponse {
    year: u16,
    label: String,
    total_votes: u64,
    total_seats: usize,
    turnout_percent: Option<f64>,
    seat_counts: Vec<(SeatCategory, usize)>,
    parties: Vec<PartyStats>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatesQuery {
    q: Option<String>,
    party: Option<u32>,
    province: Option<u32>,
    region: Option<u32>,
    status: Option<String>,
    min: Option<u64>,
    max: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SeatsQuery {
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TargetsQuery {
    category: Option<String>,
    party: Option<u32>,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let data = load_years(&config, None).await?;
    info!(years = data.years.len(), "election data loaded");
    let app = router(config, data);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(config: Config, data: MultiYearData) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let state = ApiState {
        config: Arc::new(config),
        data: Arc::new(data),
    };

    Router::new()
        .route("/health", get(health))
        .route("/v1/years", get(years))
        .route("/v1/trend", get(trend))
        .route("/v1/:year", get(overview))
        .route("/v1/:year/candidates", get(candidates))
        .route("/v1/:year/candidates/:candidate_id", get(candidate))
        .route("/v1/:year/search", post(search))
        .route("/v1/:year/seats", get(seats))
        .route("/v1/:year/targets", get(targets))
        .route("/v1/:year/provinces", get(provinces))
        .route("/v1/:year/regions", get(regions))
        .route("/v1/:year/parties", get(parties))
        .route("/v1/:year/parties/:party_id", get(party))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn years(State(state): State<ApiState>) -> Json<ApiResponse<Vec<YearInfo>>> {
    let current = state.data.current().map(|y| y.year);
    let years = state
        .data
        .years
        .iter()
        .map(|y| YearInfo {
            year: y.year,
            label: y.label.clone(),
            description: y.description.clone(),
            seat_allocation: y.seat_allocation,
            candidates: y.snapshot.candidates.len(),
            constituencies: y.snapshot.constituencies.len(),
            current: Some(y.year) == current,
        })
        .collect();
    ok(years)
}

async fn overview(
    State(state): State<ApiState>,
    Path(year): Path<u16>,
) -> ApiResult<OverviewResponse> {
    let election = find_year(&state, year)?;
    let report = ElectionReport::build(election);
    Ok(ok(OverviewResponse {
        year: election.year,
        label: election.label.clone(),
        total_votes: election.snapshot.total_candidate_votes(),
        total_seats: report.seats.all.len(),
        turnout_percent: report.turnout_percent(),
        seat_counts: seat_counts(&report.seats),
        parties: report.party_stats(),
    }))
}

async fn candidates(
    State(state): State<ApiState>,
    Path(year): Path<u16>,
    Query(query): Query<CandidatesQuery>,
) -> ApiResult<Vec<CandidateAnalysis>> {
    let election = find_year(&state, year)?;
    let filter = filter_from_query(query)?;
    let report = ElectionReport::build(election);
    Ok(ok(report.search(&filter).into_iter().cloned().collect()))
}

async fn candidate(
    State(state): State<ApiState>,
    Path((year, candidate_id)): Path<(u16, u64)>,
) -> ApiResult<CandidateProfile> {
    let election = find_year(&state, year)?;
    ElectionReport::build(election)
        .candidate(CandidateId(candidate_id))
        .map(ok)
        .ok_or_else(|| {
            ApiError::not_found(format!("candidate {candidate_id} not found in {year}"))
        })
}

async fn search(
    State(state): State<ApiState>,
    Path(year): Path<u16>,
    Json(filter): Json<CandidateFilter>,
) -> ApiResult<Vec<CandidateAnalysis>> {
    let election = find_year(&state, year)?;
    let report = ElectionReport::build(election);
    Ok(ok(report.search(&filter).into_iter().cloned().collect()))
}

async fn seats(
    State(state): State<ApiState>,
    Path(year): Path<u16>,
    Query(query): Query<SeatsQuery>,
) -> ApiResult<SeatBuckets> {
    let election = find_year(&state, year)?;
    let category = parse_category(query.category.as_deref())?;
    let buckets = ElectionReport::build(election).seats;
    Ok(ok(match category {
        Some(category) => SeatBuckets::from_seats(buckets.bucket(category).to_vec()),
        None => buckets,
    }))
}

async fn targets(
    State(state): State<ApiState>,
    Path(year): Path<u16>,
    Query(query): Query<TargetsQuery>,
) -> ApiResult<Vec<SeatAnalysis>> {
    let election = find_year(&state, year)?;
    let category = parse_category(query.category.as_deref())?;
    let report = ElectionReport::build(election);
    let targets = report
        .targets(category, query.party.map(PartyId))
        .into_iter()
        .cloned()
        .collect();
    Ok(ok(targets))
}

async fn provinces(
    State(state): State<ApiState>,
    Path(year): Path<u16>,
) -> ApiResult<Vec<ProvinceAnalysis>> {
    let election = find_year(&state, year)?;
    let rule = state.config.analysis.province_competitive_rule;
    Ok(ok(ElectionReport::build(election).provinces(rule)))
}

async fn regions(
    State(state): State<ApiState>,
    Path(year): Path<u16>,
) -> ApiResult<Vec<RegionAnalysis>> {
    let election = find_year(&state, year)?;
    let rule = state.config.analysis.region_competitive_rule;
    Ok(ok(ElectionReport::build(election).regions(rule)))
}

async fn parties(State(state): State<ApiState>, Path(year): Path<u16>) -> ApiResult<Vec<PartyStats>> {
    let election = find_year(&state, year)?;
    Ok(ok(ElectionReport::build(election).party_stats()))
}

async fn party(
    State(state): State<ApiState>,
    Path((year, party_id)): Path<(u16, u32)>,
) -> ApiResult<PartyPerformance> {
    let election = find_year(&state, year)?;
    ElectionReport::build(election)
        .party(PartyId(party_id))
        .map(ok)
        .ok_or_else(|| ApiError::not_found(format!("party {party_id} not found in {year}")))
}

async fn trend(State(state): State<ApiState>) -> ApiResult<TrendReport> {
    analyze_trends(&state.data)
        .map(ok)
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn find_year(state: &ApiState, year: u16) -> std::result::Result<&ElectionYear, ApiError> {
    state
        .data
        .year(year)
        .ok_or_else(|| ApiError::not_found(format!("election year {year} is not loaded")))
}

fn seat_counts(buckets: &SeatBuckets) -> Vec<(SeatCategory, usize)> {
    SeatCategory::ALL
        .iter()
        .map(|c| (*c, buckets.bucket(*c).len()))
        .collect()
}

fn parse_category(raw: Option<&str>) -> std::result::Result<Option<SeatCategory>, ApiError> {
    raw.map(SeatCategory::from_str)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

fn filter_from_query(query: CandidatesQuery) -> std::result::Result<CandidateFilter, ApiError> {
    let mut filter = CandidateFilter {
        query: query.q,
        status: query
            .status
            .as_deref()
            .map(StatusFilter::from_str)
            .transpose()
            .map_err(|e| ApiError::bad_request(e.to_string()))?
            .unwrap_or_default(),
        ..CandidateFilter::default()
    };
    filter.parties.extend(query.party.map(PartyId));
    filter.provinces.extend(query.province.map(ProvinceId));
    filter.regions.extend(query.region.map(RegionId));
    if let Some(min) = query.min {
        filter.score_range.min = min;
    }
    if let Some(max) = query.max {
        filter.score_range.max = max;
    }
    if filter.score_range.min > filter.score_range.max {
        return Err(ApiError::bad_request("min score is above max score"));
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filter_from_query_string_fields() {
        let filter = filter_from_query(CandidatesQuery {
            q: Some("bangkok".to_string()),
            party: Some(3),
            province: Some(10),
            region: Some(2),
            status: Some("winner".to_string()),
            min: Some(100),
            ..CandidatesQuery::default()
        })
        .unwrap();
        assert!(filter.parties.contains(&PartyId(3)));
        assert!(filter.provinces.contains(&ProvinceId(10)));
        assert!(filter.regions.contains(&RegionId(2)));
        assert_eq!(filter.regions.len(), 1);
        assert_eq!(filter.status, StatusFilter::Winner);
        assert_eq!(filter.score_range.min, 100);
        assert_eq!(filter.score_range.max, u64::MAX);
    }

    #[test]
    fn rejects_bad_query_values() {
        let status = filter_from_query(CandidatesQuery {
            status: Some("elected".to_string()),
            ..CandidatesQuery::default()
        });
        assert_eq!(status.unwrap_err().status, StatusCode::BAD_REQUEST);

        let range = filter_from_query(CandidatesQuery {
            min: Some(10),
            max: Some(5),
            ..CandidatesQuery::default()
        });
        assert!(range.is_err());

        assert_eq!(parse_category(Some("lost")).unwrap(), Some(SeatCategory::TossUp));
        assert!(parse_category(Some("landslide")).is_err());
    }
}
