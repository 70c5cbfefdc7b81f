use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    errors::Result,
    handlers::AppState,
    models::{DistroUsageArgs, DistroUsageEntry, Pagination, TimeEntry, TotalEntry},
    services::query_facade::{Operation, OperationDescriptor, QueryFacade, QueryOutput},
};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub operation: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HourParams {
    pub date: String,
    pub hour: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateParams {
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DistroUsageParams {
    /// Comma-separated distro names
    pub distros: Option<String>,
    pub date: Option<String>,
    pub last_days: Option<i64>,
    pub sort_biggest: Option<bool>,
}

impl From<DistroUsageParams> for DistroUsageArgs {
    fn from(params: DistroUsageParams) -> Self {
        let distros = params
            .distros
            .filter(|list| !list.trim().is_empty())
            .map(|list| list.split(',').map(|name| name.trim().to_string()).collect());

        DistroUsageArgs {
            distros,
            date: params.date,
            last_days: params.last_days,
            sort_biggest: params.sort_biggest,
        }
    }
}

pub async fn execute_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryOutput>> {
    let label = Operation::from_name(&request.operation)
        .map(|op| op.name())
        .unwrap_or("unknown");

    let result = state.facade.execute(&request.operation, request.args).await;
    observe(&state, label, result)
}

pub async fn list_operations() -> Json<Vec<OperationDescriptor>> {
    Json(QueryFacade::catalog())
}

pub async fn get_hour(
    State(state): State<AppState>,
    Query(params): Query<HourParams>,
) -> Result<Json<TimeEntry>> {
    let result = state.facade.hour(&params.date, params.hour).await;
    observe(&state, Operation::Hour.name(), result)
}

pub async fn get_day(
    State(state): State<AppState>,
    Query(params): Query<DateParams>,
) -> Result<Json<TimeEntry>> {
    let result = state.facade.day(&params.date).await;
    observe(&state, Operation::Day.name(), result)
}

pub async fn get_month(
    State(state): State<AppState>,
    Query(params): Query<DateParams>,
) -> Result<Json<TimeEntry>> {
    let result = state.facade.month(&params.date).await;
    observe(&state, Operation::Month.name(), result)
}

pub async fn get_hours(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<TimeEntry>>> {
    let result = state.facade.hours(pagination).await;
    observe(&state, Operation::Hours.name(), result)
}

pub async fn get_days(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<TimeEntry>>> {
    let result = state.facade.days(pagination).await;
    observe(&state, Operation::Days.name(), result)
}

pub async fn get_months(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<TimeEntry>>> {
    let result = state.facade.months(pagination).await;
    observe(&state, Operation::Months.name(), result)
}

pub async fn get_total(State(state): State<AppState>) -> Result<Json<TotalEntry>> {
    let result = state.facade.total().await;
    observe(&state, Operation::Total.name(), result)
}

pub async fn get_distro_usage(
    State(state): State<AppState>,
    Query(params): Query<DistroUsageParams>,
) -> Result<Json<Vec<DistroUsageEntry>>> {
    let result = state.facade.distrousage(params.into()).await;
    observe(&state, Operation::DistroUsage.name(), result)
}

fn observe<T>(state: &AppState, operation: &str, result: Result<T>) -> Result<Json<T>> {
    match &result {
        Ok(_) => state.metrics.record_query(operation, "ok"),
        Err(e) => state.metrics.record_query(operation, e.kind()),
    }
    result.map(Json)
}
