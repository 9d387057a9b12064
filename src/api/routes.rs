use crate::model::{Activity, ActivityId, ActivityPatch, DEFAULT_DURATION_MINUTES};
use crate::report::{WeekReport, render_markdown};
use crate::roadmap::reorder::ActivityList;
use crate::roadmap::summary::RangeSummary;
use crate::roadmap::timeline::{format_clock, parse_clock};
use crate::session::actor::SessionHandle;
use crate::session::{DayView, Direction, StartChange};
use crate::store::StoreError;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use http::{HeaderValue, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

#[derive(Clone)]
pub struct ApiState {
    pub owner: String,
    pub handle: SessionHandle,
    pub summary_days: u32,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/day", get(day))
        .route("/api/v1/day/navigate", post(day_navigate))
        .route("/api/v1/activities", get(activities).post(activity_create))
        .route("/api/v1/activities/order", put(activity_order))
        .route("/api/v1/activities/move", post(activity_move))
        .route(
            "/api/v1/activities/:id",
            patch(activity_patch).delete(activity_delete),
        )
        .route("/api/v1/progress/:id/toggle", post(progress_toggle))
        .route("/api/v1/start-time", put(start_time_put))
        .route("/api/v1/summary", get(summary))
        .route("/api/v1/summary/markdown", get(summary_markdown))
        .route("/api/v1/dates", get(dates))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NavigateQuery {
    direction: Direction,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateActivityBody {
    title: String,
    duration_minutes: Option<u32>,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderBody {
    order: Vec<ActivityId>,
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
    from: usize,
    to: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StartAction {
    Adjust { delta: i32 },
    Set { time: String },
    Reset,
}

#[derive(Debug, Deserialize)]
pub struct StartTimeBody {
    date: Option<String>,
    #[serde(flatten)]
    action: StartAction,
}

#[derive(Debug, Serialize)]
pub struct TogglePayload {
    activity_id: ActivityId,
    completed: bool,
}

#[derive(Debug, Serialize)]
pub struct StartTimePayload {
    start_minutes: u32,
    start: String,
}

#[derive(Debug, Serialize)]
pub struct DatesPayload {
    dates: Vec<NaiveDate>,
}

async fn day(
    State(state): State<ApiState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<DayView>> {
    let date = parse_optional_date(query.date.as_deref())?;
    Ok(Json(state.handle.day(date).await?))
}

async fn day_navigate(
    State(state): State<ApiState>,
    Query(query): Query<NavigateQuery>,
) -> ApiResult<Json<DayView>> {
    Ok(Json(state.handle.navigate(query.direction).await?))
}

async fn activities(State(state): State<ApiState>) -> ApiResult<Json<ActivityList>> {
    Ok(Json(state.handle.snapshot().await?))
}

async fn activity_create(
    State(state): State<ApiState>,
    Json(body): Json<CreateActivityBody>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    let duration = body.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    let activity = state.handle.add(body.title, duration, body.notes).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn activity_patch(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(patch): Json<ActivityPatch>,
) -> ApiResult<Json<Activity>> {
    let id = ActivityId(id);
    state
        .handle
        .patch(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No activity with id {id}")))
}

async fn activity_delete(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let id = ActivityId(id);
    state
        .handle
        .delete(id)
        .await?
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ApiError::NotFound(format!("No activity with id {id}")))
}

async fn activity_order(
    State(state): State<ApiState>,
    Json(body): Json<OrderBody>,
) -> ApiResult<Json<ActivityList>> {
    Ok(Json(state.handle.reorder(body.order).await?))
}

async fn activity_move(
    State(state): State<ApiState>,
    Json(body): Json<MoveBody>,
) -> ApiResult<Json<ActivityList>> {
    Ok(Json(state.handle.move_item(body.from, body.to).await?))
}

async fn progress_toggle(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<TogglePayload>> {
    let id = ActivityId(id);
    let date = parse_optional_date(query.date.as_deref())?;
    let completed = state
        .handle
        .toggle(id, date)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No activity with id {id}")))?;

    Ok(Json(TogglePayload {
        activity_id: id,
        completed,
    }))
}

async fn start_time_put(
    State(state): State<ApiState>,
    Json(body): Json<StartTimeBody>,
) -> ApiResult<Json<StartTimePayload>> {
    let date = parse_optional_date(body.date.as_deref())?;
    let change = match body.action {
        StartAction::Adjust { delta } => StartChange::Adjust(delta),
        StartAction::Set { time } => StartChange::Set(parse_clock(&time).ok_or_else(|| {
            ApiError::BadRequest(format!("Invalid time format: {time}. Example: 06:00"))
        })?),
        StartAction::Reset => StartChange::Reset,
    };

    let start_minutes = state.handle.change_start(date, change).await?;
    Ok(Json(StartTimePayload {
        start_minutes,
        start: format_clock(start_minutes),
    }))
}

async fn summary(
    State(state): State<ApiState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<RangeSummary>> {
    let days = query.days.unwrap_or(state.summary_days);
    Ok(Json(state.handle.summary(days).await?))
}

async fn summary_markdown(
    State(state): State<ApiState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Response> {
    let days = query.days.unwrap_or(state.summary_days);
    let report = WeekReport::new(&state.owner, state.handle.summary(days).await?);

    let mut response = Response::new(render_markdown(&report).into_response().into_body());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/markdown; charset=utf-8"),
    );

    Ok(response)
}

async fn dates(State(state): State<ApiState>) -> ApiResult<Json<DatesPayload>> {
    Ok(Json(DatesPayload {
        dates: state.handle.history().await?,
    }))
}

fn parse_optional_date(input: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    input
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("Invalid date format: {raw}. Example: 2026-02-18"))
            })
        })
        .transpose()
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(error) => Self::BadRequest(error.to_string()),
            StoreError::NotFound(id) => Self::NotFound(format!("No activity with id {id}")),
            StoreError::Transient(message) => Self::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(message) => {
                error!(error = %message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}
