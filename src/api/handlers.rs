use super::extract::{ApiJson, Caller, ExpectedVersion, StatusFilter, TicketPath, version_tag};
use super::{AppState, run_blocking};
use crate::core::{Action, Actor, NewTicket, Ticket, TicketId, TicketPatch};
use crate::error::FixhubError;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

type ApiResult = Result<Response, FixhubError>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn tagged(status: StatusCode, ticket: Ticket) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(etag) = HeaderValue::from_str(&version_tag(ticket.version)) {
        headers.insert(header::ETAG, etag);
    }
    (status, headers, Json(ticket)).into_response()
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    ApiJson(draft): ApiJson<NewTicket>,
) -> ApiResult {
    let engine = state.engine.clone();
    let ticket = run_blocking(&state, move || engine.create(&actor, draft)).await?;

    let mut response = tagged(StatusCode::CREATED, ticket.clone());
    if let Ok(location) = HeaderValue::from_str(&format!("/tickets/{}", ticket.id)) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    Ok(response)
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    TicketPath(id): TicketPath,
) -> ApiResult {
    let engine = state.engine.clone();
    let ticket = run_blocking(&state, move || engine.view(&id, &actor)).await?;
    Ok(tagged(StatusCode::OK, ticket))
}

pub async fn edit_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    TicketPath(id): TicketPath,
    ExpectedVersion(expected): ExpectedVersion,
    ApiJson(patch): ApiJson<TicketPatch>,
) -> ApiResult {
    execute(state, actor, id, Action::Edit(patch), expected).await
}

pub async fn withdraw_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    TicketPath(id): TicketPath,
    ExpectedVersion(expected): ExpectedVersion,
) -> ApiResult {
    let engine = state.engine.clone();
    let ticket = run_blocking(&state, move || {
        engine.execute(&id, &actor, &Action::Withdraw, expected)
    })
    .await?;

    let mut headers = HeaderMap::new();
    if let Ok(etag) = HeaderValue::from_str(&version_tag(ticket.version)) {
        headers.insert(header::ETAG, etag);
    }
    Ok((StatusCode::NO_CONTENT, headers).into_response())
}

pub async fn assume_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    TicketPath(id): TicketPath,
    ExpectedVersion(expected): ExpectedVersion,
) -> ApiResult {
    execute(state, actor, id, Action::Assume, expected).await
}

pub async fn renounce_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    TicketPath(id): TicketPath,
    ExpectedVersion(expected): ExpectedVersion,
) -> ApiResult {
    execute(state, actor, id, Action::Renounce, expected).await
}

pub async fn reject_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    TicketPath(id): TicketPath,
    ExpectedVersion(expected): ExpectedVersion,
    ApiJson(body): ApiJson<RejectRequest>,
) -> ApiResult {
    let action = Action::Reject {
        reason: body.reason,
    };
    execute(state, actor, id, action, expected).await
}

pub async fn resolve_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    TicketPath(id): TicketPath,
    ExpectedVersion(expected): ExpectedVersion,
    ApiJson(body): ApiJson<ResolveRequest>,
) -> ApiResult {
    let action = Action::Resolve {
        description: body.description,
    };
    execute(state, actor, id, action, expected).await
}

async fn execute(
    state: AppState,
    actor: Actor,
    id: TicketId,
    action: Action,
    expected: Option<u64>,
) -> ApiResult {
    let engine = state.engine.clone();
    let ticket = run_blocking(&state, move || engine.execute(&id, &actor, &action, expected)).await?;
    Ok(tagged(StatusCode::OK, ticket))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Caller(actor): Caller,
    StatusFilter(status): StatusFilter,
) -> Result<Json<Vec<Ticket>>, FixhubError> {
    let queries = state.queries.clone();
    let tickets = run_blocking(&state, move || queries.reported_by(&actor, status)).await?;
    Ok(Json(tickets))
}

pub async fn list_assigned(
    State(state): State<AppState>,
    Caller(actor): Caller,
    StatusFilter(status): StatusFilter,
) -> Result<Json<Vec<Ticket>>, FixhubError> {
    let queries = state.queries.clone();
    let tickets = run_blocking(&state, move || queries.assigned_to(&actor, status)).await?;
    Ok(Json(tickets))
}

pub async fn list_closed(
    State(state): State<AppState>,
    Caller(actor): Caller,
    StatusFilter(status): StatusFilter,
) -> Result<Json<Vec<Ticket>>, FixhubError> {
    let queries = state.queries.clone();
    let tickets = run_blocking(&state, move || queries.closed(&actor, status)).await?;
    Ok(Json(tickets))
}
