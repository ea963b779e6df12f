//! Request extractors that fail with [`FixhubError`]

use super::AppState;
use crate::core::{Actor, Status, TicketId};
use crate::error::FixhubError;
use async_trait::async_trait;
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::{AUTHORIZATION, IF_MATCH};
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = FixhubError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        state.identity.authenticate(header).map(Self)
    }
}

/// JSON body; malformed, unknown or missing fields become `InvalidInput`
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = FixhubError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(FixhubError::invalid_input(rejection.body_text())),
        }
    }
}

/// Ticket id from the `:id` path segment
#[derive(Debug, Clone)]
pub struct TicketPath(pub TicketId);

#[async_trait]
impl<S> FromRequestParts<S> for TicketPath
where
    S: Send + Sync,
{
    type Rejection = FixhubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| FixhubError::invalid_input(rejection.body_text()))?;
        TicketId::parse_str(&raw).map(Self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusParams {
    status: Option<String>,
}

/// Optional `?status=` listing filter
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusFilter(pub Option<Status>);

#[async_trait]
impl<S> FromRequestParts<S> for StatusFilter
where
    S: Send + Sync,
{
    type Rejection = FixhubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<StatusParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| FixhubError::invalid_input(rejection.body_text()))?;
        params
            .status
            .map(|s| s.parse::<Status>())
            .transpose()
            .map(Self)
    }
}

/// Version pinned by an `If-Match` header
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectedVersion(pub Option<u64>);

#[async_trait]
impl<S> FromRequestParts<S> for ExpectedVersion
where
    S: Send + Sync,
{
    type Rejection = FixhubError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IF_MATCH) else {
            return Ok(Self(None));
        };
        let raw = value
            .to_str()
            .map_err(|_| FixhubError::invalid_input("If-Match must be ASCII"))?;
        parse_version_tag(raw).map(|v| Self(Some(v)))
    }
}

/// Parse `"3"`, `W/"3"` or `3` into a version
pub fn parse_version_tag(raw: &str) -> crate::Result<u64> {
    let tag = raw.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    let tag = tag
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag);
    tag.parse()
        .map_err(|_| FixhubError::invalid_input(format!("If-Match must carry a ticket version, got {raw:?}")))
}

/// Entity tag for a ticket version
#[must_use]
pub fn version_tag(version: u64) -> String {
    format!("\"{version}\"")
}
