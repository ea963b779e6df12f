//! HTTP interface
//!
//! Every ticket endpoint requires `Authorization: Bearer <token>`; only
//! `/health` is public. Engine calls are synchronous and may touch the
//! disk, so they run on the blocking pool under the configured request
//! timeout. A timed-out request reports `Unavailable`, although its commit
//! may still land; clients re-read before retrying.

mod error;
mod extract;
mod handlers;

pub use error::{ErrorBody, status_code};
pub use extract::{parse_version_tag, version_tag};
pub use handlers::{HealthResponse, RejectRequest, ResolveRequest};

use crate::auth::{IdentityResolver, StaticTokenResolver};
use crate::config::Config;
use crate::error::{FixhubError, Result};
use crate::events::{DeliveryPolicy, EventHub, sinks_from_config, spawn_dispatcher};
use crate::query::TicketQueries;
use crate::storage::open_store;
use crate::workflow::WorkflowEngine;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: WorkflowEngine,
    pub queries: TicketQueries,
    pub identity: Arc<dyn IdentityResolver>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(engine: WorkflowEngine, identity: Arc<dyn IdentityResolver>) -> Self {
        let queries = TicketQueries::new(Arc::clone(engine.store()));
        Self {
            engine,
            queries,
            identity,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Build the ticket API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/tickets", post(handlers::create_ticket))
        .route("/tickets/mine", get(handlers::list_mine))
        .route("/tickets/assigned", get(handlers::list_assigned))
        .route("/tickets/closed", get(handlers::list_closed))
        .route(
            "/tickets/:id",
            get(handlers::get_ticket)
                .patch(handlers::edit_ticket)
                .delete(handlers::withdraw_ticket),
        )
        .route("/tickets/:id/assume", post(handlers::assume_ticket))
        .route("/tickets/:id/renounce", post(handlers::renounce_ticket))
        .route("/tickets/:id/reject", post(handlers::reject_ticket))
        .route("/tickets/:id/resolve", post(handlers::resolve_ticket))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Run a synchronous engine call on the blocking pool, bounded by the
/// request timeout
pub(crate) async fn run_blocking<T, F>(state: &AppState, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(state.request_timeout, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(FixhubError::InvariantViolation(format!(
            "request worker failed: {join_error}"
        ))),
        Err(_) => Err(FixhubError::Unavailable(format!(
            "request exceeded {} ms",
            state.request_timeout.as_millis()
        ))),
    }
}

/// Wire store, engine, notification dispatcher and router from `config`,
/// then serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let store = open_store(&config.store)?;
    let events = EventHub::new(config.notifications.channel_capacity);
    let engine = WorkflowEngine::new(store, events.clone())
        .with_commit_attempts(config.workflow.commit_attempts);

    let dispatcher = spawn_dispatcher(
        events.subscribe(),
        sinks_from_config(&config.notifications),
        DeliveryPolicy::from_config(&config.notifications),
    );
    drop(events);

    let identity = StaticTokenResolver::from_config(&config.auth);
    if identity.is_empty() {
        warn!("no auth.tokens configured; every ticket request will be rejected");
    }

    let state = AppState::new(engine, Arc::new(identity))
        .with_request_timeout(config.server.request_timeout());
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, backend = ?config.store.backend, "fixhub listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last publisher; the dispatcher drains and stops
    if tokio::time::timeout(Duration::from_secs(5), dispatcher).await.is_err() {
        warn!("notification dispatcher did not finish draining in time");
    }
    info!("fixhub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
