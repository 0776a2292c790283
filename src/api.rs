//! REST API router for the clearing module.
//!
//! Used by the binary and by integration tests. Create with [`create_router`]
//! or [`create_router_with_state`] when tests need their own audit sink or a
//! pre-seeded engine. Uses Extension for state so the router is `Router<()>`
//! and works with `into_make_service()`.
//!
//! Error body shape for every failure: `{"error": {"code", "message"}}`.
//! `client_id` arrives as a query parameter and is passed down the call chain
//! as an explicit argument; nothing reads it from ambient request context.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::{Arc, Mutex};

use crate::audit::{AuditEvent, AuditSink, StdoutAuditSink};
use crate::auth::{self, AuthConfig, AuthUser};
use crate::engine::ClearingEngine;
use crate::error::ClearingError;
use crate::persistence::FilePersistence;
use crate::types::{ClientId, DealId, NewDeal, NewOrder, NewSettlement, OrderId, SettlementId, SettlementStatus};

/// Shared app state: one engine per process, an audit sink, and optional
/// snapshot persistence saved after every mutation.
#[derive(Clone)]
pub struct AppState {
    pub(crate) engine: Arc<Mutex<ClearingEngine>>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) persistence: Option<Arc<FilePersistence>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_engine(ClearingEngine::new())
    }

    pub fn with_engine(engine: ClearingEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            audit: Arc::new(StdoutAuditSink),
            persistence: None,
        }
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_persistence(mut self, persistence: FilePersistence) -> Self {
        self.persistence = Some(Arc::new(persistence));
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the REST router with fresh state. Returns `Router<()>` so you can
/// call `.into_make_service()` for `axum::serve`.
pub fn create_router(auth: AuthConfig) -> Router<()> {
    create_router_with_state(AppState::new(), auth)
}

/// Builds the REST router over caller-provided state (tests, recovery).
pub fn create_router_with_state(state: AppState, auth: AuthConfig) -> Router<()> {
    let v1 = Router::new()
        .route("/deals", post(create_deal))
        .route("/deals/:deal_id", delete(delete_deal))
        .route("/orders", get(list_orders).post(create_orders))
        .route("/orders/:order_id", put(update_order))
        .route(
            "/monetary-settlements",
            get(list_settlements).post(create_settlement),
        )
        .route(
            "/monetary-settlements/:settlement_id/status",
            put(set_settlement_status),
        )
        .layer(middleware::from_fn(
            move |req: axum::extract::Request, next: middleware::Next| {
                let config = auth.clone();
                async move { auth::require_api_key_or_anonymous(req, next, config).await }
            },
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/v1", v1)
        .layer(Extension(state))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn error_response(err: &ClearingError) -> Response {
    let status = match err {
        ClearingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ClearingError::NotFound(_) => StatusCode::NOT_FOUND,
        ClearingError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ClearingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = serde_json::json!({
        "error": { "code": err.code(), "message": err.to_string() }
    });
    (status, Json(body)).into_response()
}

fn invalid_client_id() -> Response {
    let body = serde_json::json!({
        "error": {
            "code": "ERR_INVALID_CLIENT_ID",
            "message": "missing or invalid client_id query parameter"
        }
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Saves a snapshot if persistence is configured. Called with the engine lock
/// still held so the saved state matches the mutation that just happened.
fn persist(state: &AppState, engine: &ClearingEngine) {
    if let Some(persistence) = &state.persistence {
        if let Err(e) = persistence.save(&engine.snapshot()) {
            log::error!("failed to save state snapshot: {}", e);
        }
    }
}

#[derive(serde::Deserialize)]
struct ClientQuery {
    client_id: Option<u64>,
}

#[derive(serde::Deserialize)]
struct SettlementsQuery {
    deal_id: Option<u64>,
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(serde::Deserialize)]
struct StatusBody {
    status: SettlementStatus,
}

async fn create_deal(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewDeal>,
) -> Response {
    let mut engine = state.engine.lock().expect("lock");
    match engine.create_deal(body) {
        Ok(deal) => {
            persist(&state, &engine);
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "deal_create",
                Some(serde_json::json!({ "deal_id": deal.deal_id.0 })),
                "success",
            ));
            (StatusCode::CREATED, Json(deal)).into_response()
        }
        Err(e) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "deal_create",
                None,
                "rejected",
            ));
            error_response(&e)
        }
    }
}

async fn delete_deal(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deal_id): Path<u64>,
) -> Response {
    if let Err(resp) = auth::require_manager_or_admin(&user) {
        return resp;
    }
    let mut engine = state.engine.lock().expect("lock");
    match engine.delete_deal(DealId(deal_id)) {
        Ok(()) => {
            persist(&state, &engine);
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "deal_delete",
                Some(serde_json::json!({ "deal_id": deal_id })),
                "success",
            ));
            (
                StatusCode::OK,
                Json(serde_json::json!({ "message": "deal deleted" })),
            )
                .into_response()
        }
        Err(e) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "deal_delete",
                Some(serde_json::json!({ "deal_id": deal_id })),
                "rejected",
            ));
            error_response(&e)
        }
    }
}

async fn list_orders(
    Extension(state): Extension<AppState>,
    Query(query): Query<ClientQuery>,
) -> Response {
    let client_id = match query.client_id {
        Some(id) if id > 0 => ClientId(id),
        _ => return invalid_client_id(),
    };
    let engine = state.engine.lock().expect("lock");
    match engine.list_orders(client_id) {
        Ok((orders, total)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "orders": orders, "total": total })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn create_orders(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ClientQuery>,
    Json(body): Json<Vec<NewOrder>>,
) -> Response {
    let client_id = match query.client_id {
        Some(id) if id > 0 => ClientId(id),
        _ => return invalid_client_id(),
    };
    let mut engine = state.engine.lock().expect("lock");
    match engine.create_orders(client_id, body) {
        Ok(orders) => {
            persist(&state, &engine);
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "order_submit",
                Some(serde_json::json!({
                    "client_id": client_id.0,
                    "order_ids": orders.iter().map(|o| o.order_id.0).collect::<Vec<_>>(),
                })),
                "success",
            ));
            (StatusCode::CREATED, Json(orders)).into_response()
        }
        Err(e) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "order_submit",
                Some(serde_json::json!({ "client_id": client_id.0 })),
                "rejected",
            ));
            error_response(&e)
        }
    }
}

async fn update_order(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<u64>,
    Query(query): Query<ClientQuery>,
    Json(body): Json<NewOrder>,
) -> Response {
    let client_id = match query.client_id {
        Some(id) if id > 0 => ClientId(id),
        _ => return invalid_client_id(),
    };
    let mut engine = state.engine.lock().expect("lock");
    match engine.update_order(client_id, OrderId(order_id), body) {
        Ok(order) => {
            persist(&state, &engine);
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "order_update",
                Some(serde_json::json!({ "order_id": order_id })),
                "success",
            ));
            (StatusCode::OK, Json(order)).into_response()
        }
        Err(e) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "order_update",
                Some(serde_json::json!({ "order_id": order_id })),
                "rejected",
            ));
            error_response(&e)
        }
    }
}

async fn list_settlements(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SettlementsQuery>,
) -> Response {
    let deal_id = match query.deal_id {
        Some(id) if id > 0 => DealId(id),
        _ => {
            return error_response(&ClearingError::InvalidInput(
                "missing or invalid deal_id query parameter".into(),
            ))
        }
    };
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(50);
    if page < 1 || limit < 1 {
        return error_response(&ClearingError::InvalidInput(
            "invalid pagination parameters".into(),
        ));
    }

    let engine = state.engine.lock().expect("lock");
    match engine.settlements_for_deal(deal_id) {
        Ok(settlements) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "netting_run",
                Some(serde_json::json!({ "deal_id": deal_id.0 })),
                "success",
            ));
            let total = settlements.len();
            let start = (page - 1).saturating_mul(limit);
            let slice: Vec<_> = settlements.into_iter().skip(start).take(limit).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "settlements": slice, "total": total })),
            )
                .into_response()
        }
        Err(e) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "netting_run",
                Some(serde_json::json!({ "deal_id": deal_id.0 })),
                "rejected",
            ));
            error_response(&e)
        }
    }
}

async fn create_settlement(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewSettlement>,
) -> Response {
    let mut engine = state.engine.lock().expect("lock");
    match engine.create_settlement(body) {
        Ok(settlement) => {
            persist(&state, &engine);
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "settlement_create",
                Some(serde_json::json!({ "settlement_id": settlement.settlement_id.0 })),
                "success",
            ));
            (StatusCode::CREATED, Json(settlement)).into_response()
        }
        Err(e) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "settlement_create",
                None,
                "rejected",
            ));
            error_response(&e)
        }
    }
}

async fn set_settlement_status(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(settlement_id): Path<u64>,
    Json(body): Json<StatusBody>,
) -> Response {
    if let Err(resp) = auth::require_manager_or_admin(&user) {
        return resp;
    }
    let mut engine = state.engine.lock().expect("lock");
    match engine.set_settlement_status(SettlementId(settlement_id), body.status) {
        Ok(settlement) => {
            persist(&state, &engine);
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "settlement_status",
                Some(serde_json::json!({
                    "settlement_id": settlement_id,
                    "status": settlement.status,
                })),
                "success",
            ));
            (StatusCode::OK, Json(settlement)).into_response()
        }
        Err(e) => {
            state.audit.emit(&AuditEvent::now(
                user.actor(),
                "settlement_status",
                Some(serde_json::json!({ "settlement_id": settlement_id })),
                "rejected",
            ));
            error_response(&e)
        }
    }
}
