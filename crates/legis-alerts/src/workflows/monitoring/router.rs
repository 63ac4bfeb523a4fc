use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::service::{MonitorService, RunMode};
use super::sources::LegislativeSource;
use super::state::NotificationStore;
use crate::error::AppError;

/// Router exposing run triggers for an external scheduler.
pub fn monitor_router<S, N>(service: Arc<MonitorService<S, N>>) -> Router
where
    S: LegislativeSource + 'static,
    N: NotificationStore + 'static,
{
    Router::new()
        .route("/api/v1/runs/:mode", post(run_handler::<S, N>))
        .route("/api/v1/digest", get(digest_handler::<S, N>))
        .with_state(service)
}

pub(crate) async fn run_handler<S, N>(
    State(service): State<Arc<MonitorService<S, N>>>,
    Path(mode): Path<String>,
) -> Response
where
    S: LegislativeSource + 'static,
    N: NotificationStore + 'static,
{
    let mode = match mode.parse::<RunMode>() {
        Ok(mode) => mode,
        Err(error) => return AppError::from(error).into_response(),
    };

    let report = service.run(mode).await;
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn digest_handler<S, N>(
    State(service): State<Arc<MonitorService<S, N>>>,
) -> Response
where
    S: LegislativeSource + 'static,
    N: NotificationStore + 'static,
{
    match service.digest_today() {
        Ok((day, items)) => {
            let payload = json!({
                "day": day,
                "items": items,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}
