//! Event dispatch
//!
//! Every per-query route funnels into [`dispatch_event`]: decode the
//! delivery envelope, classify it by its `kind` member, validate it into a
//! typed event, and invoke the matching callback. A failure in one
//! delivery is logged and answered with an error status; it never takes
//! the reaction down or affects other deliveries.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{post, MethodRouter};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::error::{ReactionError, ReactionResult};
use crate::handlers::{ChangeEventHandler, ControlEventHandler};
use crate::models::{ChangeEvent, ControlEvent};

/// Shared state captured by every query route.
pub(crate) struct DispatchState<Q> {
    pub(crate) query_configs: Arc<HashMap<String, Option<Arc<Q>>>>,
    pub(crate) on_change: Arc<dyn ChangeEventHandler<Q>>,
    pub(crate) on_control: Option<Arc<dyn ControlEventHandler<Q>>>,
}

impl<Q> Clone for DispatchState<Q> {
    fn clone(&self) -> Self {
        DispatchState {
            query_configs: self.query_configs.clone(),
            on_change: self.on_change.clone(),
            on_control: self.on_control.clone(),
        }
    }
}

/// Builds the POST handler for one query's route.
pub(crate) fn query_route<Q>(state: DispatchState<Q>, query_id: String) -> MethodRouter
where
    Q: Send + Sync + 'static,
{
    post(move |body: Bytes| dispatch_event(state.clone(), query_id.clone(), body))
}

async fn dispatch_event<Q>(state: DispatchState<Q>, query_id: String, body: Bytes) -> Response
where
    Q: Send + Sync + 'static,
{
    match process_event(&state, &query_id, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "SUCCESS"}))).into_response(),
        Err(err) => {
            error!("Dispatch for query {} failed: {}", query_id, err);
            err.into_response()
        }
    }
}

async fn process_event<Q>(
    state: &DispatchState<Q>,
    route_query_id: &str,
    body: &[u8],
) -> ReactionResult<()>
where
    Q: Send + Sync + 'static,
{
    let envelope: Value = serde_json::from_slice(body)
        .map_err(|e| ReactionError::MalformedPayload(e.to_string()))?;

    let data = envelope
        .get("data")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    // Config correlation runs on the payload's query id, not the route's.
    let config = data
        .get("queryId")
        .and_then(Value::as_str)
        .and_then(|query_id| state.query_configs.get(query_id))
        .and_then(|config| config.clone());

    let kind = data.get("kind").and_then(Value::as_str).map(str::to_string);
    match kind.as_deref() {
        Some("change") => {
            let event: ChangeEvent = serde_json::from_value(data).map_err(|e| {
                ReactionError::InvalidEvent {
                    kind: "change",
                    message: e.to_string(),
                }
            })?;
            debug!(
                "Received change event {} for query {}",
                event.sequence, event.query_id
            );
            state.on_change.handle_change(event, config).await?;
        }
        Some("control") => match &state.on_control {
            Some(on_control) => {
                let event: ControlEvent = serde_json::from_value(data).map_err(|e| {
                    ReactionError::InvalidEvent {
                        kind: "control",
                        message: e.to_string(),
                    }
                })?;
                debug!(
                    "Received control signal {} for query {}",
                    event.control_signal, event.query_id
                );
                on_control.handle_control_signal(event, config).await?;
            }
            None => {
                debug!(
                    "Received control event for query {} but no control event handler is registered",
                    route_query_id
                );
            }
        },
        other => {
            debug!(
                "Ignoring event with unknown kind {:?} for query {}",
                other, route_query_id
            );
        }
    }

    Ok(())
}

impl IntoResponse for ReactionError {
    fn into_response(self) -> Response {
        let status = match &self {
            ReactionError::MalformedPayload(_) | ReactionError::InvalidEvent { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
