//! The update pipeline shared by all five graph update endpoints.
//!
//! authenticate → admit → read + decode → forward → acknowledge
//!
//! Each step short-circuits on failure. The body is only read once a permit
//! is held, and the permit is held until the graph collaborator has
//! finished with the update.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Uri};
use serde::de::DeserializeOwned;
use tracing::Instrument;
use uuid::Uuid;

use graphkb_core::{SourceId, UpdatePayload};
use graphkb_graph::{GraphError, GraphMutation};

use crate::admission::Permit;
use crate::auth::extract_token;
use crate::decode::{decode, read_body};
use crate::error::GatewayError;
use crate::state::GatewayState;

/// Response body of an accepted update.
pub const ACCEPTED_BODY: &str = "Graph has been received and will be processed soon";

/// Run one update request through the pipeline.
///
/// `T` selects the payload shape to decode and `forward` hands the decoded
/// payload to the matching graph mutation.
pub async fn dispatch_update<T, F, Fut>(
    state: &GatewayState,
    headers: &HeaderMap,
    uri: &Uri,
    body: Body,
    forward: F,
) -> Result<&'static str, GatewayError>
where
    T: UpdatePayload + DeserializeOwned,
    F: FnOnce(Arc<dyn GraphMutation>, SourceId, T) -> Fut,
    Fut: Future<Output = Result<(), GraphError>>,
{
    let request_id = Uuid::new_v4();
    let kind = T::KIND;
    let span = tracing::info_span!(
        "graph_update",
        %request_id,
        %kind,
        source = tracing::field::Empty,
    );

    let result = process::<T, F, Fut>(state, headers, uri, body, forward)
        .instrument(span.clone())
        .await;

    span.in_scope(|| match &result {
        Ok(_) => {}
        Err(e @ (GatewayError::Unauthorized | GatewayError::Saturated)) => {
            tracing::warn!(reason = e.code(), "Update rejected");
        }
        Err(e @ GatewayError::Malformed(_)) => {
            tracing::warn!(error = %e, "Update payload rejected");
        }
        Err(e @ (GatewayError::Auth(_) | GatewayError::Forwarding(_))) => {
            tracing::error!(error = %e, "Update failed");
        }
    });

    result
}

async fn process<T, F, Fut>(
    state: &GatewayState,
    headers: &HeaderMap,
    uri: &Uri,
    body: Body,
    forward: F,
) -> Result<&'static str, GatewayError>
where
    T: UpdatePayload + DeserializeOwned,
    F: FnOnce(Arc<dyn GraphMutation>, SourceId, T) -> Fut,
    Fut: Future<Output = Result<(), GraphError>>,
{
    let token = extract_token(headers, uri).ok_or(GatewayError::Unauthorized)?;
    let source = state
        .authenticator
        .validate(&token)
        .await?
        .ok_or(GatewayError::Unauthorized)?;
    tracing::Span::current().record("source", tracing::field::display(&source));

    let permit = Permit::try_acquire(&state.admission).ok_or(GatewayError::Saturated)?;

    let raw = read_body(body, state.max_body_bytes).await?;
    let payload: T = decode(&raw)?;
    let items = payload.item_count();

    forward(Arc::clone(&state.graph), source, payload).await?;
    drop(permit);

    tracing::info!(items, "Update applied");
    Ok(ACCEPTED_BODY)
}
