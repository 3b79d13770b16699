//! Graph update handlers.
//!
//! Each handler fixes the payload shape and the graph mutation to call; the
//! rest is [`dispatch_update`].

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::Json;
use serde::Serialize;

use graphkb_core::{
    DeleteGraphAssetRequestBody, DeleteGraphRelationRequestBody, PutGraphAssetRequestBody,
    PutGraphRelationRequestBody, PutGraphSchemaRequestBody,
};

use crate::dispatcher::dispatch_update;
use crate::error::GatewayError;
use crate::state::GatewayState;

/// `PUT /api/graph/schema`
pub async fn put_schema(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    uri: Uri,
    body: Body,
) -> Result<&'static str, GatewayError> {
    // TODO: verify the new schema is compatible with the source's existing assets.
    dispatch_update(
        &state,
        &headers,
        &uri,
        body,
        |graph, source, req: PutGraphSchemaRequestBody| async move {
            graph.update_schema(&source, &req.schema).await
        },
    )
    .await
}

/// `PUT /api/graph/assets`
pub async fn put_assets(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    uri: Uri,
    body: Body,
) -> Result<&'static str, GatewayError> {
    dispatch_update(
        &state,
        &headers,
        &uri,
        body,
        |graph, source, req: PutGraphAssetRequestBody| async move {
            graph.upsert_assets(&source, &req.assets).await
        },
    )
    .await
}

/// `PUT /api/graph/relations`
pub async fn put_relations(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    uri: Uri,
    body: Body,
) -> Result<&'static str, GatewayError> {
    dispatch_update(
        &state,
        &headers,
        &uri,
        body,
        |graph, source, req: PutGraphRelationRequestBody| async move {
            graph.upsert_relations(&source, &req.relations).await
        },
    )
    .await
}

/// `DELETE /api/graph/assets`
pub async fn delete_assets(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    uri: Uri,
    body: Body,
) -> Result<&'static str, GatewayError> {
    dispatch_update(
        &state,
        &headers,
        &uri,
        body,
        |graph, source, req: DeleteGraphAssetRequestBody| async move {
            graph.remove_assets(&source, &req.assets).await
        },
    )
    .await
}

/// `DELETE /api/graph/relations`
pub async fn delete_relations(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    uri: Uri,
    body: Body,
) -> Result<&'static str, GatewayError> {
    dispatch_update(
        &state,
        &headers,
        &uri,
        body,
        |graph, source, req: DeleteGraphRelationRequestBody| async move {
            graph.remove_relations(&source, &req.relations).await
        },
    )
    .await
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub capacity: usize,
    pub in_flight: usize,
}

/// `GET /health`
pub async fn health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        capacity: state.admission.capacity(),
        in_flight: state.admission.in_flight(),
    })
}
