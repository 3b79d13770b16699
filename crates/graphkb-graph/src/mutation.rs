//! The graph mutation contract consumed by the update gateway.

use async_trait::async_trait;

use graphkb_core::{Asset, Relation, SchemaGraph, SourceId};

use crate::client::GraphError;

/// Applies source-scoped updates to the shared knowledge graph.
///
/// A call returns once the update has been applied (or has failed); the
/// gateway holds its admission permit until then. No consistency check
/// between a source's schema and its instances is performed here.
#[async_trait]
pub trait GraphMutation: Send + Sync {
    /// Replace the schema declared by `source`.
    async fn update_schema(&self, source: &SourceId, schema: &SchemaGraph)
        -> Result<(), GraphError>;

    /// Insert or refresh assets observed by `source`.
    async fn upsert_assets(&self, source: &SourceId, assets: &[Asset]) -> Result<(), GraphError>;

    /// Insert or refresh relations observed by `source`.
    async fn upsert_relations(
        &self,
        source: &SourceId,
        relations: &[Relation],
    ) -> Result<(), GraphError>;

    /// Retract assets previously observed by `source`.
    async fn remove_assets(&self, source: &SourceId, assets: &[Asset]) -> Result<(), GraphError>;

    /// Retract relations previously observed by `source`.
    async fn remove_relations(
        &self,
        source: &SourceId,
        relations: &[Relation],
    ) -> Result<(), GraphError>;
}
