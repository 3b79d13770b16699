//! Write operations for the knowledge graph.
//!
//! Assets are shared `(:Asset {type, key})` nodes. A source's view of an
//! asset is an `OBSERVED` edge from its `(:Source {name})` node; a relation
//! carries the list of sources that observed it in `r.sources`. Removing an
//! asset or relation only retracts the calling source's observation, and the
//! element itself goes away once no source observes it any more.
//!
//! Every batch runs in a single transaction.

use async_trait::async_trait;
use chrono::Utc;
use neo4rs::{query, Query};

use graphkb_core::{Asset, AssetType, Relation, RelationKeyType, SchemaGraph, SourceId};

use crate::client::{GraphClient, GraphError};
use crate::mutation::GraphMutation;

#[async_trait]
impl GraphMutation for GraphClient {
    async fn update_schema(
        &self,
        source: &SourceId,
        schema: &SchemaGraph,
    ) -> Result<(), GraphError> {
        let now = Utc::now().to_rfc3339();
        let mut queries = Vec::with_capacity(1 + schema.assets.len() + schema.relations.len());

        queries.push(clear_schema(source, &now));
        queries.extend(schema.assets.iter().map(|t| declare_asset_type(source, t)));
        queries.extend(
            schema
                .relations
                .iter()
                .map(|r| declare_relation_type(source, r)),
        );

        self.run_batch(queries).await?;
        tracing::debug!(
            source = %source,
            asset_types = schema.assets.len(),
            relation_types = schema.relations.len(),
            "Schema replaced"
        );
        Ok(())
    }

    async fn upsert_assets(&self, source: &SourceId, assets: &[Asset]) -> Result<(), GraphError> {
        let now = Utc::now().to_rfc3339();
        let queries = assets.iter().map(|a| upsert_asset(source, a, &now)).collect();
        self.run_batch(queries).await
    }

    async fn upsert_relations(
        &self,
        source: &SourceId,
        relations: &[Relation],
    ) -> Result<(), GraphError> {
        let now = Utc::now().to_rfc3339();
        let queries = relations
            .iter()
            .map(|r| upsert_relation(source, r, &now))
            .collect();
        self.run_batch(queries).await
    }

    async fn remove_assets(&self, source: &SourceId, assets: &[Asset]) -> Result<(), GraphError> {
        let queries = assets.iter().map(|a| remove_asset(source, a)).collect();
        self.run_batch(queries).await
    }

    async fn remove_relations(
        &self,
        source: &SourceId,
        relations: &[Relation],
    ) -> Result<(), GraphError> {
        let queries = relations.iter().map(|r| remove_relation(source, r)).collect();
        self.run_batch(queries).await
    }
}

// ── Schema ───────────────────────────────────────────────────────

/// Ensure the source node exists and drop its previous declarations.
fn clear_schema(source: &SourceId, now: &str) -> Query {
    query(
        "MERGE (s:Source {name: $source})
         ON CREATE SET s.first_seen = $now
         SET s.schema_updated_at = $now
         WITH s
         OPTIONAL MATCH (s)-[d:DECLARES]->()
         DELETE d",
    )
    .param("source", source.to_string())
    .param("now", now.to_string())
}

fn declare_asset_type(source: &SourceId, asset_type: &AssetType) -> Query {
    query(
        "MATCH (s:Source {name: $source})
         MERGE (t:AssetType {name: $name})
         MERGE (s)-[:DECLARES]->(t)",
    )
    .param("source", source.to_string())
    .param("name", asset_type.0.to_string())
}

fn declare_relation_type(source: &SourceId, relation: &RelationKeyType) -> Query {
    query(
        "MATCH (s:Source {name: $source})
         MERGE (t:RelationType {type: $type, from_type: $from_type, to_type: $to_type})
         MERGE (s)-[:DECLARES]->(t)",
    )
    .param("source", source.to_string())
    .param("type", relation.relation_type.0.to_string())
    .param("from_type", relation.from_type.0.to_string())
    .param("to_type", relation.to_type.0.to_string())
}

// ── Assets ───────────────────────────────────────────────────────

fn upsert_asset(source: &SourceId, asset: &Asset, now: &str) -> Query {
    query(
        "MERGE (s:Source {name: $source})
         ON CREATE SET s.first_seen = $now
         MERGE (a:Asset {type: $type, key: $key})
         ON CREATE SET a.first_seen = $now
         MERGE (s)-[o:OBSERVED]->(a)
         ON CREATE SET o.first_seen = $now
         SET o.last_seen = $now, a.last_seen = $now",
    )
    .param("source", source.to_string())
    .param("type", asset.asset_type.0.to_string())
    .param("key", asset.key.to_string())
    .param("now", now.to_string())
}

fn remove_asset(source: &SourceId, asset: &Asset) -> Query {
    query(
        "MATCH (:Source {name: $source})-[o:OBSERVED]->(a:Asset {type: $type, key: $key})
         DELETE o
         WITH a
         WHERE NOT ( (:Source)-[:OBSERVED]->(a) )
         DETACH DELETE a",
    )
    .param("source", source.to_string())
    .param("type", asset.asset_type.0.to_string())
    .param("key", asset.key.to_string())
}

// ── Relations ────────────────────────────────────────────────────

fn upsert_relation(source: &SourceId, relation: &Relation, now: &str) -> Query {
    query(
        "MERGE (a:Asset {type: $from_type, key: $from_key})
         ON CREATE SET a.first_seen = $now
         MERGE (b:Asset {type: $to_type, key: $to_key})
         ON CREATE SET b.first_seen = $now
         MERGE (a)-[r:RELATION {type: $type}]->(b)
         ON CREATE SET r.sources = [$source], r.first_seen = $now
         ON MATCH SET r.sources = CASE
           WHEN $source IN r.sources THEN r.sources
           ELSE r.sources + $source
         END
         SET r.last_seen = $now",
    )
    .param("source", source.to_string())
    .param("type", relation.relation_type.0.to_string())
    .param("from_type", relation.from.asset_type.0.to_string())
    .param("from_key", relation.from.key.to_string())
    .param("to_type", relation.to.asset_type.0.to_string())
    .param("to_key", relation.to.key.to_string())
    .param("now", now.to_string())
}

fn remove_relation(source: &SourceId, relation: &Relation) -> Query {
    query(
        "MATCH (:Asset {type: $from_type, key: $from_key})
               -[r:RELATION {type: $type}]->
               (:Asset {type: $to_type, key: $to_key})
         WHERE $source IN r.sources
         SET r.sources = [s IN r.sources WHERE s <> $source]
         WITH r
         WHERE size(r.sources) = 0
         DELETE r",
    )
    .param("source", source.to_string())
    .param("type", relation.relation_type.0.to_string())
    .param("from_type", relation.from.asset_type.0.to_string())
    .param("from_key", relation.from.key.to_string())
    .param("to_type", relation.to.asset_type.0.to_string())
    .param("to_key", relation.to.key.to_string())
}
