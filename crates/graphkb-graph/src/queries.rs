//! Read operations over a source's partition of the knowledge graph.

use neo4rs::query;

use graphkb_core::{AssetKey, AssetType, RelationKeyType, RelationType, SchemaGraph, SourceId};

use crate::client::{GraphClient, GraphError};

impl GraphClient {
    /// Count assets currently observed by a source.
    pub async fn count_observed_assets(&self, source: &SourceId) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (:Source {name: $source})-[:OBSERVED]->(a:Asset)
             RETURN count(a) AS cnt",
        )
        .param("source", source.to_string());

        match self.query_one(q).await? {
            Some(row) => row
                .get::<i64>("cnt")
                .map_err(|e| GraphError::Decode(e.to_string())),
            None => Ok(0),
        }
    }

    /// Count relations a source has observed.
    pub async fn count_source_relations(&self, source: &SourceId) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (:Asset)-[r:RELATION]->(:Asset)
             WHERE $source IN r.sources
             RETURN count(r) AS cnt",
        )
        .param("source", source.to_string());

        match self.query_one(q).await? {
            Some(row) => row
                .get::<i64>("cnt")
                .map_err(|e| GraphError::Decode(e.to_string())),
            None => Ok(0),
        }
    }

    /// List the assets observed by a source, sorted by type then key.
    pub async fn observed_assets(&self, source: &SourceId) -> Result<Vec<AssetKey>, GraphError> {
        let q = query(
            "MATCH (:Source {name: $source})-[:OBSERVED]->(a:Asset)
             RETURN a.type AS type, a.key AS key
             ORDER BY type, key",
        )
        .param("source", source.to_string());

        self.query_rows(q)
            .await?
            .into_iter()
            .map(|row| {
                let asset_type: String = row
                    .get("type")
                    .map_err(|e| GraphError::Decode(e.to_string()))?;
                let key: String = row.get("key").map_err(|e| GraphError::Decode(e.to_string()))?;
                Ok(AssetKey::new(asset_type, key))
            })
            .collect()
    }

    /// Read back the schema currently declared by a source.
    pub async fn source_schema(&self, source: &SourceId) -> Result<SchemaGraph, GraphError> {
        let assets_q = query(
            "MATCH (:Source {name: $source})-[:DECLARES]->(t:AssetType)
             RETURN t.name AS name
             ORDER BY name",
        )
        .param("source", source.to_string());

        let relations_q = query(
            "MATCH (:Source {name: $source})-[:DECLARES]->(t:RelationType)
             RETURN t.type AS type, t.from_type AS from_type, t.to_type AS to_type
             ORDER BY type, from_type, to_type",
        )
        .param("source", source.to_string());

        let mut schema = SchemaGraph::default();

        for row in self.query_rows(assets_q).await? {
            let name: String = row.get("name").map_err(|e| GraphError::Decode(e.to_string()))?;
            schema.assets.push(AssetType(name));
        }

        for row in self.query_rows(relations_q).await? {
            let get = |key: &str| -> Result<String, GraphError> {
                row.get::<String>(key)
                    .map_err(|e| GraphError::Decode(e.to_string()))
            };
            schema.relations.push(RelationKeyType {
                relation_type: RelationType(get("type")?),
                from_type: AssetType(get("from_type")?),
                to_type: AssetType(get("to_type")?),
            });
        }

        Ok(schema)
    }
}
