//! Core domain types for the GraphKB knowledge graph.
//!
//! The graph is fed by independent data sources. Each source pushes its own
//! schema and its own view of assets (nodes) and relations (edges); every
//! mutation is scoped to the source that sent it.

use serde::{Deserialize, Serialize};

// ── Source ────────────────────────────────────────────────────────

/// Identity of the data source performing an update.
///
/// Resolved by the authenticator from the presented credential and used to
/// scope every mutation to that source's partition of the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Instances ─────────────────────────────────────────────────────

/// The type of an asset, e.g. `ip` or `device`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AssetType(pub String);

/// The type of a relation, e.g. `resolves_to`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RelationType(pub String);

/// Unique key of an asset: its type plus a source-independent key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssetKey {
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub key: String,
}

impl AssetKey {
    pub fn new(asset_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            asset_type: AssetType(asset_type.into()),
            key: key.into(),
        }
    }
}

/// An asset is fully described by its key.
pub type Asset = AssetKey;

/// A typed, directed edge between two assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Relation {
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub from: AssetKey,
    pub to: AssetKey,
}

// ── Schema ────────────────────────────────────────────────────────

/// A relation kind allowed by a source schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RelationKeyType {
    pub from_type: AssetType,
    pub to_type: AssetType,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
}

/// The schema a source declares: the asset types and relation kinds it emits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SchemaGraph {
    #[serde(default)]
    pub assets: Vec<AssetType>,
    #[serde(default)]
    pub relations: Vec<RelationKeyType>,
}

// ── Update Requests ───────────────────────────────────────────────

/// The five kinds of mutation a source can request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Schema,
    UpsertAssets,
    UpsertRelations,
    RemoveAssets,
    RemoveRelations,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::UpsertAssets => "upsert_assets",
            Self::UpsertRelations => "upsert_relations",
            Self::RemoveAssets => "remove_assets",
            Self::RemoveRelations => "remove_relations",
        }
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over the update request bodies.
pub trait UpdatePayload {
    /// Which mutation this body carries.
    const KIND: UpdateKind;

    /// Number of schema entries, assets, or relations carried.
    fn item_count(&self) -> usize;
}

/// Body of `PUT /api/graph/schema`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PutGraphSchemaRequestBody {
    pub schema: SchemaGraph,
}

/// Body of `PUT /api/graph/assets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PutGraphAssetRequestBody {
    pub assets: Vec<Asset>,
}

/// Body of `PUT /api/graph/relations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PutGraphRelationRequestBody {
    pub relations: Vec<Relation>,
}

/// Body of `DELETE /api/graph/assets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteGraphAssetRequestBody {
    pub assets: Vec<Asset>,
}

/// Body of `DELETE /api/graph/relations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteGraphRelationRequestBody {
    pub relations: Vec<Relation>,
}

impl UpdatePayload for PutGraphSchemaRequestBody {
    const KIND: UpdateKind = UpdateKind::Schema;

    fn item_count(&self) -> usize {
        self.schema.assets.len() + self.schema.relations.len()
    }
}

impl UpdatePayload for PutGraphAssetRequestBody {
    const KIND: UpdateKind = UpdateKind::UpsertAssets;

    fn item_count(&self) -> usize {
        self.assets.len()
    }
}

impl UpdatePayload for PutGraphRelationRequestBody {
    const KIND: UpdateKind = UpdateKind::UpsertRelations;

    fn item_count(&self) -> usize {
        self.relations.len()
    }
}

impl UpdatePayload for DeleteGraphAssetRequestBody {
    const KIND: UpdateKind = UpdateKind::RemoveAssets;

    fn item_count(&self) -> usize {
        self.assets.len()
    }
}

impl UpdatePayload for DeleteGraphRelationRequestBody {
    const KIND: UpdateKind = UpdateKind::RemoveRelations;

    fn item_count(&self) -> usize {
        self.relations.len()
    }
}
