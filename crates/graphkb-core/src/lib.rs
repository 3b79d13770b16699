//! graphkb-core: Shared types, configuration, and error handling for GraphKB.
//!
//! This crate provides the foundational types used across all GraphKB components:
//! - Source identities that scope every mutation to one data source
//! - Asset, relation, and schema shapes of the knowledge graph
//! - The five update request bodies accepted by the gateway
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use error::GraphKbError;
pub use types::{
    Asset, AssetKey, AssetType, DeleteGraphAssetRequestBody, DeleteGraphRelationRequestBody,
    PutGraphAssetRequestBody, PutGraphRelationRequestBody, PutGraphSchemaRequestBody, Relation,
    RelationKeyType, RelationType, SchemaGraph, SourceId, UpdateKind, UpdatePayload,
};
