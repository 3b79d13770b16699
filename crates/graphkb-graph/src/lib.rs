//! GraphKB Graph — the mutation collaborator behind the update gateway.
//!
//! The gateway only sees the [`GraphMutation`] trait. [`GraphClient`] is the
//! Neo4j implementation: every write is scoped to the source that sent it,
//! so sources can add and retract their own view of shared assets without
//! clobbering each other.

pub mod client;
pub mod mutation;
pub mod mutations;
pub mod queries;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use mutation::GraphMutation;
