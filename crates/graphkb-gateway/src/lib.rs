//! graphkb-gateway: Update gateway for the GraphKB knowledge graph.
//!
//! Data sources push schema, asset, and relation updates over HTTP. Every
//! request is authenticated to a source, admitted against a process-wide
//! concurrency limit (excess load is rejected with 429, never queued),
//! decoded into its payload shape, and forwarded to the graph mutation
//! collaborator.

pub mod admission;
pub mod auth;
pub mod decode;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use admission::{AdmissionControl, Permit, SemaphoreAdmission};
pub use auth::{AuthError, Authenticator, TokenRegistry};
pub use dispatcher::ACCEPTED_BODY;
pub use error::GatewayError;
pub use router::build_router;
pub use state::GatewayState;
