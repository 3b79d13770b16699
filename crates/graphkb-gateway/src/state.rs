//! Shared state handed to every request handler.

use std::sync::Arc;

use graphkb_core::config::GatewayConfig;
use graphkb_graph::GraphMutation;

use crate::admission::{AdmissionControl, SemaphoreAdmission};
use crate::auth::Authenticator;

/// Collaborators shared by all update routes. Clone is cheap.
#[derive(Clone)]
pub struct GatewayState {
    pub authenticator: Arc<dyn Authenticator>,
    pub admission: Arc<dyn AdmissionControl>,
    pub graph: Arc<dyn GraphMutation>,
    pub max_body_bytes: usize,
}

impl GatewayState {
    /// Build state from configuration. One admission controller is created
    /// and shared by every route.
    pub fn new(
        config: &GatewayConfig,
        authenticator: Arc<dyn Authenticator>,
        graph: Arc<dyn GraphMutation>,
    ) -> Self {
        Self {
            authenticator,
            admission: Arc::new(SemaphoreAdmission::new(config.max_concurrent_updates)),
            graph,
            max_body_bytes: config.max_body_bytes,
        }
    }
}
