// Service plugins: image matcher, alert metrics and an async evaluator per service.

pub mod n8n;
mod registry;

pub use registry::{PluginRegistry, normalize_image};

use crate::error::ServiceError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Declarative description of one alert a plugin can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertMetricDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Advisory; the scheduler decides the real cadence.
    pub poll_interval: Duration,
}

/// Outcome of one evaluation. Anything that is not a confirmed problem is `Ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertResult {
    Ok,
    Firing(String),
}

impl AlertResult {
    pub fn is_firing(&self) -> bool {
        matches!(self, AlertResult::Firing(_))
    }
}

/// What an evaluator gets to work with: where the service answers and its secret.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub base_url: String,
    pub credential: Option<String>,
}

/// Capability set of one class of service. Implementors are stateless across
/// calls; anything session-like is fetched again on every evaluation.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable identifier, also used in credential keys.
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    /// `image` is already normalized (lowercase, no tag).
    fn matches(&self, image: &str) -> bool;

    /// Port the service listens on inside its host.
    fn default_port(&self) -> u16;

    fn alert_metrics(&self) -> &[AlertMetricDefinition];

    /// Purpose segment of the credential key, if the service needs a secret.
    fn credential_purpose(&self) -> Option<&str> {
        None
    }

    async fn evaluate(
        &self,
        metric_key: &str,
        ctx: &EvaluationContext,
    ) -> Result<AlertResult, ServiceError>;
}

/// Registry with every built-in plugin, in matching priority order.
pub fn default_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(n8n::N8nPlugin));
    registry
}
