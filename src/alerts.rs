// Per-(server, container, metric) alert evaluation. Every failure collapses to `Ok`.

use crate::credentials::{CredentialStore, credential_key};
use crate::plugins::{AlertResult, EvaluationContext, PluginRegistry};
use crate::tunnel::TunnelProvider;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct AlertEvaluationEngine {
    registry: Arc<PluginRegistry>,
    tunnels: Arc<dyn TunnelProvider>,
    credentials: Arc<dyn CredentialStore>,
}

impl AlertEvaluationEngine {
    pub fn new(
        registry: Arc<PluginRegistry>,
        tunnels: Arc<dyn TunnelProvider>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            registry,
            tunnels,
            credentials,
        }
    }

    /// Never errors: no plugin, unknown metric, no tunnel, no credential or a
    /// failed request all resolve to `AlertResult::Ok`.
    #[instrument(skip(self), fields(operation = "evaluate"))]
    pub async fn evaluate(&self, server_id: &str, image: &str, metric_key: &str) -> AlertResult {
        let Some(plugin) = self.registry.resolve(image) else {
            return AlertResult::Ok;
        };
        if !plugin.alert_metrics().iter().any(|m| m.key == metric_key) {
            return AlertResult::Ok;
        }

        let base_url = match self.tunnels.open(server_id, plugin.default_port()).await {
            Ok(url) => url,
            Err(e) => {
                debug!(plugin = plugin.id(), error = %e, "tunnel unavailable; treating as ok");
                return AlertResult::Ok;
            }
        };

        let credential = match plugin.credential_purpose() {
            Some(purpose) => {
                let key = credential_key(plugin.id(), purpose, server_id);
                match self.credentials.get(&key).filter(|c| !c.is_empty()) {
                    Some(c) => Some(c),
                    None => {
                        debug!(plugin = plugin.id(), "no credential configured; nothing to check");
                        return AlertResult::Ok;
                    }
                }
            }
            None => None,
        };

        let ctx = EvaluationContext {
            base_url,
            credential,
        };
        match plugin.evaluate(metric_key, &ctx).await {
            Ok(result) => result,
            Err(e) => {
                debug!(plugin = plugin.id(), error = %e, "evaluation failed; treating as ok");
                AlertResult::Ok
            }
        }
    }

    /// Evaluates every metric of the plugin owning `image`, concurrently.
    /// Empty when no plugin matches.
    pub async fn evaluate_container(
        &self,
        server_id: &str,
        image: &str,
    ) -> Vec<(String, AlertResult)> {
        let Some(plugin) = self.registry.resolve(image) else {
            return Vec::new();
        };
        let keys: Vec<&'static str> = plugin.alert_metrics().iter().map(|m| m.key).collect();
        let results = join_all(keys.iter().map(|key| self.evaluate(server_id, image, key))).await;
        keys.into_iter().map(String::from).zip(results).collect()
    }
}
