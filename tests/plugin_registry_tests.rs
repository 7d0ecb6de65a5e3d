// Plugin registry: matching order, duplicate ids, image normalization properties

use async_trait::async_trait;
use hostpulse::error::ServiceError;
use hostpulse::plugins::{
    AlertMetricDefinition, AlertResult, EvaluationContext, Plugin, PluginRegistry,
    default_registry, normalize_image,
};
use proptest::prelude::*;
use std::sync::Arc;

/// Matches any normalized image containing `needle`.
struct NeedlePlugin {
    id: &'static str,
    needle: &'static str,
}

#[async_trait]
impl Plugin for NeedlePlugin {
    fn id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        self.id
    }

    fn matches(&self, image: &str) -> bool {
        image.contains(self.needle)
    }

    fn default_port(&self) -> u16 {
        80
    }

    fn alert_metrics(&self) -> &[AlertMetricDefinition] {
        &[]
    }

    async fn evaluate(
        &self,
        _metric_key: &str,
        _ctx: &EvaluationContext,
    ) -> Result<AlertResult, ServiceError> {
        Ok(AlertResult::Ok)
    }
}

fn needle(id: &'static str, needle: &'static str) -> Arc<dyn Plugin> {
    Arc::new(NeedlePlugin { id, needle })
}

#[test]
fn test_first_registered_match_wins() {
    let mut registry = PluginRegistry::new();
    registry.register(needle("broad", "app"));
    registry.register(needle("narrow", "myapp"));
    assert_eq!(registry.resolve("ghcr.io/me/myapp:2").unwrap().id(), "broad");
}

#[test]
fn test_duplicate_id_keeps_first() {
    let mut registry = PluginRegistry::new();
    registry.register(needle("svc", "alpha"));
    registry.register(needle("svc", "beta"));
    assert_eq!(registry.len(), 1);
    assert!(registry.resolve("alpha").is_some());
    assert!(registry.resolve("beta").is_none());
}

#[test]
fn test_default_registry_resolves_n8n_images() {
    let registry = default_registry();
    for image in ["n8nio/n8n", "N8NIO/N8N:latest", "docker.n8n.io/n8nio/n8n:1.64.0"] {
        let plugin = registry.resolve(image).expect(image);
        assert_eq!(plugin.id(), "n8n");
        assert_eq!(plugin.default_port(), 5678);
        assert_eq!(plugin.credential_purpose(), Some("apikey"));
    }
    assert!(registry.resolve("nginx:1.27").is_none());
}

proptest! {
    #[test]
    fn normalize_is_idempotent(image in "[A-Za-z0-9./:_-]{0,40}") {
        let once = normalize_image(&image);
        prop_assert_eq!(normalize_image(&once), once.clone());
    }

    #[test]
    fn normalized_has_no_tag_or_uppercase(image in "[A-Za-z0-9./:_-]{0,40}") {
        let normalized = normalize_image(&image);
        prop_assert!(!normalized.contains(':'));
        prop_assert!(!normalized.chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn tag_never_changes_resolution(name in "[a-z0-9/]{1,20}", tag in "[A-Za-z0-9.]{1,10}") {
        let registry = default_registry();
        let untagged = registry.resolve(&name).map(|p| p.id().to_string());
        let tagged = registry.resolve(&format!("{name}:{tag}")).map(|p| p.id().to_string());
        prop_assert_eq!(untagged, tagged);
    }
}
