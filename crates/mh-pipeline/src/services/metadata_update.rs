//! Metadata update service: rewrites genres and tags from configured rules.

use async_trait::async_trait;
use tracing::info;

use mh_core::config::MetadataRulesConfig;
use mh_core::MediaItem;
use mh_rules::MetadataRuleEngine;

use crate::service::{Service, ServiceStatus};

/// Applies path and pattern rules to an item's genres and tags.
#[derive(Debug)]
pub struct MetadataUpdateService {
    engine: MetadataRuleEngine,
}

impl MetadataUpdateService {
    /// Compile the configured rule set.
    ///
    /// # Errors
    ///
    /// Returns [`mh_core::Error::Config`] for malformed patterns, so a bad
    /// rule is rejected when the pipeline is built.
    pub fn new(config: &MetadataRulesConfig) -> mh_core::Result<Self> {
        Ok(Self {
            engine: MetadataRuleEngine::new(config)?,
        })
    }
}

#[async_trait]
impl Service for MetadataUpdateService {
    fn name(&self) -> &'static str {
        "metadata_update"
    }

    async fn execute(&self, item: &mut MediaItem) -> mh_core::Result<ServiceStatus> {
        if self.engine.is_empty() {
            return Ok(ServiceStatus::skipped("no rules configured"));
        }

        let before = item.changes().len();
        if !self.engine.apply(item) {
            return Ok(ServiceStatus::skipped("no rule changed the item"));
        }

        let summary = item.changes()[before..].join("; ");
        info!(item = %item.display_title(), %summary, "metadata updated");
        Ok(ServiceStatus::applied(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(json: &str) -> MetadataUpdateService {
        let config: MetadataRulesConfig = serde_json::from_str(json).unwrap();
        MetadataUpdateService::new(&config).unwrap()
    }

    #[tokio::test]
    async fn empty_rules_skip() {
        let svc = service("{}");
        let mut item = MediaItem::new("id1", "Dune");
        let status = svc.execute(&mut item).await.unwrap();
        assert_eq!(status, ServiceStatus::skipped("no rules configured"));
    }

    #[tokio::test]
    async fn matching_rule_applies() {
        let svc = service(
            r#"{
                "patterns": [{
                    "match_pattern": "live at",
                    "genres": {"new_genres": ["Concert"], "replace_existing": true}
                }]
            }"#,
        );
        let mut item = MediaItem::new("id1", "Band Live at Wembley");
        item.genres = vec!["Music".into()];

        let status = svc.execute(&mut item).await.unwrap();
        match status {
            ServiceStatus::Applied { summary } => assert!(summary.contains("Concert")),
            other => panic!("expected applied, got {other:?}"),
        }
        assert_eq!(item.genres, vec!["Concert"]);
    }

    #[tokio::test]
    async fn execute_is_idempotent() {
        let svc = service(
            r#"{
                "patterns": [{
                    "match_pattern": "Dune",
                    "genres": {"new_genres": ["Sci-Fi"]}
                }]
            }"#,
        );
        let mut item = MediaItem::new("id1", "Dune");

        let first = svc.execute(&mut item).await.unwrap();
        assert!(matches!(first, ServiceStatus::Applied { .. }));

        // Second run finds nothing left to do.
        let second = svc.execute(&mut item).await.unwrap();
        assert!(matches!(second, ServiceStatus::Skipped { .. }));
        assert_eq!(item.genres, vec!["Sci-Fi"]);
    }

    #[test]
    fn bad_pattern_fails_construction() {
        let config: MetadataRulesConfig =
            serde_json::from_str(r#"{"patterns": [{"match_pattern": "("}]}"#).unwrap();
        let err = MetadataUpdateService::new(&config).unwrap_err();
        assert!(err.is_config());
    }
}
