//! The orchestrator: maps webhook events onto configured service chains.
//!
//! Pipelines are built eagerly at construction, so every configuration
//! problem (unknown service, bad rule pattern, missing tool) is a startup
//! failure. At event time the orchestrator never fails the whole pipeline
//! for one bad service: each failure becomes a per-service record and the
//! remaining services still run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};

use mh_core::{ItemAddedEvent, MediaItem, WorkerConfig};
use mh_av::ToolRegistry;

use crate::factory;
use crate::outcome::{Outcome, PipelineOutcome, ServiceOutcome};
use crate::service::{Service, ServiceStatus};

/// Dispatches webhook events to their configured service pipelines.
#[derive(Debug)]
pub struct Orchestrator {
    media_paths: Vec<PathBuf>,
    pipelines: HashMap<String, Vec<Box<dyn Service>>>,
}

impl Orchestrator {
    /// Build all enabled webhook pipelines from the worker configuration.
    ///
    /// Services run in priority order (ascending; ties keep declaration
    /// order). Disabled webhooks get no pipeline at all.
    ///
    /// # Errors
    ///
    /// Propagates the first construction error; the orchestrator either
    /// starts with every pipeline valid or not at all.
    pub fn new(config: &WorkerConfig, tools: Arc<ToolRegistry>) -> mh_core::Result<Self> {
        let scratch_root = config.scratch_root();
        let mut pipelines = HashMap::new();

        for (webhook_id, webhook) in &config.webhooks {
            if !webhook.enabled {
                debug!(webhook = %webhook_id, "webhook disabled, not building pipeline");
                continue;
            }
            let services =
                factory::build_services(&webhook.enabled_services(), &tools, &scratch_root)?;
            info!(
                webhook = %webhook_id,
                services = services.len(),
                "pipeline ready"
            );
            pipelines.insert(webhook_id.clone(), services);
        }

        Ok(Self {
            media_paths: config.media_paths.clone(),
            pipelines,
        })
    }

    /// Ids of webhooks with an active pipeline.
    pub fn webhooks(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }

    /// Handle a raw JSON event payload for a webhook.
    ///
    /// # Errors
    ///
    /// Returns [`mh_core::Error::Validation`] when the payload cannot be
    /// parsed; everything downstream is captured in the outcome instead.
    pub async fn handle_payload(
        &self,
        webhook_id: &str,
        payload: &str,
    ) -> mh_core::Result<PipelineOutcome> {
        let event = ItemAddedEvent::from_json(payload)?;
        Ok(self.handle_event(webhook_id, &event).await)
    }

    /// Handle a parsed event for a webhook.
    pub async fn handle_event(&self, webhook_id: &str, event: &ItemAddedEvent) -> PipelineOutcome {
        let Some(services) = self.pipelines.get(webhook_id) else {
            debug!(webhook = %webhook_id, "no active pipeline, skipping event");
            return PipelineOutcome::skipped(webhook_id, &event.item_id);
        };

        let mut item = event.to_media_item(&self.media_paths);
        self.run_services(webhook_id, services, &mut item).await
    }

    async fn run_services(
        &self,
        webhook_id: &str,
        services: &[Box<dyn Service>],
        item: &mut MediaItem,
    ) -> PipelineOutcome {
        let mut records = Vec::with_capacity(services.len());

        for service in services {
            let outcome = match service.execute(item).await {
                Ok(ServiceStatus::Applied { summary }) => {
                    info!(
                        webhook = %webhook_id,
                        service = service.name(),
                        item = %item.display_title(),
                        %summary,
                        "service applied"
                    );
                    Outcome::Applied { summary }
                }
                Ok(ServiceStatus::Skipped { reason }) => {
                    debug!(
                        webhook = %webhook_id,
                        service = service.name(),
                        item = %item.display_title(),
                        %reason,
                        "service skipped"
                    );
                    Outcome::Skipped { reason }
                }
                Err(e) => {
                    error!(
                        webhook = %webhook_id,
                        service = service.name(),
                        item = %item.display_title(),
                        error = %e,
                        "service failed, continuing with remaining services"
                    );
                    Outcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            records.push(ServiceOutcome {
                service: service.name(),
                outcome,
            });
        }

        PipelineOutcome::from_services(webhook_id, &item.item_id, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::PipelineStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // -- Fake services --------------------------------------------------------

    #[derive(Debug)]
    struct FakeService {
        name: &'static str,
        result: fn() -> mh_core::Result<ServiceStatus>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Service for FakeService {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn execute(&self, _item: &mut MediaItem) -> mh_core::Result<ServiceStatus> {
            self.log.lock().unwrap().push(self.name);
            (self.result)()
        }
    }

    fn fake(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        result: fn() -> mh_core::Result<ServiceStatus>,
    ) -> Box<dyn Service> {
        Box::new(FakeService {
            name,
            result,
            log: log.clone(),
        })
    }

    fn orchestrator_with(services: Vec<Box<dyn Service>>) -> Orchestrator {
        let mut pipelines = HashMap::new();
        pipelines.insert("item_added".to_string(), services);
        Orchestrator {
            media_paths: Vec::new(),
            pipelines,
        }
    }

    fn event() -> ItemAddedEvent {
        ItemAddedEvent::from_json(r#"{"ItemId": "id1", "Name": "Dune", "Year": 2021}"#).unwrap()
    }

    // -- Tests ----------------------------------------------------------------

    #[tokio::test]
    async fn unknown_webhook_is_skipped() {
        let orch = orchestrator_with(vec![]);
        let outcome = orch.handle_event("item_removed", &event()).await;
        assert_eq!(outcome.status, PipelineStatus::Skipped);
        assert!(outcome.services.is_empty());
    }

    #[tokio::test]
    async fn empty_pipeline_reports_no_services() {
        let orch = orchestrator_with(vec![]);
        let outcome = orch.handle_event("item_added", &event()).await;
        assert_eq!(outcome.status, PipelineStatus::NoServices);
    }

    #[tokio::test]
    async fn services_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orch = orchestrator_with(vec![
            fake("first", &log, || Ok(ServiceStatus::applied("done"))),
            fake("second", &log, || Ok(ServiceStatus::skipped("nothing"))),
            fake("third", &log, || Ok(ServiceStatus::applied("done"))),
        ]);

        let outcome = orch.handle_event("item_added", &event()).await;
        assert_eq!(outcome.status, PipelineStatus::Completed);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failure_does_not_stop_later_services() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orch = orchestrator_with(vec![
            fake("ok", &log, || Ok(ServiceStatus::applied("done"))),
            fake("boom", &log, || {
                Err(mh_core::Error::tool("ffmpeg", "exit code 1"))
            }),
            fake("after", &log, || Ok(ServiceStatus::applied("done"))),
        ]);

        let outcome = orch.handle_event("item_added", &event()).await;
        assert_eq!(outcome.status, PipelineStatus::Partial);
        assert_eq!(outcome.failed_services(), vec!["boom"]);
        // The service after the failure still ran.
        assert_eq!(*log.lock().unwrap(), vec!["ok", "boom", "after"]);
        match &outcome.services[1].outcome {
            Outcome::Failed { error } => assert!(error.contains("ffmpeg")),
            other => panic!("expected failure record, got {other:?}"),
        }
    }

    #[derive(Debug)]
    struct AddGenreService;

    #[async_trait]
    impl Service for AddGenreService {
        fn name(&self) -> &'static str {
            "metadata_update"
        }
        async fn execute(&self, item: &mut MediaItem) -> mh_core::Result<ServiceStatus> {
            item.merge_genres(&["Concert".to_string()]);
            Ok(ServiceStatus::applied("genres added"))
        }
    }

    #[tokio::test]
    async fn metadata_changes_survive_later_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let services: Vec<Box<dyn Service>> = vec![
            Box::new(AddGenreService),
            fake("media_track_clean", &log, || {
                Err(mh_core::Error::tool("ffmpeg", "exit code 1"))
            }),
        ];
        let orch = orchestrator_with(vec![]);

        let mut item = MediaItem::new("id1", "Live Concert Special");
        let outcome = orch.run_services("item_added", &services, &mut item).await;

        assert_eq!(outcome.status, PipelineStatus::Partial);
        // The earlier service's mutation is still present.
        assert_eq!(item.genres, vec!["Concert"]);
        assert!(item.is_modified());
    }

    #[tokio::test]
    async fn all_skipped_is_still_completed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orch = orchestrator_with(vec![
            fake("a", &log, || Ok(ServiceStatus::skipped("n/a"))),
            fake("b", &log, || Ok(ServiceStatus::skipped("n/a"))),
        ]);

        let outcome = orch.handle_event("item_added", &event()).await;
        assert_eq!(outcome.status, PipelineStatus::Completed);
    }

    #[tokio::test]
    async fn handle_payload_parses_then_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let orch = orchestrator_with(vec![fake("a", &log, || {
            Ok(ServiceStatus::applied("done"))
        })]);

        let outcome = orch
            .handle_payload("item_added", r#"{"ItemId": "id9", "Name": "Dune"}"#)
            .await
            .unwrap();
        assert_eq!(outcome.item_id, "id9");
        assert_eq!(outcome.status, PipelineStatus::Completed);

        let err = orch.handle_payload("item_added", "not json").await.unwrap_err();
        assert!(matches!(err, mh_core::Error::Validation(_)));
    }

    #[tokio::test]
    async fn disabled_webhook_builds_no_pipeline() {
        let config = WorkerConfig::from_json(
            r#"{
                "webhooks": {
                    "item_added": {
                        "enabled": false,
                        "services": [{"name": "metadata_update"}]
                    }
                }
            }"#,
        )
        .unwrap();
        let tools = Arc::new(ToolRegistry::discover(
            &mh_core::config::ToolsConfig::default(),
        ));
        let orch = Orchestrator::new(&config, tools).unwrap();
        assert_eq!(orch.webhooks().count(), 0);

        let outcome = orch.handle_event("item_added", &event()).await;
        assert_eq!(outcome.status, PipelineStatus::Skipped);
    }

    #[tokio::test]
    async fn construction_fails_on_bad_rule() {
        let config = WorkerConfig::from_json(
            r#"{
                "webhooks": {
                    "item_added": {
                        "enabled": true,
                        "services": [{
                            "name": "metadata_update",
                            "config": {"patterns": [{"match_pattern": "("}]}
                        }]
                    }
                }
            }"#,
        )
        .unwrap();
        let tools = Arc::new(ToolRegistry::discover(
            &mh_core::config::ToolsConfig::default(),
        ));
        let err = Orchestrator::new(&config, tools).unwrap_err();
        assert!(err.is_config());
    }
}
