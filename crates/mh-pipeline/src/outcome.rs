//! Pipeline outcome reporting.
//!
//! Every handled event produces a [`PipelineOutcome`] with one record per
//! executed service, serializable for logs or an acknowledgement payload.

use serde::Serialize;

/// Overall result of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every service either applied or skipped.
    Completed,
    /// At least one service failed; the rest still ran.
    Partial,
    /// The pipeline exists but has no enabled services.
    NoServices,
    /// The webhook is unknown or disabled; nothing ran.
    Skipped,
}

/// What one service did with the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Applied { summary: String },
    Skipped { reason: String },
    Failed { error: String },
}

/// One service's record in the pipeline outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceOutcome {
    /// Service name.
    pub service: &'static str,
    /// What happened.
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Full record of one handled event.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// Webhook that was handled.
    pub webhook: String,
    /// Item identifier from the event.
    pub item_id: String,
    /// Overall status.
    pub status: PipelineStatus,
    /// Per-service records, in execution order.
    pub services: Vec<ServiceOutcome>,
}

impl PipelineOutcome {
    /// An outcome for an event whose webhook is unknown or disabled.
    pub fn skipped(webhook: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            webhook: webhook.into(),
            item_id: item_id.into(),
            status: PipelineStatus::Skipped,
            services: Vec::new(),
        }
    }

    /// Build an outcome from service records, deriving the overall status.
    pub fn from_services(
        webhook: impl Into<String>,
        item_id: impl Into<String>,
        services: Vec<ServiceOutcome>,
    ) -> Self {
        let status = if services.is_empty() {
            PipelineStatus::NoServices
        } else if services
            .iter()
            .any(|s| matches!(s.outcome, Outcome::Failed { .. }))
        {
            PipelineStatus::Partial
        } else {
            PipelineStatus::Completed
        };

        Self {
            webhook: webhook.into(),
            item_id: item_id.into(),
            status,
            services,
        }
    }

    /// Names of services that failed.
    pub fn failed_services(&self) -> Vec<&'static str> {
        self.services
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Failed { .. }))
            .map(|s| s.service)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(service: &'static str, outcome: Outcome) -> ServiceOutcome {
        ServiceOutcome { service, outcome }
    }

    #[test]
    fn empty_pipeline_is_no_services() {
        let outcome = PipelineOutcome::from_services("item_added", "id1", vec![]);
        assert_eq!(outcome.status, PipelineStatus::NoServices);
    }

    #[test]
    fn all_ok_is_completed() {
        let outcome = PipelineOutcome::from_services(
            "item_added",
            "id1",
            vec![
                record("metadata_update", Outcome::Applied { summary: "genres".into() }),
                record("dovi_conversion", Outcome::Skipped { reason: "not profile 7".into() }),
            ],
        );
        assert_eq!(outcome.status, PipelineStatus::Completed);
        assert!(outcome.failed_services().is_empty());
    }

    #[test]
    fn any_failure_is_partial() {
        let outcome = PipelineOutcome::from_services(
            "item_added",
            "id1",
            vec![
                record("metadata_update", Outcome::Applied { summary: "genres".into() }),
                record("media_track_clean", Outcome::Failed { error: "boom".into() }),
            ],
        );
        assert_eq!(outcome.status, PipelineStatus::Partial);
        assert_eq!(outcome.failed_services(), vec!["media_track_clean"]);
    }

    #[test]
    fn serializes_with_flattened_result() {
        let outcome = PipelineOutcome::from_services(
            "item_added",
            "id1",
            vec![record("metadata_update", Outcome::Skipped { reason: "no rules".into() })],
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["services"][0]["result"], "skipped");
        assert_eq!(json["services"][0]["reason"], "no rules");
    }
}
