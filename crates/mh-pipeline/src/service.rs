//! The [`Service`] trait defines a single pipeline step.
//!
//! Each service inspects the media item (and usually its file on disk),
//! decides whether it applies, and mutates the item or file when it does.
//! Returning an error never aborts the pipeline; the orchestrator records
//! the failure and moves on to the next service.

use async_trait::async_trait;

use mh_core::MediaItem;

/// What a service did with an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// The service made a change.
    Applied {
        /// Human-readable summary of what was done.
        summary: String,
    },
    /// The service decided it has nothing to do for this item.
    Skipped {
        /// Why the service did not apply.
        reason: String,
    },
}

impl ServiceStatus {
    /// Shorthand for [`ServiceStatus::Applied`].
    pub fn applied(summary: impl Into<String>) -> Self {
        Self::Applied {
            summary: summary.into(),
        }
    }

    /// Shorthand for [`ServiceStatus::Skipped`].
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// A single step in a webhook pipeline.
#[async_trait]
pub trait Service: std::fmt::Debug + Send + Sync {
    /// The configuration name of this service (e.g. "metadata_update").
    fn name(&self) -> &'static str;

    /// Process one media item.
    ///
    /// Implementations must be idempotent: running twice on the same item
    /// must leave it in the same state as running once.
    async fn execute(&self, item: &mut MediaItem) -> mh_core::Result<ServiceStatus>;
}
