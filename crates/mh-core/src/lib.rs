//! mh-core: shared types, errors, configuration, and the media item model.
//!
//! This crate is the foundational dependency for all other mh-* crates,
//! providing the unified error type, the worker configuration schema, the
//! [`MediaItem`] processing context, and inbound event payloads.

pub mod config;
pub mod error;
pub mod event;
pub mod item;
pub mod logging;

// Re-export the most commonly used items at the crate root.
pub use config::{ServiceConfig, ServiceSpec, WebhookConfig, WorkerConfig};
pub use error::{Error, Result};
pub use event::ItemAddedEvent;
pub use item::MediaItem;
