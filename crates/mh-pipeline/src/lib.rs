//! # mh-pipeline
//!
//! Webhook pipeline orchestration for mediahook.
//!
//! The [`Orchestrator`] is built once from the worker configuration: every
//! webhook's service list is validated and constructed eagerly (rules
//! compiled, tools checked), so configuration mistakes surface at startup
//! instead of mid-event. At event time, services run in priority order and
//! failures are isolated per service.

pub mod factory;
pub mod orchestrator;
pub mod outcome;
pub mod service;
pub mod services;

pub use orchestrator::Orchestrator;
pub use outcome::{Outcome, PipelineOutcome, PipelineStatus, ServiceOutcome};
pub use service::{Service, ServiceStatus};
