//! # mh-rules
//!
//! Metadata rule evaluation for the mediahook pipeline.
//!
//! Rules are declared in configuration ([`mh_core::config::MetadataRulesConfig`])
//! and compiled into a [`MetadataRuleEngine`] when the pipeline is built, so
//! malformed patterns are rejected at load time.

pub mod engine;

pub use engine::MetadataRuleEngine;
