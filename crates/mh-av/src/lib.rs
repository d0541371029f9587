//! # mh-av
//!
//! Audio/video processing and external tool management for the mediahook
//! pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery and invocation** ([`ToolRegistry`], [`ToolCommand`]) --
//!   find and cache paths to ffmpeg, ffprobe, mkvextract, mkvmerge, and
//!   dovi_tool, and run them with timeouts and captured output.
//! - **Workspace management** ([`Workspace`]) -- job-unique scratch directory
//!   lifecycle with atomic finalization.
//! - **Stream probing** ([`probe::Prober`]) -- ffprobe-backed stream metadata
//!   including Dolby Vision profile detection.
//! - **Operations** -- stream-selective remuxing ([`remux`]) and the Dolby
//!   Vision profile 7 to 8 conversion steps ([`dovi`]).

pub mod dovi;
pub mod probe;
pub mod remux;
pub mod tools;
pub mod workspace;

pub use probe::{MediaStream, Prober, StreamKind};
pub use tools::{ToolCommand, ToolConfig, ToolOutput, ToolRegistry};
pub use workspace::Workspace;
