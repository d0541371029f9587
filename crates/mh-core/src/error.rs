//! Unified error type for the mediahook worker.
//!
//! All crates funnel their failures into [`Error`]. Load-time problems
//! (bad configuration, unknown services, malformed rule patterns) use
//! [`Error::Config`] and prevent a pipeline from being registered at all;
//! everything else is recoverable at the pipeline level and is converted into
//! a per-service failure record by the orchestrator.

use std::fmt;

/// Unified error type covering all failure modes in mediahook.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration could not be loaded or validated (load-time, fatal).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "media file", "webhook").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Event or item data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, mkvmerge, dovi_tool, etc.) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing produced unusable output.
    #[error("Probe error: {0}")]
    Probe(String),

    /// A pipeline step failed.
    #[error("Pipeline error [{step}]: {message}")]
    Pipeline {
        /// The pipeline step that failed.
        step: String,
        /// Human-readable error description.
        message: String,
    },
}

impl Error {
    /// Convenience constructor for [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pipeline {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Whether this error is fatal at configuration-load time.
    ///
    /// Load-time errors prevent a pipeline from being registered; all other
    /// variants are recoverable at the pipeline level.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display() {
        let err = Error::config("unknown service: playlist_sync");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown service: playlist_sync"
        );
        assert!(err.is_config());
    }

    #[test]
    fn not_found_display() {
        let err = Error::not_found("media file", "/media/movies/Dune (2021)");
        assert_eq!(err.to_string(), "media file not found: /media/movies/Dune (2021)");
        assert!(!err.is_config());
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("found more than one video".into());
        assert_eq!(err.to_string(), "Validation error: found more than one video");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
    }

    #[test]
    fn probe_display() {
        let err = Error::Probe("ffprobe JSON parse error".into());
        assert_eq!(err.to_string(), "Probe error: ffprobe JSON parse error");
    }

    #[test]
    fn pipeline_display() {
        let err = Error::pipeline("remuxing", "mkvmerge failed");
        assert_eq!(err.to_string(), "Pipeline error [remuxing]: mkvmerge failed");
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);
    }
}
