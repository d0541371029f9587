//! Worker configuration types.
//!
//! The top-level [`WorkerConfig`] is deserialized from JSON and maps webhook
//! ids to ordered service pipelines. Service entries carry a tagged
//! configuration union ([`ServiceConfig`]): the service name is resolved
//! against a closed set of known implementations during deserialization, so
//! an unknown name is rejected when the file is loaded, never at event time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_PRIORITY: i32 = 100;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Top-level WorkerConfig
// ---------------------------------------------------------------------------

/// Root worker configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Base directories searched when an event does not carry a file path.
    pub media_paths: Vec<PathBuf>,
    /// Root directory for job-unique scratch directories.
    pub scratch_dir: Option<PathBuf>,
    /// External tool path overrides and timeout.
    pub tools: ToolsConfig,
    /// Webhook pipelines keyed by webhook id (e.g. "item_added").
    pub webhooks: BTreeMap<String, WebhookConfig>,
}

impl WorkerConfig {
    /// Deserialize a `WorkerConfig` from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed JSON, unknown service names, or
    /// invalid service config blocks.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Return the configuration for a webhook, if one is defined.
    pub fn webhook(&self, webhook_id: &str) -> Option<&WebhookConfig> {
        self.webhooks.get(webhook_id)
    }

    /// Scratch directory root, falling back to the system temp directory.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mediahook"))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.media_paths.is_empty() {
            warnings.push(
                "media_paths is empty; events without an explicit path cannot be resolved".into(),
            );
        }

        for (id, webhook) in &self.webhooks {
            if webhook.enabled && webhook.services.is_empty() {
                warnings.push(format!("webhook '{id}' is enabled but has no services"));
            }
            for spec in &webhook.services {
                if let ServiceConfig::MediaTrackClean(cfg) = &spec.service {
                    if !cfg.keep_original
                        && !cfg.keep_default
                        && cfg.keep_audio_langs.is_empty()
                        && cfg.keep_sub_langs.is_empty()
                    {
                        warnings.push(format!(
                            "webhook '{id}': media_track_clean retains nothing; \
                             only first-track fallbacks will survive"
                        ));
                    }
                }
            }
        }

        warnings
    }
}

/// Paths to external CLI tools and their execution timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub mkvextract_path: Option<PathBuf>,
    pub mkvmerge_path: Option<PathBuf>,
    pub dovi_tool_path: Option<PathBuf>,
    /// Maximum execution time for any single tool invocation, in seconds.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            mkvextract_path: None,
            mkvmerge_path: None,
            dovi_tool_path: None,
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Webhook pipelines
// ---------------------------------------------------------------------------

/// One webhook pipeline: an ordered set of services bound to an event type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Whether events for this webhook are processed at all.
    pub enabled: bool,
    /// Source queue identifier; consumed opaquely by the caller.
    pub queue: Option<String>,
    /// Configured services, in declaration order.
    pub services: Vec<ServiceSpec>,
}

impl WebhookConfig {
    /// Enabled services sorted by priority ascending.
    ///
    /// The sort is stable: equal priorities keep their declaration order.
    pub fn enabled_services(&self) -> Vec<&ServiceSpec> {
        let mut services: Vec<&ServiceSpec> =
            self.services.iter().filter(|s| s.enabled).collect();
        services.sort_by_key(|s| s.priority);
        services
    }
}

/// One configured pipeline step.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawServiceSpec")]
pub struct ServiceSpec {
    /// Whether this service runs.
    pub enabled: bool,
    /// Execution priority; lower values run first.
    pub priority: i32,
    /// The service kind and its strongly-typed configuration.
    pub service: ServiceConfig,
}

/// Known service kinds with their configuration payloads.
#[derive(Debug, Clone)]
pub enum ServiceConfig {
    /// Rewrite genres/tags from path and pattern rules.
    MetadataUpdate(MetadataRulesConfig),
    /// Remove unwanted audio/subtitle tracks.
    MediaTrackClean(TrackCleanConfig),
    /// Convert Dolby Vision profile 7 to profile 8.
    DoviConversion(DoviConfig),
}

impl ServiceConfig {
    /// The configuration name of this service kind.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceConfig::MetadataUpdate(_) => "metadata_update",
            ServiceConfig::MediaTrackClean(_) => "media_track_clean",
            ServiceConfig::DoviConversion(_) => "dovi_conversion",
        }
    }
}

/// Raw on-disk shape of a service entry, before name resolution.
#[derive(Debug, Deserialize)]
struct RawServiceSpec {
    name: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_priority")]
    priority: i32,
    #[serde(default)]
    config: serde_json::Value,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl TryFrom<RawServiceSpec> for ServiceSpec {
    type Error = String;

    fn try_from(raw: RawServiceSpec) -> std::result::Result<Self, Self::Error> {
        // An absent config block means "all defaults".
        let config = if raw.config.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            raw.config
        };

        let service = match raw.name.as_str() {
            "metadata_update" => serde_json::from_value(config)
                .map(ServiceConfig::MetadataUpdate)
                .map_err(|e| format!("metadata_update config: {e}"))?,
            "media_track_clean" => serde_json::from_value(config)
                .map(ServiceConfig::MediaTrackClean)
                .map_err(|e| format!("media_track_clean config: {e}"))?,
            "dovi_conversion" => serde_json::from_value(config)
                .map(ServiceConfig::DoviConversion)
                .map_err(|e| format!("dovi_conversion config: {e}"))?,
            other => return Err(format!("unknown service: {other}")),
        };

        Ok(ServiceSpec {
            enabled: raw.enabled,
            priority: raw.priority,
            service,
        })
    }
}

// ---------------------------------------------------------------------------
// Per-service configuration payloads
// ---------------------------------------------------------------------------

/// Configuration for the metadata update service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataRulesConfig {
    /// Path-prefix rules, evaluated first in declaration order.
    pub paths: Vec<PathRule>,
    /// Regex rules against item fields, evaluated after path rules.
    pub patterns: Vec<PatternRule>,
}

/// A rule that applies when the item path lies under a configured prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct PathRule {
    /// Directory prefix to match against the item's file path.
    pub path: PathBuf,
    #[serde(default)]
    pub genres: Option<GenreMutation>,
    #[serde(default)]
    pub tags: Option<TagMutation>,
}

/// A rule that applies when a regex matches a named item field.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRule {
    /// The item field the pattern is tested against.
    #[serde(default)]
    pub match_field: MatchField,
    /// Regular expression; compiled when the pipeline is built.
    pub match_pattern: String,
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
    #[serde(default)]
    pub genres: Option<GenreMutation>,
    #[serde(default)]
    pub tags: Option<TagMutation>,
}

/// Item fields a pattern rule can match against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum MatchField {
    #[default]
    Name,
    Overview,
}

/// Genre mutation carried by a matching rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenreMutation {
    pub new_genres: Vec<String>,
    pub replace_existing: bool,
}

/// Tag mutation carried by a matching rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagMutation {
    pub new_tags: Vec<String>,
    pub replace_existing: bool,
}

/// Configuration for the media track clean service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackCleanConfig {
    /// Keep tracks flagged as original-language.
    pub keep_original: bool,
    /// Keep tracks flagged as default.
    pub keep_default: bool,
    /// Audio language codes to retain.
    pub keep_audio_langs: Vec<String>,
    /// Subtitle language codes to retain.
    pub keep_sub_langs: Vec<String>,
}

impl Default for TrackCleanConfig {
    fn default() -> Self {
        Self {
            keep_original: true,
            keep_default: true,
            keep_audio_langs: Vec::new(),
            keep_sub_langs: Vec::new(),
        }
    }
}

/// Configuration for the Dolby Vision conversion service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DoviConfig {
    /// Scratch root override; falls back to the worker-wide scratch dir.
    pub temp_dir: Option<PathBuf>,
}
