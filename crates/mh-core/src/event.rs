//! Inbound webhook event payloads.
//!
//! Media server webhooks deliver PascalCase JSON with genre and tag lists
//! flattened into comma-joined strings. [`ItemAddedEvent`] deserializes that
//! shape (accepting proper arrays too) and converts it into a [`MediaItem`],
//! resolving the media file on disk when the payload does not carry a path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{Error, Result};
use crate::item::MediaItem;

/// File extensions considered media files during path resolution.
const MEDIA_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi"];

/// An `item_added` webhook notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemAddedEvent {
    pub item_id: String,
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub tags: Vec<String>,
    /// File path, when the server includes one.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl ItemAddedEvent {
    /// Parse an event from its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] on malformed or incomplete payloads.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("event parse error: {e}")))
    }

    /// Library folder name for this item: `Name (Year)`, with colons
    /// replaced since they are not valid in folder names on all filesystems.
    pub fn folder_title(&self) -> String {
        let title = match self.year {
            Some(year) => format!("{} ({year})", self.name),
            None => self.name.clone(),
        };
        title.replace(':', " -")
    }

    /// Locate the media file for this item.
    ///
    /// If the payload carried a path that exists, that wins. Otherwise each
    /// configured base directory is checked for a `Name (Year)` folder
    /// containing a media file; a file whose name starts with the item name
    /// is preferred over extras sitting in the same folder.
    pub fn resolve_media_file(&self, media_paths: &[PathBuf]) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            if path.is_file() {
                return Some(path.clone());
            }
            debug!(path = %path.display(), "event path does not exist, falling back to search");
        }

        let folder = self.folder_title();
        for base in media_paths {
            let dir = base.join(&folder);
            if let Some(file) = first_media_file(&dir, &self.name) {
                return Some(file);
            }
        }
        None
    }

    /// Build the processing context for this event.
    pub fn to_media_item(&self, media_paths: &[PathBuf]) -> MediaItem {
        let mut item = MediaItem::new(&self.item_id, &self.name);
        item.year = self.year;
        item.overview = self.overview.clone();
        item.genres = self.genres.clone();
        item.tags = self.tags.clone();
        item.file_path = self.resolve_media_file(media_paths);
        if item.file_path.is_none() {
            debug!(item = %item.display_title(), "no media file found for item");
        }
        item
    }
}

/// Pick a media file from `dir`, preferring files named after the item.
fn first_media_file(dir: &Path, item_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_media_extension(p))
        .collect();
    candidates.sort();

    let prefix = item_name.replace(':', " -");
    candidates
        .iter()
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .cloned()
        .or_else(|| candidates.into_iter().next())
}

fn has_media_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MEDIA_EXTENSIONS.iter().any(|m| e.eq_ignore_ascii_case(m)))
}

/// Accept either a JSON array of strings or a single comma-joined string.
fn comma_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    let values = match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::List(list)) => list,
        Some(Raw::Joined(joined)) => joined.split(',').map(String::from).collect(),
    };
    Ok(values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect())
}
