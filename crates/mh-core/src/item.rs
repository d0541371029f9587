//! The media item processing context.
//!
//! A [`MediaItem`] is built from an inbound webhook event and threaded through
//! every service in a pipeline. Services mutate it in place; metadata lists
//! are kept free of case-insensitive duplicates, and every effective change
//! is recorded so the pipeline outcome can report what actually happened.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::MatchField;

/// A media library item being processed by a pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    /// Library identifier of the item.
    pub item_id: String,
    /// Display name.
    pub name: String,
    /// Release year, when known.
    pub year: Option<i32>,
    /// Plot summary / description.
    pub overview: Option<String>,
    /// Genre list; no case-insensitive duplicates.
    pub genres: Vec<String>,
    /// Tag list; no case-insensitive duplicates.
    pub tags: Vec<String>,
    /// Resolved media file on disk, when one was found.
    pub file_path: Option<PathBuf>,
    changes: Vec<String>,
}

impl MediaItem {
    /// Create a new item with empty metadata.
    pub fn new(item_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            year: None,
            overview: None,
            genres: Vec::new(),
            tags: Vec::new(),
            file_path: None,
            changes: Vec::new(),
        }
    }

    /// Display title in `Name (Year)` form, or just the name when the year
    /// is unknown.
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({year})", self.name),
            None => self.name.clone(),
        }
    }

    /// The text of the field a pattern rule matches against.
    pub fn field_text(&self, field: MatchField) -> Option<&str> {
        match field {
            MatchField::Name => Some(&self.name),
            MatchField::Overview => self.overview.as_deref(),
        }
    }

    /// Replace the genre list outright.
    ///
    /// The new list is deduplicated case-insensitively, first occurrence
    /// wins. Returns `true` if the list actually changed.
    pub fn replace_genres(&mut self, genres: &[String]) -> bool {
        let new = dedupe(genres);
        if new == self.genres {
            return false;
        }
        self.genres = new;
        self.record(format!("genres replaced: [{}]", self.genres.join(", ")));
        true
    }

    /// Merge genres into the existing list.
    ///
    /// Existing entries keep their position and casing; a candidate is
    /// appended only if no case-insensitive equal is already present.
    /// Returns `true` if anything was added.
    pub fn merge_genres(&mut self, genres: &[String]) -> bool {
        let added = merge_into(&mut self.genres, genres);
        if !added.is_empty() {
            self.record(format!("genres added: [{}]", added.join(", ")));
        }
        !added.is_empty()
    }

    /// Replace the tag list outright. See [`MediaItem::replace_genres`].
    pub fn replace_tags(&mut self, tags: &[String]) -> bool {
        let new = dedupe(tags);
        if new == self.tags {
            return false;
        }
        self.tags = new;
        self.record(format!("tags replaced: [{}]", self.tags.join(", ")));
        true
    }

    /// Merge tags into the existing list. See [`MediaItem::merge_genres`].
    pub fn merge_tags(&mut self, tags: &[String]) -> bool {
        let added = merge_into(&mut self.tags, tags);
        if !added.is_empty() {
            self.record(format!("tags added: [{}]", added.join(", ")));
        }
        !added.is_empty()
    }

    /// Record a change made by a service.
    pub fn record(&mut self, change: impl Into<String>) {
        self.changes.push(change.into());
    }

    /// Whether any service has made an effective change to this item.
    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }

    /// All recorded changes, in order.
    pub fn changes(&self) -> &[String] {
        &self.changes
    }
}

/// Deduplicate case-insensitively, keeping the first occurrence's casing.
fn dedupe(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !contains_ci(&out, value) {
            out.push(value.clone());
        }
    }
    out
}

/// Append candidates not already present (case-insensitive). Returns the
/// entries that were added.
fn merge_into(existing: &mut Vec<String>, candidates: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for candidate in candidates {
        if !contains_ci(existing, candidate) {
            existing.push(candidate.clone());
            added.push(candidate.clone());
        }
    }
    added
}

fn contains_ci(haystack: &[String], needle: &str) -> bool {
    haystack.iter().any(|v| v.eq_ignore_ascii_case(needle))
}
