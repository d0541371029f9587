//! Compiled metadata rule engine.
//!
//! Path rules are evaluated first, in declaration order, then pattern rules.
//! Every matching rule applies its mutations: `replace_existing` swaps the
//! list out, otherwise new entries are merged in case-insensitively. Later
//! rules see the result of earlier ones, so a replace followed by a merge
//! composes the way the declaration order reads.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use mh_core::config::{GenreMutation, MatchField, MetadataRulesConfig, TagMutation};
use mh_core::{Error, MediaItem, Result};

#[derive(Debug)]
struct CompiledPathRule {
    path: std::path::PathBuf,
    genres: Option<GenreMutation>,
    tags: Option<TagMutation>,
}

#[derive(Debug)]
struct CompiledPatternRule {
    field: MatchField,
    regex: Regex,
    genres: Option<GenreMutation>,
    tags: Option<TagMutation>,
}

/// A set of metadata rules compiled and ready to apply.
#[derive(Debug)]
pub struct MetadataRuleEngine {
    path_rules: Vec<CompiledPathRule>,
    pattern_rules: Vec<CompiledPatternRule>,
}

impl MetadataRuleEngine {
    /// Compile a rule set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for any pattern that is not a valid regular
    /// expression, naming the offending pattern.
    pub fn new(config: &MetadataRulesConfig) -> Result<Self> {
        let path_rules = config
            .paths
            .iter()
            .map(|rule| CompiledPathRule {
                path: rule.path.clone(),
                genres: rule.genres.clone(),
                tags: rule.tags.clone(),
            })
            .collect();

        let mut pattern_rules = Vec::with_capacity(config.patterns.len());
        for rule in &config.patterns {
            let regex = RegexBuilder::new(&rule.match_pattern)
                .case_insensitive(rule.case_insensitive)
                .build()
                .map_err(|e| {
                    Error::config(format!("invalid pattern '{}': {e}", rule.match_pattern))
                })?;
            pattern_rules.push(CompiledPatternRule {
                field: rule.match_field,
                regex,
                genres: rule.genres.clone(),
                tags: rule.tags.clone(),
            });
        }

        Ok(Self {
            path_rules,
            pattern_rules,
        })
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.path_rules.len() + self.pattern_rules.len()
    }

    /// Whether the engine has no rules at all.
    pub fn is_empty(&self) -> bool {
        self.path_rules.is_empty() && self.pattern_rules.is_empty()
    }

    /// Apply all matching rules to the item.
    ///
    /// Returns `true` if any mutation actually changed the item's metadata.
    pub fn apply(&self, item: &mut MediaItem) -> bool {
        let mut changed = false;

        for rule in &self.path_rules {
            let matches = item
                .file_path
                .as_deref()
                .is_some_and(|p| p.starts_with(&rule.path));
            if matches {
                debug!(item = %item.display_title(), path = %rule.path.display(), "path rule matched");
                changed |= apply_mutations(item, rule.genres.as_ref(), rule.tags.as_ref());
            }
        }

        for rule in &self.pattern_rules {
            let matches = item
                .field_text(rule.field)
                .is_some_and(|text| rule.regex.is_match(text));
            if matches {
                debug!(item = %item.display_title(), pattern = %rule.regex.as_str(), "pattern rule matched");
                changed |= apply_mutations(item, rule.genres.as_ref(), rule.tags.as_ref());
            }
        }

        changed
    }
}

fn apply_mutations(
    item: &mut MediaItem,
    genres: Option<&GenreMutation>,
    tags: Option<&TagMutation>,
) -> bool {
    let mut changed = false;
    if let Some(m) = genres {
        changed |= if m.replace_existing {
            item.replace_genres(&m.new_genres)
        } else {
            item.merge_genres(&m.new_genres)
        };
    }
    if let Some(m) = tags {
        changed |= if m.replace_existing {
            item.replace_tags(&m.new_tags)
        } else {
            item.merge_tags(&m.new_tags)
        };
    }
    changed
}
