//! Media track clean service: strips unwanted audio and subtitle tracks.
//!
//! The file is probed, a retained stream set is computed from the keep
//! rules, and the file is remuxed (stream copy) when anything would be
//! removed. A track type is never emptied: if the rules would drop every
//! audio (or subtitle) track, the first one of that type survives.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use mh_core::config::TrackCleanConfig;
use mh_core::MediaItem;
use mh_av::probe::{MediaStream, Prober, StreamKind};
use mh_av::{remux, ToolRegistry, Workspace};

use crate::service::{Service, ServiceStatus};

/// Result of computing which streams to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSelection {
    /// Container indices of retained streams, in stream order.
    pub keep: Vec<u32>,
    /// Number of audio streams that would be removed.
    pub audio_removed: usize,
    /// Number of subtitle streams that would be removed.
    pub subs_removed: usize,
}

impl StreamSelection {
    /// Whether the selection removes anything at all.
    pub fn removes_anything(&self) -> bool {
        self.audio_removed + self.subs_removed > 0
    }
}

/// Compute the retained stream set for a file.
///
/// Video streams are always kept. An audio or subtitle stream is kept when
/// any keep rule matches it; if no stream of a type survives the rules, the
/// first stream of that type is kept instead.
pub fn select_streams(streams: &[MediaStream], config: &TrackCleanConfig) -> StreamSelection {
    let mut keep: Vec<u32> = Vec::new();
    let mut audio_kept = 0usize;
    let mut audio_total = 0usize;
    let mut subs_kept = 0usize;
    let mut subs_total = 0usize;

    for stream in streams {
        let retained = match stream.kind {
            StreamKind::Video => true,
            StreamKind::Audio => {
                audio_total += 1;
                let r = (config.keep_original && stream.original)
                    || (config.keep_default && stream.default)
                    || stream.language_in(&config.keep_audio_langs);
                if r {
                    audio_kept += 1;
                }
                r
            }
            StreamKind::Subtitle => {
                subs_total += 1;
                let r = (config.keep_original && stream.original)
                    || (config.keep_default && stream.default)
                    || stream.language_in(&config.keep_sub_langs);
                if r {
                    subs_kept += 1;
                }
                r
            }
        };
        if retained {
            keep.push(stream.index);
        }
    }

    // Never leave a file without any audio (or wipe out all subtitles): fall
    // back to the first stream of the type.
    if audio_total > 0 && audio_kept == 0 {
        if let Some(first) = streams.iter().find(|s| s.kind == StreamKind::Audio) {
            keep.push(first.index);
            keep.sort_unstable();
            audio_kept = 1;
        }
    }
    if subs_total > 0 && subs_kept == 0 {
        if let Some(first) = streams.iter().find(|s| s.kind == StreamKind::Subtitle) {
            keep.push(first.index);
            keep.sort_unstable();
            subs_kept = 1;
        }
    }

    StreamSelection {
        keep,
        audio_removed: audio_total - audio_kept,
        subs_removed: subs_total - subs_kept,
    }
}

/// Removes audio and subtitle tracks that match no keep rule.
#[derive(Debug)]
pub struct MediaTrackCleanService {
    config: TrackCleanConfig,
    tools: Arc<ToolRegistry>,
    scratch_root: PathBuf,
}

impl MediaTrackCleanService {
    pub fn new(config: TrackCleanConfig, tools: Arc<ToolRegistry>, scratch_root: PathBuf) -> Self {
        Self {
            config,
            tools,
            scratch_root,
        }
    }
}

#[async_trait]
impl Service for MediaTrackCleanService {
    fn name(&self) -> &'static str {
        "media_track_clean"
    }

    async fn execute(&self, item: &mut MediaItem) -> mh_core::Result<ServiceStatus> {
        let Some(file) = item.file_path.clone() else {
            return Ok(ServiceStatus::skipped("no media file on disk"));
        };

        let prober = Prober::new(&self.tools)?;
        let streams = prober.streams(&file).await?;
        let selection = select_streams(&streams, &self.config);

        if !selection.removes_anything() {
            return Ok(ServiceStatus::skipped("no tracks to remove"));
        }

        let ws = Workspace::new(&file, &self.scratch_root)?;
        remux::remux_streams(&self.tools, ws.input(), &ws.output(), &selection.keep).await?;
        ws.finalize(None)?;

        let summary = format!(
            "removed {} audio and {} subtitle track(s)",
            selection.audio_removed, selection.subs_removed
        );
        item.record(&summary);
        info!(item = %item.display_title(), %summary, "track clean complete");
        Ok(ServiceStatus::applied(summary))
    }
}
