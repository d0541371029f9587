//! FFprobe-backed stream metadata.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_streams` and maps
//! the JSON output into [`MediaStream`] records, including Dolby Vision
//! profile detection from the DOVI configuration record side data.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::tools::{ToolConfig, ToolRegistry};

/// Type of media stream within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// One stream of a media file, as reported by ffprobe.
#[derive(Debug, Clone)]
pub struct MediaStream {
    /// Stream index within the container.
    pub index: u32,
    /// Stream type.
    pub kind: StreamKind,
    /// Codec name (e.g. "hevc", "truehd", "subrip").
    pub codec: String,
    /// ISO 639 language code; "und" when the container does not say.
    pub language: String,
    /// Disposition flag: default track of its type.
    pub default: bool,
    /// Disposition flag: original-language track.
    pub original: bool,
    /// Disposition flag: forced (subtitles).
    pub forced: bool,
    /// Dolby Vision profile from the DOVI configuration record, if present.
    pub dv_profile: Option<u8>,
}

impl MediaStream {
    /// Whether this stream's language matches one of `langs`
    /// (case-insensitive).
    pub fn language_in(&self, langs: &[String]) -> bool {
        langs.iter().any(|l| l.eq_ignore_ascii_case(&self.language))
    }
}

/// Dolby Vision profile of the first video stream, if any.
pub fn dv_profile(streams: &[MediaStream]) -> Option<u8> {
    streams
        .iter()
        .find(|s| s.kind == StreamKind::Video)
        .and_then(|s| s.dv_profile)
}

/// A stream prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct Prober {
    ffprobe: ToolConfig,
}

impl Prober {
    /// Create a prober from the tool registry.
    ///
    /// # Errors
    ///
    /// Returns [`mh_core::Error::Tool`] if ffprobe was not discovered.
    pub fn new(tools: &ToolRegistry) -> mh_core::Result<Self> {
        Ok(Self {
            ffprobe: tools.require("ffprobe")?.clone(),
        })
    }

    /// Probe the streams of a media file.
    ///
    /// # Errors
    ///
    /// Returns [`mh_core::Error::Tool`] if ffprobe fails and
    /// [`mh_core::Error::Probe`] if its output cannot be parsed.
    pub async fn streams(&self, path: &Path) -> mh_core::Result<Vec<MediaStream>> {
        let output = self
            .ffprobe
            .command()
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .run()
            .await?;
        parse_streams(&output.stdout)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    original: u8,
    #[serde(default)]
    forced: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    side_data_type: Option<String>,
    dv_profile: Option<u8>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse ffprobe `-show_streams` JSON into [`MediaStream`] records.
///
/// Streams of other types (attachments, data) are skipped.
pub fn parse_streams(json_str: &str) -> mh_core::Result<Vec<MediaStream>> {
    let output: FfprobeOutput = serde_json::from_str(json_str)
        .map_err(|e| mh_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    let mut streams = Vec::new();
    for stream in output.streams {
        let kind = match stream.codec_type.as_deref() {
            Some("video") => StreamKind::Video,
            Some("audio") => StreamKind::Audio,
            Some("subtitle") => StreamKind::Subtitle,
            _ => continue,
        };

        let dv_profile = stream
            .side_data_list
            .iter()
            .find(|sd| sd.side_data_type.as_deref() == Some("DOVI configuration record"))
            .and_then(|sd| sd.dv_profile);

        streams.push(MediaStream {
            index: stream.index,
            kind,
            codec: stream.codec_name.unwrap_or_default(),
            language: stream.tags.language.unwrap_or_else(|| "und".to_string()),
            default: stream.disposition.default == 1,
            original: stream.disposition.original == 1,
            forced: stream.disposition.forced == 1,
            dv_profile,
        });
    }

    Ok(streams)
}
