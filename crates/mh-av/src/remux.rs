//! Stream-selective remuxing via ffmpeg.

use std::path::Path;

use tracing::debug;

use crate::tools::ToolRegistry;

/// Remux `input` into `output`, keeping only the streams whose container
/// indices appear in `keep`.
///
/// Streams are copied, never re-encoded, and container-level metadata is
/// carried over. The caller is responsible for including every stream that
/// must survive (video included).
pub async fn remux_streams(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    keep: &[u32],
) -> mh_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    debug!(input = %input.display(), keep = ?keep, "remuxing stream selection");

    let mut cmd = ffmpeg.command().args(["-y", "-i"]).arg(input);
    for index in keep {
        cmd = cmd.arg("-map").arg(format!("0:{index}"));
    }
    cmd.args(["-c", "copy", "-map_metadata", "0"])
        .arg(output)
        .run()
        .await?;

    Ok(())
}
