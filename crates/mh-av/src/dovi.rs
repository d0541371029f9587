//! Dolby Vision profile 7 to 8 conversion steps.
//!
//! The conversion runs entirely inside a [`Workspace`] scratch directory:
//!
//! 1. Extract the HEVC video track (mkvextract)
//! 2. Demux the enhancement layer (dovi_tool demux --el-only)
//! 3. Extract the RPU from both layers and compare SHA-512 digests to make
//!    sure base and enhancement layer are in sync
//! 4. Convert to profile 8, discarding the enhancement layer
//!    (dovi_tool -m 2 convert --discard)
//! 5. Remux the converted video with the original audio and subtitles
//!    (mkvmerge)

use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha512};
use tracing::debug;

use crate::tools::ToolRegistry;
use crate::workspace::Workspace;

/// Extract the HEVC video track from the workspace input into the scratch
/// directory.
pub async fn extract_video(tools: &ToolRegistry, ws: &Workspace) -> mh_core::Result<PathBuf> {
    let mkvextract = tools.require("mkvextract")?;
    let video = ws.temp_file("video.hevc");

    mkvextract
        .command()
        .arg(ws.input())
        .arg("tracks")
        .arg(format!("0:{}", video.display()))
        .run()
        .await?;

    Ok(video)
}

/// Demux the enhancement layer out of a dual-layer HEVC stream.
pub async fn demux_enhancement_layer(
    tools: &ToolRegistry,
    ws: &Workspace,
    video: &Path,
) -> mh_core::Result<PathBuf> {
    let dovi_tool = tools.require("dovi_tool")?;
    let el = ws.temp_file("EL.hevc");

    dovi_tool
        .command()
        .arg("demux")
        .arg(video)
        .args(["--el-only", "-e"])
        .arg(&el)
        .run()
        .await?;

    Ok(el)
}

/// Extract the RPU of an HEVC layer into `<name>.rpu` in the scratch dir.
pub async fn extract_rpu(
    tools: &ToolRegistry,
    ws: &Workspace,
    layer: &Path,
    name: &str,
) -> mh_core::Result<PathBuf> {
    let dovi_tool = tools.require("dovi_tool")?;
    let rpu = ws.temp_file(&format!("{name}.rpu"));

    dovi_tool
        .command()
        .args(["-m", "0", "extract-rpu"])
        .arg(layer)
        .arg("-o")
        .arg(&rpu)
        .run()
        .await?;

    Ok(rpu)
}

/// Whether the base and enhancement layer carry identical RPU data.
///
/// A mismatch means the layers drifted apart (bad mux) and converting would
/// bake wrong dynamic metadata into the output.
pub fn layers_in_sync(bl_rpu: &Path, el_rpu: &Path) -> mh_core::Result<bool> {
    let bl = sha512_file(bl_rpu)?;
    let el = sha512_file(el_rpu)?;
    debug!(bl = %bl, el = %el, "comparing layer RPU digests");
    Ok(bl == el)
}

/// Convert a profile 7 HEVC stream to profile 8, discarding the enhancement
/// layer.
pub async fn convert_to_profile8(
    tools: &ToolRegistry,
    ws: &Workspace,
    video: &Path,
) -> mh_core::Result<PathBuf> {
    let dovi_tool = tools.require("dovi_tool")?;
    let p8 = ws.temp_file("P8.hevc");

    dovi_tool
        .command()
        .args(["-m", "2", "convert", "--discard"])
        .arg(video)
        .arg("-o")
        .arg(&p8)
        .run()
        .await?;

    Ok(p8)
}

/// Merge the converted video with the audio and subtitles of the original
/// file, writing to the workspace output path.
pub async fn merge_with_original(
    tools: &ToolRegistry,
    ws: &Workspace,
    p8_video: &Path,
) -> mh_core::Result<PathBuf> {
    let mkvmerge = tools.require("mkvmerge")?;
    let output = ws.output();

    mkvmerge
        .command()
        .arg("--output")
        .arg(&output)
        .arg(p8_video)
        .arg("--no-video")
        .arg(ws.input())
        .run()
        .await?;

    Ok(output)
}

/// SHA-512 digest of a file, streamed in 1 MiB chunks.
pub fn sha512_file(path: &Path) -> mh_core::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
