//! Dolby Vision conversion service: profile 7 to profile 8.
//!
//! Only files whose video stream carries a DOVI configuration record with
//! profile 7 are touched; everything else is reported as skipped, which makes
//! a second run over an already converted file a no-op. All intermediates
//! live in a job-unique scratch directory that is removed when the job ends,
//! successful or not.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use mh_core::config::DoviConfig;
use mh_core::MediaItem;
use mh_av::probe::{dv_profile, MediaStream, Prober};
use mh_av::{dovi, ToolRegistry, Workspace};

use crate::service::{Service, ServiceStatus};

/// Decide from the probed streams whether a file needs conversion.
///
/// Returns the skip status for files with no Dolby Vision metadata or a
/// profile other than 7. Since a converted file probes as profile 8, running
/// the service again over its own output lands in the skip arm.
pub fn conversion_gate(streams: &[MediaStream]) -> Option<ServiceStatus> {
    match dv_profile(streams) {
        None => Some(ServiceStatus::skipped("no Dolby Vision metadata")),
        Some(7) => None,
        Some(profile) => Some(ServiceStatus::skipped(format!(
            "profile {profile}, nothing to convert"
        ))),
    }
}

/// Converts Dolby Vision profile 7 files to profile 8 in place.
#[derive(Debug)]
pub struct DoviConversionService {
    tools: Arc<ToolRegistry>,
    scratch_root: PathBuf,
}

impl DoviConversionService {
    pub fn new(config: DoviConfig, tools: Arc<ToolRegistry>, scratch_root: PathBuf) -> Self {
        let scratch_root = config.temp_dir.unwrap_or(scratch_root);
        Self {
            tools,
            scratch_root,
        }
    }
}

#[async_trait]
impl Service for DoviConversionService {
    fn name(&self) -> &'static str {
        "dovi_conversion"
    }

    async fn execute(&self, item: &mut MediaItem) -> mh_core::Result<ServiceStatus> {
        let Some(file) = item.file_path.clone() else {
            return Ok(ServiceStatus::skipped("no media file on disk"));
        };

        let prober = Prober::new(&self.tools)?;
        let streams = prober.streams(&file).await?;
        if let Some(status) = conversion_gate(&streams) {
            return Ok(status);
        }

        info!(item = %item.display_title(), "converting Dolby Vision profile 7 to 8");

        let ws = Workspace::new(&file, &self.scratch_root)?;

        let video = dovi::extract_video(&self.tools, &ws)
            .await
            .map_err(|e| step_error("extracting", e))?;
        let el = dovi::demux_enhancement_layer(&self.tools, &ws, &video)
            .await
            .map_err(|e| step_error("extracting", e))?;

        let bl_rpu = dovi::extract_rpu(&self.tools, &ws, &video, "BL")
            .await
            .map_err(|e| step_error("extracting", e))?;
        let el_rpu = dovi::extract_rpu(&self.tools, &ws, &el, "EL")
            .await
            .map_err(|e| step_error("extracting", e))?;
        if !dovi::layers_in_sync(&bl_rpu, &el_rpu)? {
            warn!(item = %item.display_title(), "base and enhancement layer RPUs differ");
            return Ok(ServiceStatus::skipped(
                "base and enhancement layer out of sync",
            ));
        }

        let p8 = dovi::convert_to_profile8(&self.tools, &ws, &video)
            .await
            .map_err(|e| step_error("converting", e))?;
        dovi::merge_with_original(&self.tools, &ws, &p8)
            .await
            .map_err(|e| step_error("remuxing", e))?;
        ws.finalize(None).map_err(|e| step_error("replacing", e))?;

        let summary = "converted Dolby Vision profile 7 to 8".to_string();
        item.record(&summary);
        info!(item = %item.display_title(), "Dolby Vision conversion complete");
        Ok(ServiceStatus::applied(summary))
    }
}

/// Wrap a step failure so the outcome names the pipeline step.
fn step_error(step: &str, source: mh_core::Error) -> mh_core::Error {
    mh_core::Error::pipeline(step, source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mh_av::probe::StreamKind;

    fn video(dv_profile: Option<u8>) -> MediaStream {
        MediaStream {
            index: 0,
            kind: StreamKind::Video,
            codec: "hevc".to_string(),
            language: "und".to_string(),
            default: true,
            original: false,
            forced: false,
            dv_profile,
        }
    }

    fn audio() -> MediaStream {
        MediaStream {
            index: 1,
            kind: StreamKind::Audio,
            codec: "truehd".to_string(),
            language: "eng".to_string(),
            default: true,
            original: true,
            forced: false,
            dv_profile: None,
        }
    }

    #[test]
    fn file_without_dovi_metadata_skips() {
        let status = conversion_gate(&[video(None), audio()]);
        assert_eq!(
            status,
            Some(ServiceStatus::skipped("no Dolby Vision metadata"))
        );
    }

    #[test]
    fn profile_8_skips_so_a_second_run_is_a_noop() {
        // A converted file probes as profile 8.
        let status = conversion_gate(&[video(Some(8)), audio()]);
        assert_eq!(
            status,
            Some(ServiceStatus::skipped("profile 8, nothing to convert"))
        );
    }

    #[test]
    fn profile_7_proceeds_to_conversion() {
        assert_eq!(conversion_gate(&[video(Some(7)), audio()]), None);
    }

    #[test]
    fn audio_only_file_skips() {
        let status = conversion_gate(&[audio()]);
        assert_eq!(
            status,
            Some(ServiceStatus::skipped("no Dolby Vision metadata"))
        );
    }

    fn service() -> DoviConversionService {
        let tools = Arc::new(ToolRegistry::discover(
            &mh_core::config::ToolsConfig::default(),
        ));
        DoviConversionService::new(DoviConfig::default(), tools, std::env::temp_dir())
    }

    #[tokio::test]
    async fn missing_file_skips() {
        let svc = service();
        let mut item = MediaItem::new("id1", "Dune");
        let status = svc.execute(&mut item).await.unwrap();
        assert_eq!(status, ServiceStatus::skipped("no media file on disk"));
        assert!(!item.is_modified());
    }

    #[test]
    fn temp_dir_override_wins() {
        let tools = Arc::new(ToolRegistry::discover(
            &mh_core::config::ToolsConfig::default(),
        ));
        let config = DoviConfig {
            temp_dir: Some(PathBuf::from("/tmp/dovi-scratch")),
        };
        let svc = DoviConversionService::new(config, tools, PathBuf::from("/tmp/default"));
        assert_eq!(svc.scratch_root, PathBuf::from("/tmp/dovi-scratch"));
    }
}
