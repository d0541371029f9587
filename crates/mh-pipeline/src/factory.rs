//! Service construction from configuration.
//!
//! Building a service does all the expensive validation up front: rule
//! patterns are compiled and required tools are looked up, so an invalid
//! pipeline is rejected before the worker accepts a single event.

use std::path::Path;
use std::sync::Arc;

use mh_core::config::{ServiceConfig, ServiceSpec};
use mh_av::ToolRegistry;

use crate::service::Service;
use crate::services::{DoviConversionService, MediaTrackCleanService, MetadataUpdateService};

/// Build the service chain for one webhook, in the given order.
///
/// # Errors
///
/// - [`mh_core::Error::Config`] when a rule pattern does not compile.
/// - [`mh_core::Error::Tool`] when a service's required tool was not found
///   during discovery.
pub fn build_services(
    specs: &[&ServiceSpec],
    tools: &Arc<ToolRegistry>,
    scratch_root: &Path,
) -> mh_core::Result<Vec<Box<dyn Service>>> {
    let mut services: Vec<Box<dyn Service>> = Vec::with_capacity(specs.len());

    for spec in specs {
        match &spec.service {
            ServiceConfig::MetadataUpdate(config) => {
                services.push(Box::new(MetadataUpdateService::new(config)?));
            }
            ServiceConfig::MediaTrackClean(config) => {
                for tool in ["ffprobe", "ffmpeg"] {
                    tools.require(tool)?;
                }
                services.push(Box::new(MediaTrackCleanService::new(
                    config.clone(),
                    Arc::clone(tools),
                    scratch_root.to_path_buf(),
                )));
            }
            ServiceConfig::DoviConversion(config) => {
                for tool in ["ffprobe", "mkvextract", "mkvmerge", "dovi_tool"] {
                    tools.require(tool)?;
                }
                services.push(Box::new(DoviConversionService::new(
                    config.clone(),
                    Arc::clone(tools),
                    scratch_root.to_path_buf(),
                )));
            }
        }
    }

    Ok(services)
}
