//! Built-in pipeline services.

pub mod dovi;
pub mod metadata_update;
pub mod track_clean;

pub use dovi::DoviConversionService;
pub use metadata_update::MetadataUpdateService;
pub use track_clean::MediaTrackCleanService;
