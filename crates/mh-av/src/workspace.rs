//! Workspace management for media operations.
//!
//! A [`Workspace`] provides a job-unique scratch directory for intermediate
//! files and manages the input/output lifecycle with atomic finalization.
//! The scratch directory is removed when the workspace is dropped, whether
//! the job succeeded or not.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Workspace for a single media operation.
///
/// # Example
///
/// ```no_run
/// use mh_av::Workspace;
/// use std::path::Path;
///
/// # fn example() -> mh_core::Result<()> {
/// let ws = Workspace::new(Path::new("/media/movie.mkv"), Path::new("/tmp/mediahook"))?;
/// // ... write the processed file to ws.output() ...
/// ws.finalize(None)?;
/// # Ok(())
/// # }
/// ```
pub struct Workspace {
    temp_dir: TempDir,
    input_path: PathBuf,
}

impl Workspace {
    /// Create a new workspace for processing a file.
    ///
    /// A fresh scratch directory is created under `scratch_root` (created if
    /// needed), so concurrent jobs never share intermediate files.
    pub fn new(input: &Path, scratch_root: &Path) -> mh_core::Result<Self> {
        std::fs::create_dir_all(scratch_root)?;
        let temp_dir = TempDir::with_prefix_in("job-", scratch_root).map_err(|e| {
            mh_core::Error::Tool {
                tool: "workspace".to_string(),
                message: format!("failed to create scratch dir: {e}"),
            }
        })?;

        Ok(Self {
            temp_dir,
            input_path: input.to_path_buf(),
        })
    }

    /// The original input file path.
    pub fn input(&self) -> &Path {
        &self.input_path
    }

    /// The output file path (same filename as input, inside the scratch dir).
    pub fn output(&self) -> PathBuf {
        let file_name = self
            .input_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("output"));
        self.temp_dir.path().join(file_name)
    }

    /// Path to the scratch directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a path for a named intermediate file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Finalize the workspace: replace the input file with the output file.
    ///
    /// The output is first staged into a hidden sibling of the destination
    /// (so the final step is a rename on the destination filesystem), then
    /// moved into place. If `backup_ext` is `Some("bak")` and the original
    /// exists, it is renamed to `<original>.bak` first.
    ///
    /// Returns the final path (the original input location).
    ///
    /// # Errors
    ///
    /// Returns an error if the output file does not exist or if any rename
    /// operation fails. The original file is untouched unless staging
    /// succeeded.
    pub fn finalize(self, backup_ext: Option<&str>) -> mh_core::Result<PathBuf> {
        let output = self.output();
        let dest = &self.input_path;

        if !output.exists() {
            return Err(mh_core::Error::Tool {
                tool: "workspace".to_string(),
                message: format!("output file does not exist: {}", output.display()),
            });
        }

        // Stage next to the destination so the final rename cannot cross
        // filesystems.
        let staged = staging_path(dest);
        if let Err(_rename_err) = std::fs::rename(&output, &staged) {
            std::fs::copy(&output, &staged).map_err(|e| mh_core::Error::Tool {
                tool: "workspace".to_string(),
                message: format!("failed to stage output: {e}"),
            })?;
            let _ = std::fs::remove_file(&output);
        }

        // Backup original if requested and it exists.
        if let Some(ext) = backup_ext {
            if dest.exists() {
                let backup = dest.with_extension(ext);
                if let Err(e) = std::fs::rename(dest, &backup) {
                    let _ = std::fs::remove_file(&staged);
                    return Err(mh_core::Error::Tool {
                        tool: "workspace".to_string(),
                        message: format!("failed to create backup: {e}"),
                    });
                }
            }
        }

        if let Err(e) = std::fs::rename(&staged, dest) {
            // Don't leave the hidden staging file in the media directory.
            let _ = std::fs::remove_file(&staged);
            return Err(mh_core::Error::Tool {
                tool: "workspace".to_string(),
                message: format!("failed to move output into place: {e}"),
            });
        }

        Ok(dest.clone())
    }
}

/// Hidden staging name in the destination's directory.
fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("output"))
        .to_string_lossy();
    dest.with_file_name(format!(".{name}.tmp"))
}
