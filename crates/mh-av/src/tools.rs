//! External tool discovery and invocation.
//!
//! The [`ToolRegistry`] resolves the CLI tools the pipeline shells out to
//! (ffmpeg, ffprobe, mkvextract, mkvmerge, dovi_tool) once at worker startup,
//! from config overrides or `PATH`, so a pipeline that needs a missing tool
//! is rejected before any event is processed. A resolved [`ToolConfig`] is
//! the only way to build a [`ToolCommand`], which runs the tool with the
//! configured timeout and captured output.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

use mh_core::config::ToolsConfig;

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "mkvextract", "mkvmerge", "dovi_tool"];

/// Configuration for a single external tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time before the tool is killed.
    pub timeout: Duration,
}

impl ToolConfig {
    /// Start building an invocation of this tool.
    pub fn command(&self) -> ToolCommand {
        ToolCommand {
            tool: self.name.clone(),
            program: self.path.clone(),
            args: Vec::new(),
            timeout: self.timeout,
        }
    }
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`ToolsConfig`] supplies a custom path
    /// **and** that path exists, it is used directly. Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`. Tools that are
    /// not found are silently omitted from the registry.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let timeout = Duration::from_secs(tools_config.timeout_secs);
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                "mkvextract" => tools_config.mkvextract_path.as_deref(),
                "mkvmerge" => tools_config.mkvmerge_path.as_deref(),
                "dovi_tool" => tools_config.dovi_tool_path.as_deref(),
                _ => None,
            };

            let resolved = if let Some(p) = custom_path {
                if p.exists() {
                    Some(p.to_path_buf())
                } else {
                    // Custom path does not exist; fall back to PATH.
                    which::which(name).ok()
                }
            } else {
                which::which(name).ok()
            };

            if let Some(path) = resolved {
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        timeout,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Return a reference to the [`ToolConfig`] for the given tool, or an
    /// [`mh_core::Error::Tool`] if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> mh_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| mh_core::Error::Tool {
            tool: name.to_string(),
            message: format!("{name} not found; is it installed and in PATH?"),
        })
    }

    /// Whether a tool was found during discovery.
    pub fn available(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Iterate over all registered tool configs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolConfig)> {
        self.tools.iter()
    }
}

/// Output captured from a tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// One invocation of a registered tool.
///
/// Built from a [`ToolConfig`] via [`ToolConfig::command`], so every run
/// carries the registry's resolved path and timeout. Arguments are `OsStr`
/// based, so media paths pass through without lossy conversion.
#[derive(Debug)]
pub struct ToolCommand {
    tool: String,
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ToolCommand {
    /// Append a single argument.
    pub fn arg(mut self, s: impl AsRef<OsStr>) -> Self {
        self.args.push(s.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(mut self, iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(iter.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// Override the tool's configured timeout for this run.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Run the tool to completion, capturing stdout and stderr.
    ///
    /// The child is killed if it outlives the timeout.
    ///
    /// # Errors
    ///
    /// Returns [`mh_core::Error::Tool`], named after the tool, when the
    /// process cannot be spawned, exceeds the timeout, or exits non-zero
    /// (the message carries trimmed stderr).
    pub async fn run(self) -> mh_core::Result<ToolOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must not leave the tool
            // running against the media file.
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| mh_core::Error::Tool {
            tool: self.tool.clone(),
            message: format!("failed to spawn {}: {e}", self.program.display()),
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(mh_core::Error::Tool {
                    tool: self.tool,
                    message: format!("I/O error waiting for process: {e}"),
                })
            }
            Err(_elapsed) => {
                return Err(mh_core::Error::Tool {
                    tool: self.tool,
                    message: format!("timed out after {:?}", self.timeout),
                })
            }
        };

        let result = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.status.success() {
            return Err(mh_core::Error::Tool {
                tool: self.tool,
                message: format!(
                    "exited with status {}: {}",
                    result.status,
                    result.stderr.trim()
                ),
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn tool(name: &str, program: &str) -> ToolConfig {
        ToolConfig {
            name: name.to_string(),
            path: PathBuf::from(program),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn discover_with_default_config() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        // We cannot guarantee any tool is installed in CI,
        // but the call itself must not panic.
        let _ = registry.iter().count();
    }

    #[test]
    fn require_missing_tool_returns_error() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        let result = registry.require("nonexistent_tool_xyz");
        assert!(result.is_err());
        assert!(!registry.available("nonexistent_tool_xyz"));
    }

    #[test]
    fn custom_path_is_used_when_it_exists() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let cfg = ToolsConfig {
            ffmpeg_path: Some(tmp.path().to_path_buf()),
            ..ToolsConfig::default()
        };
        let registry = ToolRegistry::discover(&cfg);
        let ffmpeg = registry.require("ffmpeg").unwrap();
        assert_eq!(ffmpeg.path, tmp.path());
    }

    #[test]
    fn timeout_comes_from_config() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let cfg = ToolsConfig {
            ffprobe_path: Some(tmp.path().to_path_buf()),
            timeout_secs: 42,
            ..ToolsConfig::default()
        };
        let registry = ToolRegistry::discover(&cfg);
        let ffprobe = registry.require("ffprobe").unwrap();
        assert_eq!(ffprobe.timeout, Duration::from_secs(42));
    }

    #[tokio::test]
    async fn run_captures_stdout() {
        let output = tool("ffprobe", "echo").command().arg("stream data").run().await;
        // Skip on systems where echo is not on PATH.
        if let Ok(out) = output {
            assert!(out.status.success());
            assert_eq!(out.stdout.trim(), "stream data");
        }
    }

    #[tokio::test]
    async fn spawn_failure_names_the_tool() {
        let err = tool("dovi_tool", "/no/such/binary-mh")
            .command()
            .run()
            .await
            .unwrap_err();
        match err {
            mh_core::Error::Tool { tool, message } => {
                assert_eq!(tool, "dovi_tool");
                assert!(message.contains("failed to spawn"));
            }
            other => panic!("expected tool error, got {other}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let err = tool("mkvmerge", "sh")
            .command()
            .args(["-c", "echo muxing failed >&2; exit 3"])
            .run()
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("muxing failed"), "unexpected error: {msg}");
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let tmp = tempfile::tempdir().unwrap();
        let pidfile = tmp.path().join("pid");

        let err = tool("ffmpeg", "sh")
            .command()
            .arg("-c")
            .arg(format!("echo $$ > {}; exec sleep 30", pidfile.display()))
            .timeout(Duration::from_millis(500))
            .run()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));

        // The child must actually be gone, not just abandoned.
        let pid: u32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let proc_entry = format!("/proc/{pid}");
        for _ in 0..40 {
            if !Path::new(&proc_entry).exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("child {pid} still running after timeout");
    }
}
