//! External merge tool invocation
//!
//! The actual bundle surgery is done by ICU's `icupkg` utility; this module
//! only runs it and translates its exit status. The tool's exit code is the
//! sole success signal, its stderr is the diagnostic we surface on failure.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Command name of ICU's packaging tool
pub const DEFAULT_TOOL: &str = "icupkg";

/// Handle to the external merge tool used to insert `.res` files into a
/// `.dat` bundle
///
/// # Examples
///
/// ```no_run
/// use icu_tzdata_patch::patcher::MergeTool;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tool = MergeTool::from_path().expect("icupkg not found in PATH");
/// tool.merge("metaZones.res", Path::new("/data/icudt61l.dat"), Path::new("/tmp/work"))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct MergeTool {
    binary_path: PathBuf,
}

impl MergeTool {
    /// Create a handle with an explicit path to the tool binary
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `icupkg` in PATH
    ///
    /// Returns `None` if the binary is not on the search path.
    pub fn from_path() -> Option<Self> {
        which::which(DEFAULT_TOOL).ok().map(Self::new)
    }

    /// Merge one resource file into the target bundle.
    ///
    /// Runs `icupkg -a <resource> <target>` with `working_dir` as the
    /// process's working directory, so `resource` is resolved relative to the
    /// directory the pipeline downloaded it into. Both output streams are
    /// captured in full; patch logs are small.
    pub async fn merge(&self, resource: &str, target: &Path, working_dir: &Path) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .arg("-a")
            .arg(resource)
            .arg(target)
            .current_dir(working_dir)
            .output()
            .await
            .map_err(|e| Error::Launch {
                tool: self.tool_name(),
                source: e,
            })?;

        if !output.status.success() {
            let code = output.status.code();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::warn!(tool = %self.tool_name(), code = ?code, "merge tool failed");
            return Err(Error::ExitCode {
                tool: self.tool_name(),
                code,
                stderr,
            });
        }

        if !output.stdout.is_empty() {
            tracing::debug!(
                tool = %self.tool_name(),
                stdout = %String::from_utf8_lossy(&output.stdout),
                "merge tool output"
            );
        }

        Ok(())
    }

    fn tool_name(&self) -> String {
        self.binary_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary_path.display().to_string())
    }
}
