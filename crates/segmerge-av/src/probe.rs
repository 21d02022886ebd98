//! FFprobe-based [`StartTimeProbe`] implementation.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format` and reads
//! `format.start_time`.

use std::path::{Path, PathBuf};
use std::process::Command;

use segmerge_core::{Error, Result, StartTimeProbe};
use serde::Deserialize;

use crate::tools::ToolRegistry;

/// A start-time probe backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeStartTime {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
}

impl FfprobeStartTime {
    /// Create a new probe using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Create a probe from the registry, if ffprobe was discovered.
    pub fn from_registry(tools: &ToolRegistry) -> Option<Self> {
        tools.require("ffprobe").ok().map(|p| Self::new(p.to_path_buf()))
    }
}

impl StartTimeProbe for FfprobeStartTime {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn start_time(&self, path: &Path) -> Result<Option<String>> {
        // Runs on a blocking worker; the resolver pool bounds concurrency.
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool("ffprobe", "ffprobe not found")
                } else {
                    Error::Io { source: e }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool("ffprobe", stderr.trim().to_string()));
        }

        parse_ffprobe_start_time(&String::from_utf8_lossy(&output.stdout))
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    start_time: Option<String>,
}

/// Extract the raw `format.start_time` field from ffprobe JSON output.
///
/// A missing `format` section or field is not an error; it means "absent".
fn parse_ffprobe_start_time(json: &str) -> Result<Option<String>> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;
    Ok(output.format.start_time)
}
