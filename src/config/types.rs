use segmerge_av::{EncodeSettings, ToolsConfig};
use segmerge_core::{Taxonomy, DEFAULT_OUTPUT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub encode: EncodeSettings,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeConfig {
    /// Staging directory for downloads, manifests and intermediates.
    /// Wiped at the start of every run.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Stage in a fresh temporary directory instead of `work_dir`
    #[serde(default)]
    pub use_temp_dir: bool,

    /// Final artifact path
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Leave the work directory in place after the run
    #[serde(default)]
    pub keep_intermediates: bool,

    #[serde(default)]
    pub taxonomy: Taxonomy,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            use_temp_dir: false,
            output: default_output(),
            keep_intermediates: false,
            taxonomy: Taxonomy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Maximum concurrent ffprobe calls (default: CPU count)
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl ProbeConfig {
    /// Worker count for `segment_count` segments: the configured (or CPU)
    /// limit, capped by the number of segments, never zero.
    pub fn workers(&self, segment_count: usize) -> usize {
        let limit = self.concurrency.unwrap_or_else(num_cpus::get);
        limit.min(segment_count).max(1)
    }
}
