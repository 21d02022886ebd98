//! # segmerge-av
//!
//! External tool collaborators for the segmerge engine.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe, honouring configured overrides.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Start-time probing** ([`FfprobeStartTime`]) -- implements
//!   [`segmerge_core::StartTimeProbe`] by shelling out to ffprobe.
//! - **Plan execution** ([`FfmpegExecutor`]) -- runs the group and final
//!   stages of a [`segmerge_core::ConcatenationPlan`] with ffmpeg.
//! - **Staging** ([`Workspace`]) -- the per-run work directory lifecycle.

pub mod command;
pub mod concat;
pub mod probe;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use concat::{EncodeSettings, FfmpegExecutor, MergeExecutor};
pub use probe::FfprobeStartTime;
pub use tools::{ToolInfo, ToolRegistry, ToolsConfig};
pub use workspace::{normalize_path, Workspace};
