//! Plan execution with ffmpeg.
//!
//! Group stages concatenate same-codec segments losslessly (`-c copy`), either
//! by stream-copying a single segment or through the concat demuxer. The
//! final stage concatenates intermediates with a re-encode to the configured
//! codec pair, or converts a single intermediate directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use segmerge_core::{
    concat_manifest, Error, FinalMerge, FinalStage, GroupMerge, GroupStage, Result,
};
use serde::{Deserialize, Serialize};

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::tools::ToolRegistry;

/// Codec parameters for the final transcode, the `[encode]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            preset: "fast".into(),
            crf: 23,
            audio_codec: "aac".into(),
            audio_bitrate: "128k".into(),
        }
    }
}

/// Executes the stages of a concatenation plan.
///
/// Failures are reported to the caller and never retried here.
#[async_trait]
pub trait MergeExecutor: Send + Sync {
    /// Merge one group's segments into its intermediate output.
    async fn merge_group(&self, stage: &GroupStage) -> Result<()>;

    /// Merge the surviving intermediates into the final artifact.
    async fn merge_final(&self, stage: &FinalStage) -> Result<()>;
}

/// [`MergeExecutor`] that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegExecutor {
    ffmpeg: PathBuf,
    encode: EncodeSettings,
    timeout: Duration,
}

impl FfmpegExecutor {
    pub fn new(ffmpeg: PathBuf, encode: EncodeSettings) -> Self {
        Self {
            ffmpeg,
            encode,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build an executor from the registry's ffmpeg and timeout.
    pub fn from_registry(tools: &ToolRegistry, encode: EncodeSettings) -> Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?.to_path_buf();
        Ok(Self::new(ffmpeg, encode).with_timeout(tools.timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, stage_name: &str, args: Vec<String>) -> Result<()> {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.timeout(self.timeout);
        cmd.args(args);
        cmd.execute()
            .await
            .map(|_| ())
            .map_err(|e| Error::merge(stage_name, e.to_string()))
    }
}

#[async_trait]
impl MergeExecutor for FfmpegExecutor {
    async fn merge_group(&self, stage: &GroupStage) -> Result<()> {
        let stage_name = stage.tag.to_string();
        if let Some(manifest) = &stage.manifest {
            write_manifest(manifest, stage.inputs()).await?;
        }
        ensure_parent(&stage.output).await?;

        tracing::info!(
            group = %stage.tag,
            segments = stage.segments.len(),
            "merging group into {}",
            stage.output.display()
        );
        self.run(&stage_name, group_merge_args(stage)?).await
    }

    async fn merge_final(&self, stage: &FinalStage) -> Result<()> {
        if let Some(manifest) = &stage.manifest {
            write_manifest(manifest, stage.inputs.iter().map(PathBuf::as_path)).await?;
        }
        ensure_parent(&stage.output).await?;

        tracing::info!(
            inputs = stage.inputs.len(),
            mode = ?stage.mode,
            "writing final output {}",
            stage.output.display()
        );
        self.run("final", final_merge_args(stage, &self.encode)?).await
    }
}

/// ffmpeg arguments for one group stage.
pub fn group_merge_args(stage: &GroupStage) -> Result<Vec<String>> {
    let mut args = base_args();
    match stage.mode {
        GroupMerge::StreamCopy => {
            let input = stage
                .segments
                .first()
                .ok_or_else(|| Error::merge(stage.tag.to_string(), "group has no segments"))?;
            args.extend(["-i".into(), path_arg(&input.identifier)]);
        }
        GroupMerge::Concat => {
            let manifest = stage.manifest.as_deref().ok_or_else(|| {
                Error::merge(stage.tag.to_string(), "concat stage has no manifest path")
            })?;
            args.extend(concat_input_args(manifest));
        }
    }
    args.extend(["-c".into(), "copy".into(), path_arg(&stage.output)]);
    Ok(args)
}

/// ffmpeg arguments for the final stage.
pub fn final_merge_args(stage: &FinalStage, encode: &EncodeSettings) -> Result<Vec<String>> {
    let mut args = base_args();
    match stage.mode {
        FinalMerge::DirectConversion => {
            let input = stage
                .inputs
                .first()
                .ok_or_else(|| Error::empty_input("final stage has no inputs"))?;
            args.extend(["-i".into(), path_arg(input), "-c".into(), "copy".into()]);
        }
        FinalMerge::ConcatTranscode => {
            let manifest = stage
                .manifest
                .as_deref()
                .ok_or_else(|| Error::merge("final", "concat stage has no manifest path"))?;
            args.extend(concat_input_args(manifest));
            args.extend([
                "-c:v".into(),
                encode.video_codec.clone(),
                "-preset".into(),
                encode.preset.clone(),
                "-crf".into(),
                encode.crf.to_string(),
                "-c:a".into(),
                encode.audio_codec.clone(),
                "-b:a".into(),
                encode.audio_bitrate.clone(),
            ]);
        }
    }
    args.push(path_arg(&stage.output));
    Ok(args)
}

fn base_args() -> Vec<String> {
    vec!["-hide_banner".into(), "-y".into()]
}

fn concat_input_args(manifest: &Path) -> [String; 6] {
    [
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        path_arg(manifest),
    ]
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Write a concat manifest listing `inputs` as absolute paths.
///
/// The concat demuxer resolves relative entries against the manifest's own
/// directory, not the working directory.
async fn write_manifest<'a>(
    manifest: &Path,
    inputs: impl Iterator<Item = &'a Path>,
) -> Result<()> {
    let absolute = inputs
        .map(std::path::absolute)
        .collect::<std::io::Result<Vec<_>>>()?;
    ensure_parent(manifest).await?;
    tokio::fs::write(manifest, concat_manifest(&absolute)).await?;
    tracing::debug!(entries = absolute.len(), "wrote manifest {}", manifest.display());
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await?;
            Ok(())
        }
        _ => Ok(()),
    }
}
