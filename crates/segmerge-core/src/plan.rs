//! Concatenation planning.
//!
//! A [`ConcatenationPlan`] runs in two stages: every group is first merged
//! losslessly into one intermediate transport stream, then the intermediates
//! are merged, in group priority order, into the final artifact. Building a
//! plan is a pure, single-pass transformation of [`OrderedGroups`].

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::group::GroupTag;
use crate::ordering::OrderedGroups;
use crate::segment::Segment;
use crate::{Error, Result};

/// Default name of the final artifact.
pub const DEFAULT_OUTPUT: &str = "final_merged.mp4";

/// Where a plan puts its intermediate files and final artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanLayout {
    /// Directory holding intermediates and concat manifests.
    pub work_dir: PathBuf,
    /// Path of the final artifact.
    pub output: PathBuf,
}

impl Default for PlanLayout {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl PlanLayout {
    pub fn new(work_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output: output.into(),
        }
    }

    /// `merged_<tag>.ts` inside the work directory.
    pub fn intermediate_path(&self, tag: GroupTag) -> PathBuf {
        self.work_dir.join(format!("merged_{tag}.ts"))
    }

    /// Concat manifest for one group's segments.
    pub fn group_manifest_path(&self, tag: GroupTag) -> PathBuf {
        self.work_dir.join(format!("concat_{tag}.txt"))
    }

    /// Concat manifest for the final stage.
    pub fn final_manifest_path(&self) -> PathBuf {
        self.work_dir.join("concat_final.txt")
    }
}

/// How one group's segments become its intermediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMerge {
    /// A single segment, stream-copied as is.
    StreamCopy,
    /// Lossless concat of several segments through a manifest.
    Concat,
}

/// How the intermediates become the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalMerge {
    /// A single intermediate converted straight into the output format.
    DirectConversion,
    /// Concat of several intermediates with transcoding.
    ConcatTranscode,
}

/// First-stage work for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStage {
    pub tag: GroupTag,
    /// Segments in chronological order.
    pub segments: Vec<Segment>,
    /// Intermediate output produced by this stage.
    pub output: PathBuf,
    /// Manifest to write, `None` for [`GroupMerge::StreamCopy`].
    pub manifest: Option<PathBuf>,
    pub mode: GroupMerge,
}

impl GroupStage {
    /// Segment paths in merge order.
    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        self.segments.iter().map(Segment::path)
    }
}

/// Second-stage work: merge intermediates into the final artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalStage {
    /// Intermediates in group priority order.
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Manifest to write, `None` for [`FinalMerge::DirectConversion`].
    pub manifest: Option<PathBuf>,
    pub mode: FinalMerge,
}

impl FinalStage {
    /// Build the final stage from the intermediates that are available.
    ///
    /// Used both when planning and after group merges, when some
    /// intermediates may have failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] when `inputs` is empty.
    pub fn from_intermediates(inputs: Vec<PathBuf>, layout: &PlanLayout) -> Result<Self> {
        let (mode, manifest) = match inputs.len() {
            0 => return Err(Error::empty_input("no intermediate outputs to merge")),
            1 => (FinalMerge::DirectConversion, None),
            _ => (FinalMerge::ConcatTranscode, Some(layout.final_manifest_path())),
        };

        Ok(Self {
            inputs,
            output: layout.output.clone(),
            manifest,
            mode,
        })
    }
}

/// The complete, ordered merge plan for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcatenationPlan {
    /// One stage per non-empty group, in priority order.
    pub groups: Vec<GroupStage>,
    #[serde(rename = "final")]
    pub final_stage: FinalStage,
}

impl ConcatenationPlan {
    /// Intermediate outputs in the order the final stage consumes them.
    pub fn intermediates(&self) -> impl Iterator<Item = &Path> {
        self.groups.iter().map(|g| g.output.as_path())
    }

    pub fn segment_count(&self) -> usize {
        self.groups.iter().map(|g| g.segments.len()).sum()
    }

    pub fn group(&self, tag: GroupTag) -> Option<&GroupStage> {
        self.groups.iter().find(|g| g.tag == tag)
    }
}

/// Build the merge plan for ordered groups.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] when there is no non-empty group.
pub fn build_plan(ordered: &OrderedGroups, layout: &PlanLayout) -> Result<ConcatenationPlan> {
    let groups: Vec<GroupStage> = ordered
        .iter()
        .filter(|group| !group.segments.is_empty())
        .map(|group| {
            let (mode, manifest) = if group.segments.len() == 1 {
                (GroupMerge::StreamCopy, None)
            } else {
                (GroupMerge::Concat, Some(layout.group_manifest_path(group.tag)))
            };
            GroupStage {
                tag: group.tag,
                segments: group.segments.clone(),
                output: layout.intermediate_path(group.tag),
                manifest,
                mode,
            }
        })
        .collect();

    if groups.is_empty() {
        return Err(Error::empty_input("no non-empty groups to plan"));
    }

    let final_stage =
        FinalStage::from_intermediates(groups.iter().map(|g| g.output.clone()).collect(), layout)?;

    Ok(ConcatenationPlan {
        groups,
        final_stage,
    })
}

/// Render a concat-demuxer manifest: one `file '<path>'` line per input.
///
/// Single quotes inside a path are closed, escaped and reopened (`'\''`), as
/// the concat demuxer expects.
pub fn concat_manifest<I, P>(paths: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|p| {
            let escaped = p.as_ref().to_string_lossy().replace('\'', r"'\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}
