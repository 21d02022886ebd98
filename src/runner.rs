//! End-to-end merge runs.
//!
//! A run ingests inputs, resolves offsets, orders the segments, builds the
//! plan and hands each stage to a [`MergeExecutor`]. Group-stage failures
//! are tolerated; the final stage is rebuilt from whatever intermediates
//! survived.

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::ingest::{Ingestor, Input};
use crate::resolve::resolve_all;
use segmerge_av::{normalize_path, MergeExecutor, Workspace};
use segmerge_core::{
    build_plan, order, ConcatenationPlan, Error, FinalMerge, FinalStage, GroupTag, OrderedGroups,
    PlanLayout, Result, StartTimeProbe,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What happened when a plan was executed
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub final_mode: FinalMerge,
    /// Groups whose intermediate was produced, in priority order
    pub merged_groups: Vec<GroupTag>,
    /// Groups whose merge failed, with the error message
    pub failed_groups: Vec<(GroupTag, String)>,
}

/// Execute both stages of a plan.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] when every group merge failed, or the
/// final stage's error when it fails.
pub async fn execute_plan(
    plan: &ConcatenationPlan,
    layout: &PlanLayout,
    executor: &dyn MergeExecutor,
) -> Result<RunReport> {
    let mut merged_groups = Vec::new();
    let mut failed_groups = Vec::new();
    let mut intermediates = Vec::new();

    for stage in &plan.groups {
        match executor.merge_group(stage).await {
            Ok(()) => {
                tracing::info!("Merged group {} ({} segments)", stage.tag, stage.segments.len());
                merged_groups.push(stage.tag);
                intermediates.push(stage.output.clone());
            }
            Err(e) => {
                tracing::warn!("Failed to merge group {}, skipping: {}", stage.tag, e);
                failed_groups.push((stage.tag, e.to_string()));
            }
        }
    }

    if intermediates.is_empty() {
        return Err(Error::empty_input(format!(
            "all {} group merges failed",
            plan.groups.len()
        )));
    }

    let final_stage = FinalStage::from_intermediates(intermediates, layout)?;
    tracing::info!(
        "Merging {} intermediate file(s) into {}",
        final_stage.inputs.len(),
        final_stage.output.display()
    );
    executor.merge_final(&final_stage).await?;

    Ok(RunReport {
        output: final_stage.output,
        final_mode: final_stage.mode,
        merged_groups,
        failed_groups,
    })
}

/// Log one line per group and, at debug level, one per segment
pub fn log_ordered_groups(ordered: &OrderedGroups) {
    for group in ordered {
        match group.span() {
            Some((first, last)) => tracing::info!(
                "Group {}: {} segment(s), {:.3}s to {:.3}s",
                group.tag,
                group.segments.len(),
                first,
                last
            ),
            None => tracing::info!("Group {}: empty", group.tag),
        }
    }
    for diagnostic in ordered.diagnostics() {
        tracing::debug!("{}", diagnostic);
    }
}

/// Outcome of a merge run
#[derive(Debug)]
pub struct MergeOutcome {
    pub ordered: OrderedGroups,
    pub plan: ConcatenationPlan,
    /// `None` for dry runs
    pub report: Option<RunReport>,
    /// Inputs or segments skipped during ingestion
    pub skipped: usize,
}

/// Refuse a configured work directory that overlaps a local input or holds
/// the final output, since it is wiped on open and removed after the run.
///
/// # Errors
///
/// Returns [`Error::Validation`] on overlap and [`Error::Io`] if a path
/// cannot be resolved.
pub fn check_work_dir(config: &Config, inputs: &[Input]) -> Result<()> {
    let merge = &config.merge;
    if merge.use_temp_dir {
        return Ok(());
    }

    let work_dir = normalize_path(&merge.work_dir)?;
    if normalize_path(&merge.output)?.starts_with(&work_dir) {
        return Err(Error::Validation(format!(
            "output {} lies inside work directory {}",
            merge.output.display(),
            merge.work_dir.display()
        )));
    }

    for input in inputs {
        let Input::Local(path) = input else {
            continue;
        };
        let resolved = normalize_path(path)?;
        if resolved.starts_with(&work_dir) || work_dir.starts_with(&resolved) {
            return Err(Error::Validation(format!(
                "input {} overlaps work directory {}",
                path.display(),
                merge.work_dir.display()
            )));
        }
    }

    Ok(())
}

/// One merge run and its collaborators
pub struct MergeJob<'a> {
    config: &'a Config,
    fetcher: &'a dyn Fetcher,
    probe: Arc<dyn StartTimeProbe>,
    executor: &'a dyn MergeExecutor,
}

impl<'a> MergeJob<'a> {
    pub fn new(
        config: &'a Config,
        fetcher: &'a dyn Fetcher,
        probe: Arc<dyn StartTimeProbe>,
        executor: &'a dyn MergeExecutor,
    ) -> Self {
        Self {
            config,
            fetcher,
            probe,
            executor,
        }
    }

    /// Run the whole pipeline. With `dry_run` the plan is built but no merge
    /// stage runs.
    pub async fn run(&self, inputs: &[Input], dry_run: bool) -> Result<MergeOutcome> {
        let merge = &self.config.merge;
        check_work_dir(self.config, inputs)?;
        let work_dir = (!merge.use_temp_dir).then_some(merge.work_dir.as_path());
        let mut workspace = Workspace::open(work_dir)?;
        workspace.keep(merge.keep_intermediates);
        tracing::debug!("Work directory: {}", workspace.path().display());

        let segments_dir = workspace.segments_dir();
        let ingested = Ingestor::new(self.fetcher, &segments_dir, merge.taxonomy)
            .ingest_all(inputs)
            .await;
        if ingested.segments.is_empty() {
            return Err(Error::empty_input("no segments were ingested"));
        }
        tracing::info!(
            "Ingested {} segment(s), skipped {}",
            ingested.segments.len(),
            ingested.skipped
        );

        let workers = self.config.probe.workers(ingested.segments.len());
        let segments = resolve_all(ingested.segments, self.probe.clone(), workers).await;

        let ordered = order(segments);
        log_ordered_groups(&ordered);

        let layout = workspace.plan_layout(&merge.output);
        let plan = build_plan(&ordered, &layout)?;

        let report = if dry_run {
            None
        } else {
            Some(execute_plan(&plan, &layout, self.executor).await?)
        };

        Ok(MergeOutcome {
            ordered,
            plan,
            report,
            skipped: ingested.skipped,
        })
    }
}

/// Order local segments and build their plan without touching the work
/// directory.
pub async fn plan_local(
    inputs: &[Input],
    config: &Config,
    fetcher: &dyn Fetcher,
    probe: Arc<dyn StartTimeProbe>,
) -> Result<(OrderedGroups, ConcatenationPlan)> {
    let staging = Path::new("");
    let ingested = Ingestor::new(fetcher, staging, config.merge.taxonomy)
        .ingest_all(inputs)
        .await;
    if ingested.segments.is_empty() {
        return Err(Error::empty_input("no segments found"));
    }

    let workers = config.probe.workers(ingested.segments.len());
    let ordered = order(resolve_all(ingested.segments, probe, workers).await);
    let layout = PlanLayout::new(&config.merge.work_dir, &config.merge.output);
    let plan = build_plan(&ordered, &layout)?;
    Ok((ordered, plan))
}
