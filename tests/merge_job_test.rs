//! Full merge runs over local segments with a recording executor

use assert_matches::assert_matches;
use segmerge::config::Config;
use segmerge::fetch::{Fetcher, OfflineFetcher};
use segmerge::ingest::Input;
use segmerge::runner::{plan_local, MergeJob};
use segmerge_av::MergeExecutor;
use segmerge_core::{
    Error, FinalMerge, FinalStage, GroupMerge, GroupStage, GroupTag, NoProbe, OffsetSource,
    Result,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

#[derive(Default)]
struct RecordingExecutor {
    fail_groups: Vec<GroupTag>,
    groups: Mutex<Vec<GroupStage>>,
    finals: Mutex<Vec<FinalStage>>,
}

#[async_trait::async_trait]
impl MergeExecutor for RecordingExecutor {
    async fn merge_group(&self, stage: &GroupStage) -> Result<()> {
        // The work directory must exist while stages run
        assert!(stage.output.parent().unwrap().is_dir());
        self.groups.lock().unwrap().push(stage.clone());
        if self.fail_groups.contains(&stage.tag) {
            return Err(Error::merge(stage.tag.to_string(), "exited with status 1"));
        }
        Ok(())
    }

    async fn merge_final(&self, stage: &FinalStage) -> Result<()> {
        self.finals.lock().unwrap().push(stage.clone());
        Ok(())
    }
}

/// Serves canned playlists and segment bytes
#[derive(Default)]
struct CannedFetcher {
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

#[async_trait::async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "status 404"))
    }

    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<()> {
        let bytes = self
            .files
            .get(url)
            .ok_or_else(|| Error::fetch(url, "status 404"))?;
        std::fs::write(dest, bytes)?;
        Ok(())
    }
}

/// A capture directory with main, numbered-mirror and generic-mirror segments
fn capture_dir() -> TempDir {
    let dir = tempdir().unwrap();
    for name in [
        "h_testpagerec3000_4000.ts",
        "h_testpagerec1000_2000.ts",
        "bak1_h_testpagerec1000_2000.ts",
        "bak0_h_testpagerec1000_2000.ts",
        "bak0_h_testpagerec0_1000.ts",
        "clip_bak.ts",
        "readme.txt",
    ] {
        std::fs::write(dir.path().join(name), b"ts").unwrap();
    }
    dir
}

fn config_in(root: &Path) -> Config {
    let mut config = Config::default();
    config.merge.work_dir = root.join("work");
    config.merge.output = root.join("final.mp4");
    config.probe.concurrency = Some(2);
    config
}

fn names(stage: &GroupStage) -> Vec<String> {
    stage.segments.iter().map(|s| s.display_name()).collect()
}

#[tokio::test]
async fn merges_groups_in_priority_order() {
    let captures = capture_dir();
    let scratch = tempdir().unwrap();
    let config = config_in(scratch.path());
    let executor = RecordingExecutor::default();

    let job = MergeJob::new(&config, &OfflineFetcher, Arc::new(NoProbe), &executor);
    let inputs = vec![Input::Local(captures.path().to_path_buf())];
    let outcome = job.run(&inputs, false).await.unwrap();

    let groups = executor.groups.lock().unwrap();
    let tags: Vec<GroupTag> = groups.iter().map(|g| g.tag).collect();
    assert_eq!(
        tags,
        vec![
            GroupTag::Main,
            GroupTag::Mirror(0),
            GroupTag::Mirror(1),
            GroupTag::Backup
        ]
    );
    assert_eq!(
        names(&groups[0]),
        vec!["h_testpagerec1000_2000.ts", "h_testpagerec3000_4000.ts"]
    );
    assert_eq!(
        names(&groups[1]),
        vec!["bak0_h_testpagerec0_1000.ts", "bak0_h_testpagerec1000_2000.ts"]
    );
    assert_eq!(groups[2].mode, GroupMerge::StreamCopy);
    assert_eq!(groups[3].segments[0].source, OffsetSource::Unresolved);

    let report = outcome.report.unwrap();
    assert_eq!(report.final_mode, FinalMerge::ConcatTranscode);
    assert_eq!(report.output, scratch.path().join("final.mp4"));
    assert_eq!(executor.finals.lock().unwrap()[0].inputs.len(), 4);

    // The work directory is removed after the run
    assert!(!scratch.path().join("work").exists());
}

#[tokio::test]
async fn failed_groups_are_skipped() {
    let captures = capture_dir();
    let scratch = tempdir().unwrap();
    let config = config_in(scratch.path());
    let executor = RecordingExecutor {
        fail_groups: vec![GroupTag::Main, GroupTag::Mirror(0), GroupTag::Mirror(1)],
        ..Default::default()
    };

    let job = MergeJob::new(&config, &OfflineFetcher, Arc::new(NoProbe), &executor);
    let inputs = vec![Input::Local(captures.path().to_path_buf())];
    let report = job.run(&inputs, false).await.unwrap().report.unwrap();

    assert_eq!(report.merged_groups, vec![GroupTag::Backup]);
    assert_eq!(report.failed_groups.len(), 3);
    assert_eq!(report.final_mode, FinalMerge::DirectConversion);
}

#[tokio::test]
async fn dry_run_executes_nothing() {
    let captures = capture_dir();
    let scratch = tempdir().unwrap();
    let mut config = config_in(scratch.path());
    config.merge.keep_intermediates = true;
    let executor = RecordingExecutor::default();

    let job = MergeJob::new(&config, &OfflineFetcher, Arc::new(NoProbe), &executor);
    let inputs = vec![Input::Local(captures.path().to_path_buf())];
    let outcome = job.run(&inputs, true).await.unwrap();

    assert!(outcome.report.is_none());
    assert_eq!(outcome.plan.segment_count(), 6);
    assert!(executor.groups.lock().unwrap().is_empty());
    assert!(scratch.path().join("work").is_dir());
}

#[tokio::test]
async fn nothing_to_merge_is_an_error() {
    let scratch = tempdir().unwrap();
    let config = config_in(scratch.path());
    let executor = RecordingExecutor::default();

    let job = MergeJob::new(&config, &OfflineFetcher, Arc::new(NoProbe), &executor);
    let inputs = vec![
        Input::Local(scratch.path().join("missing.ts")),
        Input::parse("https://cdn.example.com/live/index.m3u8").unwrap(),
    ];
    let err = job.run(&inputs, false).await.unwrap_err();
    assert_matches!(err, Error::EmptyInput(_));
}

#[tokio::test]
async fn binary_taxonomy_folds_mirrors_together() {
    let captures = capture_dir();
    let mut config = config_in(captures.path());
    config.merge.taxonomy = segmerge_core::Taxonomy::Binary;

    let inputs = vec![Input::Local(captures.path().to_path_buf())];
    let (ordered, plan) = plan_local(&inputs, &config, &OfflineFetcher, Arc::new(NoProbe))
        .await
        .unwrap();

    assert_eq!(ordered.len(), 2);
    let mirror = plan.group(GroupTag::Backup).unwrap();
    // The unresolved clip_bak ties with bak0 at 0.0 and sorts by name
    assert_eq!(
        names(mirror),
        vec![
            "bak0_h_testpagerec0_1000.ts",
            "clip_bak.ts",
            "bak0_h_testpagerec1000_2000.ts",
            "bak1_h_testpagerec1000_2000.ts",
        ]
    );
}

#[tokio::test]
async fn work_dir_over_local_input_is_refused() {
    let scratch = tempdir().unwrap();
    let captures = scratch.path().join("captures");
    std::fs::create_dir(&captures).unwrap();
    std::fs::write(captures.join("a.ts"), b"ts").unwrap();

    let mut config = config_in(scratch.path());
    config.merge.work_dir = captures.clone();
    let executor = RecordingExecutor::default();
    let job = MergeJob::new(&config, &OfflineFetcher, Arc::new(NoProbe), &executor);

    let err = job
        .run(&[Input::Local(captures.clone())], false)
        .await
        .unwrap_err();
    assert_matches!(err, Error::Validation(_));
    assert!(captures.join("a.ts").exists());

    // A file inside the work directory, and a work directory inside the input
    let err = job
        .run(&[Input::Local(captures.join("a.ts"))], false)
        .await
        .unwrap_err();
    assert_matches!(err, Error::Validation(_));
    config.merge.work_dir = captures.join("work");
    let job = MergeJob::new(&config, &OfflineFetcher, Arc::new(NoProbe), &executor);
    let err = job
        .run(&[Input::Local(scratch.path().join("captures/."))], false)
        .await
        .unwrap_err();
    assert_matches!(err, Error::Validation(_));
    assert!(captures.join("a.ts").exists());
    assert!(executor.groups.lock().unwrap().is_empty());
}

#[tokio::test]
async fn output_inside_work_dir_is_refused() {
    let captures = capture_dir();
    let scratch = tempdir().unwrap();
    let mut config = config_in(scratch.path());
    config.merge.output = scratch.path().join("work/../work/final.mp4");
    let executor = RecordingExecutor::default();

    let job = MergeJob::new(&config, &OfflineFetcher, Arc::new(NoProbe), &executor);
    let inputs = vec![Input::Local(captures.path().to_path_buf())];
    let err = job.run(&inputs, false).await.unwrap_err();
    assert_matches!(err, Error::Validation(_));
    assert!(executor.finals.lock().unwrap().is_empty());
}

#[tokio::test]
async fn downloads_named_like_intermediates_stay_separate() {
    let scratch = tempdir().unwrap();
    let config = config_in(scratch.path());
    let mut fetcher = CannedFetcher::default();
    fetcher.texts.insert(
        "http://h/live/index.m3u8".into(),
        "#EXTM3U\nmerged_main.ts\nseg1.ts\n".into(),
    );
    fetcher
        .files
        .insert("http://h/live/merged_main.ts".into(), b"a".to_vec());
    fetcher.files.insert("http://h/live/seg1.ts".into(), b"b".to_vec());
    let executor = RecordingExecutor::default();

    let job = MergeJob::new(&config, &fetcher, Arc::new(NoProbe), &executor);
    let inputs = vec![Input::parse("http://h/live/index.m3u8").unwrap()];
    job.run(&inputs, false).await.unwrap();

    let groups = executor.groups.lock().unwrap();
    assert_eq!(groups.len(), 1);
    let stage = &groups[0];
    assert_eq!(stage.output, scratch.path().join("work/merged_main.ts"));
    assert_eq!(stage.segments.len(), 2);
    for segment in &stage.segments {
        assert!(segment.path().starts_with(scratch.path().join("work/segments")));
        assert_ne!(segment.path(), stage.output.as_path());
    }
}
