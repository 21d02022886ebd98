//! Turning command-line inputs into local, classified segment files.
//!
//! An input is one of:
//!
//! - an M3U8 playlist URL, whose `.ts` entries are downloaded,
//! - a direct segment URL (CDN style), downloaded as is,
//! - a local `.ts` file, used in place,
//! - a local directory, whose `.ts` files are used in place.
//!
//! Every failure here is per item: the playlist or segment is skipped with a
//! warning and ingestion continues.

use crate::fetch::Fetcher;
use crate::playlist::{is_playlist_url, parse_playlist, segment_file_name};
use reqwest::Url;
use segmerge_core::{classify, GroupTag, Taxonomy};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One source the user asked to merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Playlist(Url),
    Segment(Url),
    Local(PathBuf),
}

impl Input {
    /// Interpret a command-line argument. `http(s)://` arguments are URLs,
    /// anything else is a local path.
    pub fn parse(arg: &str) -> Result<Self, String> {
        let lower = arg.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(arg).map_err(|e| format!("Invalid URL {:?}: {}", arg, e))?;
            if is_playlist_url(&url) {
                Ok(Input::Playlist(url))
            } else {
                Ok(Input::Segment(url))
            }
        } else {
            Ok(Input::Local(PathBuf::from(arg)))
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Input::Local(_))
    }
}

impl std::str::FromStr for Input {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Input::parse(s)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Playlist(url) | Input::Segment(url) => write!(f, "{}", url),
            Input::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A segment available locally, classified but not yet timed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedSegment {
    pub path: PathBuf,
    pub group: GroupTag,
}

/// Result of ingesting every input
#[derive(Debug, Default)]
pub struct Ingested {
    pub segments: Vec<IngestedSegment>,
    /// Playlists, segments or paths that were skipped
    pub skipped: usize,
}

/// Collects segments from inputs, downloading remote ones into `staging_dir`
pub struct Ingestor<'a> {
    fetcher: &'a dyn Fetcher,
    staging_dir: &'a Path,
    taxonomy: Taxonomy,
    seen: HashSet<PathBuf>,
    result: Ingested,
}

impl<'a> Ingestor<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, staging_dir: &'a Path, taxonomy: Taxonomy) -> Self {
        Self {
            fetcher,
            staging_dir,
            taxonomy,
            seen: HashSet::new(),
            result: Ingested::default(),
        }
    }

    /// Ingest all inputs in order
    pub async fn ingest_all(mut self, inputs: &[Input]) -> Ingested {
        for input in inputs {
            tracing::info!("Processing input: {}", input);
            match input {
                Input::Playlist(url) => self.ingest_playlist(url).await,
                Input::Segment(url) => self.ingest_remote_segment(url).await,
                Input::Local(path) => self.ingest_local(path),
            }
        }
        self.result
    }

    async fn ingest_playlist(&mut self, url: &Url) {
        let text = match self.fetcher.fetch_text(url.as_str()).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to fetch playlist, skipping: {}", e);
                self.result.skipped += 1;
                return;
            }
        };

        let segment_urls = parse_playlist(url, &text);
        tracing::info!("Found {} segments in {}", segment_urls.len(), url);
        if let (Some(first), Some(last)) = (segment_urls.first(), segment_urls.last()) {
            tracing::debug!("First segment: {}, last segment: {}", first, last);
        }

        for segment_url in &segment_urls {
            self.ingest_remote_segment(segment_url).await;
        }
    }

    async fn ingest_remote_segment(&mut self, url: &Url) {
        let Some(file_name) = segment_file_name(url) else {
            tracing::warn!("Segment URL has no file name, skipping: {}", url);
            self.result.skipped += 1;
            return;
        };

        let dest = self.staging_dir.join(&file_name);
        if self.seen.contains(&dest) {
            tracing::warn!("Duplicate segment {}, skipping: {}", file_name, url);
            self.result.skipped += 1;
            return;
        }

        let group = classify(&file_name, self.taxonomy);
        tracing::debug!("Downloading {} (group: {})", file_name, group);
        match self.fetcher.fetch_to_file(url.as_str(), &dest).await {
            Ok(()) => self.accept(dest, group),
            Err(e) => {
                tracing::warn!("Download failed, skipping: {}", e);
                self.result.skipped += 1;
            }
        }
    }

    fn ingest_local(&mut self, path: &Path) {
        if path.is_dir() {
            for file in list_segment_files(path) {
                self.ingest_local_file(file);
            }
        } else if path.is_file() {
            self.ingest_local_file(path.to_path_buf());
        } else {
            tracing::warn!("Input path does not exist, skipping: {:?}", path);
            self.result.skipped += 1;
        }
    }

    fn ingest_local_file(&mut self, path: PathBuf) {
        if self.seen.contains(&path) {
            tracing::warn!("Duplicate segment, skipping: {:?}", path);
            self.result.skipped += 1;
            return;
        }
        let group = classify(&path, self.taxonomy);
        self.accept(path, group);
    }

    fn accept(&mut self, path: PathBuf, group: GroupTag) {
        tracing::debug!("Classified {:?} as {}", path, group);
        self.seen.insert(path.clone());
        self.result.segments.push(IngestedSegment { path, group });
    }
}

/// `.ts` files directly inside `dir`, sorted by name
pub fn list_segment_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Failed to read directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("ts"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}
