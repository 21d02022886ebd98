//! The [`Segment`] record shared by every stage of the engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::group::GroupTag;
use crate::timestamp::ResolvedOffset;

/// Where a segment's chronological offset came from.
///
/// Purely diagnostic: ordering only ever looks at the numeric offset, so a
/// resolved `0.0` and an unresolved `0.0` sort identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetSource {
    /// Parsed from a millisecond timestamp embedded in the filename.
    Filename,
    /// Read from the container start time reported by the media probe.
    Probe,
    /// Supplied directly by the caller.
    Provided,
    /// Nothing usable was found; the offset is the `0.0` fallback.
    Unresolved,
}

/// One physical media chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Local path (or name) of the segment, unique within a run.
    pub identifier: PathBuf,
    /// Source group, assigned once at ingestion.
    pub group: GroupTag,
    /// Start offset in seconds; `0.0` when unknown.
    pub offset: f64,
    /// Provenance of `offset`.
    pub source: OffsetSource,
}

impl Segment {
    /// Create a segment from an identifier, its group and its resolved offset.
    pub fn new(
        identifier: impl Into<PathBuf>,
        group: GroupTag,
        offset: impl Into<ResolvedOffset>,
    ) -> Self {
        let offset = offset.into();
        Self {
            identifier: identifier.into(),
            group,
            offset: offset.seconds,
            source: offset.source,
        }
    }

    /// The segment's identifier as a path.
    pub fn path(&self) -> &Path {
        &self.identifier
    }

    /// The basename of the identifier, for display.
    pub fn display_name(&self) -> String {
        self.identifier
            .file_name()
            .unwrap_or(self.identifier.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Whether the offset came from an actual timestamp source.
    pub fn is_resolved(&self) -> bool {
        self.source != OffsetSource::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_from_seconds_is_provided() {
        let seg = Segment::new("/tmp/a.ts", GroupTag::Main, 4.5);
        assert_eq!(seg.offset, 4.5);
        assert_eq!(seg.source, OffsetSource::Provided);
        assert!(seg.is_resolved());
        assert_eq!(seg.display_name(), "a.ts");
    }

    #[test]
    fn unresolved_segment() {
        let seg = Segment::new("b.ts", GroupTag::Backup, ResolvedOffset::unresolved());
        assert_eq!(seg.offset, 0.0);
        assert!(!seg.is_resolved());
    }

    #[test]
    fn serializes_group_as_tag() {
        let seg = Segment::new("bak1_a.ts", GroupTag::Mirror(1), ResolvedOffset::probe(2.0));
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["group"], "bak1");
        assert_eq!(json["source"], "probe");
    }
}
