//! Intra-group ordering and cross-group priority.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::group::GroupTag;
use crate::segment::{OffsetSource, Segment};

/// One non-empty group with its segments in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedGroup {
    pub tag: GroupTag,
    pub segments: Vec<Segment>,
}

impl OrderedGroup {
    /// Offset of the first and last segment in the group.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.segments.first()?.offset, self.segments.last()?.offset))
    }
}

/// Non-empty groups in merge-priority order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OrderedGroups {
    groups: Vec<OrderedGroup>,
}

impl OrderedGroups {
    /// The groups, highest priority first.
    pub fn groups(&self) -> &[OrderedGroup] {
        &self.groups
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrderedGroup> {
        self.groups.iter()
    }

    /// Number of non-empty groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up a group by tag.
    pub fn get(&self, tag: GroupTag) -> Option<&OrderedGroup> {
        self.groups.iter().find(|g| g.tag == tag)
    }

    /// Total number of segments across all groups.
    pub fn segment_count(&self) -> usize {
        self.groups.iter().map(|g| g.segments.len()).sum()
    }

    /// Flatten back into a single segment list, group by group.
    pub fn into_segments(self) -> Vec<Segment> {
        self.groups.into_iter().flat_map(|g| g.segments).collect()
    }

    /// Per-segment classification and position records.
    pub fn diagnostics(&self) -> Vec<SegmentDiagnostic> {
        self.groups
            .iter()
            .flat_map(|group| {
                group
                    .segments
                    .iter()
                    .enumerate()
                    .map(move |(i, seg)| SegmentDiagnostic {
                        group: group.tag,
                        identifier: seg.identifier.clone(),
                        offset: seg.offset,
                        source: seg.source,
                        position: i + 1,
                    })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a OrderedGroups {
    type Item = &'a OrderedGroup;
    type IntoIter = std::slice::Iter<'a, OrderedGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Where one segment landed after ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentDiagnostic {
    pub group: GroupTag,
    pub identifier: PathBuf,
    pub offset: f64,
    pub source: OffsetSource,
    /// 1-based position within the group.
    pub position: usize,
}

impl fmt::Display for SegmentDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .identifier
            .file_name()
            .unwrap_or(self.identifier.as_os_str())
            .to_string_lossy();
        write!(
            f,
            "[{}] {}. {} (offset: {:.6}s",
            self.group, self.position, name, self.offset
        )?;
        if self.source == OffsetSource::Unresolved {
            f.write_str(", unresolved")?;
        }
        f.write_str(")")
    }
}

/// Partition segments by group and sort each group chronologically.
///
/// Within a group, segments sort ascending by offset; exact ties fall back to
/// the byte-wise order of the identifier so the result is fully determined by
/// the input set. Groups come out in [`GroupTag`] priority order and only
/// groups with at least one member appear.
///
/// Ordering is idempotent: feeding [`OrderedGroups::into_segments`] back in
/// reproduces the same result.
pub fn order(segments: impl IntoIterator<Item = Segment>) -> OrderedGroups {
    let mut buckets: BTreeMap<GroupTag, Vec<Segment>> = BTreeMap::new();
    for seg in segments {
        buckets.entry(seg.group).or_default().push(seg);
    }

    let groups = buckets
        .into_iter()
        .map(|(tag, mut segments)| {
            segments.sort_by(chronological);
            tracing::debug!(group = %tag, segments = segments.len(), "ordered group");
            OrderedGroup { tag, segments }
        })
        .collect();

    OrderedGroups { groups }
}

fn chronological(a: &Segment, b: &Segment) -> Ordering {
    offset_key(a.offset)
        .total_cmp(&offset_key(b.offset))
        .then_with(|| a.identifier.as_os_str().cmp(b.identifier.as_os_str()))
}

/// `-0.0` and `0.0` are the same instant.
fn offset_key(offset: f64) -> f64 {
    if offset == 0.0 {
        0.0
    } else {
        offset
    }
}
