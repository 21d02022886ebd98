//! # segmerge-core
//!
//! Segment reconciliation and ordering engine.
//!
//! Given transport-stream segments captured from a primary source and any
//! number of mirror sources, this crate decides which files get merged, in
//! which order, grouped how. It never touches media bytes:
//!
//! - **Group classification** ([`classify`]) -- map a segment name to a
//!   [`GroupTag`] (`main`, `bak<N>` or `bak`).
//! - **Timestamp resolution** ([`resolve_offset`]) -- derive a start offset
//!   from the filename, or from a [`StartTimeProbe`], falling back to `0.0`.
//! - **Ordering** ([`order`]) -- sort each group by offset, then identifier,
//!   and emit groups in priority order.
//! - **Planning** ([`build_plan`]) -- turn ordered groups into a
//!   [`ConcatenationPlan`] for an external mux/transcode executor.
//!
//! ## Example
//!
//! ```
//! use segmerge_core::{build_plan, classify, order, PlanLayout, Segment, Taxonomy};
//!
//! let segments = vec![
//!     Segment::new("bak0_b.ts", classify("bak0_b.ts", Taxonomy::Numbered), 2.0),
//!     Segment::new("a.ts", classify("a.ts", Taxonomy::Numbered), 1.0),
//! ];
//! let ordered = order(segments);
//! let plan = build_plan(&ordered, &PlanLayout::default())?;
//! assert_eq!(plan.groups.len(), 2);
//! # Ok::<(), segmerge_core::Error>(())
//! ```

pub mod error;
pub mod group;
pub mod ordering;
pub mod plan;
pub mod segment;
pub mod timestamp;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use group::{classify, GroupTag, Taxonomy};
pub use ordering::{order, OrderedGroup, OrderedGroups, SegmentDiagnostic};
pub use plan::{
    build_plan, concat_manifest, ConcatenationPlan, FinalMerge, FinalStage, GroupMerge,
    GroupStage, PlanLayout, DEFAULT_OUTPUT,
};
pub use segment::{OffsetSource, Segment};
pub use timestamp::{
    offset_from_filename, parse_start_time, resolve_offset, NoProbe, ResolvedOffset,
    StartTimeProbe,
};
