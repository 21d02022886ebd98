//! Chronological offset resolution.
//!
//! Sources are tried cheapest and most exact first:
//!
//! 1. a millisecond start time embedded in the filename
//!    (`<hash>_testpagerec<start>_<end>.ts`),
//! 2. the container start time reported by a [`StartTimeProbe`],
//! 3. the `0.0` fallback.
//!
//! Resolution never fails. Callers decide whether an unresolved offset is
//! worth a warning.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::segment::OffsetSource;
use crate::Result;

static RECORDING_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_testpagerec(\d+)_(\d+)\.ts$").expect("recording name pattern is valid")
});

/// Values a probe may report when the container carries no start time.
const ABSENT_START_TIMES: &[&str] = &["", "N/A"];

/// A collaborator able to read a segment's container-level start time.
///
/// Implementations must be safe to share across worker threads.
pub trait StartTimeProbe: Send + Sync {
    /// Human-readable name identifying this probe implementation.
    fn name(&self) -> &'static str;

    /// Return the raw start-time field of the file at `path`.
    ///
    /// `Ok(None)`, `Ok(Some(""))` and `Ok(Some("N/A"))` all mean "absent".
    fn start_time(&self, path: &Path) -> Result<Option<String>>;
}

/// A probe that never reports a start time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl StartTimeProbe for NoProbe {
    fn name(&self) -> &'static str {
        "none"
    }

    fn start_time(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }
}

/// An offset in seconds together with where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedOffset {
    pub seconds: f64,
    pub source: OffsetSource,
}

impl ResolvedOffset {
    pub fn filename(seconds: f64) -> Self {
        Self {
            seconds,
            source: OffsetSource::Filename,
        }
    }

    pub fn probe(seconds: f64) -> Self {
        Self {
            seconds,
            source: OffsetSource::Probe,
        }
    }

    /// The `0.0` fallback.
    pub fn unresolved() -> Self {
        Self {
            seconds: 0.0,
            source: OffsetSource::Unresolved,
        }
    }
}

impl From<f64> for ResolvedOffset {
    fn from(seconds: f64) -> Self {
        Self {
            seconds,
            source: OffsetSource::Provided,
        }
    }
}

/// Parse the millisecond start offset embedded in a recording filename.
///
/// Returns the offset in seconds, or `None` when the name does not follow the
/// `…_testpagerec<start>_<end>.ts` pattern.
pub fn offset_from_filename(basename: &str) -> Option<f64> {
    let caps = RECORDING_NAME.captures(basename)?;
    let millis: u64 = caps.get(1)?.as_str().parse().ok()?;
    Some(millis as f64 / 1000.0)
}

/// Parse a probe-reported start time.
///
/// Empty strings and `N/A` are absent values, not zero. Anything that does
/// not parse to a finite number is treated the same way.
pub fn parse_start_time(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if ABSENT_START_TIMES.contains(&raw) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|secs| secs.is_finite())
}

/// Resolve the chronological offset of one segment.
///
/// The probe is only consulted when the filename carries no timestamp.
pub fn resolve_offset(identifier: &Path, probe: &dyn StartTimeProbe) -> ResolvedOffset {
    let basename = identifier
        .file_name()
        .unwrap_or(identifier.as_os_str())
        .to_string_lossy();

    if let Some(seconds) = offset_from_filename(&basename) {
        return ResolvedOffset::filename(seconds);
    }

    match probe.start_time(identifier) {
        Ok(Some(raw)) => match parse_start_time(&raw) {
            Some(seconds) => ResolvedOffset::probe(seconds),
            None => {
                tracing::trace!(segment = %basename, raw = %raw, "probe reported no start time");
                ResolvedOffset::unresolved()
            }
        },
        Ok(None) => ResolvedOffset::unresolved(),
        Err(e) => {
            tracing::debug!(
                segment = %basename,
                probe = probe.name(),
                error = %e,
                "start time probe failed"
            );
            ResolvedOffset::unresolved()
        }
    }
}
