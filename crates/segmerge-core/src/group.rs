//! Source-group classification.
//!
//! Every segment belongs to exactly one [`GroupTag`], derived purely from its
//! basename. Tags are totally ordered by merge priority: `main` first, then
//! numbered mirrors `bak0`, `bak1`, … ascending, then the unnumbered `bak`
//! bucket last.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Literal prefix marking a mirror (backup) capture source.
const MIRROR_PREFIX: &str = "bak";

/// A segment's capture-source group.
///
/// The derived `Ord` is the merge priority: variant order first, then the
/// mirror number for [`GroupTag::Mirror`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupTag {
    /// The primary source.
    Main,
    /// A numbered mirror source, `bak<N>`.
    Mirror(u32),
    /// A mirror source without a number, `bak`.
    Backup,
}

impl GroupTag {
    /// Whether this tag denotes a mirror source of any kind.
    pub fn is_mirror(&self) -> bool {
        !matches!(self, GroupTag::Main)
    }
}

impl fmt::Display for GroupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupTag::Main => f.write_str("main"),
            GroupTag::Mirror(n) => write!(f, "{MIRROR_PREFIX}{n}"),
            GroupTag::Backup => f.write_str(MIRROR_PREFIX),
        }
    }
}

impl FromStr for GroupTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "main" => Ok(GroupTag::Main),
            MIRROR_PREFIX => Ok(GroupTag::Backup),
            _ => s
                .strip_prefix(MIRROR_PREFIX)
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse().ok())
                .map(GroupTag::Mirror)
                .ok_or_else(|| format!("Unknown group tag: {s}")),
        }
    }
}

impl Serialize for GroupTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GroupTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Rule set used to classify segment names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
    /// `bak<N>_` prefixes become numbered mirrors; any other `bak` is the
    /// generic mirror bucket.
    #[default]
    Numbered,
    /// Only `main` and `bak`: any name containing `bak` is a mirror.
    Binary,
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Taxonomy::Numbered => f.write_str("numbered"),
            Taxonomy::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for Taxonomy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "numbered" => Ok(Taxonomy::Numbered),
            "binary" => Ok(Taxonomy::Binary),
            _ => Err(format!("Unknown taxonomy: {s} (expected numbered or binary)")),
        }
    }
}

/// Classify a segment by its basename.
///
/// Total and pure: every identifier maps to exactly one tag. The numbered
/// prefix is checked before the generic substring match, otherwise numbered
/// mirrors would collapse into [`GroupTag::Backup`].
///
/// Only the basename is inspected, so a parent directory called `backup/`
/// does not turn primary segments into mirrors.
///
/// # Example
///
/// ```
/// use segmerge_core::{classify, GroupTag, Taxonomy};
///
/// assert_eq!(classify("bak2_seg001.ts", Taxonomy::Numbered), GroupTag::Mirror(2));
/// assert_eq!(classify("BAKUP_clip.ts", Taxonomy::Numbered), GroupTag::Backup);
/// assert_eq!(classify("clip.ts", Taxonomy::Numbered), GroupTag::Main);
/// ```
pub fn classify(identifier: impl AsRef<Path>, taxonomy: Taxonomy) -> GroupTag {
    let identifier = identifier.as_ref();
    let basename = identifier
        .file_name()
        .unwrap_or(identifier.as_os_str())
        .to_string_lossy();

    if taxonomy == Taxonomy::Numbered {
        if let Some(n) = mirror_number(&basename) {
            return GroupTag::Mirror(n);
        }
    }

    if basename.to_lowercase().contains(MIRROR_PREFIX) {
        GroupTag::Backup
    } else {
        GroupTag::Main
    }
}

/// Extract `N` from a `bak<N>_` prefix.
///
/// A number too large for `u32` is not a usable mirror index; such names
/// fall through to the generic bucket.
fn mirror_number(basename: &str) -> Option<u32> {
    let rest = basename.strip_prefix(MIRROR_PREFIX)?;
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 || rest.as_bytes().get(digits_len) != Some(&b'_') {
        return None;
    }
    rest[..digits_len].parse().ok()
}
