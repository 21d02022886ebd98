//! Unified error type for segmerge.
//!
//! The engine itself only ever produces [`Error::EmptyInput`]; the other
//! variants are raised by the collaborator layers (fetching, probing, tool
//! execution) that share this type.

/// Unified error type covering all failure modes in segmerge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nothing left to merge: no segments ingested, no non-empty groups, or
    /// no group merged successfully.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Retrieving a playlist or segment failed.
    #[error("Fetch error [{url}]: {message}")]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Merging one plan stage failed.
    #[error("Merge error [{stage}]: {message}")]
    Merge {
        /// The stage that failed (a group tag or `final`).
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration or input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Convenience constructor for [`Error::EmptyInput`].
    pub fn empty_input(message: impl Into<String>) -> Self {
        Error::EmptyInput(message.into())
    }

    /// Convenience constructor for [`Error::Fetch`].
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Merge`].
    pub fn merge(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Merge {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether this error ends the whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::EmptyInput(_) | Error::Validation(_))
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
