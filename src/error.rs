//! Error types for the library.
//!
//! Text normalization and span detection are total functions and never fail;
//! errors here cover the registry update pipeline and internal-consistency
//! violations reaching the RTF encoder.

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the taxonomy update pipeline at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    /// Downloading the remote taxonomy archive
    Download,
    /// Extracting the archive contents
    Extract,
    /// Parsing the tabular taxonomy files
    Parse,
    /// Persisting the validated name list
    Persist,
}

impl std::fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UpdateStage::Download => "download",
            UpdateStage::Extract => "extract",
            UpdateStage::Parse => "parse",
            UpdateStage::Persist => "persist",
        };
        f.write_str(s)
    }
}

/// Error types that can occur during processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Taxonomy update failed at a specific pipeline stage.
    ///
    /// The previously loaded registry sets and the persisted list file are
    /// guaranteed unchanged when this is returned.
    #[error("Taxonomy update failed during {stage}: {reason}")]
    Update {
        /// Pipeline stage where the failure occurred
        stage: UpdateStage,
        /// Human-readable cause
        reason: String,
    },

    /// Taxonomy update was cancelled before completion
    #[error("Taxonomy update cancelled")]
    UpdateCancelled,

    /// An update is already in flight; concurrent updates are rejected
    #[error("Taxonomy update already in progress")]
    UpdateInProgress,

    /// Italic span lies outside the text bounds.
    ///
    /// Indicates a detector bug, not a recoverable runtime condition.
    #[error("Italic span {start}..{end} out of bounds for text of {len} chars")]
    SpanOutOfBounds {
        /// Span start (char offset)
        start: usize,
        /// Span end (char offset)
        end: usize,
        /// Length of the plain text in chars
        len: usize,
    },

    /// Italic spans overlap or are out of order.
    ///
    /// Indicates a detector bug, not a recoverable runtime condition.
    #[error("Italic span starting at {start} overlaps or precedes a span ending at {prev_end}")]
    SpanOverlap {
        /// End of the preceding span (char offset)
        prev_end: usize,
        /// Start of the offending span (char offset)
        start: usize,
    },
}
